use crate::{load_reveal_config, load_roster, open_stores, HistoryStore, IconStore};
use anyhow::Context;
use rosterspin_core::{Clock, DrawSession, FrameScheduler, RngState};
use std::path::Path;

pub type FileSession<C> = DrawSession<RngState, HistoryStore, IconStore, C>;

/// Loads assets and stored state into a ready session. Without a seed the
/// generator is seeded from entropy.
pub fn open_session<C: Clock>(
    assets_dir: &Path,
    data_dir: &Path,
    seed: Option<u64>,
    scheduler: FrameScheduler<C>,
) -> anyhow::Result<FileSession<C>> {
    let roster = load_roster(assets_dir).context("load roster")?;
    let config = load_reveal_config(assets_dir).context("load reveal config")?;
    let (history_store, icon_store) = open_stores(data_dir).context("open storage")?;
    let rng = match seed {
        Some(seed) => RngState::from_seed(seed),
        None => RngState::from_entropy(),
    };
    tracing::debug!(seed = rng.seed(), data = %data_dir.display(), "session opened");
    Ok(DrawSession::new(
        roster,
        config,
        rng,
        history_store,
        icon_store,
        scheduler,
    ))
}
