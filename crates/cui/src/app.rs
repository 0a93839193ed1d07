use crate::LaunchOptions;
use anyhow::{Context, Result};
use rosterspin_core::{
    Clock, DrawOutcome, Event, FrameScheduler, ImageSource, PersistTarget, RefusalReason,
    RevealPhase, RosterEntry, SystemClock,
};
use rosterspin_data::{default_assets_dir, default_data_dir, open_session, FileSession};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

const MAX_EVENT_LOG: usize = 200;
const MIN_POLL_MS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelRow {
    pub label: String,
    pub centered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub label: String,
    pub drawn: bool,
}

pub struct App<C: Clock = SystemClock> {
    pub session: FileSession<C>,
    pub data_dir: PathBuf,
    pub event_log: VecDeque<String>,
    pub status_line: String,
    pub show_help: bool,
    pub confirm_purge: bool,
    pub should_quit: bool,
}

impl App<SystemClock> {
    pub fn bootstrap(options: &LaunchOptions) -> Result<Self> {
        let assets_dir = options.assets_dir.clone().unwrap_or_else(default_assets_dir);
        let data_dir = options
            .data_dir
            .clone()
            .or_else(default_data_dir)
            .context("no data directory: set ROSTERSPIN_DATA or HOME, or pass --data")?;
        let scheduler = FrameScheduler::new(SystemClock::new());
        let session = open_session(&assets_dir, &data_dir, options.seed, scheduler)
            .context("open session")?;
        Ok(Self::with_session(session, data_dir))
    }
}

impl<C: Clock> App<C> {
    pub fn with_session(session: FileSession<C>, data_dir: PathBuf) -> Self {
        let mut app = Self {
            session,
            data_dir,
            event_log: VecDeque::new(),
            status_line: "ready".to_string(),
            show_help: false,
            confirm_purge: false,
            should_quit: false,
        };
        app.push_event_line(format!(
            "roster: {} entries, {} drawn",
            app.session.roster().len(),
            app.session.history().len()
        ));
        app
    }

    /// Delivers due animation wake-ups and collects session events.
    pub fn on_tick(&mut self) {
        if let Some(entry) = self.session.pump() {
            self.status_line = format!("picked {}", entry.id);
        }
        self.flush_events();
    }

    /// How long the input poll may block without missing a frame.
    pub fn poll_timeout(&self, tick_rate: Duration) -> Duration {
        match self.session.time_until_next_wakeup() {
            Some(ms) => Duration::from_millis(ms.max(MIN_POLL_MS)).min(tick_rate),
            None => tick_rate,
        }
    }

    pub fn draw(&mut self) {
        self.confirm_purge = false;
        match self.session.trigger_draw() {
            DrawOutcome::Started(_) => self.status_line = "spinning...".to_string(),
            DrawOutcome::Refused(RefusalReason::AlreadySpinning) => {
                self.status_line = "already spinning".to_string();
            }
            DrawOutcome::Refused(RefusalReason::PoolEmpty) => {
                self.status_line =
                    "everyone has been drawn; purge history to start over".to_string();
            }
        }
        self.flush_events();
    }

    pub fn skip(&mut self) {
        self.confirm_purge = false;
        self.session.skip();
        self.status_line = "selection cleared".to_string();
        self.flush_events();
    }

    /// First press arms the purge, second press runs it.
    pub fn purge(&mut self) {
        if !self.confirm_purge {
            self.confirm_purge = true;
            self.status_line = "press P again to clear history (Esc to cancel)".to_string();
            return;
        }
        self.confirm_purge = false;
        self.session.purge();
        self.status_line = "history cleared".to_string();
        self.flush_events();
    }

    pub fn cancel(&mut self) {
        if self.show_help {
            self.show_help = false;
        } else if self.confirm_purge {
            self.confirm_purge = false;
            self.status_line = "purge cancelled".to_string();
        }
    }

    pub fn quit(&mut self) {
        self.teardown();
        self.should_quit = true;
    }

    pub fn teardown(&mut self) {
        self.session.teardown();
    }

    pub fn next_hint(&self) -> &'static str {
        if self.session.state().is_spinning {
            "spinning"
        } else if self.session.can_draw() {
            "space: draw  s: skip  P: purge"
        } else {
            "pool empty: P to purge"
        }
    }

    pub fn phase_label(&self) -> &'static str {
        match self.session.animator().phase() {
            RevealPhase::Idle => "idle",
            RevealPhase::Previewing => "ready...",
            RevealPhase::Spinning => "spinning",
            RevealPhase::Settled => "settled",
        }
    }

    pub fn reel_rows(&self) -> Vec<ReelRow> {
        let animator = self.session.animator();
        let center = animator.config().center_slot();
        let visible = animator.visible();
        if visible.is_empty() {
            return vec![ReelRow {
                label: "?".to_string(),
                centered: true,
            }];
        }
        visible
            .iter()
            .enumerate()
            .map(|(idx, entry)| ReelRow {
                label: self.entry_label(entry),
                centered: idx == center,
            })
            .collect()
    }

    pub fn selection_lines(&self) -> Vec<String> {
        let Some(entry) = self.session.state().committed_selection.as_ref() else {
            return vec!["-".to_string()];
        };
        let mut lines = vec![self.entry_label(entry)];
        lines.extend(entry.aux_text.iter().map(|line| format!("  {line}")));
        lines
    }

    pub fn history_rows(&self) -> Vec<String> {
        self.session
            .history()
            .entries()
            .iter()
            .map(|entry| format!("{} {}", format_clock(entry.timestamp), entry.id))
            .collect()
    }

    pub fn roster_rows(&self) -> Vec<RosterRow> {
        let history = self.session.history();
        self.session
            .roster()
            .entries()
            .iter()
            .map(|entry| RosterRow {
                label: self.entry_label(entry),
                drawn: history.contains(&entry.id),
            })
            .collect()
    }

    pub fn available_summary(&self) -> String {
        format!(
            "{}/{}",
            self.session.available_pool().len(),
            self.session.roster().len()
        )
    }

    fn entry_label(&self, entry: &RosterEntry) -> String {
        let badge = match self.session.icons().image_source(entry) {
            ImageSource::Remote(_) => "img".to_string(),
            ImageSource::Inline(_) => "icon".to_string(),
            ImageSource::Initials(initials) => initials,
        };
        format!("[{badge}] {}", entry.id)
    }

    fn flush_events(&mut self) {
        let lines: Vec<String> = self.session.events().drain().map(describe_event).collect();
        for line in lines {
            self.push_event_line(line);
        }
    }

    fn push_event_line(&mut self, line: String) {
        self.event_log.push_back(line);
        while self.event_log.len() > MAX_EVENT_LOG {
            self.event_log.pop_front();
        }
    }
}

fn describe_event(event: Event) -> String {
    match event {
        Event::SpinStarted {
            target: _,
            reel_len,
            available,
        } => format!("spin started ({available} available, reel {reel_len})"),
        Event::SpinPreviewEnded => "reel released".to_string(),
        Event::SpinSettled { target } => format!("settled on {target}"),
        Event::SpinCancelled { phase } => format!("spin cancelled while {phase:?}"),
        Event::SelectionCommitted { id, timestamp } => {
            format!("recorded {id} at {}", format_clock(timestamp))
        }
        Event::DrawRefused { reason } => format!("draw refused: {reason:?}"),
        Event::Skipped => "skipped".to_string(),
        Event::Purged { cleared } => format!("history purged ({cleared} entries)"),
        Event::IconUploaded { id } => format!("icon uploaded for {id}"),
        Event::IconRemoved { id } => format!("icon removed for {id}"),
        Event::PersistFailed { target, message } => {
            let what = match target {
                PersistTarget::History => "history",
                PersistTarget::Icons => "icons",
            };
            format!("warning: could not save {what}: {message}")
        }
    }
}

/// `HH:MM:SS` (UTC) for an epoch-millisecond timestamp.
pub fn format_clock(timestamp_ms: i64) -> String {
    let secs = timestamp_ms.div_euclid(1_000).rem_euclid(86_400);
    format!("{:02}:{:02}:{:02}", secs / 3_600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosterspin_core::VirtualClock;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "rosterspin_cui_app_{tag}_{}_{}",
            std::process::id(),
            nanos
        ))
    }

    fn test_app() -> (App<VirtualClock>, VirtualClock, PathBuf, PathBuf) {
        let assets = unique_temp_dir("assets");
        let data = unique_temp_dir("data");
        fs::create_dir_all(&assets).expect("mkdir");
        fs::write(assets.join("roster.json"), r#"["Ash Warden","Brin","Cole"]"#).expect("roster");
        let clock = VirtualClock::new(0);
        let session = open_session(&assets, &data, Some(1), FrameScheduler::new(clock.clone()))
            .expect("open");
        (App::with_session(session, data.clone()), clock, assets, data)
    }

    #[test]
    fn format_clock_wraps_days() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(3_723_000), "01:02:03");
        assert_eq!(format_clock(86_400_000 + 59_000), "00:00:59");
    }

    #[test]
    fn draw_spins_then_commits_on_ticks() {
        let (mut app, clock, assets, data) = test_app();
        assert_eq!(app.reel_rows().len(), 1);
        app.draw();
        assert_eq!(app.status_line, "spinning...");
        assert_eq!(app.reel_rows().len(), 3);
        assert!(app.poll_timeout(Duration::from_millis(120)) <= Duration::from_millis(120));

        app.draw();
        assert_eq!(app.status_line, "already spinning");

        for _ in 0..400 {
            clock.advance(16);
            app.on_tick();
            if !app.session.state().is_spinning {
                break;
            }
        }
        assert!(app.status_line.starts_with("picked "));
        assert_eq!(app.history_rows().len(), 1);
        assert_eq!(app.roster_rows().iter().filter(|row| row.drawn).count(), 1);
        assert_eq!(app.available_summary(), "2/3");
        let centered: Vec<_> = app.reel_rows().into_iter().filter(|row| row.centered).collect();
        assert_eq!(centered.len(), 1);
        assert_eq!(app.selection_lines()[0], centered[0].label);
        let _ = fs::remove_dir_all(assets);
        let _ = fs::remove_dir_all(data);
    }

    #[test]
    fn purge_needs_confirmation() {
        let (mut app, _, assets, data) = test_app();
        app.session.record_selection(&RosterEntry::named("Brin"));
        app.purge();
        assert!(app.confirm_purge);
        assert_eq!(app.session.history().len(), 1);
        app.cancel();
        assert!(!app.confirm_purge);
        app.purge();
        app.purge();
        assert!(app.session.history().is_empty());
        assert!(app.event_log.iter().any(|line| line.starts_with("history purged")));
        let _ = fs::remove_dir_all(assets);
        let _ = fs::remove_dir_all(data);
    }

    #[test]
    fn labels_fall_back_to_initials() {
        let (app, _, assets, data) = test_app();
        let rows = app.roster_rows();
        assert_eq!(rows[0].label, "[AW] Ash Warden");
        assert_eq!(rows[1].label, "[BR] Brin");
        let _ = fs::remove_dir_all(assets);
        let _ = fs::remove_dir_all(data);
    }
}
