use crate::{
    available_pool, draw, Clock, CustomIconMap, Event, EventBus, FrameScheduler, History,
    IconError, IconGallery, PersistTarget, RandomSource, RefusalReason, RevealAnimator,
    RevealConfig, RevealStep, Roster, RosterEntry, Store, Wakeup,
};

/// Transient selection state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawState {
    pub is_spinning: bool,
    pub target: Option<RosterEntry>,
    pub committed_selection: Option<RosterEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    Started(RosterEntry),
    Refused(RefusalReason),
}

/// One draw slot: roster, persisted history and icons, and the reveal
/// animation, all on a single thread.
pub struct DrawSession<R, H, I, C: Clock> {
    roster: Roster,
    history: History,
    history_store: H,
    icons: IconGallery<I>,
    rng: R,
    animator: RevealAnimator,
    scheduler: FrameScheduler<C>,
    state: DrawState,
    events: EventBus,
}

impl<R, H, I, C> DrawSession<R, H, I, C>
where
    R: RandomSource,
    H: Store<History>,
    I: Store<CustomIconMap>,
    C: Clock,
{
    pub fn new(
        roster: Roster,
        config: RevealConfig,
        rng: R,
        history_store: H,
        icon_store: I,
        scheduler: FrameScheduler<C>,
    ) -> Self {
        let mut history = history_store.load();
        let dropped = history.retain_known(&roster);
        if !dropped.is_empty() {
            tracing::warn!(?dropped, "dropped history entries not present in roster");
        }
        Self {
            roster,
            history,
            history_store,
            icons: IconGallery::open(icon_store),
            rng,
            animator: RevealAnimator::new(config),
            scheduler,
            state: DrawState::default(),
            events: EventBus::default(),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn animator(&self) -> &RevealAnimator {
        &self.animator
    }

    pub fn scheduler(&self) -> &FrameScheduler<C> {
        &self.scheduler
    }

    pub fn icons(&self) -> &IconGallery<I> {
        &self.icons
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn available_pool(&self) -> Vec<&RosterEntry> {
        available_pool(&self.roster, &self.history)
    }

    /// Whether the draw trigger should be enabled.
    pub fn can_draw(&self) -> bool {
        !self.state.is_spinning && !self.available_pool().is_empty()
    }

    pub fn trigger_draw(&mut self) -> DrawOutcome {
        if self.state.is_spinning {
            return self.refuse(RefusalReason::AlreadySpinning);
        }
        if self.available_pool().is_empty() {
            return self.refuse(RefusalReason::PoolEmpty);
        }
        let pool = available_pool(&self.roster, &self.history);
        let Some(target) = draw(&pool, &mut self.rng).map(|entry| (*entry).clone()) else {
            return DrawOutcome::Refused(RefusalReason::PoolEmpty);
        };
        self.state = DrawState {
            is_spinning: true,
            target: Some(target.clone()),
            committed_selection: None,
        };
        self.animator.start(
            target.clone(),
            &pool,
            &self.roster,
            &mut self.rng,
            &mut self.scheduler,
        );
        let reel_len = self.animator.reel().map(|reel| reel.len()).unwrap_or(0);
        tracing::info!(entry = %target.id, available = pool.len(), "draw started");
        self.events.push(Event::SpinStarted {
            target: target.id.clone(),
            reel_len,
            available: pool.len(),
        });
        DrawOutcome::Started(target)
    }

    /// Delivers every due wake-up. Returns the entry committed by this call, if any.
    pub fn pump(&mut self) -> Option<RosterEntry> {
        let mut committed = None;
        for wake in self.scheduler.take_due() {
            if let Some(entry) = self.handle_wakeup(wake) {
                committed = Some(entry);
            }
        }
        committed
    }

    pub fn handle_wakeup(&mut self, wake: Wakeup) -> Option<RosterEntry> {
        match self.animator.handle(wake, &mut self.scheduler) {
            RevealStep::PreviewEnded => {
                self.events.push(Event::SpinPreviewEnded);
                None
            }
            RevealStep::Settled(target) => {
                self.events.push(Event::SpinSettled {
                    target: target.id.clone(),
                });
                self.record_selection(&target);
                self.state.committed_selection = Some(target.clone());
                self.state.is_spinning = false;
                Some(target)
            }
            RevealStep::Advanced { .. } | RevealStep::Ignored => None,
        }
    }

    /// Prepends `entry` to history and persists it. Ids outside the roster or
    /// already drawn are ignored.
    pub fn record_selection(&mut self, entry: &RosterEntry) -> bool {
        if !self.roster.contains(&entry.id) {
            tracing::warn!(id = %entry.id, "refusing to record id outside the roster");
            return false;
        }
        if self.history.contains(&entry.id) {
            tracing::warn!(id = %entry.id, "refusing to record id already in history");
            return false;
        }
        let timestamp = self.scheduler.epoch_ms();
        self.history.record(entry.id.clone(), timestamp);
        self.persist_history();
        tracing::info!(id = %entry.id, timestamp, "selection committed");
        self.events.push(Event::SelectionCommitted {
            id: entry.id.clone(),
            timestamp,
        });
        true
    }

    /// Clears the transient selection. History is left as written.
    pub fn skip(&mut self) {
        self.cancel_spin();
        self.state = DrawState::default();
        self.events.push(Event::Skipped);
    }

    /// Clears history and the transient selection together.
    pub fn purge(&mut self) {
        self.cancel_spin();
        let cleared = self.history.len();
        self.history.clear();
        self.state = DrawState::default();
        self.persist_history();
        tracing::info!(cleared, "history purged");
        self.events.push(Event::Purged { cleared });
    }

    /// Cancels pending callbacks without committing anything.
    pub fn teardown(&mut self) {
        self.cancel_spin();
        self.state.is_spinning = false;
        self.state.target = None;
    }

    /// Milliseconds until the animation next needs a wake-up.
    pub fn time_until_next_wakeup(&self) -> Option<u64> {
        self.scheduler.time_until_next()
    }

    pub fn upload_icon(&mut self, id: &str, bytes: &[u8]) -> Result<String, IconError> {
        match self.icons.upload(&self.roster, id, bytes) {
            Ok(uri) => {
                self.events.push(Event::IconUploaded { id: id.to_string() });
                Ok(uri)
            }
            Err(err) => {
                self.note_icon_error(&err);
                Err(err)
            }
        }
    }

    pub fn remove_icon(&mut self, id: &str) -> Result<bool, IconError> {
        match self.icons.remove(id) {
            Ok(removed) => {
                if removed {
                    self.events.push(Event::IconRemoved { id: id.to_string() });
                }
                Ok(removed)
            }
            Err(err) => {
                self.note_icon_error(&err);
                Err(err)
            }
        }
    }

    fn refuse(&mut self, reason: RefusalReason) -> DrawOutcome {
        tracing::debug!(?reason, "draw refused");
        self.events.push(Event::DrawRefused { reason });
        DrawOutcome::Refused(reason)
    }

    fn cancel_spin(&mut self) {
        let phase = self.animator.phase();
        if self.animator.cancel(&mut self.scheduler) {
            tracing::debug!(?phase, "spin cancelled");
            self.events.push(Event::SpinCancelled { phase });
        }
    }

    fn persist_history(&mut self) {
        if let Err(err) = self.history_store.save(&self.history) {
            tracing::warn!(error = %err, "failed to persist history");
            self.events.push(Event::PersistFailed {
                target: PersistTarget::History,
                message: err.to_string(),
            });
        }
    }

    fn note_icon_error(&mut self, err: &IconError) {
        if let IconError::Persist(inner) = err {
            tracing::warn!(error = %inner, "failed to persist icons");
            self.events.push(Event::PersistFailed {
                target: PersistTarget::Icons,
                message: inner.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        JsonStore, MemoryBackend, RevealPhase, ScriptedRandom, VirtualClock, CUSTOM_ICONS_KEY,
        HISTORY_KEY,
    };

    type TestSession = DrawSession<
        ScriptedRandom,
        JsonStore<MemoryBackend, History>,
        JsonStore<MemoryBackend, CustomIconMap>,
        VirtualClock,
    >;

    fn session(backend: &MemoryBackend, picks: &[usize]) -> (TestSession, VirtualClock) {
        let clock = VirtualClock::new(1_700_000_000_000);
        let roster = Roster::from_names(["A", "B", "C"]).expect("roster");
        let session = DrawSession::new(
            roster,
            RevealConfig::default(),
            ScriptedRandom::new(picks.iter().copied()),
            JsonStore::new(backend.clone(), HISTORY_KEY),
            JsonStore::new(backend.clone(), CUSTOM_ICONS_KEY),
            FrameScheduler::new(clock.clone()),
        );
        (session, clock)
    }

    #[test]
    fn unknown_history_ids_are_dropped_on_load() {
        let backend = MemoryBackend::new();
        backend.insert_raw(
            HISTORY_KEY,
            r#"[{"id":"Q","timestamp":2},{"id":"B","timestamp":1}]"#,
        );
        let (session, _) = session(&backend, &[]);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.available_pool().len(), 2);
    }

    #[test]
    fn teardown_mid_spin_leaves_nothing_pending() {
        let backend = MemoryBackend::new();
        let (mut session, clock) = session(&backend, &[0]);
        assert!(matches!(session.trigger_draw(), DrawOutcome::Started(_)));
        clock.advance(1_000);
        session.teardown();
        assert_eq!(session.scheduler().pending_count(), 0);
        clock.advance(10_000);
        assert_eq!(session.pump(), None);
        assert!(session.history().is_empty());
        assert!(!session.state().is_spinning);
        assert_eq!(session.animator().phase(), RevealPhase::Idle);
    }

    #[test]
    fn history_write_failure_is_reported_not_fatal() {
        let backend = MemoryBackend::new();
        let (mut session, _) = session(&backend, &[]);
        backend.set_fail_writes(true);
        assert!(session.record_selection(&RosterEntry::named("C")));
        assert!(session.history().contains("C"));
        let events: Vec<_> = session.events().drain().collect();
        assert!(events.iter().any(|event| matches!(
            event,
            Event::PersistFailed {
                target: PersistTarget::History,
                ..
            }
        )));
    }

    #[test]
    fn foreign_selection_is_not_recorded() {
        let backend = MemoryBackend::new();
        let (mut session, _) = session(&backend, &[]);
        assert!(!session.record_selection(&RosterEntry::named("Nobody")));
        assert!(session.history().is_empty());
    }

    #[test]
    fn repeated_selection_is_not_recorded_twice() {
        let backend = MemoryBackend::new();
        let (mut session, clock) = session(&backend, &[]);
        assert!(session.record_selection(&RosterEntry::named("B")));
        clock.advance(50);
        assert!(!session.record_selection(&RosterEntry::named("B")));
        assert_eq!(session.history().len(), 1);
        assert_eq!(
            session.history().latest().map(|entry| entry.timestamp),
            Some(1_700_000_000_000)
        );
        let commits = session
            .events()
            .drain()
            .filter(|event| matches!(event, Event::SelectionCommitted { .. }))
            .count();
        assert_eq!(commits, 1);
    }
}
