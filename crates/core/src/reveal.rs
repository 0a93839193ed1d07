use crate::{
    Clock, FrameScheduler, RandomSource, RevealConfig, Roster, RosterEntry, TimerHandle,
    WakeKind, Wakeup,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RevealPhase {
    Idle,
    Previewing,
    Spinning,
    Settled,
}

/// Cubic ease-in-out over `[0, 1]`.
pub fn ease_in_out_cubic(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    if p < 0.5 {
        4.0 * p * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(3) / 2.0
    }
}

/// Decoys plus the target, cut so the last visible window is centred on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reel {
    entries: Vec<RosterEntry>,
    target_index: usize,
    window: usize,
}

impl Reel {
    pub fn build<R: RandomSource>(
        target: &RosterEntry,
        pool: &[&RosterEntry],
        roster: &Roster,
        config: &RevealConfig,
        rng: &mut R,
    ) -> Self {
        let window = config.window();
        let center = config.center_slot();
        let after = window - 1 - center;

        let mut source: Vec<RosterEntry> = if pool.len() >= config.min_pool {
            pool.iter().map(|entry| (*entry).clone()).collect()
        } else {
            roster.entries().to_vec()
        };
        if source.is_empty() {
            source.push(target.clone());
        }
        rng.shuffle(&mut source);

        let n = source.len();
        let min_len = n + window + after;
        let copies = config.reel_copies.max(2).max(min_len.div_ceil(n));
        let mut entries = Vec::with_capacity(n * copies);
        for _ in 0..copies {
            entries.extend(source.iter().cloned());
        }

        // Candidate resting positions: one full copy, leaving room for the
        // trailing half of the window.
        let hi = entries.len() - 1 - after;
        let lo = hi + 1 - n;
        let target_index = match (lo..=hi).find(|idx| entries[*idx].id == target.id) {
            Some(idx) => idx,
            None => {
                let idx = lo + rng.pick_index(n);
                entries[idx] = target.clone();
                idx
            }
        };
        entries.truncate(target_index + after + 1);

        Self {
            entries,
            target_index,
            window,
        }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Window start at which the target sits in the centre slot.
    pub fn final_offset(&self) -> usize {
        self.entries.len() - self.window
    }

    pub fn offset_for(&self, eased: f64) -> usize {
        let final_offset = self.final_offset();
        let raw = (eased.clamp(0.0, 1.0) * final_offset as f64).floor() as usize;
        raw.min(final_offset)
    }

    pub fn window_at(&self, offset: usize) -> &[RosterEntry] {
        let start = offset.min(self.final_offset());
        &self.entries[start..start + self.window]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// Wake-up did not belong to the current run.
    Ignored,
    PreviewEnded,
    Advanced { offset: usize },
    Settled(RosterEntry),
}

/// Idle → Previewing → Spinning → Settled, driven by scheduler wake-ups.
#[derive(Debug, Clone)]
pub struct RevealAnimator {
    config: RevealConfig,
    phase: RevealPhase,
    target: Option<RosterEntry>,
    reel: Option<Reel>,
    offset: usize,
    progress: f64,
    spin_started_ms: u64,
    pending: Option<TimerHandle>,
}

impl RevealAnimator {
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            phase: RevealPhase::Idle,
            target: None,
            reel: None,
            offset: 0,
            progress: 0.0,
            spin_started_ms: 0,
            pending: None,
        }
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, RevealPhase::Previewing | RevealPhase::Spinning)
    }

    pub fn target(&self) -> Option<&RosterEntry> {
        self.target.as_ref()
    }

    pub fn reel(&self) -> Option<&Reel> {
        self.reel.as_ref()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Linear progress of the spin in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending
    }

    /// Entries currently on screen. Empty while idle.
    pub fn visible(&self) -> &[RosterEntry] {
        match (&self.reel, self.phase) {
            (Some(reel), phase) if phase != RevealPhase::Idle && !reel.is_empty() => {
                reel.window_at(self.offset)
            }
            _ => &[],
        }
    }

    pub fn centered(&self) -> Option<&RosterEntry> {
        self.visible().get(self.config.center_slot())
    }

    /// Begins a run for `target`, abandoning any run still in flight.
    pub fn start<C: Clock, R: RandomSource>(
        &mut self,
        target: RosterEntry,
        pool: &[&RosterEntry],
        roster: &Roster,
        rng: &mut R,
        scheduler: &mut FrameScheduler<C>,
    ) {
        self.cancel(scheduler);
        let reel = Reel::build(&target, pool, roster, &self.config, rng);
        tracing::debug!(
            entry = %target.id,
            reel_len = reel.len(),
            final_offset = reel.final_offset(),
            "reveal previewing"
        );
        self.reel = Some(reel);
        self.target = Some(target);
        self.offset = 0;
        self.progress = 0.0;
        self.phase = RevealPhase::Previewing;
        self.pending = Some(scheduler.set_timer(self.config.preview_ms));
    }

    pub fn handle<C: Clock>(
        &mut self,
        wake: Wakeup,
        scheduler: &mut FrameScheduler<C>,
    ) -> RevealStep {
        if self.pending != Some(wake.handle) {
            return RevealStep::Ignored;
        }
        self.pending = None;
        match (self.phase, wake.kind) {
            (RevealPhase::Previewing, WakeKind::Timer) => {
                self.phase = RevealPhase::Spinning;
                self.spin_started_ms = scheduler.now_ms();
                self.pending = Some(scheduler.request_frame());
                RevealStep::PreviewEnded
            }
            (RevealPhase::Spinning, WakeKind::Frame) => self.advance(scheduler),
            (phase, kind) => {
                tracing::warn!(?phase, ?kind, "unexpected reveal wake-up");
                RevealStep::Ignored
            }
        }
    }

    /// Drops the run and any pending callback. Returns whether a run was active.
    pub fn cancel<C: Clock>(&mut self, scheduler: &mut FrameScheduler<C>) -> bool {
        let was_active = self.is_active();
        if let Some(handle) = self.pending.take() {
            scheduler.cancel(handle);
        }
        self.phase = RevealPhase::Idle;
        self.target = None;
        self.reel = None;
        self.offset = 0;
        self.progress = 0.0;
        was_active
    }

    fn advance<C: Clock>(&mut self, scheduler: &mut FrameScheduler<C>) -> RevealStep {
        let Some(reel) = self.reel.as_ref() else {
            return RevealStep::Ignored;
        };
        let elapsed = scheduler.now_ms().saturating_sub(self.spin_started_ms);
        let p = if self.config.spin_ms == 0 {
            1.0
        } else {
            (elapsed as f64 / self.config.spin_ms as f64).min(1.0)
        };
        self.progress = p;
        if p >= 1.0 {
            self.offset = reel.final_offset();
            self.phase = RevealPhase::Settled;
            return match self.target.clone() {
                Some(target) => RevealStep::Settled(target),
                None => RevealStep::Ignored,
            };
        }
        self.offset = self.offset.max(reel.offset_for(ease_in_out_cubic(p)));
        self.pending = Some(scheduler.request_frame());
        RevealStep::Advanced {
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RngState, ScriptedRandom, VirtualClock};

    fn roster(names: &[&str]) -> Roster {
        Roster::from_names(names.iter().copied()).expect("roster")
    }

    fn run_to_end(
        animator: &mut RevealAnimator,
        clock: &VirtualClock,
        scheduler: &mut FrameScheduler<VirtualClock>,
    ) -> (Vec<usize>, Vec<RosterEntry>) {
        let mut offsets = Vec::new();
        let mut settled = Vec::new();
        for _ in 0..10_000 {
            clock.advance(scheduler.frame_ms());
            for wake in scheduler.take_due() {
                match animator.handle(wake, scheduler) {
                    RevealStep::Advanced { offset } => offsets.push(offset),
                    RevealStep::Settled(entry) => settled.push(entry),
                    _ => {}
                }
            }
            if scheduler.pending_count() == 0 {
                break;
            }
        }
        (offsets, settled)
    }

    #[test]
    fn easing_hits_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-12);
        assert!((ease_in_out_cubic(0.25) - 0.0625).abs() < 1e-12);
        let mut last = 0.0;
        for step in 0..=100 {
            let value = ease_in_out_cubic(f64::from(step) / 100.0);
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn reel_rests_on_target_in_centre_slot() {
        let roster = roster(&["A", "B", "C", "D", "E"]);
        let pool: Vec<_> = roster.entries().iter().collect();
        let config = RevealConfig::default();
        let mut rng = RngState::from_seed(3);
        for idx in 0..roster.len() {
            let target = &roster.entries()[idx];
            let reel = Reel::build(target, &pool, &roster, &config, &mut rng);
            let last = reel.window_at(reel.final_offset());
            assert_eq!(&last[config.center_slot()], target);
            assert_eq!(reel.target_index(), reel.final_offset() + config.center_slot());
            assert!(reel.target_index() >= roster.len() * (config.reel_copies - 2));
        }
    }

    #[test]
    fn small_pool_falls_back_to_roster_for_decoys() {
        let roster = roster(&["A", "B", "C", "D"]);
        let pool = vec![&roster.entries()[2]];
        let mut rng = ScriptedRandom::new([]);
        let config = RevealConfig::default();
        let reel = Reel::build(&roster.entries()[2], &pool, &roster, &config, &mut rng);
        assert!(reel.entries().iter().any(|entry| entry.id == "A"));
        assert_eq!(reel.entries()[reel.target_index()].id, "C");
    }

    #[test]
    fn single_entry_roster_still_builds_a_full_window() {
        let roster = roster(&["Solo"]);
        let pool: Vec<_> = roster.entries().iter().collect();
        let mut rng = RngState::from_seed(1);
        let config = RevealConfig::default();
        let reel = Reel::build(&roster.entries()[0], &pool, &roster, &config, &mut rng);
        assert!(reel.len() >= 3);
        assert_eq!(reel.window_at(reel.final_offset()).len(), 3);
    }

    #[test]
    fn target_outside_source_is_inserted() {
        let roster = roster(&["A", "B", "C"]);
        let pool: Vec<_> = roster.entries().iter().collect();
        let stranger = RosterEntry::named("Z");
        let mut rng = ScriptedRandom::new([1]);
        let reel = Reel::build(&stranger, &pool, &roster, &RevealConfig::default(), &mut rng);
        assert_eq!(reel.entries()[reel.target_index()].id, "Z");
        assert_eq!(reel.entries().iter().filter(|entry| entry.id == "Z").count(), 1);
    }

    #[test]
    fn spin_decelerates_monotonically_and_settles_once() {
        let roster = roster(&["A", "B", "C", "D", "E", "F"]);
        let pool: Vec<_> = roster.entries().iter().collect();
        let clock = VirtualClock::default();
        let mut scheduler = FrameScheduler::new(clock.clone());
        let mut rng = RngState::from_seed(11);
        let mut animator = RevealAnimator::new(RevealConfig::default());
        let target = roster.entries()[4].clone();
        animator.start(target.clone(), &pool, &roster, &mut rng, &mut scheduler);
        assert_eq!(animator.phase(), RevealPhase::Previewing);
        assert_eq!(animator.centered(), animator.reel().map(|reel| &reel.entries()[1]));

        let (offsets, settled) = run_to_end(&mut animator, &clock, &mut scheduler);
        assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(settled, vec![target.clone()]);
        assert_eq!(animator.phase(), RevealPhase::Settled);
        assert_eq!(animator.centered(), Some(&target));
        assert_eq!(animator.progress(), 1.0);
        assert_eq!(animator.pending(), None);
    }

    #[test]
    fn preview_dwell_precedes_spinning() {
        let roster = roster(&["A", "B", "C"]);
        let pool: Vec<_> = roster.entries().iter().collect();
        let clock = VirtualClock::default();
        let mut scheduler = FrameScheduler::new(clock.clone());
        let mut animator = RevealAnimator::new(RevealConfig::default());
        animator.start(
            roster.entries()[0].clone(),
            &pool,
            &roster,
            &mut ScriptedRandom::new([]),
            &mut scheduler,
        );
        clock.advance(399);
        assert!(scheduler.take_due().is_empty());
        clock.advance(1);
        let wakes = scheduler.take_due();
        assert_eq!(wakes.len(), 1);
        assert_eq!(animator.handle(wakes[0], &mut scheduler), RevealStep::PreviewEnded);
        assert_eq!(animator.phase(), RevealPhase::Spinning);
    }

    #[test]
    fn cancelled_run_never_completes() {
        let roster = roster(&["A", "B", "C"]);
        let pool: Vec<_> = roster.entries().iter().collect();
        let clock = VirtualClock::default();
        let mut scheduler = FrameScheduler::new(clock.clone());
        let mut animator = RevealAnimator::new(RevealConfig::default());
        animator.start(
            roster.entries()[1].clone(),
            &pool,
            &roster,
            &mut RngState::from_seed(5),
            &mut scheduler,
        );
        clock.advance(1_000);
        let stale = scheduler.take_due();
        assert!(animator.cancel(&mut scheduler));
        for wake in stale {
            assert_eq!(animator.handle(wake, &mut scheduler), RevealStep::Ignored);
        }
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(animator.phase(), RevealPhase::Idle);
        assert!(animator.visible().is_empty());
    }

    #[test]
    fn restart_abandons_previous_run() {
        let roster = roster(&["A", "B", "C", "D"]);
        let pool: Vec<_> = roster.entries().iter().collect();
        let clock = VirtualClock::default();
        let mut scheduler = FrameScheduler::new(clock.clone());
        let mut rng = RngState::from_seed(9);
        let mut animator = RevealAnimator::new(RevealConfig::default());
        animator.start(roster.entries()[0].clone(), &pool, &roster, &mut rng, &mut scheduler);
        let first = animator.pending();
        animator.start(roster.entries()[3].clone(), &pool, &roster, &mut rng, &mut scheduler);
        assert_ne!(animator.pending(), first);
        assert_eq!(scheduler.pending_count(), 1);
        let (_, settled) = run_to_end(&mut animator, &clock, &mut scheduler);
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].id, "D");
    }
}
