use std::cell::Cell;
use std::rc::Rc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub const DEFAULT_FRAME_MS: u64 = 16;

pub trait Clock {
    /// Monotonic milliseconds from an arbitrary origin.
    fn now_ms(&self) -> u64;
    /// Wall clock milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> i64;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn epoch_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<u64>>,
    epoch_base: i64,
}

impl VirtualClock {
    pub fn new(epoch_base: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            epoch_base,
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn epoch_ms(&self) -> i64 {
        self.epoch_base + self.now.get() as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeKind {
    Timer,
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wakeup {
    pub handle: TimerHandle,
    pub kind: WakeKind,
    pub at_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    handle: TimerHandle,
    kind: WakeKind,
    due_ms: u64,
}

/// One-shot timers and per-frame callbacks over an injected clock.
#[derive(Debug)]
pub struct FrameScheduler<C: Clock> {
    clock: C,
    frame_ms: u64,
    next_id: u64,
    pending: Vec<Pending>,
}

impl<C: Clock> FrameScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self::with_frame_ms(clock, DEFAULT_FRAME_MS)
    }

    pub fn with_frame_ms(clock: C, frame_ms: u64) -> Self {
        Self {
            clock,
            frame_ms: frame_ms.max(1),
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn epoch_ms(&self) -> i64 {
        self.clock.epoch_ms()
    }

    pub fn frame_ms(&self) -> u64 {
        self.frame_ms
    }

    pub fn set_timer(&mut self, delay_ms: u64) -> TimerHandle {
        let due_ms = self.clock.now_ms() + delay_ms;
        self.push(WakeKind::Timer, due_ms)
    }

    pub fn request_frame(&mut self) -> TimerHandle {
        let due_ms = self.clock.now_ms() + self.frame_ms;
        self.push(WakeKind::Frame, due_ms)
    }

    /// Returns whether the handle was still pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|item| item.handle != handle);
        before != self.pending.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.iter().map(|item| item.due_ms).min()
    }

    /// Milliseconds until the earliest pending wake-up, zero if overdue.
    pub fn time_until_next(&self) -> Option<u64> {
        let now = self.clock.now_ms();
        self.next_deadline().map(|due_ms| due_ms.saturating_sub(now))
    }

    /// Removes and returns every wake-up due at the current time, earliest first.
    pub fn take_due(&mut self) -> Vec<Wakeup> {
        let now = self.clock.now_ms();
        let mut due: Vec<Pending> = Vec::new();
        self.pending.retain(|item| {
            if item.due_ms <= now {
                due.push(*item);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|item| (item.due_ms, item.handle));
        due.into_iter()
            .map(|item| Wakeup {
                handle: item.handle,
                kind: item.kind,
                at_ms: now,
            })
            .collect()
    }

    fn push(&mut self, kind: WakeKind, due_ms: u64) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push(Pending {
            handle,
            kind,
            due_ms,
        });
        handle
    }
}
