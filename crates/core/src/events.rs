use crate::RevealPhase;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefusalReason {
    AlreadySpinning,
    PoolEmpty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PersistTarget {
    History,
    Icons,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    SpinStarted {
        target: String,
        reel_len: usize,
        available: usize,
    },
    SpinPreviewEnded,
    SpinSettled { target: String },
    SpinCancelled { phase: RevealPhase },
    SelectionCommitted { id: String, timestamp: i64 },
    DrawRefused { reason: RefusalReason },
    Skipped,
    Purged { cleared: usize },
    IconUploaded { id: String },
    IconRemoved { id: String },
    PersistFailed { target: PersistTarget, message: String },
}

#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<Event>,
}

impl EventBus {
    pub fn push(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.queue.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
