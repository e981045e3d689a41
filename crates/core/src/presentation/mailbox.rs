use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Single-slot, most-recent-wins handoff between one producer and one
/// consumer thread.
///
/// Posting overwrites any undelivered value. Each value carries a delivery
/// deadline; a value still pending past its deadline is dropped on take.
pub struct SnapshotMailbox<T> {
    slot: Mutex<Slot<T>>,
}

struct Slot<T> {
    pending: Option<Pending<T>>,
    stats: MailboxStats,
}

struct Pending<T> {
    value: T,
    deadline: Instant,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MailboxStats {
    pub posted: u64,
    pub delivered: u64,
    /// Overwritten before the consumer took them.
    pub coalesced: u64,
    /// Dropped because their deadline passed.
    pub expired: u64,
}

impl<T> SnapshotMailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                pending: None,
                stats: MailboxStats::default(),
            }),
        }
    }

    /// Stores `value`, replacing any undelivered one. Returns `true` when a
    /// pending value was overwritten.
    pub fn post(&self, value: T, budget: Duration) -> bool {
        self.post_at(value, Instant::now() + budget)
    }

    pub fn post_at(&self, value: T, deadline: Instant) -> bool {
        let mut slot = self.lock();
        slot.stats.posted += 1;
        let replaced = slot.pending.replace(Pending { value, deadline }).is_some();
        if replaced {
            slot.stats.coalesced += 1;
        }
        replaced
    }

    pub fn take(&self) -> Option<T> {
        self.take_at(Instant::now())
    }

    pub fn take_at(&self, now: Instant) -> Option<T> {
        let mut slot = self.lock();
        let pending = slot.pending.take()?;
        if now > pending.deadline {
            slot.stats.expired += 1;
            return None;
        }
        slot.stats.delivered += 1;
        Some(pending.value)
    }

    /// Drops any pending value without counting it as delivered or expired.
    pub fn clear(&self) {
        self.lock().pending = None;
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_none()
    }

    pub fn stats(&self) -> MailboxStats {
        self.lock().stats
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for SnapshotMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
