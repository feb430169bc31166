//! Cancellable delayed tasks
//!
//! Nothing runs by itself: the owner polls `pop_due` with the current time.
//! Timers due at the same instant come out in scheduling order.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    pending: BTreeMap<(u64, TimerId), T>,
    due: HashMap<TimerId, u64>,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
            due: HashMap::new(),
        }
    }

    /// Schedule `payload` to come due at `due_ms`
    pub fn schedule(&mut self, due_ms: u64, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert((due_ms, id), payload);
        self.due.insert(id, due_ms);
        id
    }

    /// Cancel a pending timer, returning its payload if it had not fired
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let due = self.due.remove(&id)?;
        self.pending.remove(&(due, id))
    }

    /// Earliest pending due time
    pub fn next_due(&self) -> Option<u64> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// Remove and return the earliest timer due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerId, T)> {
        let (&(due, id), _) = self.pending.iter().next()?;
        if due > now_ms {
            return None;
        }
        self.due.remove(&id);
        self.pending.remove(&(due, id)).map(|payload| (id, payload))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.due.clear();
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
