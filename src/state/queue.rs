//! FIFO waiting queue over session identifiers.
//!
//! A pure index: it owns no sessions and performs no validity checks of its
//! own. A dequeued identifier must be re-validated against the registry
//! before being treated as a live partner candidate.

use crate::state::session::SessionId;
use std::collections::{HashSet, VecDeque};

/// Ordered set of sessions awaiting a partner.
///
/// Invariant: an identifier appears at most once.
#[derive(Debug, Default)]
pub struct WaitQueue {
    order: VecDeque<SessionId>,
    members: HashSet<SessionId>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Append a session to the back of the queue. No-op if already queued.
    ///
    /// Returns whether the session was newly enqueued.
    pub fn enqueue(&mut self, id: SessionId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    /// Pop the longest-waiting session, if any.
    pub fn pop_front(&mut self) -> Option<SessionId> {
        let id = self.order.pop_front()?;
        self.members.remove(&id);
        Some(id)
    }

    /// Remove a session from anywhere in the queue (used when a queued
    /// session leaves before being matched). Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|queued| queued != id);
        true
    }

    /// 1-based queue position, or `None` if not queued.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|queued| queued == id).map(|i| i + 1)
    }
}
