//! Authoritative session store and the pairing critical sections.
//!
//! The sessions map and the waiting queue live behind a single mutex so the
//! operations with cross-session invariants — linking two partners,
//! dequeue-validate-pair, detach-and-requeue — are each one critical
//! section. No observer can ever see a half-updated partner relation, and a
//! waiting session can be claimed by at most one matchmaking attempt.
//!
//! Critical sections only mutate the map and queue; event publication
//! happens outside the lock from the outcome values returned here.

use crate::error::{ChatError, ChatResult};
use crate::state::queue::WaitQueue;
use crate::state::session::{Session, SessionId, Tag};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of a pairing attempt.
#[derive(Debug, Clone)]
pub enum PairOutcome {
    /// Paired with a previously waiting session. `partner` is a snapshot
    /// taken after the symmetric link was written.
    Matched { partner: Session },
    /// No valid candidate was waiting; the session was queued.
    Queued { position: usize },
}

/// What a detach removed, for event publication by the caller.
#[derive(Debug, Clone)]
pub struct Detached {
    /// Snapshot of the removed session.
    pub session: Session,
    /// The orphaned partner, already unlinked and re-queued.
    pub partner: Option<Session>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, Session>,
    queue: WaitQueue,
}

/// Authoritative mapping from session identifier to session record.
///
/// Owns the session lifecycle and the waiting queue.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session. Fails with `Validation` if the id is already
    /// registered; ids are untrusted and silently replacing a live session
    /// would orphan its partner.
    pub fn create(&self, id: &str, display_name: String, tag: Option<Tag>) -> ChatResult<Session> {
        let mut inner = self.inner.lock();
        if inner.sessions.contains_key(id) {
            return Err(ChatError::Validation(format!(
                "session {id} is already registered"
            )));
        }
        let session = Session::new(id.to_string(), display_name, tag);
        inner.sessions.insert(id.to_string(), session.clone());
        Ok(session)
    }

    /// Snapshot of a session record, if present.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner.lock().sessions.get(id).cloned()
    }

    /// Link two sessions symmetrically. Both sides are written under one
    /// lock acquisition; the relation is never observable half-updated.
    pub fn set_partner(&self, id_a: &str, id_b: &str) -> ChatResult<()> {
        let mut inner = self.inner.lock();
        if !inner.sessions.contains_key(id_a) {
            return Err(ChatError::NotFound(id_a.to_string()));
        }
        if !inner.sessions.contains_key(id_b) {
            return Err(ChatError::NotFound(id_b.to_string()));
        }
        link(&mut inner, id_a, id_b);
        Ok(())
    }

    /// Clear one session's partner link and its partner's back-link.
    pub fn clear_partner(&self, id: &str) {
        let mut inner = self.inner.lock();
        let Some(partner_id) = inner.sessions.get(id).and_then(|s| s.partner.clone()) else {
            return;
        };
        if let Some(session) = inner.sessions.get_mut(id) {
            session.partner = None;
        }
        if let Some(partner) = inner.sessions.get_mut(&partner_id)
            && partner.partner.as_deref() == Some(id)
        {
            partner.partner = None;
        }
    }

    /// Update a session's last-activity timestamp. Returns whether the
    /// session exists.
    pub fn touch(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.sessions.get_mut(id) {
            Some(session) => {
                session.touch();
                true
            }
            None => false,
        }
    }

    /// Remove a session outright. Prefer `detach` at the cleanup boundary;
    /// this does not touch the partner or the queue.
    pub fn remove(&self, id: &str) -> Option<Session> {
        self.inner.lock().sessions.remove(id)
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().sessions.is_empty()
    }

    /// Snapshot of all session ids (for sweeps and count broadcasts).
    pub fn ids(&self) -> Vec<SessionId> {
        self.inner.lock().sessions.keys().cloned().collect()
    }

    /// Snapshot of all session records.
    pub fn all(&self) -> Vec<Session> {
        self.inner.lock().sessions.values().cloned().collect()
    }

    /// 1-based waiting-queue position for a session, if queued.
    pub fn queue_position(&self, id: &str) -> Option<usize> {
        self.inner.lock().queue.position(id)
    }

    /// Number of sessions waiting for a partner.
    pub fn waiting_count(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Pair `self_id` against the waiting queue, or enqueue it.
    ///
    /// Dequeued candidates are re-validated before linking: a candidate that
    /// was evicted or paired concurrently is discarded and the next one is
    /// tried. The dequeue, the validity check, and the symmetric link are a
    /// single critical section, so a waiting session can never be claimed
    /// twice and every session has at most one partner at any instant.
    pub fn pair_or_enqueue(&self, self_id: &str) -> ChatResult<PairOutcome> {
        let mut inner = self.inner.lock();
        match inner.sessions.get(self_id) {
            None => return Err(ChatError::NotFound(self_id.to_string())),
            Some(session) if session.partner.is_some() => {
                return Err(ChatError::Validation(format!(
                    "session {self_id} already has a partner"
                )));
            }
            Some(_) => {}
        }
        // A session re-entering matchmaking must not pick itself.
        inner.queue.remove(self_id);

        while let Some(candidate_id) = inner.queue.pop_front() {
            let valid = inner
                .sessions
                .get(&candidate_id)
                .is_some_and(|candidate| candidate.partner.is_none());
            if !valid {
                // Evicted or paired since it was queued; drop and retry.
                continue;
            }
            link(&mut inner, self_id, &candidate_id);
            let partner = inner
                .sessions
                .get(&candidate_id)
                .cloned()
                .ok_or_else(|| ChatError::Inconsistency("candidate vanished mid-link".into()))?;
            return Ok(PairOutcome::Matched { partner });
        }

        inner.queue.enqueue(self_id.to_string());
        let position = inner.queue.position(self_id).unwrap_or(1);
        Ok(PairOutcome::Queued { position })
    }

    /// Remove a session, unlink and re-queue its partner, all under one
    /// lock. Returns `None` if the session was absent (already cleaned up).
    pub fn detach(&self, id: &str) -> Option<Detached> {
        let mut inner = self.inner.lock();
        detach_locked(&mut inner, id)
    }

    /// `detach`, but only if the session has been inactive longer than
    /// `stale_after`. The staleness re-check happens under the same lock as
    /// the removal, so a session that becomes active between the sweeper's
    /// snapshot and this call is left alone.
    pub fn detach_if_stale(&self, id: &str, stale_after: Duration) -> Option<Detached> {
        let mut inner = self.inner.lock();
        let stale = inner
            .sessions
            .get(id)
            .is_some_and(|session| session.last_activity.elapsed() > stale_after);
        if !stale {
            return None;
        }
        detach_locked(&mut inner, id)
    }

    /// Fail-safe repair for an asymmetric partner link: forcibly clear both
    /// sides and re-queue whichever sessions still exist without a partner.
    pub fn repair_asymmetry(&self, id_a: &str, id_b: &str) {
        let mut inner = self.inner.lock();
        for id in [id_a, id_b] {
            if let Some(session) = inner.sessions.get_mut(id) {
                session.partner = None;
            }
            if inner.sessions.contains_key(id) {
                inner.queue.enqueue(id.to_string());
            }
        }
    }
}

/// Write a symmetric partner link. Callers hold the lock and have verified
/// both sessions exist. Any pre-existing link on either side is dissolved
/// first, including its back-link, so the relation stays symmetric.
fn link(inner: &mut Inner, id_a: &str, id_b: &str) {
    unlink(inner, id_a);
    unlink(inner, id_b);
    if let Some(a) = inner.sessions.get_mut(id_a) {
        a.partner = Some(id_b.to_string());
    }
    if let Some(b) = inner.sessions.get_mut(id_b) {
        b.partner = Some(id_a.to_string());
    }
}

/// Clear the back-link held by `id`'s current partner, if any.
fn unlink(inner: &mut Inner, id: &str) {
    if let Some(old_partner_id) = inner.sessions.get(id).and_then(|s| s.partner.clone())
        && let Some(old_partner) = inner.sessions.get_mut(&old_partner_id)
        && old_partner.partner.as_deref() == Some(id)
    {
        old_partner.partner = None;
    }
}

fn detach_locked(inner: &mut Inner, id: &str) -> Option<Detached> {
    let session = inner.sessions.remove(id)?;
    inner.queue.remove(id);

    let partner = session.partner.as_ref().and_then(|partner_id| {
        let partner = inner.sessions.get_mut(partner_id)?;
        partner.partner = None;
        let snapshot = partner.clone();
        inner.queue.enqueue(partner_id.clone());
        Some(snapshot)
    });

    Some(Detached { session, partner })
}
