//! The Hub - central shared state and boundary operations.
//!
//! The Hub composes the session registry, the waiting queue (owned by the
//! registry), and the per-session outboxes, and exposes the operations the
//! request layer calls: join, leave, next, send_message, poll_events, and
//! cleanup_user. One `Arc<Hub>` is shared by the HTTP handlers and the
//! background sweeper.
//!
//! Registry critical sections return outcome snapshots; all event
//! publication happens here, outside the registry lock.

use crate::config::LimitsConfig;
use crate::error::{ChatError, ChatResult};
use crate::events::{EndReason, Event, EventBody};
use crate::identity;
use crate::metrics;
use crate::state::outbox::OutboxManager;
use crate::state::registry::{Detached, PairOutcome, Registry};
use crate::state::session::{Session, Tag};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, error, info};

/// What a join (or next) reports back to the client.
#[derive(Debug, Clone)]
pub struct JoinReceipt {
    pub display_name: String,
    /// 1-based waiting-queue position, or `None` if matched immediately.
    pub queue_position: Option<usize>,
    pub total_active: usize,
}

/// A drained slice of a session's outbox.
#[derive(Debug, Clone)]
pub struct Poll {
    pub events: Vec<Event>,
    pub server_time: DateTime<Utc>,
}

/// Central shared state container.
pub struct Hub {
    registry: Registry,
    outboxes: OutboxManager,
    max_message_len: usize,
}

impl Hub {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            registry: Registry::new(),
            outboxes: OutboxManager::new(limits.outbox_capacity),
            max_message_len: limits.max_message_len,
        }
    }

    /// Register a session, generate its identity, and run matchmaking.
    ///
    /// A duplicate id is rejected; ids are untrusted and replacing a live
    /// session would orphan its partner.
    pub fn join(&self, session_id: &str, tag: Option<Tag>) -> ChatResult<JoinReceipt> {
        let session_id = require_id(session_id)?;
        let display_name = identity::generate_name(tag);
        self.registry
            .create(session_id, display_name.clone(), tag)?;
        self.outboxes.create(session_id);
        self.outboxes.append(
            session_id,
            EventBody::Connected {
                session_id: session_id.to_string(),
                display_name: display_name.clone(),
            },
        );

        let queue_position = match self.registry.pair_or_enqueue(session_id)? {
            PairOutcome::Matched { partner } => {
                self.publish_match(session_id, &display_name, tag, &partner);
                None
            }
            PairOutcome::Queued { position } => Some(position),
        };

        self.broadcast_user_count();
        self.update_gauges();
        metrics::inc_joins();
        info!(
            session = %session_id,
            name = %display_name,
            matched = queue_position.is_none(),
            "Session joined"
        );

        Ok(JoinReceipt {
            display_name,
            queue_position,
            total_active: self.registry.len(),
        })
    }

    /// Relay a text message to the sender's current partner.
    ///
    /// The caller names the partner it believes it has; both directions of
    /// the link are checked so stale client state after a disconnect or
    /// rematch surfaces as `PairingMismatch` instead of misdelivery.
    pub fn send_message(&self, sender_id: &str, partner_id: &str, text: &str) -> ChatResult<()> {
        let sender_id = require_id(sender_id)?;
        let partner_id = require_id(partner_id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Validation("message text required".into()));
        }
        if text.chars().count() > self.max_message_len {
            return Err(ChatError::Validation(format!(
                "message exceeds {} characters",
                self.max_message_len
            )));
        }

        let sender = self
            .registry
            .get(sender_id)
            .ok_or_else(|| ChatError::NotFound(sender_id.to_string()))?;
        let partner = self
            .registry
            .get(partner_id)
            .ok_or_else(|| ChatError::NotFound(partner_id.to_string()))?;

        if sender.partner.as_deref() != Some(partner_id) {
            return Err(ChatError::PairingMismatch(format!(
                "{sender_id} is not paired with {partner_id}"
            )));
        }
        if partner.partner.as_deref() != Some(sender_id) {
            // Should be impossible while the registry holds the symmetry
            // invariant. Fail safe: clear both links, re-queue both.
            self.registry.repair_asymmetry(sender_id, partner_id);
            for id in [sender_id, partner_id] {
                self.outboxes.append(
                    id,
                    EventBody::Error {
                        message: "pairing was reset; waiting for a new partner".into(),
                    },
                );
            }
            error!(
                sender = %sender_id,
                partner = %partner_id,
                "Asymmetric partner link detected; force-cleared both sides"
            );
            return Err(ChatError::Inconsistency(format!(
                "partner link between {sender_id} and {partner_id} was asymmetric"
            )));
        }

        self.registry.touch(sender_id);
        self.outboxes.append(
            partner_id,
            EventBody::Message {
                text: text.to_string(),
                sender_name: sender.display_name,
                sender_tag: sender.tag,
                sent_at: Utc::now(),
            },
        );
        metrics::inc_messages();
        Ok(())
    }

    /// Drain a session's outbox from a cursor forward. Counts as activity.
    pub fn poll_events(&self, session_id: &str, cursor: Option<u64>) -> ChatResult<Poll> {
        let session_id = require_id(session_id)?;
        if !self.registry.touch(session_id) {
            return Err(ChatError::NotFound(session_id.to_string()));
        }
        let events = self.outboxes.read_after(session_id, cursor);
        metrics::inc_polls();
        Ok(Poll {
            events,
            server_time: Utc::now(),
        })
    }

    /// Explicit disconnect. Acked even if the session is already gone.
    pub fn leave(&self, session_id: &str) -> ChatResult<()> {
        let session_id = require_id(session_id)?;
        self.cleanup(session_id, EndReason::PartnerLeft);
        Ok(())
    }

    /// Invoked by the transport when it detects a closed connection.
    /// Equivalent to `leave`.
    pub fn cleanup_user(&self, session_id: &str) {
        self.cleanup(session_id, EndReason::PartnerLeft);
    }

    /// Skip to a new partner: cleanup followed by a fresh join under the
    /// same id. The display name is regenerated; the tag carries over.
    pub fn next(&self, session_id: &str) -> ChatResult<JoinReceipt> {
        let session_id = require_id(session_id)?;
        let tag = self.registry.get(session_id).and_then(|s| s.tag);
        self.cleanup(session_id, EndReason::PartnerLeft);
        self.join(session_id, tag)
    }

    /// Evict every session inactive longer than `stale_after`, exactly as
    /// if each had left. Returns the number evicted.
    ///
    /// Iterates a snapshot of ids; staleness is re-checked under the
    /// registry lock, so sessions that act between snapshot and eviction
    /// survive, and sessions already gone are skipped.
    pub fn sweep(&self, stale_after: Duration) -> usize {
        let mut swept = 0;
        for session_id in self.registry.ids() {
            let Some(detached) = self.registry.detach_if_stale(&session_id, stale_after) else {
                continue;
            };
            self.outboxes.clear(&session_id);
            self.publish_detach(&detached, EndReason::PartnerTimedOut);
            info!(session = %session_id, "Evicted stale session");
            swept += 1;
        }
        if swept > 0 {
            // One count snapshot for the whole pass rather than per eviction
            self.broadcast_user_count();
            self.update_gauges();
            metrics::add_swept(swept);
        }
        swept
    }

    /// Snapshot of a session record, if present.
    pub fn session(&self, session_id: &str) -> Option<Session> {
        self.registry.get(session_id)
    }

    /// Number of active sessions.
    pub fn total_active(&self) -> usize {
        self.registry.len()
    }

    /// Number of sessions waiting for a partner.
    pub fn waiting_count(&self) -> usize {
        self.registry.waiting_count()
    }

    /// 1-based waiting-queue position for a session, if queued.
    pub fn queue_position(&self, session_id: &str) -> Option<usize> {
        self.registry.queue_position(session_id)
    }

    /// The disconnect state transition shared by leave, next, transport
    /// close, and (with a different reason) the sweeper. No-op if absent.
    fn cleanup(&self, session_id: &str, reason: EndReason) -> bool {
        let Some(detached) = self.registry.detach(session_id) else {
            debug!(session = %session_id, "Cleanup for absent session (already gone)");
            return false;
        };
        self.outboxes.clear(session_id);
        self.publish_detach(&detached, reason);
        self.broadcast_user_count();
        self.update_gauges();
        info!(session = %session_id, "Session cleaned up");
        true
    }

    /// Notify both sides of a fresh pairing. The self-side event is written
    /// first so its `matched` always precedes the count refresh below.
    fn publish_match(&self, self_id: &str, self_name: &str, self_tag: Option<Tag>, partner: &Session) {
        self.outboxes.append(
            self_id,
            EventBody::Matched {
                partner_id: partner.id.clone(),
                partner_name: partner.display_name.clone(),
                partner_tag: partner.tag,
            },
        );
        self.outboxes.append(
            &partner.id,
            EventBody::Matched {
                partner_id: self_id.to_string(),
                partner_name: self_name.to_string(),
                partner_tag: self_tag,
            },
        );
        metrics::inc_matches();
        debug!(session = %self_id, partner = %partner.id, "Sessions matched");
    }

    /// Tell a detached session's orphaned partner what happened.
    fn publish_detach(&self, detached: &Detached, reason: EndReason) {
        let Some(partner) = &detached.partner else {
            return;
        };
        let name = detached.session.display_name.clone();
        self.outboxes.append(
            &partner.id,
            EventBody::PartnerDisconnected {
                partner_name: name.clone(),
            },
        );
        self.outboxes.append(
            &partner.id,
            EventBody::ChatEnded {
                reason,
                partner_name: name,
            },
        );
    }

    /// Append a point-in-time `user_count` snapshot to every active
    /// session's outbox.
    fn broadcast_user_count(&self) {
        let count = self.registry.len();
        for session_id in self.registry.ids() {
            self.outboxes
                .append(&session_id, EventBody::UserCount { count });
        }
    }

    fn update_gauges(&self) {
        metrics::set_active_sessions(self.registry.len() as i64);
        metrics::set_waiting_sessions(self.registry.waiting_count() as i64);
    }
}

fn require_id(id: &str) -> ChatResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ChatError::Validation("session id required".into()));
    }
    Ok(id)
}
