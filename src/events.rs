//! Delivery events and their typed payloads.
//!
//! Events are the only thing a client ever receives: the core appends them
//! to a session's outbox and the transport drains them from a cursor
//! forward. The payload is a tagged union keyed by the `type` field so the
//! wire shape stays fixed per variant.

use crate::state::session::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single delivery event in a session's outbox.
///
/// `id` is unique and strictly increasing within one outbox; consumers
/// deduplicate replayed events by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: EventBody,
}

/// Typed event payloads, discriminated by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EventBody {
    /// Sent once to a session's own outbox when it joins.
    Connected {
        session_id: String,
        display_name: String,
    },
    /// Both sides of a new pairing receive this with the other's identity.
    Matched {
        partner_id: String,
        partner_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        partner_tag: Option<Tag>,
    },
    /// Relayed chat text, delivered to the recipient's outbox only.
    Message {
        text: String,
        sender_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sender_tag: Option<Tag>,
        sent_at: DateTime<Utc>,
    },
    /// The session's partner left, timed out, or skipped to a new partner.
    PartnerDisconnected { partner_name: String },
    /// Follows `PartnerDisconnected`; the pairing no longer exists.
    ChatEnded {
        reason: EndReason,
        partner_name: String,
    },
    /// Point-in-time snapshot of the total active session count.
    UserCount { count: usize },
    /// Out-of-band error report for the consumer.
    Error { message: String },
}

impl EventBody {
    /// Static name of the event type, matching the wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Matched { .. } => "matched",
            Self::Message { .. } => "message",
            Self::PartnerDisconnected { .. } => "partner_disconnected",
            Self::ChatEnded { .. } => "chat_ended",
            Self::UserCount { .. } => "user_count",
            Self::Error { .. } => "error",
        }
    }
}

/// Why a pairing ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The partner explicitly left or skipped to the next partner.
    PartnerLeft,
    /// The partner was evicted by the lifecycle sweeper.
    PartnerTimedOut,
}
