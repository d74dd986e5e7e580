//! Session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Opaque client-supplied session identifier.
///
/// Untrusted input: never parsed, only used as a map key. The client is
/// responsible for uniqueness per connection attempt.
pub type SessionId = String;

/// Optional category tag steering display-name generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Animal,
    Blossom,
}

/// One anonymous participant's connection context for the lifetime of one
/// visit.
///
/// The partner link is mutually consistent at every observation point: if
/// `a.partner == Some(b.id)` then `b.partner == Some(a.id)`. The registry
/// enforces this, not callers.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// Generated display name, immutable for the session's life.
    pub display_name: String,
    pub tag: Option<Tag>,
    /// Current partner, if paired.
    pub partner: Option<SessionId>,
    /// Updated on any inbound action attributable to this session.
    pub last_activity: Instant,
    pub joined_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, display_name: String, tag: Option<Tag>) -> Self {
        Self {
            id,
            display_name,
            tag,
            partner: None,
            last_activity: Instant::now(),
            joined_at: Utc::now(),
        }
    }

    /// Mark the session as active now.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}
