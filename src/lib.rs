//! paird - anonymous pair-chat matchmaking daemon.
//!
//! Clients register an anonymous session, get paired with another waiting
//! session, exchange text through the pairing, and can skip to a new partner
//! or leave. All state is in-memory and process-lifetime only; delivery to
//! clients is at-least-once through a per-session bounded event outbox that
//! consumers drain with a cursor.

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod identity;
pub mod metrics;
pub mod state;
pub mod sweeper;
