//! Shared chat state: sessions, waiting queue, outboxes, and the Hub.

pub mod hub;
pub mod outbox;
pub mod queue;
pub mod registry;
pub mod session;

pub use hub::Hub;
pub use session::{Session, SessionId, Tag};
