//! Per-session bounded event outboxes.
//!
//! Each session owns one append-only log of delivery events with strictly
//! increasing identifiers. The log keeps only the most recent entries;
//! trimming drops from the front. Reads never block and never fail: an
//! unrecognized cursor falls back to replaying everything retained, which
//! the consumer deduplicates by event id (at-least-once delivery).

use crate::events::{Event, EventBody};
use crate::state::session::SessionId;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::VecDeque;

/// Floor on retained events per outbox regardless of configuration.
pub const MIN_CAPACITY: usize = 50;

/// One session's event log.
#[derive(Debug, Default)]
struct Outbox {
    last_id: u64,
    events: VecDeque<Event>,
}

/// All live outboxes, keyed by session id.
///
/// Appends from the matchmaker, the relay, and cleanup for the same session
/// serialize on the map entry; there is no cross-session ordering guarantee
/// and none is needed.
pub struct OutboxManager {
    boxes: DashMap<SessionId, Outbox>,
    capacity: usize,
}

impl OutboxManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            boxes: DashMap::new(),
            capacity: capacity.max(MIN_CAPACITY),
        }
    }

    /// Create an empty outbox for a session. No-op if one exists.
    pub fn create(&self, id: &str) {
        self.boxes.entry(id.to_string()).or_default();
    }

    /// Append an event, assigning the next identifier.
    ///
    /// Returns the assigned id, or `None` if the session has no outbox
    /// (cleaned up concurrently) — delivery is only promised to sessions
    /// that are still registered.
    pub fn append(&self, id: &str, body: EventBody) -> Option<u64> {
        let mut entry = self.boxes.get_mut(id)?;
        let outbox = entry.value_mut();
        outbox.last_id += 1;
        let event_id = outbox.last_id;
        let kind = body.kind();
        outbox.events.push_back(Event {
            id: event_id,
            at: Utc::now(),
            body,
        });
        while outbox.events.len() > self.capacity {
            outbox.events.pop_front();
        }
        tracing::trace!(session = %id, event = kind, id = event_id, "Event appended");
        Some(event_id)
    }

    /// Read events after a cursor, in insertion order.
    ///
    /// `None` means "from the beginning". A cursor that matches a retained
    /// event returns the events strictly after it. A cursor that matches
    /// nothing (trimmed away, or from a previous life of this session id)
    /// returns everything retained rather than failing.
    pub fn read_after(&self, id: &str, cursor: Option<u64>) -> Vec<Event> {
        let Some(outbox) = self.boxes.get(id) else {
            return Vec::new();
        };
        match cursor {
            Some(cursor) if outbox.events.iter().any(|e| e.id == cursor) => outbox
                .events
                .iter()
                .filter(|e| e.id > cursor)
                .cloned()
                .collect(),
            _ => outbox.events.iter().cloned().collect(),
        }
    }

    /// Drop a session's outbox entirely.
    pub fn clear(&self, id: &str) {
        self.boxes.remove(id);
    }

    /// Number of events currently retained for a session.
    pub fn retained(&self, id: &str) -> usize {
        self.boxes.get(id).map_or(0, |outbox| outbox.events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> OutboxManager {
        let m = OutboxManager::new(MIN_CAPACITY);
        m.create("s1");
        m
    }

    fn count(n: usize) -> EventBody {
        EventBody::UserCount { count: n }
    }

    #[test]
    fn test_ids_are_strictly_increasing() {
        let m = manager();
        let mut last = 0;
        for i in 0..10 {
            let id = m.append("s1", count(i)).unwrap();
            assert!(id > last);
            last = id;
        }
        let events = m.read_after("s1", None);
        assert!(events.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_capacity_floor_and_trim() {
        let m = manager();
        for i in 0..(MIN_CAPACITY + 10) {
            m.append("s1", count(i));
        }
        assert_eq!(m.retained("s1"), MIN_CAPACITY);

        // Oldest were dropped from the front; ids keep increasing
        let events = m.read_after("s1", None);
        assert_eq!(events.first().unwrap().id, 11);
        assert_eq!(events.last().unwrap().id, (MIN_CAPACITY + 10) as u64);
    }

    #[test]
    fn test_read_after_cursor() {
        let m = manager();
        for i in 0..5 {
            m.append("s1", count(i));
        }
        let events = m.read_after("s1", Some(3));
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.id > 3));
    }

    #[test]
    fn test_unknown_cursor_falls_back_to_all() {
        let m = manager();
        for i in 0..5 {
            m.append("s1", count(i));
        }
        // Cursor from a previous life of this session id
        let events = m.read_after("s1", Some(999));
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn test_trimmed_cursor_falls_back_to_all() {
        let m = manager();
        for i in 0..(MIN_CAPACITY + 5) {
            m.append("s1", count(i));
        }
        // Event 2 was trimmed away; replay everything retained
        let events = m.read_after("s1", Some(2));
        assert_eq!(events.len(), MIN_CAPACITY);
    }

    #[test]
    fn test_read_missing_outbox_is_empty() {
        let m = manager();
        assert!(m.read_after("nope", None).is_empty());
    }

    #[test]
    fn test_append_after_clear_is_dropped() {
        let m = manager();
        m.append("s1", count(1)).unwrap();
        m.clear("s1");
        assert!(m.append("s1", count(2)).is_none());
        assert!(m.read_after("s1", None).is_empty());
    }

    #[test]
    fn test_configured_capacity_below_floor_is_raised() {
        let m = OutboxManager::new(10);
        m.create("s1");
        for i in 0..(MIN_CAPACITY + 1) {
            m.append("s1", count(i));
        }
        assert_eq!(m.retained("s1"), MIN_CAPACITY);
    }
}
