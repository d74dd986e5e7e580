//! Matchmaking flow: joining, queueing, pairing, and skipping to the next
//! partner.

use paird::config::LimitsConfig;
use paird::events::{Event, EventBody};
use paird::state::Hub;

fn hub() -> Hub {
    Hub::new(&LimitsConfig::default())
}

fn drain(hub: &Hub, session_id: &str) -> Vec<Event> {
    hub.poll_events(session_id, None).unwrap().events
}

fn matched_events(events: &[Event]) -> Vec<&Event> {
    events
        .iter()
        .filter(|e| matches!(e.body, EventBody::Matched { .. }))
        .collect()
}

#[test]
fn test_first_join_waits_in_queue() {
    let hub = hub();
    let receipt = hub.join("s1", None).unwrap();

    assert!(!receipt.display_name.is_empty());
    assert_eq!(receipt.queue_position, Some(1));
    assert_eq!(receipt.total_active, 1);
    assert_eq!(hub.queue_position("s1"), Some(1));

    let events = drain(&hub, "s1");
    assert!(matched_events(&events).is_empty());
}

#[test]
fn test_second_join_matches_first() {
    let hub = hub();
    let receipt1 = hub.join("s1", None).unwrap();
    let receipt2 = hub.join("s2", None).unwrap();

    assert!(receipt2.queue_position.is_none());
    assert_eq!(hub.waiting_count(), 0);

    // Partner links point at each other
    assert_eq!(hub.session("s1").unwrap().partner.as_deref(), Some("s2"));
    assert_eq!(hub.session("s2").unwrap().partner.as_deref(), Some("s1"));

    // Both sides got a matched event naming the other
    let s1_events = drain(&hub, "s1");
    let s2_events = drain(&hub, "s2");
    match &matched_events(&s1_events)[..] {
        [event] => match &event.body {
            EventBody::Matched {
                partner_id,
                partner_name,
                ..
            } => {
                assert_eq!(partner_id, "s2");
                assert_eq!(partner_name, &receipt2.display_name);
            }
            other => panic!("unexpected body {other:?}"),
        },
        other => panic!("expected exactly one matched event, got {other:?}"),
    }
    match &matched_events(&s2_events)[..] {
        [event] => match &event.body {
            EventBody::Matched {
                partner_id,
                partner_name,
                ..
            } => {
                assert_eq!(partner_id, "s1");
                assert_eq!(partner_name, &receipt1.display_name);
            }
            other => panic!("unexpected body {other:?}"),
        },
        other => panic!("expected exactly one matched event, got {other:?}"),
    }
}

#[test]
fn test_partner_links_stay_symmetric_across_many_joins() {
    let hub = hub();
    for i in 0..9 {
        hub.join(&format!("s{i}"), None).unwrap();
    }

    // Every paired session's partner points straight back
    for i in 0..9 {
        let id = format!("s{i}");
        let session = hub.session(&id).unwrap();
        if let Some(partner_id) = &session.partner {
            let partner = hub.session(partner_id).unwrap();
            assert_eq!(partner.partner.as_deref(), Some(id.as_str()));
        }
    }

    // Odd joiner count leaves exactly one waiting
    assert_eq!(hub.waiting_count(), 1);
}

#[test]
fn test_matched_precedes_user_count_for_that_pairing() {
    let hub = hub();
    hub.join("s1", None).unwrap();
    hub.join("s2", None).unwrap();

    let events = drain(&hub, "s1");
    let matched_at = events
        .iter()
        .position(|e| matches!(e.body, EventBody::Matched { .. }))
        .expect("matched event");
    let count_of_two = events
        .iter()
        .position(|e| matches!(e.body, EventBody::UserCount { count: 2 }))
        .expect("user_count event for the pairing");
    assert!(matched_at < count_of_two);
}

#[test]
fn test_next_requeues_partner_and_rematches() {
    let hub = hub();
    hub.join("s1", None).unwrap();
    hub.join("s2", None).unwrap();

    let receipt = hub.next("s1").unwrap();

    // Nobody else waiting: s2 was re-queued by the cleanup half of next,
    // so s1's rejoin pairs them straight back up.
    assert!(receipt.queue_position.is_none());
    assert_eq!(hub.session("s1").unwrap().partner.as_deref(), Some("s2"));
    assert_eq!(hub.session("s2").unwrap().partner.as_deref(), Some("s1"));

    // s2 saw the breakup before the rematch
    let s2_events = drain(&hub, "s2");
    let disconnect_at = s2_events
        .iter()
        .position(|e| matches!(e.body, EventBody::PartnerDisconnected { .. }))
        .expect("partner_disconnected");
    let ended_at = s2_events
        .iter()
        .position(|e| matches!(e.body, EventBody::ChatEnded { .. }))
        .expect("chat_ended");
    let rematch_at = s2_events
        .iter()
        .rposition(|e| matches!(e.body, EventBody::Matched { .. }))
        .expect("rematch");
    assert!(disconnect_at < ended_at);
    assert!(ended_at < rematch_at);
}

#[test]
fn test_next_with_waiting_third_party() {
    let hub = hub();
    hub.join("s1", None).unwrap();
    hub.join("s2", None).unwrap();
    hub.join("s3", None).unwrap(); // waits

    let receipt = hub.next("s1").unwrap();

    // s3 was queued first, so s1 pairs with s3; s2 goes back to waiting.
    assert!(receipt.queue_position.is_none());
    assert_eq!(hub.session("s1").unwrap().partner.as_deref(), Some("s3"));
    assert_eq!(hub.queue_position("s2"), Some(1));
}

#[test]
fn test_next_on_unknown_session_is_fresh_join() {
    let hub = hub();
    let receipt = hub.next("ghost").unwrap();
    assert_eq!(receipt.queue_position, Some(1));
    assert_eq!(hub.total_active(), 1);
}

#[test]
fn test_next_preserves_tag() {
    use paird::state::Tag;

    let hub = hub();
    hub.join("s1", Some(Tag::Blossom)).unwrap();
    hub.next("s1").unwrap();
    assert_eq!(hub.session("s1").unwrap().tag, Some(Tag::Blossom));
}
