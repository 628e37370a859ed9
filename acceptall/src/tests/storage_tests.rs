//! Store behavior: log/stat consistency and session TTL.

use crate::storage::{InvitationStore, SESSION_TTL_MINUTES};
use std::collections::BTreeMap;

fn temp_store() -> (tempfile::TempDir, InvitationStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = InvitationStore::new(dir.path().join("store.json"));
    (dir, store)
}

#[test]
fn log_and_daily_stats_stay_consistent() {
    let (_dir, store) = temp_store();
    store.record_acceptance("Ada Lovelace", None).unwrap();
    store
        .record_acceptance("Grace Hopper", Some("https://www.linkedin.com/in/grace/".into()))
        .unwrap();
    store.record_acceptance("Alan Turing", None).unwrap();

    let log = store.invitations().unwrap();
    assert_eq!(log.len(), 3);

    // stat[date] must equal the count of log entries dated that day,
    // whatever day(s) the test happens to run across.
    let mut expected: BTreeMap<String, u64> = BTreeMap::new();
    for entry in &log {
        *expected
            .entry(entry.timestamp.format("%Y-%m-%d").to_string())
            .or_default() += 1;
    }
    assert_eq!(store.daily_stats().unwrap(), expected);
}

#[test]
fn entries_are_append_only_and_ordered() {
    let (_dir, store) = temp_store();
    store.record_acceptance("First", None).unwrap();
    store.record_acceptance("Second", None).unwrap();

    let log = store.invitations().unwrap();
    assert_eq!(log[0].name, "First");
    assert_eq!(log[1].name, "Second");
    assert!(log[0].timestamp <= log[1].timestamp);
}

#[test]
fn session_round_trips_within_ttl() {
    let (_dir, store) = temp_store();
    store.save_session(12).unwrap();
    let session = store.load_session().unwrap().expect("live session");
    assert_eq!(session.total_accepted, 12);

    // Reading a live session does not consume it.
    assert!(store.load_session().unwrap().is_some());

    store.clear_session().unwrap();
    assert!(store.load_session().unwrap().is_none());
}

#[test]
fn expired_session_is_cleared_on_read() {
    let (dir, store) = temp_store();
    // Write a record that is well past the TTL.
    let stale = serde_json::json!({
        "invitations": [],
        "daily_stats": {},
        "session": {
            "total_accepted": 7,
            "timestamp": "2020-01-01T00:00:00Z"
        }
    });
    std::fs::write(dir.path().join("store.json"), stale.to_string()).unwrap();

    assert!(store.load_session().unwrap().is_none());

    // The stale record is gone from disk, not just skipped.
    let raw = std::fs::read_to_string(dir.path().join("store.json")).unwrap();
    assert!(!raw.contains("\"session\""));
}

#[test]
fn session_expiry_boundary_uses_the_ttl() {
    use crate::storage::ResumeSession;
    use chrono::{Duration, Utc};

    let now = Utc::now();
    let live = ResumeSession {
        total_accepted: 1,
        timestamp: now - Duration::minutes(SESSION_TTL_MINUTES) + Duration::seconds(1),
    };
    let stale = ResumeSession {
        total_accepted: 1,
        timestamp: now - Duration::minutes(SESSION_TTL_MINUTES) - Duration::seconds(1),
    };
    assert!(!live.is_expired(now));
    assert!(stale.is_expired(now));
}

#[test]
fn missing_file_reads_as_empty() {
    let (_dir, store) = temp_store();
    assert!(store.invitations().unwrap().is_empty());
    assert!(store.daily_stats().unwrap().is_empty());
    assert!(store.load_session().unwrap().is_none());
}
