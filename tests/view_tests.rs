//! Presentation-boundary tests: text filter and clear semantics.

use chrono::Utc;

use printwatch::capture::event::{DebugEvent, EventSource};
use printwatch::view::EventLog;

fn event(seq: u64, name: &str, text: &str) -> DebugEvent {
    DebugEvent {
        seq,
        timestamp: Utc::now(),
        process_id: seq as i32 + 1,
        process_name: name.into(),
        thread_id: 0,
        text: text.into(),
        component: 0,
        source: EventSource::Legacy,
    }
}

#[test]
fn filter_matches_name_or_text_case_insensitively() {
    let mut log = EventLog::new();
    log.push(event(0, "procA", "alpha"));
    log.push(event(1, "other", "beta"));
    log.push(event(2, "third", "says PROCeed"));

    log.set_filter(Some("proc"));
    let visible: Vec<_> = log.visible().map(|e| e.seq).collect();
    assert_eq!(visible, [0, 2]); // name match and text match

    // clearing the filter restores everything; the log was never mutated
    log.set_filter(None);
    assert_eq!(log.visible().count(), 3);
    assert_eq!(log.len(), 3);
}

#[test]
fn empty_filter_shows_everything() {
    let mut log = EventLog::new();
    log.push(event(0, "procA", "alpha"));
    log.set_filter(Some(""));
    assert_eq!(log.visible().count(), 1);
}

#[test]
fn filter_scenario_proc_a_vs_other() {
    let mut log = EventLog::new();
    log.push(event(0, "procA", "x"));
    log.push(event(1, "other", "y"));

    log.set_filter(Some("proc"));
    let names: Vec<_> = log.visible().map(|e| e.process_name.as_str()).collect();
    assert_eq!(names, ["procA"]);

    log.set_filter(None);
    assert_eq!(log.visible().count(), 2);
}

#[test]
fn clear_empties_the_log_but_keeps_the_filter() {
    let mut log = EventLog::new();
    log.push(event(0, "procA", "x"));
    log.set_filter(Some("proc"));
    log.clear();

    assert!(log.is_empty());
    assert_eq!(log.visible().count(), 0);

    // new events are still filtered by the surviving predicate
    log.push(event(1, "unrelated", "x"));
    log.push(event(2, "procB", "x"));
    assert_eq!(log.visible().count(), 1);
}
