//! Normalized debug-print event model.
//!
//! Both capture channels funnel into this one record type so downstream
//! consumers (view, export, filtering) never have to care which protocol a
//! message arrived on. The `source` tag is kept because the two channels
//! carry different attribute completeness: the legacy protocol has no thread
//! identity and no component id.
//!
//! ## Formats supported
//! - `serde` for JSON serialization (stream export, logging)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which capture channel observed the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// Kernel DbgPrint trace provider.
    Kernel,
    /// Legacy shared-memory slot protocol (OutputDebugString).
    Legacy,
}

/// One captured debug message, immutable once constructed.
///
/// Text and name fields are always owned copies; decoding copies data out of
/// the channel's reuse buffer before the buffer is handed back to the
/// protocol, so an event never aliases shared memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugEvent {
    /// Publication-order counter stamped by the merged sink. Strictly
    /// increasing across both channels; the only cross-channel total order,
    /// since the channels use different time sources.
    pub seq: u64,
    /// Observation time: wall clock at capture for legacy events,
    /// provider-supplied timestamp for kernel events.
    pub timestamp: DateTime<Utc>,
    /// Emitting process id as reported by the source channel.
    pub process_id: i32,
    /// Best-effort display name; empty if resolution failed or the process
    /// already exited.
    pub process_name: String,
    /// Emitting thread id; 0 for legacy events (the protocol carries none).
    pub thread_id: u32,
    /// Decoded message with trailing CR/LF trimmed.
    pub text: String,
    /// Component tag from the kernel record; 0 when absent or legacy.
    pub component: u32,
    pub source: EventSource,
}

impl DebugEvent {
    /// True when `needle` occurs case-insensitively in the process name or
    /// the message text. Empty needle matches everything.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.process_name.to_lowercase().contains(&needle)
            || self.text.to_lowercase().contains(&needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DebugEvent {
        DebugEvent {
            seq: 7,
            timestamp: Utc::now(),
            process_id: 4660,
            process_name: "procA".into(),
            thread_id: 0,
            text: "hello".into(),
            component: 0,
            source: EventSource::Legacy,
        }
    }

    #[test]
    fn json_roundtrip_preserves_source_tag() {
        let ev = sample();
        let json = serde_json::to_string(&ev).unwrap();
        let back: DebugEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
        assert_eq!(back.source, EventSource::Legacy);
    }

    #[test]
    fn matches_is_case_insensitive_over_name_and_text() {
        let ev = sample();
        assert!(ev.matches("PROC"));
        assert!(ev.matches("Hello"));
        assert!(ev.matches(""));
        assert!(!ev.matches("kernel32"));
    }
}
