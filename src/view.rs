//! Presentation-boundary event log.
//!
//! Append-only, in-memory sequence of captured events with a read-time text
//! filter. The filter is a case-insensitive substring match over the process
//! name OR the message text; changing or clearing it never mutates the
//! underlying sequence. `clear` empties the log without touching channel
//! running state — that is the controller's concern, not this type's.

use crate::capture::event::DebugEvent;

#[derive(Default)]
pub struct EventLog {
    events: Vec<DebugEvent>,
    filter: Option<String>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ev: DebugEvent) {
        self.events.push(ev);
    }

    /// Set or clear the filter text. `None` (or an empty string) shows
    /// everything.
    pub fn set_filter(&mut self, text: Option<&str>) {
        self.filter = text.filter(|t| !t.is_empty()).map(str::to_string);
    }

    /// Events passing the current filter, in publication order.
    pub fn visible(&self) -> impl Iterator<Item = &DebugEvent> {
        let filter = self.filter.as_deref();
        self.events
            .iter()
            .filter(move |ev| filter.map_or(true, |t| ev.matches(t)))
    }

    /// Total captured events, filter ignored.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all captured events. The filter, and any running channels,
    /// are unaffected.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
