pub mod controller;
#[cfg(windows)]
pub mod dbwin;
pub mod event;
pub mod kernel;
pub mod legacy;
pub mod resolver;
pub mod slot;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crossbeam::channel::Sender;

use crate::capture::event::DebugEvent;

/// Shared send handle cloned into every channel worker.
///
/// Publication never blocks the capture thread (unbounded channel), and each
/// event gets a sink-wide sequence number stamped at publication time — the
/// only ordering that holds across channels, since kernel and legacy events
/// carry timestamps from different clocks.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<DebugEvent>,
    seq: Arc<AtomicU64>,
}

impl EventSink {
    pub fn new(tx: Sender<DebugEvent>) -> Self {
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stamp and forward one event. A send error only means the consumer
    /// went away during shutdown; the worker loops treat it as a stop hint.
    pub fn publish(&self, mut ev: DebugEvent) -> bool {
        ev.seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.tx.send(ev).is_ok()
    }
}
