//! Kernel channel adapter
//! ======================
//! Bridges the kernel debug-print trace provider to the merged sink. The
//! provider's delivery loop is a blocking call that lasts the whole session,
//! so it runs on its own worker thread; `stop()` tells the trace source to
//! end delivery, which unblocks that thread, then joins it.
//!
//! Decoding is per-record and loss-tolerant: a record without the expected
//! `Message` payload is skipped and counted, never fatal to the session.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use log::Level;

use crate::capture::event::{DebugEvent, EventSource};
use crate::capture::resolver::ProcessNameResolver;
use crate::capture::slot::decode_ansi_trimmed;
use crate::capture::EventSink;
use crate::capture_log;

/// One delivered provider record, reduced to the fields this tool consumes.
#[derive(Debug, Clone)]
pub struct TraceRecord {
    /// Provider-supplied timestamp (not this host's wall clock at decode).
    pub timestamp: DateTime<Utc>,
    pub process_id: i32,
    pub thread_id: u32,
    /// Optional component tag; absent on many records.
    pub component: Option<u32>,
    /// Raw ANSI bytes of the `Message` field; `None` when the record lacks
    /// the field entirely.
    pub message: Option<Vec<u8>>,
}

/// A trace subscription split into synchronous bring-up and blocking
/// delivery. `open` acquires the session and must fail loudly (missing
/// privileges, provider registration) so the caller can refuse to flip the
/// channel to running; `run` then blocks delivering records until `stop` is
/// called from another thread.
pub trait TraceSource: Send + Sync {
    fn open(&self) -> std::io::Result<()>;
    fn run(&self, deliver: &mut dyn FnMut(TraceRecord)) -> std::io::Result<()>;
    fn stop(&self);
}

/// Decode one record into a normalized event, or `None` if the record lacks
/// a `Message` field and must be skipped.
pub fn decode_record(
    record: TraceRecord,
    resolver: &dyn ProcessNameResolver,
) -> Option<DebugEvent> {
    let message = record.message?;
    Some(DebugEvent {
        seq: 0, // stamped by the sink
        timestamp: record.timestamp,
        process_id: record.process_id,
        process_name: resolver.name_for(record.process_id),
        thread_id: record.thread_id,
        text: decode_ansi_trimmed(&message),
        component: record.component.unwrap_or(0),
        source: EventSource::Kernel,
    })
}

pub struct KernelChannelAdapter {
    source: Arc<dyn TraceSource>,
    resolver: Arc<dyn ProcessNameResolver>,
    sink: EventSink,
    skipped: Arc<AtomicU64>,
    alive: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl KernelChannelAdapter {
    pub fn new(
        source: Arc<dyn TraceSource>,
        resolver: Arc<dyn ProcessNameResolver>,
        sink: EventSink,
    ) -> Self {
        Self {
            source,
            resolver,
            sink,
            skipped: Arc::new(AtomicU64::new(0)),
            alive: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// True only while the delivery loop is actually running; a worker that
    /// died on a delivery error drops the flag itself, so the channel never
    /// reports enabled-but-dead.
    pub fn is_running(&self) -> bool {
        self.worker.is_some() && self.alive.load(Ordering::Relaxed)
    }

    /// Records skipped because the `Message` field was missing.
    pub fn skipped_count(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Bring the session up and spawn the delivery thread. Idempotent while
    /// running; session acquisition failures propagate and the channel is
    /// left stopped.
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.worker.is_some() {
            if self.alive.load(Ordering::Relaxed) {
                return Ok(());
            }
            // reap a worker that died on a delivery error before restarting
            self.stop();
        }

        // Synchronous bring-up: a channel must not look enabled while its
        // session could not be acquired at all.
        self.source.open()?;

        let source = self.source.clone();
        let resolver = self.resolver.clone();
        let sink = self.sink.clone();
        let skipped = self.skipped.clone();
        let alive = self.alive.clone();
        alive.store(true, Ordering::Relaxed);

        let spawned = std::thread::Builder::new()
            .name("kernel-capture".into())
            .spawn(move || {
                capture_log!(Level::Info, "kernel", "channel started");
                let mut deliver = |record: TraceRecord| {
                    match decode_record(record, &*resolver) {
                        Some(ev) => {
                            let _ = sink.publish(ev);
                        }
                        None => {
                            skipped.fetch_add(1, Ordering::Relaxed);
                            capture_log!(Level::Debug, "kernel", "record without Message skipped");
                        }
                    }
                };
                if let Err(e) = source.run(&mut deliver) {
                    capture_log!(Level::Error, "kernel", "trace delivery ended with error: {}", e);
                }
                alive.store(false, Ordering::Relaxed);
                capture_log!(Level::Info, "kernel", "channel exited");
            });
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.alive.store(false, Ordering::Relaxed);
                self.source.stop();
                Err(e)
            }
        }
    }

    /// End trace delivery and join the worker. No-op if not running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.source.stop();
            if handle.join().is_err() {
                capture_log!(Level::Error, "kernel", "capture worker panicked");
            }
            self.alive.store(false, Ordering::Relaxed);
        }
    }
}

impl Drop for KernelChannelAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::resolver::StaticResolver;

    fn record(message: Option<&[u8]>, component: Option<u32>) -> TraceRecord {
        TraceRecord {
            timestamp: Utc::now(),
            process_id: 42,
            thread_id: 7,
            component,
            message: message.map(|m| m.to_vec()),
        }
    }

    #[test]
    fn record_with_message_decodes_with_defaults() {
        let resolver = StaticResolver::new([(42, "procA")]);
        let ev = decode_record(record(Some(b"boot\n"), None), &resolver).unwrap();
        assert_eq!(ev.text, "boot");
        assert_eq!(ev.component, 0);
        assert_eq!(ev.thread_id, 7);
        assert_eq!(ev.process_name, "procA");
        assert_eq!(ev.source, EventSource::Kernel);
    }

    #[test]
    fn component_is_carried_when_present() {
        let resolver = StaticResolver::default();
        let ev = decode_record(record(Some(b"x"), Some(0xBEEF)), &resolver).unwrap();
        assert_eq!(ev.component, 0xBEEF);
        assert_eq!(ev.process_name, "");
    }

    #[test]
    fn record_without_message_is_skipped() {
        let resolver = StaticResolver::default();
        assert!(decode_record(record(None, Some(1)), &resolver).is_none());
    }
}
