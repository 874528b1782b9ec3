//! Legacy channel reader
//! =====================
//! *Single* blocking worker thread that drives the slot handshake, decodes
//! each delivered payload, and publishes the result to the merged sink.
//!
//! Loop shape, each iteration:
//!   1. signal `BufferReady` (slot free, writers may proceed)
//!   2. bounded wait on `DataReady` — a timeout just re-checks the stop flag
//!   3. on delivery: copy the slot out, decode pid + text, resolve the
//!      process name (best effort), publish with the current wall clock
//!
//! Per-message failures never break the loop: a malformed payload (no NUL
//! terminator) is dropped and counted, a failed name lookup publishes with an
//! empty name. Only resource acquisition errors escape, at construction.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use log::Level;

use crate::capture::event::{DebugEvent, EventSource};
use crate::capture::resolver::ProcessNameResolver;
use crate::capture::slot::{decode_slot, SlotChannel, SLOT_SIZE};
use crate::capture::EventSink;
use crate::capture_log;

pub struct LegacyChannelReader {
    slot: Option<Box<dyn SlotChannel>>,
    resolver: Arc<dyn ProcessNameResolver>,
    sink: EventSink,
    wait_timeout: Duration,
    stop: Arc<AtomicBool>,
    malformed: Arc<AtomicU64>,
    worker: Option<JoinHandle<Box<dyn SlotChannel>>>,
}

impl LegacyChannelReader {
    pub fn new(
        slot: Box<dyn SlotChannel>,
        resolver: Arc<dyn ProcessNameResolver>,
        sink: EventSink,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            slot: Some(slot),
            resolver,
            sink,
            wait_timeout,
            stop: Arc::new(AtomicBool::new(false)),
            malformed: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Payloads dropped because no terminator was found in the slot.
    pub fn malformed_count(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Spawn the worker. Idempotent: a second call while running is a no-op.
    /// Fails only if the OS refuses the thread; the running flag is not
    /// flipped in that case.
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        // The slot is handed to the worker and handed back on join, so the
        // OS resources survive stop/start cycles without reallocation. A
        // panicked worker takes its slot down with it; that reader is done.
        let slot = match self.slot.take() {
            Some(s) => s,
            None => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "slot resources were lost when a previous worker panicked",
                ))
            }
        };
        self.stop.store(false, Ordering::Relaxed);

        let stop = self.stop.clone();
        let resolver = self.resolver.clone();
        let sink = self.sink.clone();
        let malformed = self.malformed.clone();
        let wait_timeout = self.wait_timeout;

        let handle = std::thread::Builder::new()
            .name("legacy-capture".into())
            .spawn(move || {
                capture_log!(Level::Info, "legacy", "channel started");
                run_loop(&*slot, &*resolver, &sink, &stop, &malformed, wait_timeout);
                capture_log!(Level::Info, "legacy", "channel exited");
                slot
            })?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Signal the worker and join it. Bounded by the wait timeout, since the
    /// flag is checked once per loop iteration. No-op if not running.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(slot) => self.slot = Some(slot),
                Err(_) => capture_log!(Level::Error, "legacy", "capture worker panicked"),
            }
        }
    }
}

impl Drop for LegacyChannelReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    slot: &dyn SlotChannel,
    resolver: &dyn ProcessNameResolver,
    sink: &EventSink,
    stop: &AtomicBool,
    malformed: &AtomicU64,
    wait_timeout: Duration,
) {
    let mut buf = [0u8; SLOT_SIZE];
    while !stop.load(Ordering::Relaxed) {
        if let Err(e) = slot.signal_buffer_ready() {
            capture_log!(Level::Error, "legacy", "signaling BufferReady failed: {}", e);
            break;
        }
        match slot.wait_data_ready(wait_timeout) {
            Ok(true) => {}
            Ok(false) => continue, // timeout: cancellation-check cadence
            Err(e) => {
                capture_log!(Level::Error, "legacy", "waiting for DataReady failed: {}", e);
                break;
            }
        }
        let time = Utc::now();
        if let Err(e) = slot.read(&mut buf) {
            capture_log!(Level::Error, "legacy", "slot read failed: {}", e);
            break;
        }
        match decode_slot(&buf) {
            Ok((pid, text)) => {
                let ev = DebugEvent {
                    seq: 0, // stamped by the sink
                    timestamp: time,
                    process_id: pid,
                    process_name: resolver.name_for(pid),
                    thread_id: 0,
                    text,
                    component: 0,
                    source: EventSource::Legacy,
                };
                if !sink.publish(ev) {
                    break; // consumer gone, shutting down
                }
            }
            Err(e) => {
                malformed.fetch_add(1, Ordering::Relaxed);
                capture_log!(Level::Debug, "legacy", "payload dropped: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::resolver::StaticResolver;
    use crate::capture::slot::SlotNames;

    #[test]
    fn default_names_match_the_protocol() {
        let names = SlotNames::default();
        assert_eq!(names.section, "DBWIN_BUFFER");
        assert_eq!(names.buffer_ready, "DBWIN_BUFFER_READY");
        assert_eq!(names.data_ready, "DBWIN_DATA_READY");
    }

    #[test]
    fn stop_before_start_is_a_noop() {
        let (tx, _rx) = crossbeam::channel::unbounded();
        let mut reader = LegacyChannelReader::new(
            Box::new(NeverReadySlot),
            Arc::new(StaticResolver::default()),
            EventSink::new(tx),
            Duration::from_millis(10),
        );
        reader.stop();
        assert!(!reader.is_running());
    }

    struct NeverReadySlot;

    impl SlotChannel for NeverReadySlot {
        fn signal_buffer_ready(&self) -> std::io::Result<()> {
            Ok(())
        }
        fn wait_data_ready(&self, _timeout: Duration) -> std::io::Result<bool> {
            Ok(false)
        }
        fn read(&self, _buf: &mut [u8; SLOT_SIZE]) -> std::io::Result<()> {
            Ok(())
        }
    }
}
