//! Capture session controller.
//!
//! Composes the two channels behind independent enable toggles, owns every
//! OS-level resource for its own lifetime, and exposes the single merged
//! event stream. Channels are fully decoupled: enabling both is valid and
//! yields interleaved events, ordered only by the sink's sequence counter.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver};
use thiserror::Error;

use crate::capture::event::DebugEvent;
use crate::capture::kernel::{KernelChannelAdapter, TraceSource};
use crate::capture::legacy::LegacyChannelReader;
use crate::capture::resolver::ProcessNameResolver;
use crate::capture::slot::SlotChannel;
use crate::capture::EventSink;

/// Channel bring-up failures. Per-message problems never surface here; they
/// are handled (dropped or degraded) inside the capture loops.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("legacy channel failed to start: {0}")]
    LegacyStart(#[source] std::io::Error),

    #[error("kernel channel failed to start: {0}")]
    KernelStart(#[source] std::io::Error),

    #[error("controller already disposed")]
    Disposed,
}

pub struct CaptureController {
    legacy: Option<LegacyChannelReader>,
    kernel: Option<KernelChannelAdapter>,
    rx: Receiver<DebugEvent>,
}

impl CaptureController {
    /// Build from already-acquired resource handles. The slot and trace
    /// source live as long as the controller; start/stop cycles toggle
    /// delivery only, never reallocate.
    pub fn new(
        slot: Box<dyn SlotChannel>,
        trace: Arc<dyn TraceSource>,
        resolver: Arc<dyn ProcessNameResolver>,
        wait_timeout: Duration,
    ) -> Self {
        let (tx, rx) = unbounded();
        let sink = EventSink::new(tx);
        Self {
            legacy: Some(LegacyChannelReader::new(
                slot,
                resolver.clone(),
                sink.clone(),
                wait_timeout,
            )),
            kernel: Some(KernelChannelAdapter::new(trace, resolver, sink)),
            rx,
        }
    }

    /// Receiving side of the merged stream. Cloneable; events are consumed
    /// by whichever clone receives first.
    pub fn events(&self) -> Receiver<DebugEvent> {
        self.rx.clone()
    }

    pub fn legacy_running(&self) -> bool {
        self.legacy.as_ref().is_some_and(|c| c.is_running())
    }

    pub fn kernel_running(&self) -> bool {
        self.kernel.as_ref().is_some_and(|c| c.is_running())
    }

    /// Toggle the legacy channel. Idempotent in both directions.
    pub fn set_legacy_enabled(&mut self, enabled: bool) -> Result<(), CaptureError> {
        let channel = self.legacy.as_mut().ok_or(CaptureError::Disposed)?;
        if enabled {
            channel.start().map_err(CaptureError::LegacyStart)?;
        } else {
            channel.stop();
        }
        Ok(())
    }

    /// Toggle the kernel channel. Idempotent in both directions.
    pub fn set_kernel_enabled(&mut self, enabled: bool) -> Result<(), CaptureError> {
        let channel = self.kernel.as_mut().ok_or(CaptureError::Disposed)?;
        if enabled {
            channel.start().map_err(CaptureError::KernelStart)?;
        } else {
            channel.stop();
        }
        Ok(())
    }

    /// Stop both channels (not-running is a no-op) and release every OS
    /// resource. Safe to call more than once; later toggles report
    /// `Disposed`.
    pub fn dispose(&mut self) {
        if let Some(mut legacy) = self.legacy.take() {
            legacy.stop();
        }
        if let Some(mut kernel) = self.kernel.take() {
            kernel.stop();
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.dispose();
    }
}
