//! ETW consumer for real-time kernel debug-print events.
//!
//! This module sets up and runs an Event Tracing for Windows (ETW) session
//! on the NT Kernel Logger with the DbgPrint flag, and adapts each delivered
//! record into the channel-neutral `TraceRecord` the kernel adapter consumes.
//!
//! Key responsibilities:
//! - Start/stop the kernel logger session (one per host; stale instances
//!   from a crashed reader are stopped before restart).
//! - Drive the blocking `ProcessTrace` delivery loop.
//! - Reduce raw event records to the DbgPrint payload fields.

#[cfg(windows)]
pub mod session;

#[cfg(windows)]
pub use session::DebugPrintSession;
