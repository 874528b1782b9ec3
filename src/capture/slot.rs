//! Shared slot protocol
//! --------------------
//! An arbitrary, unmodified writer process hands off one message at a time
//! through a single fixed-size named section:
//!
//!   ┌──── 0                                  4096 ────┐
//!   │ i32 pid (LE) │ NUL-terminated ANSI text │ stale │
//!   └──────────────────────────────────────────────────┘
//!
//! Two named auto-reset events coordinate the hand-off:
//! * `BufferReady`  reader → writers: "slot is free, you may write"
//! * `DataReady`    writer → reader:  "slot is filled, you may read"
//!
//! Only one in-flight message is representable. A writer that jumps the gun
//! before `BufferReady` is re-signaled can overwrite another writer's unread
//! payload; that race is part of the protocol contract the external writers
//! hardcode, and a reader must preserve the single-slot semantics rather than
//! bolt queuing onto them.
//!
//! Trailing bytes after the terminator are whatever the previous message left
//! behind; the protocol never zeroes the buffer between uses.

use std::time::Duration;

use thiserror::Error;

/// Slot size fixed by the protocol (and by every existing writer).
pub const SLOT_SIZE: usize = 1 << 12;

/// Byte offset where the message text starts (after the LE i32 pid).
pub const TEXT_OFFSET: usize = 4;

/// Default bound on one `DataReady` wait. Short enough to keep `stop()`
/// responsive; a timeout is the cancellation-check cadence, not a failure.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(400);

/// Well-known names of the section and the two events. Injectable so tests
/// and isolated reader instances can run against private names instead of
/// the global ones every writer on the host targets.
#[derive(Debug, Clone)]
pub struct SlotNames {
    pub section: String,
    pub buffer_ready: String,
    pub data_ready: String,
}

impl Default for SlotNames {
    fn default() -> Self {
        Self {
            section: "DBWIN_BUFFER".into(),
            buffer_ready: "DBWIN_BUFFER_READY".into(),
            data_ready: "DBWIN_DATA_READY".into(),
        }
    }
}

/// The OS resource seam of the protocol: one slot region plus its two
/// signals, owned by exactly one reader. Implementations are expected to be
/// driven from a single worker thread.
pub trait SlotChannel: Send {
    /// Signal writers that the slot is free.
    fn signal_buffer_ready(&self) -> std::io::Result<()>;

    /// Block until a writer signals the slot is filled, or the timeout
    /// elapses. `Ok(false)` on timeout.
    fn wait_data_ready(&self, timeout: Duration) -> std::io::Result<bool>;

    /// Copy the current slot contents out. Must be called only after
    /// `wait_data_ready` returned `Ok(true)` and before the next
    /// `signal_buffer_ready`, while no writer may touch the slot.
    fn read(&self, buf: &mut [u8; SLOT_SIZE]) -> std::io::Result<()>;
}

/// Why a delivered slot payload could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotDecodeError {
    /// No NUL byte anywhere in the text area. The writer either died
    /// mid-write or never followed the protocol; the partial message is
    /// unusable and must be dropped without reading past the buffer.
    #[error("no NUL terminator within the slot")]
    MissingTerminator,
}

/// Decode one delivered slot: LE i32 pid, then the ANSI text up to the first
/// NUL with trailing CR/LF trimmed. The returned `String` owns its bytes;
/// nothing borrows from `buf`.
pub fn decode_slot(buf: &[u8; SLOT_SIZE]) -> Result<(i32, String), SlotDecodeError> {
    let pid = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let payload = &buf[TEXT_OFFSET..];
    let nul = payload
        .iter()
        .position(|&b| b == 0)
        .ok_or(SlotDecodeError::MissingTerminator)?;
    Ok((pid, decode_ansi_trimmed(&payload[..nul])))
}

/// Single-byte (Latin-1) decode with trailing `\r`/`\n` stripped. Writers
/// emit ANSI text, so every byte maps to exactly one char; lossy UTF-8 would
/// mangle high bytes instead.
pub(crate) fn decode_ansi_trimmed(bytes: &[u8]) -> String {
    let mut end = bytes.len();
    while end > 0 && (bytes[end - 1] == b'\r' || bytes[end - 1] == b'\n') {
        end -= 1;
    }
    bytes[..end].iter().map(|&b| b as char).collect()
}
