//! NT Kernel Logger session scoped to DbgPrint events.
//!
//! The kernel logger is a singleton session with a fixed name; only its
//! enable-flag set is ours to choose (`EVENT_TRACE_FLAG_DBGPRINT`). `open`
//! starts the session synchronously — that is where missing privileges
//! surface, and the caller must see them before flipping any running state.
//! `run` opens a real-time consumer on the started session and blocks in
//! `ProcessTrace` until another thread calls `stop`, which stops the logger
//! and thereby unblocks delivery. Handles are closed on the way out of `run`,
//! exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::{ffi::c_void, io, mem, ptr};

use chrono::{DateTime, Utc};
use log::Level;
use windows_sys::core::GUID;
use windows_sys::Win32::Foundation::ERROR_SUCCESS;
use windows_sys::Win32::System::Diagnostics::Etw::{
    CloseTrace, ControlTraceW, OpenTraceW, ProcessTrace, StartTraceW, EVENT_RECORD,
    EVENT_TRACE_CONTROL_STOP, EVENT_TRACE_FLAG_DBGPRINT, EVENT_TRACE_LOGFILEW,
    EVENT_TRACE_PROPERTIES, EVENT_TRACE_REAL_TIME_MODE, INVALID_PROCESSTRACE_HANDLE,
    PROCESS_TRACE_MODE_EVENT_RECORD, PROCESS_TRACE_MODE_REAL_TIME, SystemTraceControlGuid,
    WNODE_FLAG_TRACED_GUID,
};

use crate::capture::kernel::{TraceRecord, TraceSource};
use crate::capture_log;

/// The kernel logger's fixed session name. Any other name is rejected by
/// `StartTraceW` when `SystemTraceControlGuid` is requested.
const KERNEL_LOGGER_NAME: &str = "NT Kernel Logger";

/// Provider GUID of kernel DbgPrint events
/// ({13976d09-a327-438c-950b-7f03192815c7}); other kernel-logger records
/// (headers, rundown) arrive on different GUIDs and are ignored.
const DBGPRINT_GUID: GUID = GUID {
    data1: 0x13976d09,
    data2: 0xa327,
    data3: 0x438c,
    data4: [0x95, 0x0b, 0x7f, 0x03, 0x19, 0x28, 0x15, 0xc7],
};

/// 1601-01-01 → 1970-01-01 in 100 ns units (FILETIME epoch difference).
const FILETIME_UNIX_DIFF: i64 = 116_444_736_000_000_000;

/// `EVENT_TRACE_PROPERTIES` plus the trailing logger-name buffer ETW writes
/// into.
#[repr(C)]
struct TraceProps {
    props: EVENT_TRACE_PROPERTIES,
    _name_buffer: [u16; 128],
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(Some(0)).collect()
}

fn kernel_logger_props() -> TraceProps {
    let mut tp: TraceProps = unsafe { mem::zeroed() };
    tp.props.Wnode.BufferSize = mem::size_of::<TraceProps>() as u32;
    tp.props.Wnode.Guid = SystemTraceControlGuid;
    tp.props.Wnode.Flags = WNODE_FLAG_TRACED_GUID;
    tp.props.Wnode.ClientContext = 1; // QPC; ETW still hands consumers FILETIME
    tp.props.LogFileMode = EVENT_TRACE_REAL_TIME_MODE;
    tp.props.EnableFlags = EVENT_TRACE_FLAG_DBGPRINT;
    tp.props.LoggerNameOffset = mem::size_of::<EVENT_TRACE_PROPERTIES>() as u32;
    tp
}

/// Blocking real-time DbgPrint subscription.
pub struct DebugPrintSession {
    started: AtomicBool,
}

impl DebugPrintSession {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
        }
    }

    fn stop_logger() -> u32 {
        let name = wide(KERNEL_LOGGER_NAME);
        let mut tp = kernel_logger_props();
        unsafe { ControlTraceW(0, name.as_ptr(), &mut tp.props, EVENT_TRACE_CONTROL_STOP) }
    }
}

impl Default for DebugPrintSession {
    fn default() -> Self {
        Self::new()
    }
}

struct CallbackCtx<'a> {
    deliver: &'a mut dyn FnMut(TraceRecord),
}

unsafe extern "system" fn record_callback(record: *mut EVENT_RECORD) {
    let record = &*record;
    if record.UserContext.is_null() {
        return;
    }
    let header = &record.EventHeader;
    if !guid_eq(&header.ProviderId, &DBGPRINT_GUID) {
        return; // headers, rundown, other kernel events
    }

    // MOF payload: u32 ComponentId, then a NUL-terminated ANSI message.
    let len = record.UserDataLength as usize;
    let data = std::slice::from_raw_parts(record.UserData as *const u8, len);
    let (component, message) = if len >= 4 {
        let component = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let text = &data[4..];
        let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
        (Some(component), Some(text[..end].to_vec()))
    } else {
        (None, None)
    };

    let ctx = &mut *(record.UserContext as *mut CallbackCtx<'_>);
    (ctx.deliver)(TraceRecord {
        timestamp: filetime_to_utc(header.TimeStamp),
        process_id: header.ProcessId as i32,
        thread_id: header.ThreadId,
        component,
        message,
    });
}

fn guid_eq(a: &GUID, b: &GUID) -> bool {
    a.data1 == b.data1 && a.data2 == b.data2 && a.data3 == b.data3 && a.data4 == b.data4
}

fn filetime_to_utc(ts: i64) -> DateTime<Utc> {
    let unix_100ns = ts - FILETIME_UNIX_DIFF;
    let secs = unix_100ns.div_euclid(10_000_000);
    let nanos = (unix_100ns.rem_euclid(10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos).unwrap_or_else(Utc::now)
}

impl TraceSource for DebugPrintSession {
    fn open(&self) -> io::Result<()> {
        let name = wide(KERNEL_LOGGER_NAME);

        // A previous reader that died without stopping the logger leaves the
        // singleton session running; clear it so StartTraceW can succeed.
        Self::stop_logger();

        let mut tp = kernel_logger_props();
        let mut session: u64 = 0;
        let status = unsafe { StartTraceW(&mut session, name.as_ptr(), &mut tp.props) };
        if status != ERROR_SUCCESS {
            return Err(io::Error::from_raw_os_error(status as i32));
        }
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    fn run(&self, deliver: &mut dyn FnMut(TraceRecord)) -> io::Result<()> {
        if !self.started.load(Ordering::Acquire) {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "kernel logger session was not started",
            ));
        }

        let mut ctx = CallbackCtx { deliver };
        let mut logger_name = wide(KERNEL_LOGGER_NAME);
        let mut logfile: EVENT_TRACE_LOGFILEW = unsafe { mem::zeroed() };
        logfile.LoggerName = logger_name.as_mut_ptr();
        logfile.Anonymous1.ProcessTraceMode =
            PROCESS_TRACE_MODE_REAL_TIME | PROCESS_TRACE_MODE_EVENT_RECORD;
        logfile.Anonymous2.EventRecordCallback = Some(record_callback);
        logfile.Context = &mut ctx as *mut CallbackCtx<'_> as *mut c_void;

        let consumer = unsafe { OpenTraceW(&mut logfile) };
        if consumer == INVALID_PROCESSTRACE_HANDLE {
            let err = io::Error::last_os_error();
            self.started.store(false, Ordering::Release);
            Self::stop_logger();
            return Err(err);
        }

        // Blocks until the logger session is stopped from another thread.
        let status = unsafe { ProcessTrace(&consumer, 1, ptr::null(), ptr::null()) };
        unsafe { CloseTrace(consumer) };

        if status != ERROR_SUCCESS {
            return Err(io::Error::from_raw_os_error(status as i32));
        }
        Ok(())
    }

    fn stop(&self) {
        self.started.store(false, Ordering::Release);
        let status = Self::stop_logger();
        if status != ERROR_SUCCESS {
            capture_log!(Level::Debug, "kernel", "stopping kernel logger returned {}", status);
        }
    }
}
