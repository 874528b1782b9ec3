//! Best-effort process-name lookup.
//!
//! Resolution runs on the capture path for every event, against processes
//! that may already be gone by the time their message is decoded. Failure is
//! therefore an expected outcome, mapped to an empty string; it never
//! escapes to the capture loop.

use std::collections::HashMap;

/// Maps a pid to a display name. Injectable so tests don't depend on live
/// host processes.
pub trait ProcessNameResolver: Send + Sync {
    /// Display name for `pid`, or an empty string if it cannot be resolved.
    fn name_for(&self, pid: i32) -> String;
}

/// Resolver backed by the host OS.
#[derive(Default)]
pub struct SystemResolver;

impl ProcessNameResolver for SystemResolver {
    #[cfg(windows)]
    fn name_for(&self, pid: i32) -> String {
        use windows_sys::Win32::{
            Foundation::CloseHandle,
            System::ProcessStatus::K32GetProcessImageFileNameW,
            System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION},
        };

        if pid <= 0 {
            return String::new();
        }
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid as u32) };
        if handle.is_null() {
            return String::new();
        }
        let mut buf = [0u16; 260];
        let len = unsafe { K32GetProcessImageFileNameW(handle, buf.as_mut_ptr(), buf.len() as u32) };
        unsafe { CloseHandle(handle) };
        if len == 0 {
            return String::new();
        }
        let path = String::from_utf16_lossy(&buf[..len as usize]);
        // Image path → bare name, e.g. \Device\...\notepad.exe → notepad
        path.rsplit('\\')
            .next()
            .map(|f| f.trim_end_matches(".exe").to_string())
            .unwrap_or_default()
    }

    #[cfg(not(windows))]
    fn name_for(&self, pid: i32) -> String {
        if pid <= 0 {
            return String::new();
        }
        std::fs::read_to_string(format!("/proc/{pid}/comm"))
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default()
    }
}

/// Fixed pid→name table for tests; unknown pids resolve to empty.
#[derive(Default)]
pub struct StaticResolver {
    names: HashMap<i32, String>,
}

impl StaticResolver {
    pub fn new(entries: impl IntoIterator<Item = (i32, &'static str)>) -> Self {
        Self {
            names: entries.into_iter().map(|(p, n)| (p, n.to_string())).collect(),
        }
    }
}

impl ProcessNameResolver for StaticResolver {
    fn name_for(&self, pid: i32) -> String {
        self.names.get(&pid).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_resolver_falls_back_to_empty() {
        let r = StaticResolver::new([(42, "procA")]);
        assert_eq!(r.name_for(42), "procA");
        assert_eq!(r.name_for(99), "");
    }

    #[test]
    fn system_resolver_rejects_nonpositive_pids() {
        let r = SystemResolver;
        assert_eq!(r.name_for(0), "");
        assert_eq!(r.name_for(-5), "");
    }
}
