//! Win32 implementation of the slot channel.
//!
//! Opens (or creates) the named pagefile-backed section and the two named
//! auto-reset events. Create-or-open on every handle: writers and competing
//! reader instances race to create the same well-known names, and
//! `CreateFileMappingW`/`CreateEventW` hand back the existing object when it
//! is already there.
//!
//! All handles live for the lifetime of this struct and are released exactly
//! once on drop.

use std::{
    ffi::OsStr,
    io,
    os::windows::prelude::OsStrExt,
    ptr,
    time::Duration,
};

use windows_sys::Win32::{
    Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE, WAIT_OBJECT_0, WAIT_TIMEOUT},
    System::Memory::{
        CreateFileMappingW, MapViewOfFile, UnmapViewOfFile, FILE_MAP_READ, PAGE_READWRITE,
        MEMORY_MAPPED_VIEW_ADDRESS,
    },
    System::Threading::{CreateEventW, SetEvent, WaitForSingleObject},
};

use crate::capture::slot::{SlotChannel, SlotNames, SLOT_SIZE};

/// Null-terminated UTF-16 for the Win32 W-APIs.
fn wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(Some(0)).collect()
}

/// RAII owner of the slot section, its view, and both named events.
pub struct DbwinSlot {
    section: HANDLE,
    view: MEMORY_MAPPED_VIEW_ADDRESS, // kept for UnmapViewOfFile
    base: *const u8,
    buffer_ready: HANDLE,
    data_ready: HANDLE,
}

// The view is only ever read from the one worker thread that owns the
// channel; the event handles are thread-safe kernel objects.
unsafe impl Send for DbwinSlot {}

impl DbwinSlot {
    /// Create-or-open every named resource of the protocol. Any failure here
    /// is fatal for the legacy channel and propagates to the caller.
    pub fn open(names: &SlotNames) -> io::Result<Self> {
        let buffer_ready = create_auto_reset_event(&names.buffer_ready)?;
        let data_ready = match create_auto_reset_event(&names.data_ready) {
            Ok(h) => h,
            Err(e) => {
                unsafe { CloseHandle(buffer_ready) };
                return Err(e);
            }
        };

        let wide_name = wide(&names.section);
        // Pagefile-backed named section; writers map it read-write, the
        // reader only ever reads.
        let section = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                ptr::null(),
                PAGE_READWRITE,
                0,
                SLOT_SIZE as u32,
                wide_name.as_ptr(),
            )
        };
        if section.is_null() {
            let err = io::Error::last_os_error();
            unsafe {
                CloseHandle(buffer_ready);
                CloseHandle(data_ready);
            }
            return Err(err);
        }

        let view = unsafe { MapViewOfFile(section, FILE_MAP_READ, 0, 0, SLOT_SIZE) };
        if view.Value.is_null() {
            let err = io::Error::last_os_error();
            unsafe {
                CloseHandle(section);
                CloseHandle(buffer_ready);
                CloseHandle(data_ready);
            }
            return Err(err);
        }

        Ok(Self {
            section,
            view,
            base: view.Value as *const u8,
            buffer_ready,
            data_ready,
        })
    }
}

fn create_auto_reset_event(name: &str) -> io::Result<HANDLE> {
    let wide_name = wide(name);
    // bManualReset = FALSE → auto-reset, initial state non-signaled.
    let handle = unsafe { CreateEventW(ptr::null(), 0, 0, wide_name.as_ptr()) };
    if handle.is_null() {
        return Err(io::Error::last_os_error());
    }
    Ok(handle)
}

impl SlotChannel for DbwinSlot {
    fn signal_buffer_ready(&self) -> io::Result<()> {
        if unsafe { SetEvent(self.buffer_ready) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn wait_data_ready(&self, timeout: Duration) -> io::Result<bool> {
        match unsafe { WaitForSingleObject(self.data_ready, timeout.as_millis() as u32) } {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            _ => Err(io::Error::last_os_error()),
        }
    }

    fn read(&self, buf: &mut [u8; SLOT_SIZE]) -> io::Result<()> {
        // Copy out while the slot is quiescent (between DataReady and the
        // next BufferReady); the event must not alias the shared view.
        unsafe { ptr::copy_nonoverlapping(self.base, buf.as_mut_ptr(), SLOT_SIZE) };
        Ok(())
    }
}

impl Drop for DbwinSlot {
    fn drop(&mut self) {
        unsafe {
            UnmapViewOfFile(self.view); // unmap first
            CloseHandle(self.section);  // then close handles
            CloseHandle(self.buffer_ready);
            CloseHandle(self.data_ready);
        }
    }
}
