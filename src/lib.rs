// src/lib.rs
// ────────────────────────────────────────────────────────────────────────────
// Public library entry point.  Re-export everything for both `main.rs` and
// integration tests.

pub mod capture;
pub mod config;
pub mod etw;
pub mod macros;
pub mod view;
