// src/main.rs

//! Console entry-point.
//!
//! 1. Parse configuration & set up structured logging
//! 2. Acquire the slot section/events and the kernel trace session
//! 3. Enable the configured capture channels
//! 4. Print every event from the merged stream until terminated
//!
// ───── std / 3rd-party imports ──────────────────────────────────────────────
use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::{process, thread};

// ───── local imports ────────────────────────────────────────────────────────
use printwatch::config::{self, Config};

// ───── helpers ──────────────────────────────────────────────────────────────

/// Print an error with context and terminate the process.
macro_rules! fatal {
    ($ctx:expr, $($arg:tt)+) => {{
        eprintln!(
            "[{}][ERROR][{}] {}",
            chrono::Local::now().to_rfc3339(),
            $ctx,
            format!($($arg)+)
        );
        std::process::exit(1);
    }};
}

/// Directory that contains the running executable.
fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configure global logging as requested in `config.logging`.
fn setup_logging(exe_dir: &Path, cfg: &Config) -> Result<(), fern::InitError> {
    let level = match cfg.logging.level.to_uppercase().as_str() {
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let log_path = cfg
        .logging
        .enable_file
        .then(|| exe_dir.join(cfg.logging.file.as_deref().unwrap_or("printwatch.log")));

    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}][pid={}][tid={:?}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                process::id(),
                thread::current().id(),
                msg
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Some(path) = log_path {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

#[cfg(windows)]
fn run(cfg: Config) -> anyhow::Result<()> {
    use std::sync::Arc;

    use printwatch::capture::controller::CaptureController;
    use printwatch::capture::dbwin::DbwinSlot;
    use printwatch::capture::event::EventSource;
    use printwatch::capture::resolver::SystemResolver;
    use printwatch::etw::DebugPrintSession;

    // OS resources are acquired once, up front; failures here mean the
    // channel cannot function at all and must be visible to the operator.
    let names = cfg.capture.slot_names();
    let slot = DbwinSlot::open(&names)?;
    let wait_timeout = cfg.capture.wait_timeout()?;

    let mut controller = CaptureController::new(
        Box::new(slot),
        Arc::new(DebugPrintSession::new()),
        Arc::new(SystemResolver),
        wait_timeout,
    );
    let events = controller.events();

    let mut started = 0;
    if cfg.capture.legacy {
        match controller.set_legacy_enabled(true) {
            Ok(()) => started += 1,
            Err(e) => log::error!("{e}"),
        }
    }
    if cfg.capture.kernel {
        match controller.set_kernel_enabled(true) {
            Ok(()) => started += 1,
            Err(e) => log::error!("{e}"),
        }
    }
    if started == 0 {
        anyhow::bail!("no capture channel could be started");
    }
    log::info!("capturing on {started} channel(s)");

    // Merged stream → stdout, one line per event, until terminated.
    for ev in events {
        let tag = match ev.source {
            EventSource::Kernel => "K",
            EventSource::Legacy => "U",
        };
        println!(
            "{:>8} {} [{}] {:>6} {:<20} {}",
            ev.seq,
            ev.timestamp.with_timezone(&Local).format("%H:%M:%S%.3f"),
            tag,
            ev.process_id,
            ev.process_name,
            ev.text
        );
    }

    controller.dispose();
    Ok(())
}

#[cfg(not(windows))]
fn run(_cfg: Config) -> anyhow::Result<()> {
    anyhow::bail!(
        "both capture channels (kernel DbgPrint trace, DBWIN slot protocol) \
         exist only on Windows"
    );
}

fn main() {
    let exe_dir = exe_dir();
    let cfg = config::load(&exe_dir.join("printwatch.toml"))
        .unwrap_or_else(|e| fatal!("config", "{}", e));

    setup_logging(&exe_dir, &cfg).unwrap_or_else(|e| fatal!("logging", "{}", e));
    log::info!("printwatch starting");

    if let Err(e) = run(cfg) {
        fatal!("capture", "{:#}", e);
    }
}
