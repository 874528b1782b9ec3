/// Structured log line for the capture pipeline: timestamp, level, capture
/// channel, then the host pid/tid the line was emitted from. The channel tag
/// (`"legacy"`, `"kernel"`, `"config"`) keeps interleaved worker output
/// attributable.
///
/// ```rust
/// use log::Level;
/// printwatch::capture_log!(Level::Info, "legacy", "channel started");
/// printwatch::capture_log!(Level::Error, "kernel", "trace start failed: {}", 5);
/// ```
///
/// Produces lines like:
/// `[2026-08-31T09:12:44+02:00][INFO][legacy][pid=4568][tid=1824] channel started`
#[macro_export]
macro_rules! capture_log {
    ($level:expr, $channel:expr, $fmt:expr $(, $($arg:tt)+)?) => {{
        log::log!(
            $level,
            concat!(
                "[", "{}", "]",
                "[", "{}", "]",
                "[", $channel, "]",
                "[pid=", "{}", "]",
                "[tid=", "{:?}", "] ",
                $fmt
            ),
            chrono::Local::now().to_rfc3339(),
            $level,
            std::process::id(),
            std::thread::current().id()
            $(, $($arg)+)?
        );
    }};
}
