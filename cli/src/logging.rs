//! Logging configuration with file-based output and size-based rotation.
//!
//! Writes logs to `~/.config/sanctum/sanctum.log` (or platform equivalent)
//! with 10 MB size-based rotation. Set `DEBUG_LOGGING=1` (or `debug_logging`
//! in the config) to enable debug output for sanctum crates.

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEBUG_DIRECTIVE: &str = "info,sanctum_core=debug,sanctum_cli=debug";

/// Initialize logging with dual output (file + stdout).
///
/// Returns a `WorkerGuard` that must be held for the program lifetime so
/// buffered logs are flushed on shutdown. If the log directory or file can't
/// be created, falls back to stdout-only logging and returns `None`.
pub fn init(debug_logging: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = debug_logging || std::env::var("DEBUG_LOGGING").is_ok();

    let Some(log_dir) = dirs::config_dir().map(|config| config.join("sanctum")) else {
        init_stdout_only(debug_logging);
        return None;
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // No subscriber yet
        eprintln!(
            "Failed to create log directory {:?}: {}, using stdout only",
            log_dir, e
        );
        init_stdout_only(debug_logging);
        return None;
    }

    // 10 MB, keep 1 rotated file (sanctum.log and sanctum.log.1)
    let log_path = log_dir.join("sanctum.log");
    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(10 * 1024 * 1024),
        1,
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {:?}: {}", log_path, e);
            init_stdout_only(debug_logging);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(log_file = ?log_path, debug_logging, "Sanctum logging initialized");

    Some(guard)
}

fn init_stdout_only(debug_logging: bool) {
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(debug_logging, "Sanctum logging initialized (stdout only)");
}

fn filter(debug_logging: bool) -> EnvFilter {
    EnvFilter::new(if debug_logging { DEBUG_DIRECTIVE } else { "info" })
}
