//! # Logging Initialization
//!
//! Installs the global `tracing` subscriber once per process.
//!
//! - **Filter**: `RUST_LOG` when set, else `<level>,delve_core=debug`.
//! - **File (default)**: a daily rolling `delve.log` in the user cache directory
//!   (from `directories`), written through a non-blocking appender without ANSI
//!   colors.
//! - **Stderr**: when `log_to_file` is false, or when the cache directory is
//!   missing or not writable, logs go to stderr with colors.
//!
//! Security events are logged with the rejection kind and argument index only;
//! rejected argument text is never written to the log.

use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, path::Path, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Initialize verbose logging for tests.
pub fn init_test_logging() {
    // Tests may race to install the subscriber; only the first one wins.
    let _ = init_logging("trace", false);
}

/// Initializes the logging system.
///
/// # Errors
///
/// Currently infallible; the `Result` leaves room for subscriber setup errors.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},delve_core=debug")));

        if log_to_file && let Some(proj_dirs) = ProjectDirs::from("com", "Delve", "delve") {
            let log_dir = proj_dirs.cache_dir();

            // tracing_appender::rolling::daily panics when it cannot create the file.
            if can_write_to(log_dir) {
                let file_appender = tracing_appender::rolling::daily(log_dir, "delve.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .init();
                // Leaked so buffered lines are flushed at exit.
                Box::leak(Box::new(guard));
                return;
            }
        }

        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().with_writer(stderr).with_ansi(true))
            .init();
    });

    Ok(())
}

/// Create `dir` if needed and check a file can be written in it.
fn can_write_to(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".delve_log_probe");
    match std::fs::write(&probe, "probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
