/*!
 * Logging initialization and the backend-scoped log adapter
 */

use std::fmt;

use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;

/// Initialize structured logging for binaries and tests.
///
/// The filter honors `RUST_LOG` when set and falls back to the given level
/// for this crate. Safe to call more than once.
pub fn init(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wharf={}", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

/// Emit a log line scoped to one filesystem instance.
///
/// Every backend log line carries the backend name and the opaque
/// per-connection identifier so operators can follow one session across
/// protocol and storage layers.
pub fn fs_log(backend: &str, connection_id: &str, level: Level, args: fmt::Arguments<'_>) {
    if level == Level::ERROR {
        error!(backend, connection_id, "{}", args);
    } else if level == Level::WARN {
        warn!(backend, connection_id, "{}", args);
    } else if level == Level::INFO {
        info!(backend, connection_id, "{}", args);
    } else if level == Level::DEBUG {
        debug!(backend, connection_id, "{}", args);
    } else {
        trace!(backend, connection_id, "{}", args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("debug");
        init("info");
    }

    #[test]
    fn test_fs_log_all_levels() {
        for level in [
            Level::ERROR,
            Level::WARN,
            Level::INFO,
            Level::DEBUG,
            Level::TRACE,
        ] {
            fs_log("osfs", "conn1", level, format_args!("probe {}", 42));
        }
    }
}
