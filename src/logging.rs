//! Logging bootstrap for the binary.
//!
//! Diagnostics go to stderr so they never mix with listings on stdout.
//! `RUST_LOG` takes precedence over the verbosity flag.

use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Maps the number of `-v` flags to a level spec.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Starts the stderr logger. Keep the handle alive for the process lifetime.
pub fn init_logging(verbosity: u8) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(level_for_verbosity(verbosity))?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(level_for_verbosity(0), "warn");
        assert_eq!(level_for_verbosity(1), "info");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(9), "debug");
    }
}
