use error_stack::{Report, ResultExt};
use log::LevelFilter;

use crate::error::MediationError;

/// Installs the process-wide logger writing to stderr.
///
/// Should be called once by the host or binary before the first adapter is
/// created; the library itself only emits through the `log` facade.
///
/// # Errors
///
/// Returns [`MediationError::Settings`] when a logger is already installed.
pub fn init_logger(level: LevelFilter) -> Result<(), Report<MediationError>> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .change_context(MediationError::Settings {
            message: "Failed to initialize logger".to_string(),
        })
}

/// Maps a verbosity count (`-v`, `-vv`, ...) onto a level filter.
#[must_use]
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_for_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_for_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn test_second_install_fails() {
        let _ = init_logger(LevelFilter::Debug);
        assert!(
            init_logger(LevelFilter::Debug).is_err(),
            "a logger can only be installed once"
        );
    }
}
