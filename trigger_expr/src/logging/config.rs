//! Logging configuration
//!
//! Buffer and message limits come from compile-time constants; level and
//! output format are runtime preferences that can be set once per process.

use crate::config::compile_time::logging::{LOG_BUFFER_SIZE, MAX_LOG_MESSAGE_LENGTH};
use crate::config::runtime::LoggingPreferences;
use std::sync::OnceLock;

type EventsLogLevel = crate::logging::events::LogLevel;
type RuntimeLogLevel = crate::config::runtime::LogLevel;

static RUNTIME_PREFERENCES: OnceLock<LoggingPreferences> = OnceLock::new();

/// Initialize runtime preferences
pub fn init_runtime_preferences(preferences: LoggingPreferences) -> Result<(), String> {
    RUNTIME_PREFERENCES
        .set(preferences)
        .map_err(|_| "Runtime preferences already initialized".to_string())
}

/// Get runtime preferences (with fallback to defaults)
fn get_runtime_preferences() -> LoggingPreferences {
    RUNTIME_PREFERENCES.get().cloned().unwrap_or_default()
}

/// Get minimum log level
pub fn get_min_log_level() -> EventsLogLevel {
    get_runtime_preferences().min_log_level.to_events_log_level()
}

/// Check if structured logging is enabled
pub fn use_structured_logging() -> bool {
    get_runtime_preferences().use_structured_logging
}

/// Check if console logging is enabled
pub fn use_console_logging() -> bool {
    get_runtime_preferences().enable_console_logging
}

/// Get the in-memory event buffer size
pub fn get_error_buffer_size() -> usize {
    LOG_BUFFER_SIZE
}

/// Get maximum log message length
pub fn get_max_log_message_length() -> usize {
    MAX_LOG_MESSAGE_LENGTH
}

/// Validate current configuration settings
pub fn validate_config() -> Result<(), String> {
    if MAX_LOG_MESSAGE_LENGTH < 64 {
        return Err(format!(
            "Max log message length too small: {}",
            MAX_LOG_MESSAGE_LENGTH
        ));
    }

    if LOG_BUFFER_SIZE == 0 {
        return Err("Log buffer size must be positive".to_string());
    }

    Ok(())
}

/// Get configuration summary for diagnostics
pub fn get_config_summary() -> String {
    let preferences = get_runtime_preferences();

    format!(
        "Logging Configuration:\n\
         - Log buffer size: {}\n\
         - Max message length: {}\n\
         - Min log level: {:?}\n\
         - Structured logging: {}\n\
         - Console logging: {}",
        LOG_BUFFER_SIZE,
        MAX_LOG_MESSAGE_LENGTH,
        preferences.min_log_level,
        preferences.use_structured_logging,
        preferences.enable_console_logging,
    )
}

/// Preferences used by the CLI when `--verbose` is passed
pub fn get_verbose_preferences(structured: bool) -> LoggingPreferences {
    LoggingPreferences {
        use_structured_logging: structured,
        enable_console_logging: true,
        min_log_level: RuntimeLogLevel::Debug,
    }
}

/// Preferences used by the CLI by default
pub fn get_quiet_preferences(structured: bool) -> LoggingPreferences {
    LoggingPreferences {
        use_structured_logging: structured,
        enable_console_logging: true,
        min_log_level: RuntimeLogLevel::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(validate_config().is_ok());
    }

    #[test]
    fn test_compile_time_constants() {
        assert!(get_error_buffer_size() >= 100);
        assert!(get_max_log_message_length() >= 64);
    }

    #[test]
    fn test_cli_presets() {
        let verbose = get_verbose_preferences(true);
        assert!(verbose.use_structured_logging);
        assert_eq!(verbose.min_log_level, RuntimeLogLevel::Debug);

        let quiet = get_quiet_preferences(false);
        assert!(quiet.enable_console_logging);
        assert_eq!(quiet.min_log_level, RuntimeLogLevel::Warning);
    }

    #[test]
    fn test_summary_lists_limits() {
        let summary = get_config_summary();
        assert!(summary.contains("Log buffer size"));
        assert!(summary.contains("Min log level"));
    }
}
