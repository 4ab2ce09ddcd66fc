//! Runtime user preferences
//!
//! Compile-time limits live in `compile_time`; everything here is a user
//! preference with an environment-variable override and a sensible default.

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserPreferences {
    /// Reject expressions longer than `MAX_EXPRESSION_LENGTH`
    pub enforce_length_limit: bool,
    /// Emit a debug event for every reference the scanner closes
    pub log_references: bool,
    /// Populate `ScanMetrics` on the parsed result
    pub collect_metrics: bool,
}

impl Default for ParserPreferences {
    fn default() -> Self {
        Self {
            enforce_length_limit: env::var(env_vars::PARSER_ENFORCE_LENGTH_LIMIT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            log_references: env::var(env_vars::PARSER_LOG_REFERENCES)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            collect_metrics: env::var(env_vars::PARSER_COLLECT_METRICS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging (user preference)
    pub use_structured_logging: bool,
    /// Whether to enable console output (user preference)
    pub enable_console_logging: bool,
    /// User preferred minimum log level
    pub min_log_level: LogLevel,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var(env_vars::LOGGING_USE_STRUCTURED)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_console_logging: env::var(env_vars::LOGGING_ENABLE_CONSOLE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
pub fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub parser: ParserPreferences,
    pub logging: LoggingPreferences,
}

/// Environment variable names for configuration
pub mod env_vars {
    // Parser
    pub const PARSER_ENFORCE_LENGTH_LIMIT: &str = "TRIGGER_PARSER_ENFORCE_LENGTH_LIMIT";
    pub const PARSER_LOG_REFERENCES: &str = "TRIGGER_PARSER_LOG_REFERENCES";
    pub const PARSER_COLLECT_METRICS: &str = "TRIGGER_PARSER_COLLECT_METRICS";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "TRIGGER_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "TRIGGER_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "TRIGGER_LOGGING_MIN_LEVEL";
}
