//! Global logging module
//!
//! Thread-safe global logging with a per-thread expression context, coded
//! events and a clean macro interface. Every function here is a no-op until
//! `init_global_logging` (or `init_global_logging_with_service`) has run.

pub mod codes;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{
    ConsoleLogger, Logger, LoggingService, MemoryLogger, MultiLogger, StructuredLogger,
};

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

/// The expression currently being validated on this thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionContext {
    pub expression_id: usize,
    pub expression: String,
}

thread_local! {
    static EXPRESSION_CONTEXT: RefCell<Option<ExpressionContext>> = const { RefCell::new(None) };
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize global logging from the runtime preferences
pub fn init_global_logging() -> Result<(), String> {
    config::validate_config().map_err(|e| format!("Configuration validation failed: {}", e))?;

    let logging_service = Arc::new(service::create_configured_service());

    GLOBAL_LOGGER
        .set(logging_service.clone())
        .map_err(|_| "Global logger already initialized".to_string())?;

    let event = LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    );
    logging_service.log_event(event);

    Ok(())
}

/// Initialize with custom service (primarily for testing)
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), String> {
    GLOBAL_LOGGER
        .set(service)
        .map_err(|_| "Global logger already initialized".to_string())
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

/// Safe access to global logger
pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

/// True when a global logger exists and accepts debug events
pub fn debug_enabled() -> bool {
    try_get_global_logger()
        .map(|logger| logger.should_log(LogLevel::Debug))
        .unwrap_or(false)
}

// ============================================================================
// EXPRESSION CONTEXT MANAGEMENT
// ============================================================================

pub fn set_expression_context(expression_id: usize, expression: &str) {
    EXPRESSION_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = Some(ExpressionContext {
            expression_id,
            expression: expression.to_string(),
        });
    });
}

pub fn clear_expression_context() {
    EXPRESSION_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = None;
    });
}

/// Execute function with expression context
pub fn with_expression_context<F, R>(expression_id: usize, expression: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    set_expression_context(expression_id, expression);
    let result = f();
    clear_expression_context();
    result
}

pub fn get_current_expression_context() -> Option<ExpressionContext> {
    EXPRESSION_CONTEXT.with(|ctx| ctx.borrow().clone())
}

// ============================================================================
// MACRO SUPPORT FUNCTIONS
// ============================================================================

fn decorate(mut event: LogEvent, context: Vec<(&str, &str)>) -> LogEvent {
    for (key, value) in context {
        event = event.with_context(key, value);
    }

    if let Some(expr_ctx) = get_current_expression_context() {
        event = event.with_context("expression_id", &expr_ctx.expression_id.to_string());
        event = event.with_context("expression", &expr_ctx.expression);
    }

    event
}

fn dispatch(event: LogEvent) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(event);
    }
}

/// Used by `log_error!`
pub fn log_error_with_context(
    code: Code,
    message: &str,
    span: Option<crate::utils::Span>,
    context: Vec<(&str, &str)>,
) {
    if !is_initialized() {
        return;
    }

    let mut event = LogEvent::error(code, message);
    if let Some(s) = span {
        event = event.with_span(s);
    }
    dispatch(decorate(event, context));
}

/// Used by `log_success!`
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    if is_initialized() {
        dispatch(decorate(LogEvent::success(code, message), context));
    }
}

/// Used by `log_info!`
pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    if is_initialized() {
        dispatch(decorate(LogEvent::info(message), context));
    }
}

/// Used by `log_warning!`
pub fn log_warning_with_context(message: &str, context: Vec<(&str, &str)>) {
    if is_initialized() {
        dispatch(decorate(LogEvent::warning(message), context));
    }
}

/// Used by `log_debug!`
pub fn log_debug_with_context(message: &str, context: Vec<(&str, &str)>) {
    if is_initialized() {
        dispatch(decorate(LogEvent::debug(message), context));
    }
}

/// Safe critical error logging; always reaches stderr
pub fn safe_log_critical(code: Code, message: &str) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(LogEvent::error(code, message));
    }
    eprintln!("CRITICAL ERROR [{}]: {}", code.as_str(), message);
}

/// Get system diagnostics
pub fn get_system_diagnostics() -> String {
    let mut diagnostics = String::new();

    diagnostics.push_str("=== Logging System Diagnostics ===\n");
    diagnostics.push_str(&format!("Initialized: {}\n", is_initialized()));
    diagnostics.push_str(&format!(
        "Configuration: {}\n\n",
        crate::config::build_info::source_info()
    ));
    diagnostics.push_str(&config::get_config_summary());

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_context_management() {
        assert!(get_current_expression_context().is_none());

        set_expression_context(7, "{host:key.last(0)}=0");
        let context = get_current_expression_context().unwrap();
        assert_eq!(context.expression_id, 7);
        assert_eq!(context.expression, "{host:key.last(0)}=0");

        clear_expression_context();
        assert!(get_current_expression_context().is_none());
    }

    #[test]
    fn test_with_expression_context() {
        let result = with_expression_context(3, "1=1", || {
            let context = get_current_expression_context();
            assert_eq!(context.map(|c| c.expression_id), Some(3));
            42
        });

        assert_eq!(result, 42);
        assert!(get_current_expression_context().is_none());
    }

    #[test]
    fn test_decorate_adds_expression_context() {
        let event = with_expression_context(9, "{a:b.last(0)}", || {
            decorate(LogEvent::info("scan"), vec![("stage", "scanner")])
        });

        assert_eq!(event.context.get("stage").map(String::as_str), Some("scanner"));
        assert_eq!(event.context.get("expression_id").map(String::as_str), Some("9"));
    }

    #[test]
    fn test_diagnostics() {
        let diagnostics = get_system_diagnostics();
        assert!(diagnostics.contains("Logging System Diagnostics"));
        assert!(diagnostics.contains("Initialized:"));
    }
}
