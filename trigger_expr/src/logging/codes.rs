//! Error and success codes with their classification metadata
//!
//! Single source of truth for every code the parser, catalog and batch
//! layers emit. Constants are grouped by concern; the registry below maps
//! each code to its category, severity and recommended action.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// Errors raised while scanning characters or checking balance
pub mod structural {
    use super::Code;

    pub const EMPTY_EXPRESSION: Code = Code::new("E101");
    pub const INVALID_START: Code = Code::new("E102");
    pub const INCORRECT_CLOSING_PARENTHESIS: Code = Code::new("E103");
    pub const INCORRECT_CLOSING_BRACE: Code = Code::new("E104");
    pub const UNEXPECTED_OPENING_BRACE: Code = Code::new("E105");
    pub const UNEXPECTED_SYMBOL: Code = Code::new("E106");
    pub const UNEXPECTED_FUNCTION_SYMBOL: Code = Code::new("E107");
    pub const ILLEGAL_LINKAGE_SEQUENCE: Code = Code::new("E108");
    pub const ILLEGAL_QUOTE: Code = Code::new("E109");
    pub const ITEM_PARAMETER_SYNTAX: Code = Code::new("E110");
    pub const FUNCTION_PARAMETER_SYNTAX: Code = Code::new("E111");
    pub const UNBALANCED_QUOTES: Code = Code::new("E112");
    pub const UNBALANCED_PARENTHESES: Code = Code::new("E113");
    pub const UNBALANCED_BRACES: Code = Code::new("E114");
}

/// Errors raised while validating individual references and the expression shape
pub mod semantic {
    use super::Code;

    pub const INCORRECT_MACRO: Code = Code::new("E201");
    pub const INCORRECT_USER_MACRO: Code = Code::new("E202");
    pub const EMPTY_HOST: Code = Code::new("E203");
    pub const INCORRECT_HOST: Code = Code::new("E204");
    pub const EMPTY_ITEM_KEY: Code = Code::new("E205");
    pub const INCORRECT_ITEM_KEY: Code = Code::new("E206");
    pub const UNKNOWN_FUNCTION: Code = Code::new("E207");
    pub const INCORRECT_FUNCTION_FORMAT: Code = Code::new("E208");
    pub const ARGUMENT_COUNT: Code = Code::new("E209");
    pub const ARGUMENT_TYPE: Code = Code::new("E210");
    pub const ADJACENT_VALUES: Code = Code::new("E211");
    pub const LINKAGE_SYMBOLS: Code = Code::new("E212");
}

/// Whole-expression errors
pub mod aggregate {
    use super::Code;

    pub const NO_HOST_ITEM_REFERENCE: Code = Code::new("E301");
}

/// Compile-time limit violations
pub mod limits {
    use super::Code;

    pub const EXPRESSION_TOO_LONG: Code = Code::new("E401");
    pub const TOO_MANY_REFERENCES: Code = Code::new("E402");
}

/// Function catalog errors
pub mod catalog {
    use super::Code;

    pub const CATALOG_LOAD_ERROR: Code = Code::new("E450");
}

/// Batch validation errors
pub mod batch {
    use super::Code;

    pub const INPUT_READ_ERROR: Code = Code::new("E501");
    pub const EMPTY_BATCH: Code = Code::new("E502");
    pub const BATCH_TOO_LARGE: Code = Code::new("E503");
    pub const WORKER_FAILURE: Code = Code::new("E504");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const OPERATION_COMPLETED_SUCCESSFULLY: Code = Code::new("I001");
    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");
    pub const EXPRESSION_ACCEPTED: Code = Code::new("I010");
    pub const CATALOG_LOADED: Code = Code::new("I020");
    pub const BATCH_COMPLETED: Code = Code::new("I030");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

type RegistryRow = (
    &'static str,
    &'static str,
    Severity,
    bool,
    &'static str,
    &'static str,
);

#[rustfmt::skip]
const REGISTRY_ROWS: &[RegistryRow] = &[
    ("ERR001", "System", Severity::Critical, false,
        "Critical internal error", "File a bug report with the failing expression"),
    ("ERR002", "System", Severity::Critical, false,
        "System initialization failure", "Check configuration and environment variables"),

    ("E101", "Structural", Severity::Medium, true,
        "Expression is empty", "Provide a non-empty trigger expression"),
    ("E102", "Structural", Severity::Medium, true,
        "Expression starts with an invalid character", "Start the expression with '(', '{' or a digit"),
    ("E103", "Structural", Severity::Medium, true,
        "Closing parenthesis without a matching opening one", "Remove the extra ')' or add the missing '('"),
    ("E104", "Structural", Severity::Medium, true,
        "Closing curly brace without a matching opening one", "Remove the extra '}' or add the missing '{'"),
    ("E105", "Structural", Severity::Medium, true,
        "Curly brace opened inside a reference", "Close the current reference before opening another"),
    ("E106", "Structural", Severity::Medium, true,
        "Symbol not allowed at this position", "Remove the symbol or move it into item parameters"),
    ("E107", "Structural", Severity::Medium, true,
        "Text between a trigger function and the closing curly brace", "Close the reference right after the function call"),
    ("E108", "Structural", Severity::Medium, true,
        "Two linking symbols in a row", "Put an operand between the linking symbols"),
    ("E109", "Structural", Severity::Medium, true,
        "Quote outside a parameter list", "Use quotes only inside item or function parameters"),
    ("E110", "Structural", Severity::Medium, true,
        "Malformed item key parameters", "Check commas, quotes and square brackets in the item key"),
    ("E111", "Structural", Severity::Medium, true,
        "Malformed trigger function parameters", "Check commas, quotes and parentheses in the function call"),
    ("E112", "Structural", Severity::Medium, true,
        "Odd number of quotes", "Close every quoted parameter"),
    ("E113", "Structural", Severity::Medium, true,
        "Parentheses are not balanced", "Match every '(' with a ')'"),
    ("E114", "Structural", Severity::Medium, true,
        "Curly braces are not balanced", "Match every '{' with a '}'"),

    ("E201", "Semantic", Severity::Medium, true,
        "Unknown or malformed macro", "Use a supported macro such as {TRIGGER.VALUE}"),
    ("E202", "Semantic", Severity::Medium, true,
        "Malformed user macro", "User macros look like {$NAME} with upper-case letters, digits, '.' and '_'"),
    ("E203", "Semantic", Severity::Medium, true,
        "Host name is empty", "Prefix the item key with a host name and ':'"),
    ("E204", "Semantic", Severity::Medium, true,
        "Host name has invalid characters", "Use letters, digits, spaces, '.', '_' and '-' in host names"),
    ("E205", "Semantic", Severity::Medium, true,
        "Item key is empty", "Provide an item key between ':' and the function"),
    ("E206", "Semantic", Severity::Medium, true,
        "Item key is malformed", "Fix the item key according to the reported reason"),
    ("E207", "Semantic", Severity::Medium, true,
        "Trigger function is not supported", "Use one of the supported trigger functions"),
    ("E208", "Semantic", Severity::Medium, true,
        "Trigger function call is malformed", "Write the function name in lower case followed by its parameters"),
    ("E209", "Semantic", Severity::Medium, true,
        "Wrong number of function arguments", "Supply every mandatory argument and no extra ones"),
    ("E210", "Semantic", Severity::Medium, true,
        "Function argument has the wrong type", "Use a time period, a #count or a number as the function requires"),
    ("E211", "Semantic", Severity::Medium, true,
        "Two values without an operator between them", "Join the values with a linking symbol"),
    ("E212", "Semantic", Severity::Medium, true,
        "Linking symbols do not join the values correctly", "Use exactly one linking symbol between neighbouring values"),

    ("E301", "Aggregate", Severity::Medium, true,
        "Expression has no host:key reference", "Add at least one {host:key.function()} reference"),

    ("E401", "Limits", Severity::High, true,
        "Expression exceeds the maximum length", "Shorten the expression or rebuild with a larger limit"),
    ("E402", "Limits", Severity::High, true,
        "Expression has too many references", "Split the trigger or rebuild with a larger limit"),

    ("E450", "Catalog", Severity::High, false,
        "Function catalog could not be loaded", "Fix the catalog TOML and retry"),

    ("E501", "Batch", Severity::Medium, false,
        "Expression list could not be read", "Check the input path and permissions"),
    ("E502", "Batch", Severity::Low, true,
        "No expressions to validate", "Provide at least one expression"),
    ("E503", "Batch", Severity::Medium, false,
        "Too many expressions in one batch", "Split the input into smaller batches"),
    ("E504", "Batch", Severity::High, false,
        "Validation worker failed", "Retry with --threads 1 and report the failing input"),

    ("I001", "Success", Severity::Low, true,
        "Operation completed successfully", "No action required"),
    ("I004", "Success", Severity::Low, true,
        "System initialization completed", "No action required"),
    ("I010", "Success", Severity::Low, true,
        "Trigger expression accepted", "No action required"),
    ("I020", "Success", Severity::Low, true,
        "Function catalog loaded", "No action required"),
    ("I030", "Success", Severity::Low, true,
        "Batch validation completed", "Review failed expressions, if any"),
];

/// Error metadata registry using OnceLock for thread safety
static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        REGISTRY_ROWS
            .iter()
            .map(
                |&(code, category, severity, recoverable, description, recommended_action)| {
                    (
                        code,
                        ErrorMetadata {
                            code,
                            category,
                            severity,
                            recoverable,
                            description,
                            recommended_action,
                        },
                    )
                },
            )
            .collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get metadata for a specific code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get severity from code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Check if error is recoverable
pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

/// Get human-readable description for code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

/// Get recommended action for code
pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

/// Get category from code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_constant_has_metadata() {
        let codes = [
            system::INTERNAL_ERROR,
            structural::EMPTY_EXPRESSION,
            structural::UNBALANCED_BRACES,
            semantic::INCORRECT_ITEM_KEY,
            semantic::LINKAGE_SYMBOLS,
            aggregate::NO_HOST_ITEM_REFERENCE,
            limits::TOO_MANY_REFERENCES,
            catalog::CATALOG_LOAD_ERROR,
            batch::WORKER_FAILURE,
            success::EXPRESSION_ACCEPTED,
        ];

        for code in codes {
            assert!(
                get_error_metadata(code.as_str()).is_some(),
                "missing metadata for {}",
                code
            );
        }
    }

    #[test]
    fn test_registry_has_no_duplicate_rows() {
        assert_eq!(get_error_registry().len(), REGISTRY_ROWS.len());
    }

    #[test]
    fn test_classification_lookups() {
        assert_eq!(get_category("E103"), "Structural");
        assert_eq!(get_category("E206"), "Semantic");
        assert_eq!(get_severity("ERR001"), Severity::Critical);
        assert!(!is_recoverable("E504"));
        assert_eq!(get_description("E999"), "Unknown error");
        assert_eq!(get_action("E999"), "No specific action available");
    }
}
