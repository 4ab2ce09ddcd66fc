//! Expression rejection reasons

use crate::logging::codes::{self, Code};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    Structural,
    Semantic,
    Aggregate,
    Limit,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Structural => "Structural",
            ErrorCategory::Semantic => "Semantic",
            ErrorCategory::Aggregate => "Aggregate",
            ErrorCategory::Limit => "Limit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionErrorKind {
    // Structural
    #[error("Empty expression.")]
    EmptyExpression,

    #[error("Incorrect trigger expression: expression cannot start with '{symbol}'.")]
    InvalidStart { symbol: char },

    #[error("Incorrect closing parenthesis in trigger expression.")]
    IncorrectClosingParenthesis,

    #[error("Incorrect closing curly brace in trigger expression.")]
    IncorrectClosingBrace,

    #[error("Incorrect opening curly brace inside a trigger expression reference.")]
    UnexpectedOpeningBrace,

    #[error("Unexpected symbol '{symbol}' in trigger expression.")]
    UnexpectedSymbol { symbol: char },

    #[error("Unexpected symbol '{symbol}' after trigger function.")]
    UnexpectedFunctionSymbol { symbol: char },

    #[error("Incorrect usage of linking symbols '{previous}{symbol}' in trigger expression.")]
    IllegalLinkageSequence { previous: char, symbol: char },

    #[error("Incorrect usage of quotes in trigger expression.")]
    IllegalQuote,

    #[error("Incorrect item parameters syntax.")]
    ItemParameterSyntax,

    #[error("Incorrect trigger function parameters syntax.")]
    FunctionParameterSyntax,

    #[error("Incorrect count of quotes in trigger expression.")]
    UnbalancedQuotes,

    #[error("Incorrect parenthesis count in trigger expression.")]
    UnbalancedParentheses,

    #[error("Incorrect curly braces count in trigger expression.")]
    UnbalancedBraces,

    // Semantic
    #[error("Incorrect macro \"{name}\" is used in expression.")]
    IncorrectMacro { name: String },

    #[error("Incorrect user macro format \"{name}\" is used in expression.")]
    IncorrectUserMacro { name: String },

    #[error("Empty host name provided in expression.")]
    EmptyHost,

    #[error("Incorrect host name \"{host}\" provided in expression.")]
    IncorrectHost { host: String },

    #[error("Empty item key provided for host \"{host}\".")]
    EmptyItemKey { host: String },

    #[error("Incorrect item key \"{key}\" provided for trigger expression: {reason}.")]
    IncorrectItemKey { key: String, reason: String },

    #[error("Unknown trigger function \"{name}\".")]
    UnknownFunction { name: String },

    #[error("Incorrect trigger function \"{function}\" provided in expression.")]
    IncorrectFunctionFormat { function: String },

    #[error("Incorrect number of arguments for trigger function \"{function}\".")]
    ArgumentCount { function: String },

    #[error("Incorrect type of arguments for trigger function \"{function}\": \"{argument}\" is not a valid {expected}.")]
    ArgumentType {
        function: String,
        argument: String,
        expected: &'static str,
    },

    #[error("Incorrect trigger expression: values must be separated by a linking symbol.")]
    AdjacentValues,

    #[error("Incorrect usage of expression logic linking symbols.")]
    LinkageSymbols,

    // Aggregate
    #[error("Trigger expression must contain at least one host:key reference.")]
    NoHostItemReference,

    // Limits
    #[error("Trigger expression is too long: {length} characters (max: {max}).")]
    ExpressionTooLong { length: usize, max: usize },

    #[error("Trigger expression has too many references: more than {max}.")]
    TooManyReferences { max: usize },
}

impl ExpressionErrorKind {
    pub fn category(&self) -> ErrorCategory {
        use ExpressionErrorKind::*;

        match self {
            EmptyExpression
            | InvalidStart { .. }
            | IncorrectClosingParenthesis
            | IncorrectClosingBrace
            | UnexpectedOpeningBrace
            | UnexpectedSymbol { .. }
            | UnexpectedFunctionSymbol { .. }
            | IllegalLinkageSequence { .. }
            | IllegalQuote
            | ItemParameterSyntax
            | FunctionParameterSyntax
            | UnbalancedQuotes
            | UnbalancedParentheses
            | UnbalancedBraces => ErrorCategory::Structural,
            IncorrectMacro { .. }
            | IncorrectUserMacro { .. }
            | EmptyHost
            | IncorrectHost { .. }
            | EmptyItemKey { .. }
            | IncorrectItemKey { .. }
            | UnknownFunction { .. }
            | IncorrectFunctionFormat { .. }
            | ArgumentCount { .. }
            | ArgumentType { .. }
            | AdjacentValues
            | LinkageSymbols => ErrorCategory::Semantic,
            NoHostItemReference => ErrorCategory::Aggregate,
            ExpressionTooLong { .. } | TooManyReferences { .. } => ErrorCategory::Limit,
        }
    }

    pub fn error_code(&self) -> Code {
        use ExpressionErrorKind::*;

        match self {
            EmptyExpression => codes::structural::EMPTY_EXPRESSION,
            InvalidStart { .. } => codes::structural::INVALID_START,
            IncorrectClosingParenthesis => codes::structural::INCORRECT_CLOSING_PARENTHESIS,
            IncorrectClosingBrace => codes::structural::INCORRECT_CLOSING_BRACE,
            UnexpectedOpeningBrace => codes::structural::UNEXPECTED_OPENING_BRACE,
            UnexpectedSymbol { .. } => codes::structural::UNEXPECTED_SYMBOL,
            UnexpectedFunctionSymbol { .. } => codes::structural::UNEXPECTED_FUNCTION_SYMBOL,
            IllegalLinkageSequence { .. } => codes::structural::ILLEGAL_LINKAGE_SEQUENCE,
            IllegalQuote => codes::structural::ILLEGAL_QUOTE,
            ItemParameterSyntax => codes::structural::ITEM_PARAMETER_SYNTAX,
            FunctionParameterSyntax => codes::structural::FUNCTION_PARAMETER_SYNTAX,
            UnbalancedQuotes => codes::structural::UNBALANCED_QUOTES,
            UnbalancedParentheses => codes::structural::UNBALANCED_PARENTHESES,
            UnbalancedBraces => codes::structural::UNBALANCED_BRACES,
            IncorrectMacro { .. } => codes::semantic::INCORRECT_MACRO,
            IncorrectUserMacro { .. } => codes::semantic::INCORRECT_USER_MACRO,
            EmptyHost => codes::semantic::EMPTY_HOST,
            IncorrectHost { .. } => codes::semantic::INCORRECT_HOST,
            EmptyItemKey { .. } => codes::semantic::EMPTY_ITEM_KEY,
            IncorrectItemKey { .. } => codes::semantic::INCORRECT_ITEM_KEY,
            UnknownFunction { .. } => codes::semantic::UNKNOWN_FUNCTION,
            IncorrectFunctionFormat { .. } => codes::semantic::INCORRECT_FUNCTION_FORMAT,
            ArgumentCount { .. } => codes::semantic::ARGUMENT_COUNT,
            ArgumentType { .. } => codes::semantic::ARGUMENT_TYPE,
            AdjacentValues => codes::semantic::ADJACENT_VALUES,
            LinkageSymbols => codes::semantic::LINKAGE_SYMBOLS,
            NoHostItemReference => codes::aggregate::NO_HOST_ITEM_REFERENCE,
            ExpressionTooLong { .. } => codes::limits::EXPRESSION_TOO_LONG,
            TooManyReferences { .. } => codes::limits::TOO_MANY_REFERENCES,
        }
    }
}

/// A rejected expression: the first problem found plus where to look.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct ExpressionError {
    pub kind: ExpressionErrorKind,
    /// Character index the context starts at, in the trimmed expression
    pub offset: usize,
    /// Expression text from `offset` to the end
    pub context: String,
}

impl ExpressionError {
    /// Anchor `kind` one character before `failed_at` (a character index)
    pub fn at(kind: ExpressionErrorKind, expression: &str, failed_at: usize) -> Self {
        let offset = failed_at.saturating_sub(1);
        Self {
            kind,
            offset,
            context: expression.chars().skip(offset).collect(),
        }
    }

    /// Error covering the whole expression
    pub fn whole(kind: ExpressionErrorKind, expression: &str) -> Self {
        Self {
            kind,
            offset: 0,
            context: expression.to_string(),
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn context_line(&self) -> String {
        format!("Check expression part starting from \"{}\".", self.context)
    }

    /// The two user-facing lines: the problem and where to look
    pub fn messages(&self) -> Vec<String> {
        vec![self.message(), self.context_line()]
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn error_code(&self) -> Code {
        self.kind.error_code()
    }
}
