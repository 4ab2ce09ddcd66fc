//! Parsed references and the overall parse result

use crate::utils::Span;
use serde::Serialize;
use std::collections::BTreeMap;

/// A `{host:item.function(params)}` reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionReference {
    /// The whole reference including braces
    pub expression: String,
    pub host: String,
    /// Item key including any bracketed parameters
    pub item: String,
    /// Top-level item key parameters, quotes removed
    pub item_params: Vec<String>,
    /// Function call text, e.g. `last(0)`
    pub function: String,
    pub function_name: String,
    /// Function parameters, quotes removed
    pub function_params: Vec<String>,
    /// Text between the function parentheses, verbatim
    pub raw_params: String,
    /// Position of the reference, `{` through `}`, in the trimmed expression
    pub span: Span,
}

impl FunctionReference {
    /// Rebuild the reference text from its parts
    pub fn reassemble(&self) -> String {
        format!(
            "{{{}:{}.{}({})}}",
            self.host, self.item, self.function_name, self.raw_params
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpressionReference {
    HostItemFunction(FunctionReference),
    /// Built-in macro such as `{TRIGGER.VALUE}`
    Macro { expression: String, name: String },
    /// User macro such as `{$THRESHOLD}`
    UserMacro { expression: String, name: String },
}

impl ExpressionReference {
    /// The literal reference text, braces included
    pub fn expression(&self) -> &str {
        match self {
            ExpressionReference::HostItemFunction(function) => &function.expression,
            ExpressionReference::Macro { expression, .. }
            | ExpressionReference::UserMacro { expression, .. } => expression,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ExpressionReference::HostItemFunction(_) => "host_item_function",
            ExpressionReference::Macro { .. } => "macro",
            ExpressionReference::UserMacro { .. } => "user_macro",
        }
    }

    pub fn as_function(&self) -> Option<&FunctionReference> {
        match self {
            ExpressionReference::HostItemFunction(function) => Some(function),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanMetrics {
    pub characters: usize,
    pub function_references: usize,
    pub macros: usize,
    pub user_macros: usize,
    /// Top-level linking symbols by symbol
    pub linkage_counts: BTreeMap<char, u32>,
    pub max_item_param_depth: usize,
    pub quoted_params: usize,
}

impl ScanMetrics {
    pub fn total_references(&self) -> usize {
        self.function_references + self.macros + self.user_macros
    }

    pub fn total_linkage_symbols(&self) -> u32 {
        self.linkage_counts.values().sum()
    }
}

/// A validated expression and everything extracted from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedExpression {
    pub expression: String,
    pub references: Vec<ExpressionReference>,
    pub hosts: Vec<String>,
    pub items: Vec<String>,
    /// Function names, one per function reference
    pub functions: Vec<String>,
    /// Raw parameter text, one per function reference
    pub function_params: Vec<String>,
    pub macros: Vec<String>,
    pub usermacros: Vec<String>,
    /// Expression with every reference and number replaced by `{expression}`
    pub simplified: String,
    pub metrics: ScanMetrics,
}

impl ParsedExpression {
    pub fn function_references(&self) -> impl Iterator<Item = &FunctionReference> {
        self.references.iter().filter_map(ExpressionReference::as_function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    fn sample() -> FunctionReference {
        FunctionReference {
            expression: "{host:key[a,\"b\"].count(#3,\">5\")}".to_string(),
            host: "host".to_string(),
            item: "key[a,\"b\"]".to_string(),
            item_params: vec!["a".to_string(), "b".to_string()],
            function: "count(#3,\">5\")".to_string(),
            function_name: "count".to_string(),
            function_params: vec!["#3".to_string(), ">5".to_string()],
            raw_params: "#3,\">5\"".to_string(),
            span: Span::new(Position::start(), Position::new(33, 33)),
        }
    }

    #[test]
    fn test_reassemble_matches_expression() {
        let reference = sample();
        assert_eq!(reference.reassemble(), reference.expression);
    }

    #[test]
    fn test_reference_accessors() {
        let function = ExpressionReference::HostItemFunction(sample());
        let user_macro = ExpressionReference::UserMacro {
            expression: "{$LIMIT}".to_string(),
            name: "{$LIMIT}".to_string(),
        };

        assert_eq!(function.kind_name(), "host_item_function");
        assert!(function.as_function().is_some());
        assert_eq!(user_macro.expression(), "{$LIMIT}");
        assert!(user_macro.as_function().is_none());
    }

    #[test]
    fn test_reference_serializes_with_type_tag() {
        let reference = ExpressionReference::Macro {
            expression: "{TRIGGER.VALUE}".to_string(),
            name: "{TRIGGER.VALUE}".to_string(),
        };
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["type"], "macro");
        assert_eq!(json["name"], "{TRIGGER.VALUE}");
    }

    #[test]
    fn test_metrics_totals() {
        let mut metrics = ScanMetrics {
            function_references: 2,
            macros: 1,
            ..Default::default()
        };
        metrics.linkage_counts.insert('=', 2);
        metrics.linkage_counts.insert('&', 1);

        assert_eq!(metrics.total_references(), 3);
        assert_eq!(metrics.total_linkage_symbols(), 3);
    }
}
