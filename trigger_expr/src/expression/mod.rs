//! Trigger expression parser
//!
//! `parse` checks one expression in a single left-to-right scan followed
//! by a validation pass, and returns either every reference it contains or
//! the first problem found.
//!
//! ```text
//! {Zabbix server:agent.ping.last(0)}=0
//!  \___________/ \________/ \__/ |
//!      host         item    func params
//! ```

pub mod arguments;
pub mod builder;
pub mod error;
pub mod reference;
pub mod scanner;
pub mod validator;

pub use error::{ErrorCategory, ExpressionError, ExpressionErrorKind};
pub use reference::{ExpressionReference, FunctionReference, ParsedExpression, ScanMetrics};
pub use scanner::LINKAGE_SYMBOLS;
pub use validator::PLACEHOLDER;

use crate::catalog::{DefaultCatalog, ExpressionCatalog};
use crate::config::compile_time::expression::{
    MAX_EXPRESSION_LENGTH, MAX_PARAMETERS, MAX_REFERENCES,
};
use crate::config::ParserPreferences;
use crate::logging::codes;
use scanner::ScanLimits;
use std::sync::{Arc, OnceLock};

/// Reusable parser bound to a catalog. Cloning is cheap: the catalog is
/// shared and every call to `parse` keeps its state local.
#[derive(Clone)]
pub struct ExpressionParser {
    catalog: Arc<dyn ExpressionCatalog>,
    preferences: ParserPreferences,
}

impl ExpressionParser {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(DefaultCatalog::default()),
            preferences: ParserPreferences::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ExpressionCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_preferences(mut self, preferences: ParserPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn catalog(&self) -> &dyn ExpressionCatalog {
        self.catalog.as_ref()
    }

    pub fn preferences(&self) -> &ParserPreferences {
        &self.preferences
    }

    /// Surrounding whitespace is trimmed first; spans and error offsets
    /// count from the trimmed text.
    pub fn parse(&self, expression: &str) -> Result<ParsedExpression, ExpressionError> {
        match self.parse_inner(expression.trim()) {
            Ok(parsed) => {
                crate::log_success!(
                    codes::success::EXPRESSION_ACCEPTED,
                    "Expression accepted",
                    "references" => parsed.references.len(),
                    "hosts" => parsed.hosts.len()
                );
                Ok(parsed)
            }
            Err(error) => {
                crate::log_error!(
                    error.error_code(),
                    &error.message(),
                    "offset" => error.offset,
                    "category" => error.category().as_str()
                );
                Err(error)
            }
        }
    }

    fn parse_inner(&self, expression: &str) -> Result<ParsedExpression, ExpressionError> {
        if expression.is_empty() {
            return Err(ExpressionError::whole(
                ExpressionErrorKind::EmptyExpression,
                expression,
            ));
        }

        let length = expression.chars().count();
        if self.preferences.enforce_length_limit && length > MAX_EXPRESSION_LENGTH {
            return Err(ExpressionError::whole(
                ExpressionErrorKind::ExpressionTooLong {
                    length,
                    max: MAX_EXPRESSION_LENGTH,
                },
                expression,
            ));
        }

        let limits = ScanLimits {
            max_references: MAX_REFERENCES,
            max_parameters: MAX_PARAMETERS,
            log_references: self.preferences.log_references,
        };
        let output = scanner::scan(expression, &limits)?;
        let mut parsed = validator::validate(expression, output, self.catalog.as_ref())?;

        if !self.preferences.collect_metrics {
            parsed.metrics = ScanMetrics::default();
        }
        Ok(parsed)
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExpressionParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionParser")
            .field("functions", &self.catalog.allowed_functions().len())
            .field("preferences", &self.preferences)
            .finish()
    }
}

/// Parse with the stock catalog
pub fn parse(expression: &str) -> Result<ParsedExpression, ExpressionError> {
    static PARSER: OnceLock<ExpressionParser> = OnceLock::new();
    PARSER.get_or_init(ExpressionParser::new).parse(expression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArgKind, ArgSpec, FunctionSpec, FunctionTable, ValueType};
    use assert_matches::assert_matches;

    fn kind_of(expression: &str) -> ExpressionErrorKind {
        parse(expression).unwrap_err().kind
    }

    #[test]
    fn test_single_reference() {
        let parsed = parse("{Zabbix server:agent.ping.last(0)}=0").unwrap();

        assert_eq!(parsed.references.len(), 1);
        let function = parsed.function_references().next().unwrap();
        assert_eq!(function.host, "Zabbix server");
        assert_eq!(function.item, "agent.ping");
        assert_eq!(function.function_name, "last");
        assert_eq!(function.function_params, vec!["0"]);
        assert_eq!(parsed.hosts, vec!["Zabbix server"]);
        assert_eq!(parsed.functions, vec!["last"]);
        assert_eq!(parsed.function_params, vec!["0"]);
        assert_eq!(parsed.simplified, "{expression}={expression}");
    }

    #[test]
    fn test_empty_expression() {
        let err = parse("").unwrap_err();
        assert_eq!(err.kind, ExpressionErrorKind::EmptyExpression);
        assert_eq!(err.message(), "Empty expression.");
        assert_eq!(kind_of("   "), ExpressionErrorKind::EmptyExpression);
    }

    #[test]
    fn test_adjacent_references() {
        assert_eq!(
            kind_of("{host:item.last(0)}{host:item.last(0)}"),
            ExpressionErrorKind::AdjacentValues
        );
        assert_eq!(
            kind_of("{host:key.diff()}=0 0"),
            ExpressionErrorKind::AdjacentValues
        );
    }

    #[test]
    fn test_macro_only_expression() {
        let err = parse("{$MY.MACRO}").unwrap_err();
        assert_eq!(err.kind, ExpressionErrorKind::NoHostItemReference);
        assert!(err.message().contains("must contain at least one host:key reference"));
    }

    #[test]
    fn test_arithmetic_with_parentheses() {
        let parsed = parse("(1+{host:item.last(0)})*2>10").unwrap();
        assert_eq!(parsed.hosts, vec!["host"]);
        assert_eq!(
            parsed.simplified,
            "({expression}+{expression})*{expression}>{expression}"
        );
        assert_eq!(parsed.metrics.total_linkage_symbols(), 3);
    }

    #[test]
    fn test_unquoted_function_parameters() {
        let parsed = parse("{host:item.count(#3,>5)}=1").unwrap();
        let function = parsed.function_references().next().unwrap();
        assert_eq!(function.function_params, vec!["#3", ">5"]);
        assert_eq!(parsed.function_params, vec!["#3,>5"]);
    }

    #[test]
    fn test_linkage_symbol_inside_quotes_is_not_counted() {
        let parsed = parse(r#"{host:key.str("a+b")}=0"#).unwrap();
        assert_eq!(parsed.function_params, vec![r#""a+b""#]);
        assert_eq!(parsed.metrics.linkage_counts.get(&'+'), None);
    }

    #[test]
    fn test_illegal_linkage_sequence_context() {
        let err = parse("{host:key.diff()}&+{TRIGGER.VALUE}").unwrap_err();
        assert_matches!(err.kind, ExpressionErrorKind::IllegalLinkageSequence { .. });
        assert_eq!(err.offset, 17);
        assert_eq!(
            err.messages(),
            vec![
                "Incorrect usage of linking symbols '&+' in trigger expression.".to_string(),
                "Check expression part starting from \"&+{TRIGGER.VALUE}\".".to_string(),
            ]
        );
    }

    #[test]
    fn test_unary_minus() {
        assert!(parse("{host:key.diff()}&-{TRIGGER.VALUE}").is_ok());
        assert!(parse("(-5)={host:key.diff()}").is_ok());
        assert!(parse("{host:key.last(0)}>-1").is_ok());
    }

    #[test]
    fn test_nested_item_key_parameters() {
        let parsed = parse(r#"{host:key[a,,"b",,[c,d,,"e",],,[f]].count(1,,"b",3)}=0"#).unwrap();
        let function = parsed.function_references().next().unwrap();
        assert_eq!(function.item, r#"key[a,,"b",,[c,d,,"e",],,[f]]"#);
        assert_eq!(function.function_params, vec!["1", "", "b", "3"]);
        assert_eq!(parsed.metrics.max_item_param_depth, 2);
    }

    #[test]
    fn test_suffixed_numbers() {
        assert!(parse("{host:key.avg(5m)}>1.5K").is_ok());
        assert_eq!(
            kind_of("(({host:key.diff()}) * 1w) / 1Ks"),
            ExpressionErrorKind::LinkageSymbols
        );
        assert!(parse("(({host:key.diff()}) * 1w) / 1K").is_ok());
    }

    #[test]
    fn test_numbers_need_a_leading_digit() {
        for expression in [
            "(({host:key.last(0)}+.1))",
            "({host:key.last(0)}+.1)/({host:key.last(0)}+1)",
            "{host:key.last(0)}>.5K",
        ] {
            assert_eq!(kind_of(expression), ExpressionErrorKind::LinkageSymbols);
        }
        assert!(parse("(({host:key.last(0)}+0.1))").is_ok());
    }

    #[test]
    fn test_nested_reference_is_rejected() {
        assert_eq!(
            kind_of(r#"{host:key[].count(1,{host:key.last(0)},"{host:key.last(0)}")}=0"#),
            ExpressionErrorKind::FunctionParameterSyntax
        );
        assert!(parse("{host:key.count(1,{$VALUE})}>0").is_ok());
    }

    #[test]
    fn test_offsets_count_from_trimmed_text() {
        let parsed = parse("  {host:key.last(0)}=0").unwrap();
        assert_eq!(parsed.references[0].as_function().unwrap().span.start.index, 0);

        let err = parse("  {host:key.last(0)}=+0").unwrap_err();
        assert_eq!(err.offset, 18);
    }

    #[test]
    fn test_misplaced_parentheses() {
        assert_eq!(
            kind_of("({host:key.diff()}=0"),
            ExpressionErrorKind::UnbalancedParentheses
        );
        assert_eq!(
            kind_of("0={host:key.diff()}()"),
            ExpressionErrorKind::LinkageSymbols
        );
        assert_eq!(
            kind_of("{host:key.diff()}=0)"),
            ExpressionErrorKind::IncorrectClosingParenthesis
        );
    }

    #[test]
    fn test_unicode_parameters() {
        let parsed = parse("{host:key.str(ГУГЛ)}=0").unwrap();
        assert_eq!(parsed.function_params, vec!["ГУГЛ"]);

        let err = parse("{host:key[ГУГЛ].last(0)}=+1").unwrap_err();
        assert_eq!(err.offset, 24);
        assert_eq!(err.context, "=+1");
    }

    #[test]
    fn test_reference_errors() {
        assert_eq!(kind_of("{:key.diff()}"), ExpressionErrorKind::EmptyHost);
        assert_matches!(
            kind_of("{host:key.()}"),
            ExpressionErrorKind::UnknownFunction { .. }
        );
        assert_matches!(
            kind_of("{host:key.diff())}"),
            ExpressionErrorKind::UnexpectedFunctionSymbol { symbol: ')' }
        );
        assert_matches!(
            kind_of("{host:key.unknown(0)}=0"),
            ExpressionErrorKind::UnknownFunction { name } if name == "unknown"
        );
    }

    #[test]
    fn test_argument_errors() {
        assert_matches!(
            kind_of("{host:key.last(1,2,3)}=0"),
            ExpressionErrorKind::ArgumentCount { .. }
        );
        assert_matches!(
            kind_of("{host:key.nodata(abc)}=0"),
            ExpressionErrorKind::ArgumentType { .. }
        );
        assert!(parse("{host:key.last({$PERIOD})}=0").is_ok());
    }

    #[test]
    fn test_word_operators_are_rejected() {
        assert!(parse("{host:key.last(0)}=0 and {host:key.last(0)}=1").is_err());
    }

    #[test]
    fn test_token_round_trip() {
        let expression = "{host:key[a].count(#3, \"x\")}>1 | {other:k.last(0)}<2";
        let parsed = parse(expression).unwrap();

        for function in parsed.function_references() {
            let start = function.span.start.offset;
            let end = function.span.end.offset;
            assert_eq!(function.reassemble(), &expression[start..end]);
        }
    }

    #[test]
    fn test_parsing_is_repeatable() {
        let expression = "{host:item.count(#3,>5)}=1";
        assert_eq!(parse(expression), parse(expression));
    }

    #[test]
    fn test_length_limit() {
        let long = format!("{{host:key.last(0)}}={}", "1".repeat(MAX_EXPRESSION_LENGTH));
        assert_matches!(
            kind_of(&long),
            ExpressionErrorKind::ExpressionTooLong { .. }
        );

        let parser = ExpressionParser::new().with_preferences(ParserPreferences {
            enforce_length_limit: false,
            log_references: false,
            collect_metrics: false,
        });
        let parsed = parser.parse(&long).unwrap();
        assert_eq!(parsed.metrics, ScanMetrics::default());
    }

    #[test]
    fn test_custom_catalog() {
        let mut functions = FunctionTable::new();
        functions.insert(
            "band",
            FunctionSpec::new(
                &[ValueType::Unsigned],
                &[ArgSpec::mandatory(ArgKind::SecNum), ArgSpec::mandatory(ArgKind::Num)],
            ),
        );
        let parser = ExpressionParser::new()
            .with_catalog(Arc::new(DefaultCatalog::with_functions(functions)));

        assert!(parser.parse("{host:key.band(#1,12)}=0").is_ok());
        assert_matches!(
            parser.parse("{host:key.last(0)}=0").unwrap_err().kind,
            ExpressionErrorKind::UnknownFunction { .. }
        );
    }

    #[test]
    fn test_parser_is_shareable_across_threads() {
        let parser = ExpressionParser::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let parser = parser.clone();
                std::thread::spawn(move || {
                    parser
                        .parse(&format!("{{host:key.last(0)}}>{}", i))
                        .is_ok()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
