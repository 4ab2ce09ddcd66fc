//! Single-pass character scanner
//!
//! Walks the expression once, left to right, tracking the previous
//! characters, bracket counters and the reference being built. The first
//! structural problem stops the scan; semantic checks run afterwards on
//! the collected references.

use super::builder::{CurrentReference, Region};
use super::error::{ExpressionError, ExpressionErrorKind};
use super::reference::{ExpressionReference, ScanMetrics};
use crate::config::compile_time::expression::{MAX_PARAMETERS, MAX_REFERENCES};
use crate::utils::{Position, Span};
use std::collections::BTreeMap;

/// Symbols that link values at the top level of an expression
pub const LINKAGE_SYMBOLS: [char; 10] = ['+', '-', '*', '/', '#', '=', '<', '>', '&', '|'];

pub fn is_linkage_symbol(c: char) -> bool {
    LINKAGE_SYMBOLS.contains(&c)
}

/// Whether `rest` starts with a `{MACRO}` or `{$MACRO}` reference. Only
/// those may appear as brace text inside a parameter list.
fn opens_macro(rest: &str) -> bool {
    let Some(inner) = rest.strip_prefix('{') else {
        return false;
    };
    let (name, user) = match inner.strip_prefix('$') {
        Some(name) => (name, true),
        None => (inner, false),
    };
    let end = name
        .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '_'))
        .unwrap_or(name.len());
    let tail = &name[end..];
    end > 0 && (tail.starts_with('}') || (user && tail.starts_with(':')))
}

/// Limits applied while scanning
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    pub max_references: usize,
    pub max_parameters: usize,
    pub log_references: bool,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_references: MAX_REFERENCES,
            max_parameters: MAX_PARAMETERS,
            log_references: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketCounters {
    pub open_paren: u32,
    pub close_paren: u32,
    pub open_brace: u32,
    pub close_brace: u32,
    pub open_bracket: u32,
    pub close_bracket: u32,
    /// Every opening and closing quote
    pub quote_count: u32,
}

impl BracketCounters {
    fn close_paren(&mut self) -> Result<(), ExpressionErrorKind> {
        self.close_paren += 1;
        if self.close_paren > self.open_paren {
            return Err(ExpressionErrorKind::IncorrectClosingParenthesis);
        }
        Ok(())
    }

    fn close_brace(&mut self) -> Result<(), ExpressionErrorKind> {
        self.close_brace += 1;
        if self.close_brace > self.open_brace {
            return Err(ExpressionErrorKind::IncorrectClosingBrace);
        }
        Ok(())
    }

    /// Balance checks run after the last character, in this order
    pub fn check_balance(&self) -> Result<(), ExpressionErrorKind> {
        if self.quote_count % 2 != 0 {
            return Err(ExpressionErrorKind::UnbalancedQuotes);
        }
        if self.open_paren != self.close_paren {
            return Err(ExpressionErrorKind::UnbalancedParentheses);
        }
        if self.open_brace != self.close_brace {
            return Err(ExpressionErrorKind::UnbalancedBraces);
        }
        Ok(())
    }
}

/// Character history and counters
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    /// Length of the run of identical characters ending at `prev_char`
    pub sequence_count: u32,
    pub prev_char: Option<char>,
    pub prev_prev_char: Option<char>,
    pub prev_non_space: Option<char>,
    pub prev_prev_non_space: Option<char>,
    pub counters: BracketCounters,
    pub linkage_counts: BTreeMap<char, u32>,
}

impl ScanState {
    fn record(&mut self, c: char) {
        if self.prev_char == Some(c) {
            self.sequence_count += 1;
        } else {
            self.sequence_count = 1;
        }
        self.prev_prev_char = self.prev_char;
        self.prev_char = Some(c);

        if !c.is_whitespace() {
            self.prev_prev_non_space = self.prev_non_space;
            self.prev_non_space = Some(c);
        }
    }

    /// The next character is preceded by an odd run of backslashes
    fn follows_escape(&self) -> bool {
        self.prev_char == Some('\\') && self.sequence_count % 2 == 1
    }

    /// Two linking symbols may only touch when the second is a unary minus
    fn check_linkage(&self, c: char) -> Result<(), ExpressionErrorKind> {
        if let Some(previous) = self.prev_non_space {
            if is_linkage_symbol(previous) && !(c == '-' && previous != '-') {
                return Err(ExpressionErrorKind::IllegalLinkageSequence {
                    previous,
                    symbol: c,
                });
            }
        }
        Ok(())
    }
}

/// A reference together with where it sits in the expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedReference {
    pub reference: ExpressionReference,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub references: Vec<ScannedReference>,
    pub counters: BracketCounters,
    pub metrics: ScanMetrics,
}

/// Scan `expression` and collect its references.
pub fn scan(expression: &str, limits: &ScanLimits) -> Result<ScanOutput, ExpressionError> {
    Scanner::new(expression, *limits).run()
}

struct Scanner<'a> {
    expression: &'a str,
    limits: ScanLimits,
    state: ScanState,
    current: Option<CurrentReference>,
    references: Vec<ScannedReference>,
    metrics: ScanMetrics,
}

impl<'a> Scanner<'a> {
    fn new(expression: &'a str, limits: ScanLimits) -> Self {
        Self {
            expression,
            limits,
            state: ScanState::default(),
            current: None,
            references: Vec::new(),
            metrics: ScanMetrics::default(),
        }
    }

    fn run(mut self) -> Result<ScanOutput, ExpressionError> {
        let mut pos = Position::start();
        let mut started = false;
        let expression = self.expression;

        for c in expression.chars() {
            let index = pos.index;

            if !started && !c.is_whitespace() {
                started = true;
                if !(c == '(' || c == '{' || c.is_ascii_digit()) {
                    return Err(self.fail(ExpressionErrorKind::InvalidStart { symbol: c }, index));
                }
            }

            if let Err(kind) = self.step(c, pos) {
                return Err(self.fail(kind, index));
            }

            self.state.record(c);
            pos = pos.advance(c);
        }

        self.metrics.characters = pos.index;
        self.metrics.linkage_counts = self.state.linkage_counts.clone();
        for scanned in &self.references {
            match scanned.reference {
                ExpressionReference::HostItemFunction(_) => self.metrics.function_references += 1,
                ExpressionReference::Macro { .. } => self.metrics.macros += 1,
                ExpressionReference::UserMacro { .. } => self.metrics.user_macros += 1,
            }
        }

        Ok(ScanOutput {
            references: self.references,
            counters: self.state.counters,
            metrics: self.metrics,
        })
    }

    fn fail(&self, kind: ExpressionErrorKind, index: usize) -> ExpressionError {
        ExpressionError::at(kind, self.expression, index)
    }

    fn region(&self) -> Region {
        self.current
            .as_ref()
            .map(|r| r.region)
            .unwrap_or(Region::TopLevel)
    }

    fn step(&mut self, c: char, pos: Position) -> Result<(), ExpressionErrorKind> {
        if self.current.as_ref().map(|r| r.in_quotes).unwrap_or(false) {
            return self.quoted(c);
        }

        match self.region() {
            Region::TopLevel => self.top_level(c, pos),
            Region::Host => self.host(c, pos),
            Region::UserMacro => self.user_macro(c, pos),
            Region::Item => self.item(c, pos),
            Region::ItemParam | Region::FunctionParam => self.parameter(c, pos),
            Region::Function => match c {
                '}' => self.close_reference(pos),
                _ => Err(ExpressionErrorKind::UnexpectedFunctionSymbol { symbol: c }),
            },
        }
    }

    fn top_level(&mut self, c: char, pos: Position) -> Result<(), ExpressionErrorKind> {
        match c {
            '{' => {
                self.state.counters.open_brace += 1;
                self.current = Some(CurrentReference::open(pos));
            }
            '}' => self.state.counters.close_brace()?,
            '(' => self.state.counters.open_paren += 1,
            ')' => self.state.counters.close_paren()?,
            '"' => return Err(ExpressionErrorKind::IllegalQuote),
            '[' | ']' => return Err(ExpressionErrorKind::UnexpectedSymbol { symbol: c }),
            c if is_linkage_symbol(c) => {
                self.state.check_linkage(c)?;
                *self.state.linkage_counts.entry(c).or_insert(0) += 1;
            }
            _ => {}
        }
        Ok(())
    }

    fn host(&mut self, c: char, pos: Position) -> Result<(), ExpressionErrorKind> {
        match c {
            '}' => return self.close_reference(pos),
            '{' => return Err(ExpressionErrorKind::UnexpectedOpeningBrace),
            '"' => return Err(ExpressionErrorKind::IllegalQuote),
            _ => {}
        }

        if let Some(reference) = self.current.as_mut() {
            if c == '$' && reference.is_fresh(pos) {
                reference.region = Region::UserMacro;
            } else if c == ':' {
                reference.begin_item(pos.offset);
            }
        }
        Ok(())
    }

    fn user_macro(&mut self, c: char, pos: Position) -> Result<(), ExpressionErrorKind> {
        match c {
            '}' => self.close_reference(pos),
            '{' => Err(ExpressionErrorKind::UnexpectedOpeningBrace),
            '"' => Err(ExpressionErrorKind::IllegalQuote),
            _ => Ok(()),
        }
    }

    fn item(&mut self, c: char, pos: Position) -> Result<(), ExpressionErrorKind> {
        match c {
            '}' => return self.close_reference(pos),
            '{' => return Err(ExpressionErrorKind::UnexpectedOpeningBrace),
            '"' => return Err(ExpressionErrorKind::IllegalQuote),
            ']' => return Err(ExpressionErrorKind::UnexpectedSymbol { symbol: c }),
            ')' => return Err(ExpressionErrorKind::IncorrectClosingParenthesis),
            _ => {}
        }

        let Some(reference) = self.current.as_mut() else {
            return Ok(());
        };

        match c {
            '[' => {
                if reference.has_item_params() {
                    return Err(ExpressionErrorKind::ItemParameterSyntax);
                }
                self.state.counters.open_bracket += 1;
                reference.begin_item_params();
                self.metrics.max_item_param_depth = self.metrics.max_item_param_depth.max(1);
            }
            '(' => {
                self.state.counters.open_paren += 1;
                reference.begin_function_params(pos.offset);
            }
            _ => {}
        }
        Ok(())
    }

    /// Unquoted character inside an item or function parameter list
    fn parameter(&mut self, c: char, pos: Position) -> Result<(), ExpressionErrorKind> {
        let region = self.region();
        let Some((opener, closer)) = region.delimiters() else {
            return Ok(());
        };

        if c == '}' && self.current.as_ref().map(|r| r.macro_depth == 0).unwrap_or(true) {
            return self.close_reference(pos);
        }

        let max_parameters = self.limits.max_parameters;
        let Some(reference) = self.current.as_mut() else {
            return Ok(());
        };

        if reference.quote_just_closed && !c.is_whitespace() && !(c == ',' || c == closer) {
            return Err(region.syntax_error());
        }

        match c {
            '"' => {
                if reference.depth == 1 {
                    if reference.quote_just_closed || !reference.current_param_is_blank() {
                        return Err(region.syntax_error());
                    }
                    self.metrics.quoted_params += 1;
                } else {
                    reference.write_param(c);
                }
                reference.in_quotes = true;
                self.state.counters.quote_count += 1;
            }
            ',' if reference.depth == 1 && reference.macro_depth == 0 => {
                if reference.param_count() >= max_parameters {
                    return Err(region.syntax_error());
                }
                reference.next_param();
            }
            c if c == opener => {
                reference.depth += 1;
                reference.write_param(c);
                if region == Region::ItemParam {
                    self.state.counters.open_bracket += 1;
                    self.metrics.max_item_param_depth =
                        self.metrics.max_item_param_depth.max(reference.depth);
                } else {
                    self.state.counters.open_paren += 1;
                }
            }
            c if c == closer => {
                reference.depth -= 1;
                if region == Region::ItemParam {
                    self.state.counters.close_bracket += 1;
                } else {
                    self.state.counters.close_paren()?;
                }

                if reference.depth > 0 {
                    reference.write_param(c);
                } else if region == Region::ItemParam {
                    reference.end_item_params();
                } else {
                    reference.end_function_params(pos.offset);
                }
            }
            '{' => {
                if !opens_macro(&self.expression[pos.offset..]) {
                    return Err(region.syntax_error());
                }
                reference.macro_depth += 1;
                self.state.counters.open_brace += 1;
                reference.write_param(c);
            }
            '}' => {
                reference.macro_depth -= 1;
                self.state.counters.close_brace += 1;
                reference.write_param(c);
            }
            c if c.is_whitespace() => {
                if !reference.quote_just_closed && !reference.current_param_is_blank() {
                    reference.write_param(c);
                }
            }
            _ => reference.write_param(c),
        }
        Ok(())
    }

    /// Character inside a quoted parameter
    fn quoted(&mut self, c: char) -> Result<(), ExpressionErrorKind> {
        let escaped = self.state.follows_escape();
        let Some(reference) = self.current.as_mut() else {
            return Ok(());
        };

        if c != '"' {
            reference.write_param(c);
            return Ok(());
        }

        if escaped {
            if reference.depth == 1 {
                reference.write_escaped_quote();
            } else {
                reference.write_param(c);
            }
            return Ok(());
        }

        reference.in_quotes = false;
        self.state.counters.quote_count += 1;
        if reference.depth == 1 {
            reference.quote_just_closed = true;
        } else {
            reference.write_param(c);
        }
        Ok(())
    }

    fn close_reference(&mut self, pos: Position) -> Result<(), ExpressionErrorKind> {
        let region = self.region();
        if region.is_param_list() {
            return Err(region.syntax_error());
        }
        let Some(reference) = self.current.take() else {
            return Err(ExpressionErrorKind::IncorrectClosingBrace);
        };
        self.state.counters.close_brace()?;

        if self.references.len() >= self.limits.max_references {
            return Err(ExpressionErrorKind::TooManyReferences {
                max: self.limits.max_references,
            });
        }

        let start = reference.start;
        let finished = reference.finish(self.expression, pos);

        if self.limits.log_references {
            crate::log_debug!("Reference collected",
                "reference" => finished.expression(),
                "type" => finished.kind_name(),
                "offset" => start.index
            );
        }

        self.references.push(ScannedReference {
            reference: finished,
            span: Span::new(start, pos.advance('}')),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn scan_default(expression: &str) -> Result<ScanOutput, ExpressionError> {
        scan(expression, &ScanLimits::default())
    }

    fn function_params(output: &ScanOutput, index: usize) -> Vec<String> {
        output.references[index]
            .reference
            .as_function()
            .map(|f| f.function_params.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_simple_reference() {
        let output = scan_default("{Zabbix server:agent.ping.last(0)}=0").unwrap();
        assert_eq!(output.references.len(), 1);

        let function = output.references[0].reference.as_function().unwrap();
        assert_eq!(function.host, "Zabbix server");
        assert_eq!(function.item, "agent.ping");
        assert_eq!(function.function_name, "last");
        assert_eq!(function.function, "last(0)");
        assert_eq!(function.function_params, vec!["0".to_string()]);
        assert_eq!(output.metrics.linkage_counts.get(&'='), Some(&1));
        assert_eq!(output.counters.check_balance(), Ok(()));
    }

    #[test]
    fn test_invalid_start() {
        let err = scan_default("=0").unwrap_err();
        assert_matches!(err.kind, ExpressionErrorKind::InvalidStart { symbol: '=' });
        assert_eq!(err.offset, 0);

        assert!(scan_default("  (1)").is_ok());
        assert!(scan_default("5").is_ok());
    }

    #[test]
    fn test_linkage_sequence() {
        let err = scan_default("{host:key.diff()}&+{TRIGGER.VALUE}").unwrap_err();
        assert_matches!(
            err.kind,
            ExpressionErrorKind::IllegalLinkageSequence {
                previous: '&',
                symbol: '+'
            }
        );
        assert_eq!(err.offset, 17);
        assert_eq!(err.context, "&+{TRIGGER.VALUE}");

        assert!(scan_default("1&-1").is_ok());
        assert!(scan_default("1 = - 1").is_ok());
        assert_matches!(
            scan_default("1--1").unwrap_err().kind,
            ExpressionErrorKind::IllegalLinkageSequence { .. }
        );
    }

    #[test]
    fn test_quoted_parameters() {
        let output = scan_default(r#"{host:key.str("a+b")}=0"#).unwrap();
        assert_eq!(function_params(&output, 0), vec!["a+b".to_string()]);
        assert_eq!(output.metrics.linkage_counts.get(&'+'), None);
        assert_eq!(output.metrics.quoted_params, 1);
        assert_eq!(output.counters.quote_count, 2);

        let output = scan_default(r#"{host:key.str("say \"hi\"")}=0"#).unwrap();
        assert_eq!(function_params(&output, 0), vec![r#"say "hi""#.to_string()]);
    }

    #[test]
    fn test_unquoted_parameters_drop_leading_spaces() {
        let output = scan_default("{host:item.count(#3, >5)}=1").unwrap();
        assert_eq!(
            function_params(&output, 0),
            vec!["#3".to_string(), ">5".to_string()]
        );
        let function = output.references[0].reference.as_function().unwrap();
        assert_eq!(function.raw_params, "#3, >5");
    }

    #[test]
    fn test_nested_item_parameters() {
        let expression = r#"{host:key[a,,"b",,[c,d,,"e",],,[f]].count(1,,"b",3)}"#;
        let output = scan_default(expression).unwrap();
        let function = output.references[0].reference.as_function().unwrap();

        assert_eq!(function.item, r#"key[a,,"b",,[c,d,,"e",],,[f]]"#);
        assert_eq!(
            function.item_params,
            vec!["a", "", "b", "", r#"[c,d,,"e",]"#, "", "[f]"]
        );
        assert_eq!(function.function_params, vec!["1", "", "b", "3"]);
        assert_eq!(output.metrics.max_item_param_depth, 2);
    }

    #[test]
    fn test_text_after_closing_quote() {
        let err = scan_default(r#"{host:key.str("a"b)}=0"#).unwrap_err();
        assert_eq!(err.kind, ExpressionErrorKind::FunctionParameterSyntax);

        let err = scan_default(r#"{host:key[a"b"].last(0)}=0"#).unwrap_err();
        assert_eq!(err.kind, ExpressionErrorKind::ItemParameterSyntax);
    }

    #[test]
    fn test_reference_closed_inside_parameters() {
        let err = scan_default("{host:key.last(0}=0").unwrap_err();
        assert_eq!(err.kind, ExpressionErrorKind::FunctionParameterSyntax);
    }

    #[test]
    fn test_function_symbols() {
        let err = scan_default("{host:key.diff())}").unwrap_err();
        assert_matches!(
            err.kind,
            ExpressionErrorKind::UnexpectedFunctionSymbol { symbol: ')' }
        );

        let err = scan_default("{host:key.diff() }").unwrap_err();
        assert_matches!(
            err.kind,
            ExpressionErrorKind::UnexpectedFunctionSymbol { symbol: ' ' }
        );
    }

    #[test]
    fn test_top_level_symbols() {
        assert_eq!(
            scan_default("(1))").unwrap_err().kind,
            ExpressionErrorKind::IncorrectClosingParenthesis
        );
        assert_eq!(
            scan_default("1}").unwrap_err().kind,
            ExpressionErrorKind::IncorrectClosingBrace
        );
        assert_eq!(
            scan_default(r#"1="a""#).unwrap_err().kind,
            ExpressionErrorKind::IllegalQuote
        );
        assert_matches!(
            scan_default("1=[1]").unwrap_err().kind,
            ExpressionErrorKind::UnexpectedSymbol { symbol: '[' }
        );
        assert_eq!(
            scan_default("{host{").unwrap_err().kind,
            ExpressionErrorKind::UnexpectedOpeningBrace
        );
    }

    #[test]
    fn test_macros() {
        let output = scan_default("{TRIGGER.VALUE}={$LIMIT}").unwrap();
        assert_eq!(output.references.len(), 2);
        assert_matches!(
            &output.references[0].reference,
            ExpressionReference::Macro { name, .. } if name == "{TRIGGER.VALUE}"
        );
        assert_matches!(
            &output.references[1].reference,
            ExpressionReference::UserMacro { name, .. } if name == "{$LIMIT}"
        );
        assert_eq!(output.metrics.macros, 1);
        assert_eq!(output.metrics.user_macros, 1);
    }

    #[test]
    fn test_user_macro_parameter() {
        let output = scan_default("{host:key.last({$PERIOD})}>0").unwrap();
        assert_eq!(function_params(&output, 0), vec!["{$PERIOD}".to_string()]);
        assert_eq!(output.counters.check_balance(), Ok(()));
    }

    #[test]
    fn test_nested_reference_in_parameters() {
        let err = scan_default(
            r#"{host:key[].count(1,{host:key.last(0)},"{host:key.last(0)}")}=0"#,
        )
        .unwrap_err();
        assert_matches!(err.kind, ExpressionErrorKind::FunctionParameterSyntax);

        let err = scan_default("{host:key[{host:other.last(0)}].last(0)}=0").unwrap_err();
        assert_matches!(err.kind, ExpressionErrorKind::ItemParameterSyntax);

        let output = scan_default("{host:key[{HOST.HOST}].last({$PERIOD})}>0").unwrap();
        assert_eq!(output.references.len(), 1);
        assert_eq!(function_params(&output, 0), vec!["{$PERIOD}".to_string()]);
    }

    #[test]
    fn test_opens_macro() {
        assert!(opens_macro("{$PERIOD})}"));
        assert!(opens_macro("{$CTX:\"a\"}"));
        assert!(opens_macro("{HOST.NAME}"));
        assert!(!opens_macro("{host:key.last(0)}"));
        assert!(!opens_macro("{}"));
        assert!(!opens_macro("{$}"));
        assert!(!opens_macro("{HOST"));
    }

    #[test]
    fn test_unicode_offsets() {
        let output = scan_default("{host:key.str(ГУГЛ)}=0").unwrap();
        assert_eq!(function_params(&output, 0), vec!["ГУГЛ".to_string()]);
        assert_eq!(output.references[0].span.len(), 20);
        assert_eq!(output.metrics.characters, 22);

        let err = scan_default("{host:key.str(ГУГЛ)}=+0").unwrap_err();
        assert_eq!(err.offset, 20);
        assert_eq!(err.context, "=+0");
    }

    #[test]
    fn test_reference_limit() {
        let limits = ScanLimits {
            max_references: 1,
            ..ScanLimits::default()
        };
        let err = scan("{host:key.last(0)}={host:key.last(1)}", &limits).unwrap_err();
        assert_matches!(err.kind, ExpressionErrorKind::TooManyReferences { max: 1 });
    }

    #[test]
    fn test_parameter_limit() {
        let limits = ScanLimits {
            max_parameters: 2,
            ..ScanLimits::default()
        };
        assert!(scan("{host:key.count(1,2)}=0", &limits).is_ok());
        let err = scan("{host:key.count(1,2,3)}=0", &limits).unwrap_err();
        assert_eq!(err.kind, ExpressionErrorKind::FunctionParameterSyntax);
    }

    #[test]
    fn test_balance_order() {
        let output = scan_default("((1)").unwrap();
        assert_eq!(
            output.counters.check_balance(),
            Err(ExpressionErrorKind::UnbalancedParentheses)
        );
        let output = scan_default("{host:key.last(0)").unwrap();
        assert_eq!(
            output.counters.check_balance(),
            Err(ExpressionErrorKind::UnbalancedBraces)
        );
    }
}
