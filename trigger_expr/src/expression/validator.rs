//! Post-scan validation
//!
//! Runs once the scanner has accepted every character: balance checks,
//! per-reference checks against the catalog, then the shape of the
//! expression with every reference and number collapsed to a placeholder.

use super::arguments::validate_arguments;
use super::error::{ExpressionError, ExpressionErrorKind};
use super::reference::{ExpressionReference, FunctionReference, ParsedExpression};
use super::scanner::{is_linkage_symbol, ScanOutput};
use crate::catalog::formats::cached_regex;
use crate::catalog::ExpressionCatalog;
use regex::Regex;
use std::sync::OnceLock;

/// Stands in for every reference and number in the simplified expression
pub const PLACEHOLDER: &str = "{expression}";

const NUMBER_PATTERN: &str = r"[0-9]+(\.[0-9]+)?[KMGTsmhdw]?";
const PARENTHESIZED_PATTERN: &str = r"\(-?\{expression\}\)";
const UNARY_MINUS_PATTERN: &str = r"(^|[(=#<>&|+\-*/])-\{expression\}";
const SHAPE_PATTERN: &str = r"^[()0-9=#<>&|+\-*/]+$";

pub fn validate(
    expression: &str,
    scan: ScanOutput,
    catalog: &dyn ExpressionCatalog,
) -> Result<ParsedExpression, ExpressionError> {
    scan.counters
        .check_balance()
        .map_err(|kind| ExpressionError::whole(kind, expression))?;

    let mut parsed = ParsedExpression {
        expression: expression.to_string(),
        references: Vec::with_capacity(scan.references.len()),
        hosts: Vec::new(),
        items: Vec::new(),
        functions: Vec::new(),
        function_params: Vec::new(),
        macros: Vec::new(),
        usermacros: Vec::new(),
        simplified: String::new(),
        metrics: scan.metrics,
    };
    let mut working = expression.to_string();

    for scanned in scan.references {
        check_reference(&scanned.reference, catalog)
            .map_err(|kind| ExpressionError::at(kind, expression, scanned.span.start.index + 1))?;

        working = working.replacen(scanned.reference.expression(), PLACEHOLDER, 1);

        match &scanned.reference {
            ExpressionReference::HostItemFunction(function) => {
                parsed.hosts.push(function.host.clone());
                parsed.items.push(function.item.clone());
                parsed.functions.push(function.function_name.clone());
                parsed.function_params.push(function.raw_params.clone());
            }
            ExpressionReference::Macro { name, .. } => parsed.macros.push(name.clone()),
            ExpressionReference::UserMacro { name, .. } => parsed.usermacros.push(name.clone()),
        }
        parsed.references.push(scanned.reference);
    }

    if parsed.hosts.is_empty() && parsed.items.is_empty() {
        return Err(ExpressionError::whole(
            ExpressionErrorKind::NoHostItemReference,
            expression,
        ));
    }

    parsed.simplified = simplify(&working);
    check_shape(&collapse(&parsed.simplified))
        .map_err(|kind| ExpressionError::whole(kind, expression))?;

    Ok(parsed)
}

fn check_reference(
    reference: &ExpressionReference,
    catalog: &dyn ExpressionCatalog,
) -> Result<(), ExpressionErrorKind> {
    match reference {
        ExpressionReference::Macro { name, .. } => {
            if !catalog.macro_name_is_valid(name) {
                return Err(ExpressionErrorKind::IncorrectMacro { name: name.clone() });
            }
        }
        ExpressionReference::UserMacro { name, .. } => {
            if !catalog.user_macro_name_is_valid(name) {
                return Err(ExpressionErrorKind::IncorrectUserMacro { name: name.clone() });
            }
        }
        ExpressionReference::HostItemFunction(function) => {
            check_function_reference(function, catalog)?;
        }
    }
    Ok(())
}

fn check_function_reference(
    reference: &FunctionReference,
    catalog: &dyn ExpressionCatalog,
) -> Result<(), ExpressionErrorKind> {
    if reference.host.is_empty() {
        return Err(ExpressionErrorKind::EmptyHost);
    }
    if !catalog.host_name_is_valid(&reference.host) {
        return Err(ExpressionErrorKind::IncorrectHost {
            host: reference.host.clone(),
        });
    }

    if reference.item.is_empty() {
        return Err(ExpressionErrorKind::EmptyItemKey {
            host: reference.host.clone(),
        });
    }
    catalog
        .validate_item_key(&reference.item)
        .map_err(|reason| ExpressionErrorKind::IncorrectItemKey {
            key: reference.item.clone(),
            reason,
        })?;

    let spec = catalog
        .allowed_functions()
        .get(&reference.function_name.to_lowercase())
        .ok_or_else(|| ExpressionErrorKind::UnknownFunction {
            name: reference.function_name.clone(),
        })?;

    if !catalog.function_format_is_valid(&reference.function) {
        return Err(ExpressionErrorKind::IncorrectFunctionFormat {
            function: reference.function.clone(),
        });
    }

    validate_arguments(reference, spec, catalog)
}

/// Replace numbers with the placeholder and drop whitespace
pub fn simplify(working: &str) -> String {
    static NUMBER: OnceLock<Option<Regex>> = OnceLock::new();

    let replaced = match cached_regex(&NUMBER, NUMBER_PATTERN) {
        Some(re) => re.replace_all(working, PLACEHOLDER).into_owned(),
        None => working.to_string(),
    };
    replaced.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Fold `({expression})` and unary minus into a bare placeholder until
/// nothing changes
pub fn collapse(simplified: &str) -> String {
    static PARENTHESIZED: OnceLock<Option<Regex>> = OnceLock::new();
    static UNARY_MINUS: OnceLock<Option<Regex>> = OnceLock::new();

    let (Some(parenthesized), Some(unary_minus)) = (
        cached_regex(&PARENTHESIZED, PARENTHESIZED_PATTERN),
        cached_regex(&UNARY_MINUS, UNARY_MINUS_PATTERN),
    ) else {
        return simplified.to_string();
    };

    let mut current = simplified.to_string();
    loop {
        let folded = parenthesized.replace_all(&current, PLACEHOLDER);
        let folded = unary_minus
            .replace_all(&folded, "${1}{expression}")
            .into_owned();
        if folded == current {
            return current;
        }
        current = folded;
    }
}

/// Values and linking symbols must alternate, one symbol between each
/// pair of values
fn check_shape(collapsed: &str) -> Result<(), ExpressionErrorKind> {
    static SHAPE: OnceLock<Option<Regex>> = OnceLock::new();

    let reduced = collapsed.replace(PLACEHOLDER, "1");
    if reduced.contains("11") {
        return Err(ExpressionErrorKind::AdjacentValues);
    }

    let shape_ok = cached_regex(&SHAPE, SHAPE_PATTERN)
        .map(|re| re.is_match(&reduced))
        .unwrap_or(false);
    if !shape_ok {
        return Err(ExpressionErrorKind::LinkageSymbols);
    }

    let values = collapsed.matches(PLACEHOLDER).count();
    let symbols = reduced.chars().filter(|c| is_linkage_symbol(*c)).count();
    if values == 0 || symbols != values - 1 {
        return Err(ExpressionErrorKind::LinkageSymbols);
    }

    check_operand_order(&reduced)
}

fn check_operand_order(reduced: &str) -> Result<(), ExpressionErrorKind> {
    let mut expect_value = true;
    let mut depth = 0usize;

    for c in reduced.chars() {
        match c {
            '(' if expect_value => depth += 1,
            ')' if !expect_value && depth > 0 => depth -= 1,
            '-' if expect_value => {}
            c if c.is_ascii_digit() && expect_value => expect_value = false,
            c if is_linkage_symbol(c) && !expect_value => expect_value = true,
            _ => return Err(ExpressionErrorKind::LinkageSymbols),
        }
    }

    if expect_value || depth != 0 {
        return Err(ExpressionErrorKind::LinkageSymbols);
    }
    Ok(())
}
