//! Trigger function argument checks

use super::error::ExpressionErrorKind;
use super::reference::FunctionReference;
use crate::catalog::{ArgKind, ExpressionCatalog, FunctionSpec};

/// Check the parameters of `reference` against the declared arguments of
/// its function. Functions without declared arguments are not checked.
pub fn validate_arguments(
    reference: &FunctionReference,
    spec: &FunctionSpec,
    catalog: &dyn ExpressionCatalog,
) -> Result<(), ExpressionErrorKind> {
    let Some(args) = spec.args.as_ref() else {
        return Ok(());
    };

    let params = &reference.function_params;
    if params.len() > args.len() {
        return Err(argument_count(reference));
    }

    for (position, arg) in args.iter().enumerate() {
        let value = params.get(position).map(|p| p.trim()).unwrap_or_default();

        if value.is_empty() {
            if arg.mandatory {
                return Err(argument_count(reference));
            }
            continue;
        }

        // Macro values are only known at evaluation time
        if catalog.user_macro_name_is_valid(value) {
            continue;
        }

        if let Some(expected) = type_mismatch(arg.kind, value, catalog) {
            return Err(ExpressionErrorKind::ArgumentType {
                function: reference.function.clone(),
                argument: value.to_string(),
                expected,
            });
        }
    }

    Ok(())
}

/// Name of the expected type when `value` does not fit `kind`
fn type_mismatch(
    kind: ArgKind,
    value: &str,
    catalog: &dyn ExpressionCatalog,
) -> Option<&'static str> {
    let valid = match kind {
        ArgKind::Str => true,
        ArgKind::Sec => catalog.float_format_is_valid(value),
        ArgKind::SecNum => catalog.ticks_format_is_valid(value),
        ArgKind::Num => catalog.number_is_valid(value),
    };

    if valid {
        return None;
    }

    Some(match kind {
        ArgKind::Sec => "time period",
        ArgKind::SecNum => "time period or value count",
        _ => "number",
    })
}

fn argument_count(reference: &FunctionReference) -> ExpressionErrorKind {
    ExpressionErrorKind::ArgumentCount {
        function: reference.function.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArgSpec, DefaultCatalog, ValueType};
    use crate::utils::Span;
    use assert_matches::assert_matches;

    fn call(name: &str, params: &[&str]) -> FunctionReference {
        let raw = params.join(",");
        FunctionReference {
            expression: format!("{{host:key.{}({})}}", name, raw),
            host: "host".to_string(),
            item: "key".to_string(),
            item_params: Vec::new(),
            function: format!("{}({})", name, raw),
            function_name: name.to_string(),
            function_params: params.iter().map(|p| p.to_string()).collect(),
            raw_params: raw,
            span: Span::default(),
        }
    }

    fn check(name: &str, params: &[&str]) -> Result<(), ExpressionErrorKind> {
        let catalog = DefaultCatalog::default();
        let spec = catalog.allowed_functions().get(name).cloned().unwrap();
        validate_arguments(&call(name, params), &spec, &catalog)
    }

    #[test]
    fn test_accepted_arguments() {
        assert!(check("last", &["0"]).is_ok());
        assert!(check("last", &["#5", "1h"]).is_ok());
        assert!(check("count", &["#3", ">5"]).is_ok());
        assert!(check("str", &["a+b"]).is_ok());
        assert!(check("diff", &[""]).is_ok());
        assert!(check("count", &["1", "", "b", "3"]).is_ok());
    }

    #[test]
    fn test_argument_count() {
        assert_matches!(
            check("last", &["1", "2", "3"]),
            Err(ExpressionErrorKind::ArgumentCount { function }) if function == "last(1,2,3)"
        );
        assert_matches!(
            check("nodata", &[""]),
            Err(ExpressionErrorKind::ArgumentCount { .. })
        );
        assert_matches!(
            check("diff", &["a", "b"]),
            Err(ExpressionErrorKind::ArgumentCount { .. })
        );
    }

    #[test]
    fn test_argument_type() {
        assert_matches!(
            check("nodata", &["abc"]),
            Err(ExpressionErrorKind::ArgumentType { argument, expected: "time period", .. })
                if argument == "abc"
        );
        assert_matches!(
            check("last", &["#x"]),
            Err(ExpressionErrorKind::ArgumentType {
                expected: "time period or value count",
                ..
            })
        );
    }

    #[test]
    fn test_user_macro_arguments_skip_type_check() {
        assert!(check("last", &["{$PERIOD}"]).is_ok());
        assert!(check("nodata", &[" {$TIMEOUT}"]).is_ok());
    }

    #[test]
    fn test_number_arguments() {
        let catalog = DefaultCatalog::default();
        let spec = FunctionSpec::new(&[ValueType::Float], &[ArgSpec::mandatory(ArgKind::Num)]);

        assert!(validate_arguments(&call("band", &["-1.5"]), &spec, &catalog).is_ok());
        assert_matches!(
            validate_arguments(&call("band", &["1h"]), &spec, &catalog),
            Err(ExpressionErrorKind::ArgumentType { expected: "number", .. })
        );
    }

    #[test]
    fn test_unchecked_functions() {
        let catalog = DefaultCatalog::default();
        let spec = FunctionSpec::unchecked(&[ValueType::Float]);
        assert!(validate_arguments(&call("any", &["x", "y", "z"]), &spec, &catalog).is_ok());
    }
}
