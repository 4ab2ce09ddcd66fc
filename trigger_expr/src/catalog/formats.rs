//! Format predicates for host names, macros, function calls and arguments

use regex::Regex;
use std::sync::OnceLock;

pub const HOST_NAME_PATTERN: &str = r"^[0-9a-zA-Z_. \-]+$";
pub const MACRO_PATTERN: &str = r"^\{[A-Z.]+\}$";
pub const USER_MACRO_PATTERN: &str = r"^\{\$[A-Z0-9._]+\}$";
pub const FUNCTION_CALL_PATTERN: &str = r"^[a-z]+\([^\x00-\x1F]*\)$";
pub const FLOAT_PATTERN: &str = r"^ *[0-9]+(\.[0-9]*)?[KMGTsmhdw]? *$";
pub const COUNT_PATTERN: &str = r"^ *#[0-9]+ *$";
pub const NUMBER_PATTERN: &str = r"^ *-?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][-+]?[0-9]+)? *$";

/// Built-in macros that may stand alone as a reference
pub const KNOWN_MACROS: &[&str] = &["{TRIGGER.VALUE}"];

/// Compile `pattern` once into `cell`. All patterns in this crate are
/// literals, so a compile failure only ever means "never matches".
pub(crate) fn cached_regex(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cached_regex(cell, pattern)
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

pub fn host_name_is_valid(host: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, HOST_NAME_PATTERN, host)
}

/// Built-in macro: well-formed and known
pub fn macro_name_is_valid(name: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, MACRO_PATTERN, name) && KNOWN_MACROS.contains(&name)
}

pub fn user_macro_name_is_valid(name: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, USER_MACRO_PATTERN, name)
}

pub fn function_format_is_valid(call: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, FUNCTION_CALL_PATTERN, call)
}

/// Time period or size: digits, optional fraction, optional unit suffix
pub fn float_format_is_valid(value: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, FLOAT_PATTERN, value)
}

/// `#N` value count or any float-format value
pub fn ticks_format_is_valid(value: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, COUNT_PATTERN, value) || float_format_is_valid(value)
}

pub fn number_is_valid(value: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, NUMBER_PATTERN, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_names() {
        assert!(host_name_is_valid("Zabbix server"));
        assert!(host_name_is_valid(
            "abcdefghijklmnopqrstuvwxyz. _-ABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890"
        ));
        assert!(!host_name_is_valid(""));
        assert!(!host_name_is_valid("host:1"));
        assert!(!host_name_is_valid("(host"));
    }

    #[test]
    fn test_macros() {
        assert!(macro_name_is_valid("{TRIGGER.VALUE}"));
        assert!(!macro_name_is_valid("{TRIGGER.VALUES}"));
        assert!(!macro_name_is_valid("{trigger.value}"));

        assert!(user_macro_name_is_valid("{$MY.MACRO}"));
        assert!(user_macro_name_is_valid("{$PERIOD_1}"));
        assert!(!user_macro_name_is_valid("{$my.macro}"));
        assert!(!user_macro_name_is_valid("{$}"));
        assert!(!user_macro_name_is_valid("{MACRO}"));
    }

    #[test]
    fn test_function_call_format() {
        assert!(function_format_is_valid("last(0)"));
        assert!(function_format_is_valid("diff()"));
        assert!(function_format_is_valid("str(\"ГУГЛ\")"));
        assert!(!function_format_is_valid("LAST(0)"));
        assert!(!function_format_is_valid("last(\t)"));
        assert!(!function_format_is_valid("last"));
    }

    #[test]
    fn test_float_and_ticks() {
        for value in ["0", "300", "5m", "1.5K", "10.", " 7d ", "2w"] {
            assert!(float_format_is_valid(value), "{value} should be a float");
        }
        for value in ["", "#3", "-1", ".5", "5mm", "abc"] {
            assert!(!float_format_is_valid(value), "{value} should not be a float");
        }

        assert!(ticks_format_is_valid("#3"));
        assert!(ticks_format_is_valid(" #10 "));
        assert!(ticks_format_is_valid("5m"));
        assert!(!ticks_format_is_valid("#"));
        assert!(!ticks_format_is_valid("#3s"));
    }

    #[test]
    fn test_numbers() {
        for value in ["0", "-1", "3.25", ".5", "1e3", " 42 "] {
            assert!(number_is_valid(value), "{value} should be a number");
        }
        for value in ["", "-", "inf", "NaN", "5m", "1,5"] {
            assert!(!number_is_valid(value), "{value} should not be a number");
        }
    }
}
