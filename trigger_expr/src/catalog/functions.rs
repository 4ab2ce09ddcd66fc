//! Trigger function table
//!
//! Maps each lower-case function name to its positional argument list and
//! the item value types it applies to. The built-in table covers the stock
//! functions; custom tables can be loaded from TOML.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Type an argument must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    /// Any text
    Str,
    /// Time period accepted by the float format (`300`, `5m`, `1.5K`)
    Sec,
    /// Time period or value count (`#3`)
    SecNum,
    /// Plain number
    Num,
}

impl ArgKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgKind::Str => "str",
            ArgKind::Sec => "sec",
            ArgKind::SecNum => "sec_num",
            ArgKind::Num => "num",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    #[serde(default)]
    pub mandatory: bool,
    pub kind: ArgKind,
}

impl ArgSpec {
    pub const fn mandatory(kind: ArgKind) -> Self {
        Self {
            mandatory: true,
            kind,
        }
    }

    pub const fn optional(kind: ArgKind) -> Self {
        Self {
            mandatory: false,
            kind,
        }
    }
}

/// Item value types a function can be applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Float,
    Unsigned,
    Character,
    Text,
    Log,
}

const ALL_TYPES: &[ValueType] = &[
    ValueType::Float,
    ValueType::Unsigned,
    ValueType::Character,
    ValueType::Text,
    ValueType::Log,
];
const NUMERIC_TYPES: &[ValueType] = &[ValueType::Float, ValueType::Unsigned];
const CHARACTER_TYPES: &[ValueType] = &[ValueType::Character, ValueType::Text, ValueType::Log];
const LOG_TYPES: &[ValueType] = &[ValueType::Log];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    #[serde(default)]
    pub value_types: Vec<ValueType>,
    /// `None` disables argument checking for the function
    #[serde(default)]
    pub args: Option<Vec<ArgSpec>>,
}

impl FunctionSpec {
    pub fn new(value_types: &[ValueType], args: &[ArgSpec]) -> Self {
        Self {
            value_types: value_types.to_vec(),
            args: Some(args.to_vec()),
        }
    }

    /// A function whose arguments are never checked
    pub fn unchecked(value_types: &[ValueType]) -> Self {
        Self {
            value_types: value_types.to_vec(),
            args: None,
        }
    }

    pub fn accepts(&self, value_type: ValueType) -> bool {
        self.value_types.contains(&value_type)
    }

    pub fn mandatory_count(&self) -> usize {
        self.args
            .as_ref()
            .map(|args| args.iter().filter(|a| a.mandatory).count())
            .unwrap_or(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid function table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Function name '{name}' must be lower-case letters only")]
    InvalidFunctionName { name: String },

    #[error("Function table is empty")]
    EmptyTable,
}

#[derive(Deserialize)]
struct FunctionTableFile {
    functions: BTreeMap<String, FunctionSpec>,
}

/// Lookup table of allowed trigger functions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionTable {
    functions: HashMap<String, FunctionSpec>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock function table
    pub fn builtin() -> Self {
        use ArgKind::*;

        let mut table = Self::new();

        let period = [ArgSpec::mandatory(SecNum), ArgSpec::optional(Sec)];
        for name in ["avg", "delta", "max", "min", "sum"] {
            table.insert(name, FunctionSpec::new(NUMERIC_TYPES, &period));
        }
        table.insert("last", FunctionSpec::new(ALL_TYPES, &period));
        table.insert("strlen", FunctionSpec::new(CHARACTER_TYPES, &period));

        table.insert(
            "count",
            FunctionSpec::new(
                ALL_TYPES,
                &[
                    ArgSpec::mandatory(SecNum),
                    ArgSpec::optional(Str),
                    ArgSpec::optional(Str),
                    ArgSpec::optional(Sec),
                ],
            ),
        );
        table.insert(
            "fuzzytime",
            FunctionSpec::new(NUMERIC_TYPES, &[ArgSpec::mandatory(Sec)]),
        );
        table.insert("nodata", FunctionSpec::new(ALL_TYPES, &[ArgSpec::mandatory(Sec)]));

        let pattern = [ArgSpec::mandatory(Str), ArgSpec::optional(SecNum)];
        for name in ["iregexp", "regexp", "str"] {
            table.insert(name, FunctionSpec::new(CHARACTER_TYPES, &pattern));
        }

        for name in ["logeventid", "logsource"] {
            table.insert(name, FunctionSpec::new(LOG_TYPES, &[ArgSpec::mandatory(Str)]));
        }

        // Functions that take no meaningful arguments still accept one
        // optional string so that `name()` parses as one empty parameter.
        let ignored = [ArgSpec::optional(Str)];
        table.insert("logseverity", FunctionSpec::new(LOG_TYPES, &ignored));
        for name in [
            "abschange",
            "change",
            "date",
            "dayofmonth",
            "dayofweek",
            "diff",
            "now",
            "prev",
            "time",
        ] {
            table.insert(name, FunctionSpec::new(ALL_TYPES, &ignored));
        }

        table
    }

    /// Load a table from TOML:
    ///
    /// ```toml
    /// [functions.last]
    /// value_types = ["float", "unsigned"]
    /// args = [{ mandatory = true, kind = "sec_num" }, { kind = "sec" }]
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: FunctionTableFile = toml::from_str(content)?;

        if file.functions.is_empty() {
            return Err(CatalogError::EmptyTable);
        }

        let mut table = Self::new();
        for (name, spec) in file.functions {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(CatalogError::InvalidFunctionName { name });
            }
            table.insert(&name, spec);
        }

        Ok(table)
    }

    pub fn insert(&mut self, name: &str, spec: FunctionSpec) {
        self.functions.insert(name.to_string(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Function names in alphabetical order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
