//! Lookup oracles consumed by the expression parser
//!
//! The parser never hard-codes what a valid host, item key, macro or
//! function is. It asks an `ExpressionCatalog`. `DefaultCatalog` provides
//! the stock rules; applications with their own host or function inventory
//! implement the trait themselves.

pub mod formats;
pub mod functions;
pub mod item_key;

pub use functions::{ArgKind, ArgSpec, CatalogError, FunctionSpec, FunctionTable, ValueType};

use crate::config::compile_time::expression::MAX_ITEM_KEY_DEPTH;
use crate::logging::codes;

pub trait ExpressionCatalog: Send + Sync {
    fn host_name_is_valid(&self, host: &str) -> bool;

    /// `Err` carries a reason that is shown to the user verbatim
    fn validate_item_key(&self, key: &str) -> Result<(), String>;

    fn macro_name_is_valid(&self, name: &str) -> bool;

    fn user_macro_name_is_valid(&self, name: &str) -> bool;

    fn allowed_functions(&self) -> &FunctionTable;

    fn function_format_is_valid(&self, call: &str) -> bool;

    fn float_format_is_valid(&self, value: &str) -> bool;

    fn ticks_format_is_valid(&self, value: &str) -> bool;

    fn number_is_valid(&self, value: &str) -> bool {
        formats::number_is_valid(value)
    }
}

/// Stock catalog backed by the built-in function table and format patterns
#[derive(Debug, Clone)]
pub struct DefaultCatalog {
    functions: FunctionTable,
    max_item_key_depth: usize,
}

impl DefaultCatalog {
    pub fn new() -> Self {
        Self::with_functions(FunctionTable::builtin())
    }

    pub fn with_functions(functions: FunctionTable) -> Self {
        Self {
            functions,
            max_item_key_depth: MAX_ITEM_KEY_DEPTH,
        }
    }

    /// Build a catalog whose function table comes from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        match FunctionTable::from_toml_str(content) {
            Ok(functions) => {
                crate::log_success!(
                    codes::success::CATALOG_LOADED,
                    "Function catalog loaded",
                    "functions" => functions.len()
                );
                Ok(Self::with_functions(functions))
            }
            Err(err) => {
                crate::log_error!(
                    codes::catalog::CATALOG_LOAD_ERROR,
                    "Function catalog could not be loaded",
                    "error" => &err
                );
                Err(err)
            }
        }
    }

    pub fn with_max_item_key_depth(mut self, depth: usize) -> Self {
        self.max_item_key_depth = depth;
        self
    }
}

impl Default for DefaultCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionCatalog for DefaultCatalog {
    fn host_name_is_valid(&self, host: &str) -> bool {
        formats::host_name_is_valid(host)
    }

    fn validate_item_key(&self, key: &str) -> Result<(), String> {
        item_key::validate_item_key(key, self.max_item_key_depth)
    }

    fn macro_name_is_valid(&self, name: &str) -> bool {
        formats::macro_name_is_valid(name)
    }

    fn user_macro_name_is_valid(&self, name: &str) -> bool {
        formats::user_macro_name_is_valid(name)
    }

    fn allowed_functions(&self) -> &FunctionTable {
        &self.functions
    }

    fn function_format_is_valid(&self, call: &str) -> bool {
        formats::function_format_is_valid(call)
    }

    fn float_format_is_valid(&self, value: &str) -> bool {
        formats::float_format_is_valid(value)
    }

    fn ticks_format_is_valid(&self, value: &str) -> bool {
        formats::ticks_format_is_valid(value)
    }
}
