//! Trigger expression parser and validator
//!
//! Checks monitoring trigger expressions such as
//! `{Zabbix server:agent.ping.last(0)}=0` and extracts their host, item,
//! function and macro references.
//!
//! ```no_run
//! let parsed = trigger_expr::parse("{host:system.cpu.load.avg(5m)}>1.5").unwrap();
//! assert_eq!(parsed.hosts, vec!["host"]);
//! ```

// Internal modules
#[macro_use]
pub mod logging;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod expression;
pub mod utils;

// Re-export key types for library consumers
pub use batch::{BatchConfig, BatchError, BatchResults};
pub use catalog::{DefaultCatalog, ExpressionCatalog, FunctionTable};
pub use expression::{
    parse, ExpressionError, ExpressionErrorKind, ExpressionParser, ExpressionReference,
    FunctionReference, ParsedExpression,
};
