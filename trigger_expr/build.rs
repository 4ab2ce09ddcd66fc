// build.rs - TOML-driven compile-time constant generation
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    expression: ExpressionLimits,
    batch: BatchLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct ExpressionLimits {
    max_expression_length: usize,
    max_references: usize,
    max_parameters: usize,
    max_item_key_depth: usize,
}

#[derive(serde::Deserialize)]
struct BatchLimits {
    max_worker_threads: usize,
    max_expressions_per_batch: usize,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    log_buffer_size: usize,
    max_log_message_length: usize,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=TRIGGER_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=TRIGGER_CONFIG_DIR");

    let profile = env::var("TRIGGER_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("TRIGGER_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Find workspace root (parent of trigger_expr directory)
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_limits(&config, &profile);
    generate_constants(&config, &profile);
}

fn validate_limits(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_EXPRESSION_LENGTH: usize = 1_000_000;
    const ABSOLUTE_MAX_ITEM_KEY_DEPTH: usize = 256;

    if config.expression.max_expression_length == 0
        || config.expression.max_expression_length > ABSOLUTE_MAX_EXPRESSION_LENGTH
    {
        panic!("LIMITS: max_expression_length must be between 1 and {ABSOLUTE_MAX_EXPRESSION_LENGTH}");
    }

    if config.expression.max_references == 0 {
        panic!("LIMITS: max_references must be at least 1");
    }

    if config.expression.max_parameters == 0 {
        panic!("LIMITS: max_parameters must be at least 1");
    }

    if config.expression.max_item_key_depth == 0
        || config.expression.max_item_key_depth > ABSOLUTE_MAX_ITEM_KEY_DEPTH
    {
        panic!("LIMITS: max_item_key_depth must be between 1 and {ABSOLUTE_MAX_ITEM_KEY_DEPTH}");
    }

    if config.batch.max_worker_threads == 0 {
        panic!("LIMITS: max_worker_threads must be at least 1");
    }

    if config.logging.log_buffer_size < 100 || config.logging.log_buffer_size > 100_000 {
        panic!("LIMITS: log_buffer_size must be between 100 and 100000");
    }

    if profile == "production" {
        if config.expression.max_expression_length > 65_535 {
            panic!("PRODUCTION: max_expression_length too high for production");
        }
        if config.batch.max_worker_threads > 64 {
            panic!("PRODUCTION: max_worker_threads too high for production");
        }
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod expression {{
        pub const MAX_EXPRESSION_LENGTH: usize = {};
        pub const MAX_REFERENCES: usize = {};
        pub const MAX_PARAMETERS: usize = {};
        pub const MAX_ITEM_KEY_DEPTH: usize = {};
    }}

    pub mod batch {{
        pub const MAX_WORKER_THREADS: usize = {};
        pub const MAX_EXPRESSIONS_PER_BATCH: usize = {};
    }}

    pub mod logging {{
        pub const LOG_BUFFER_SIZE: usize = {};
        pub const MAX_LOG_MESSAGE_LENGTH: usize = {};
    }}
}}
"#,
        profile,
        config.expression.max_expression_length,
        config.expression.max_references,
        config.expression.max_parameters,
        config.expression.max_item_key_depth,
        config.batch.max_worker_threads,
        config.batch.max_expressions_per_batch,
        config.logging.log_buffer_size,
        config.logging.max_log_message_length,
    );

    fs::write(output_path, constants_code).unwrap();
}
