use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use trigger_expr::batch::{self, BatchConfig, BatchResults, ExpressionOutcome};
use trigger_expr::expression::ExpressionReference;
use trigger_expr::logging;

/// Validate trigger expressions.
#[derive(Parser, Debug)]
#[command(name = "trigger-expr", version, about = "Validate trigger expressions")]
struct Args {
    /// Expressions to validate
    expressions: Vec<String>,

    /// Read expressions from a file, one per line (`#` starts a comment)
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Print each result as JSON
    #[arg(long)]
    json: bool,

    /// Maximum worker threads
    #[arg(short, long)]
    threads: Option<usize>,

    /// Stop after the first rejected expression
    #[arg(long)]
    fail_fast: bool,

    /// Log debug events to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log events as JSON lines
    #[arg(long)]
    structured_logs: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    match run(&args) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(args: &Args) -> Result<(), String> {
    let preferences = if args.verbose {
        logging::config::get_verbose_preferences(args.structured_logs)
    } else {
        logging::config::get_quiet_preferences(args.structured_logs)
    };
    logging::config::init_runtime_preferences(preferences)?;
    logging::init_global_logging()
}

/// Returns whether every expression was accepted
fn run(args: &Args) -> Result<bool, Box<dyn std::error::Error>> {
    let mut expressions = args.expressions.clone();
    if let Some(path) = &args.file {
        expressions.extend(batch::read_expressions(path)?);
    }

    let mut config = BatchConfig {
        fail_fast: args.fail_fast,
        ..BatchConfig::default()
    };
    if let Some(threads) = args.threads {
        config.max_threads = threads.max(1);
    }

    let results = batch::validate_expressions(&expressions, &config)?;

    if args.json {
        print_json(&results)?;
    } else {
        print_report(&results);
    }

    Ok(results.all_accepted())
}

fn print_json(results: &BatchResults) -> Result<(), serde_json::Error> {
    for outcome in &results.outcomes {
        let value = match &outcome.result {
            Ok(parsed) => json!({
                "index": outcome.index,
                "accepted": true,
                "result": parsed,
            }),
            Err(error) => json!({
                "index": outcome.index,
                "expression": outcome.expression,
                "accepted": false,
                "error": {
                    "code": error.error_code().as_str(),
                    "category": error.category(),
                    "message": error.message(),
                    "offset": error.offset,
                    "context": error.context,
                },
            }),
        };
        println!("{}", serde_json::to_string(&value)?);
    }
    Ok(())
}

fn print_report(results: &BatchResults) {
    for outcome in &results.outcomes {
        print_outcome(outcome);
    }

    println!();
    println!("{}", results.summary());
}

fn print_outcome(outcome: &ExpressionOutcome) {
    match &outcome.result {
        Ok(parsed) => {
            println!("✓ {}", outcome.expression);
            for reference in &parsed.references {
                match reference {
                    ExpressionReference::HostItemFunction(function) => println!(
                        "    host: {}  item: {}  function: {}",
                        function.host, function.item, function.function
                    ),
                    other => println!("    {}: {}", other.kind_name(), other.expression()),
                }
            }
        }
        Err(error) => {
            println!("✗ {}", outcome.expression);
            for line in error.messages() {
                println!("    {}", line);
            }
        }
    }
}
