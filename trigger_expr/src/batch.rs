//! Batch validation of many trigger expressions
//!
//! Expressions are validated sequentially or split into chunks across
//! worker threads. Every worker shares one `ExpressionParser`; outcomes are
//! returned in input order regardless of which thread produced them.

use crate::config::compile_time::batch::{MAX_EXPRESSIONS_PER_BATCH, MAX_WORKER_THREADS};
use crate::expression::{ExpressionError, ExpressionParser, ParsedExpression};
use crate::logging::{self, codes};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// BATCH TYPES
// ============================================================================

/// Batch validation configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_threads: usize,
    pub progress_reporting: bool,
    pub fail_fast: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_threads: std::thread::available_parallelism()
                .map(|n| n.get().min(MAX_WORKER_THREADS))
                .unwrap_or(4),
            progress_reporting: false,
            fail_fast: false,
        }
    }
}

/// Result of validating one expression of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionOutcome {
    /// Position in the input
    pub index: usize,
    pub expression: String,
    pub result: Result<ParsedExpression, ExpressionError>,
}

impl ExpressionOutcome {
    pub fn is_accepted(&self) -> bool {
        self.result.is_ok()
    }
}

/// Batch validation results
#[derive(Debug, Default)]
pub struct BatchResults {
    /// Sorted by input index
    pub outcomes: Vec<ExpressionOutcome>,
    pub processing_duration: Duration,
    pub expressions_submitted: usize,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.processed_count() - self.success_count()
    }

    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.success_count() as f64 / self.processed_count() as f64
        }
    }

    pub fn all_accepted(&self) -> bool {
        self.failure_count() == 0 && self.processed_count() == self.expressions_submitted
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExpressionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_accepted())
    }

    pub fn merge(&mut self, other: BatchResults) {
        self.outcomes.extend(other.outcomes);
        self.outcomes.sort_by_key(|o| o.index);
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch validation completed: {} expressions processed, {} accepted ({:.1}%), {} rejected, {:.2}s total",
            self.processed_count(),
            self.success_count(),
            self.success_rate() * 100.0,
            self.failure_count(),
            self.processing_duration.as_secs_f64()
        )
    }
}

/// Batch validation errors
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Failed to read expressions from {path}: {error}")]
    Io { path: String, error: String },

    #[error("No expressions to validate")]
    Empty,

    #[error("Too many expressions: {count} (max: {max})")]
    TooMany { count: usize, max: usize },

    #[error("Worker thread error: {message}")]
    ThreadError { message: String },
}

impl BatchError {
    pub fn code(&self) -> logging::Code {
        match self {
            BatchError::Io { .. } => codes::batch::INPUT_READ_ERROR,
            BatchError::Empty => codes::batch::EMPTY_BATCH,
            BatchError::TooMany { .. } => codes::batch::BATCH_TOO_LARGE,
            BatchError::ThreadError { .. } => codes::batch::WORKER_FAILURE,
        }
    }
}

// ============================================================================
// INPUT
// ============================================================================

/// Read one expression per line, skipping blank lines and `#` comments
pub fn read_expressions(path: &Path) -> Result<Vec<String>, BatchError> {
    let content = fs::read_to_string(path).map_err(|e| {
        let error = BatchError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        };
        crate::log_error!(error.code(), "Cannot read expression file",
            "file" => path.display(),
            "error" => &e
        );
        error
    })?;

    let expressions: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();

    crate::log_info!("Expressions loaded",
        "file" => path.display(),
        "count" => expressions.len()
    );

    Ok(expressions)
}

fn check_batch_size(expressions: &[String]) -> Result<(), BatchError> {
    if expressions.is_empty() {
        crate::log_error!(codes::batch::EMPTY_BATCH, "No expressions to validate");
        return Err(BatchError::Empty);
    }
    if expressions.len() > MAX_EXPRESSIONS_PER_BATCH {
        crate::log_error!(codes::batch::BATCH_TOO_LARGE, "Batch exceeds expression limit",
            "count" => expressions.len(),
            "max" => MAX_EXPRESSIONS_PER_BATCH
        );
        return Err(BatchError::TooMany {
            count: expressions.len(),
            max: MAX_EXPRESSIONS_PER_BATCH,
        });
    }
    Ok(())
}

fn validate_one(parser: &ExpressionParser, index: usize, expression: &str) -> ExpressionOutcome {
    let result = logging::with_expression_context(index, expression, || parser.parse(expression));
    ExpressionOutcome {
        index,
        expression: expression.to_string(),
        result,
    }
}

// ============================================================================
// BATCH PROCESSING
// ============================================================================

/// Validate expressions one after another on the calling thread
pub fn validate_expressions_sequential(
    expressions: &[String],
    parser: &ExpressionParser,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();
    check_batch_size(expressions)?;

    crate::log_info!("Starting sequential batch validation",
        "expressions" => expressions.len()
    );

    let mut results = BatchResults::new();
    results.expressions_submitted = expressions.len();

    for (index, expression) in expressions.iter().enumerate() {
        if config.progress_reporting {
            eprintln!("Validating expression {} of {}", index + 1, expressions.len());
        }

        let outcome = validate_one(parser, index, expression);
        let rejected = !outcome.is_accepted();
        results.outcomes.push(outcome);

        if rejected && config.fail_fast {
            crate::log_warning!("Fail-fast mode enabled, stopping batch validation");
            break;
        }
    }

    results.processing_duration = start_time.elapsed();
    log_completion(&results, 1);
    Ok(results)
}

/// Validate expressions in chunks spread across worker threads
pub fn validate_expressions_parallel(
    expressions: &[String],
    parser: &ExpressionParser,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();
    check_batch_size(expressions)?;

    let threads = config.max_threads.clamp(1, MAX_WORKER_THREADS);
    let chunk_size = calculate_chunk_size(expressions.len(), threads);

    crate::log_debug!("Parallel validation configuration",
        "expressions" => expressions.len(),
        "chunk_size" => chunk_size,
        "threads" => threads
    );

    let mut results = BatchResults::new();
    results.expressions_submitted = expressions.len();

    for (chunk_id, chunk) in expressions.chunks(chunk_size).enumerate() {
        let first_index = chunk_id * chunk_size;
        let chunk_results = validate_chunk_parallel(chunk, first_index, parser, threads)?;
        results.merge(chunk_results);

        if config.progress_reporting {
            eprintln!(
                "Validated {} of {} expressions",
                results.processed_count(),
                expressions.len()
            );
        }

        if config.fail_fast && results.failure_count() > 0 {
            crate::log_warning!("Fail-fast mode enabled, stopping batch validation");
            break;
        }
    }

    results.processing_duration = start_time.elapsed();
    log_completion(&results, threads);
    Ok(results)
}

/// Validate one chunk, splitting it evenly between threads
fn validate_chunk_parallel(
    expressions: &[String],
    first_index: usize,
    parser: &ExpressionParser,
    threads: usize,
) -> Result<BatchResults, BatchError> {
    let results = Arc::new(Mutex::new(BatchResults::new()));
    let per_thread = (expressions.len() + threads - 1) / threads;

    let mut handles = Vec::new();
    for (thread_id, slice) in expressions.chunks(per_thread.max(1)).enumerate() {
        let thread_expressions = slice.to_vec();
        let offset = first_index + thread_id * per_thread.max(1);
        let parser = parser.clone();
        let results_clone = Arc::clone(&results);

        handles.push(thread::spawn(move || {
            let outcomes: Vec<ExpressionOutcome> = thread_expressions
                .iter()
                .enumerate()
                .map(|(local, expression)| validate_one(&parser, offset + local, expression))
                .collect();

            let mut guard = results_clone
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.outcomes.extend(outcomes);
        }));
    }

    for handle in handles {
        handle.join().map_err(|_| {
            crate::log_error!(codes::batch::WORKER_FAILURE, "Worker thread panicked");
            BatchError::ThreadError {
                message: "Thread panicked during validation".to_string(),
            }
        })?;
    }

    let mutex = Arc::try_unwrap(results).map_err(|_| BatchError::ThreadError {
        message: "Failed to collect results from worker threads".to_string(),
    })?;
    let mut chunk_results = mutex
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    chunk_results.outcomes.sort_by_key(|o| o.index);

    Ok(chunk_results)
}

/// Chunk size for parallel validation
fn calculate_chunk_size(count: usize, max_threads: usize) -> usize {
    const MIN_CHUNK_SIZE: usize = 1;
    const MAX_CHUNK_SIZE: usize = 1000;

    let threads = max_threads.max(1);
    let ideal_chunk_size = (count + threads - 1) / threads;
    ideal_chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

fn log_completion(results: &BatchResults, threads: usize) {
    crate::log_success!(
        codes::success::BATCH_COMPLETED,
        "Batch validation completed",
        "processed" => results.processed_count(),
        "accepted" => results.success_count(),
        "rejected" => results.failure_count(),
        "threads_used" => threads,
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Validate expressions with the default parser
pub fn validate_expressions(
    expressions: &[String],
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    validate_expressions_with_parser(expressions, &ExpressionParser::new(), config)
}

pub fn validate_expressions_with_parser(
    expressions: &[String],
    parser: &ExpressionParser,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    if config.max_threads <= 1 || expressions.len() <= 1 {
        validate_expressions_sequential(expressions, parser, config)
    } else {
        validate_expressions_parallel(expressions, parser, config)
    }
}

/// Validate every expression listed in a file
pub fn validate_file(path: &Path, config: &BatchConfig) -> Result<BatchResults, BatchError> {
    let expressions = read_expressions(path)?;
    validate_expressions(&expressions, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionErrorKind;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    fn sample_expressions() -> Vec<String> {
        vec![
            "{host:key.last(0)}=0".to_string(),
            "{host:key.last(0)}{host:key.last(0)}".to_string(),
            "(1+{host:item.last(0)})*2>10".to_string(),
            "".to_string(),
            "{host:item.count(#3,>5)}=1".to_string(),
            "{$MY.MACRO}".to_string(),
            "{host:key.nodata(5m)}=1".to_string(),
        ]
    }

    fn parallel_config(threads: usize) -> BatchConfig {
        BatchConfig {
            max_threads: threads,
            progress_reporting: false,
            fail_fast: false,
        }
    }

    #[test]
    fn test_read_expressions() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("triggers.txt");
        fs::write(
            &path,
            "# production triggers\n{host:key.last(0)}=0\n\n  {host:key.diff()}=1  \n",
        )
        .unwrap();

        let expressions = read_expressions(&path).unwrap();
        assert_eq!(
            expressions,
            vec!["{host:key.last(0)}=0", "{host:key.diff()}=1"]
        );
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = tempdir().unwrap();
        let result = read_expressions(&temp_dir.path().join("missing.txt"));
        assert_matches!(result, Err(BatchError::Io { .. }));
    }

    #[test]
    fn test_sequential_validation() {
        let expressions = sample_expressions();
        let results = validate_expressions(&expressions, &parallel_config(1)).unwrap();

        assert_eq!(results.processed_count(), 7);
        assert_eq!(results.success_count(), 4);
        assert_eq!(results.failure_count(), 3);
        assert!(!results.all_accepted());
        assert_matches!(
            &results.outcomes[1].result,
            Err(e) if e.kind == ExpressionErrorKind::AdjacentValues
        );
    }

    #[test]
    fn test_parallel_validation_preserves_order() {
        let expressions = sample_expressions();
        let sequential = validate_expressions(&expressions, &parallel_config(1)).unwrap();
        let parallel = validate_expressions(&expressions, &parallel_config(3)).unwrap();

        assert_eq!(parallel.processed_count(), expressions.len());
        for (index, outcome) in parallel.outcomes.iter().enumerate() {
            assert_eq!(outcome.index, index);
            assert_eq!(outcome.expression, expressions[index]);
        }
        assert_eq!(sequential.outcomes, parallel.outcomes);
    }

    #[test]
    fn test_fail_fast_sequential() {
        let config = BatchConfig {
            max_threads: 1,
            progress_reporting: false,
            fail_fast: true,
        };
        let results = validate_expressions(&sample_expressions(), &config).unwrap();
        assert_eq!(results.processed_count(), 2);
        assert_eq!(results.failure_count(), 1);
        assert!(!results.all_accepted());
    }

    #[test]
    fn test_empty_batch() {
        assert_matches!(
            validate_expressions(&[], &BatchConfig::default()),
            Err(BatchError::Empty)
        );
    }

    #[test]
    fn test_validate_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("triggers.txt");
        fs::write(&path, "{host:key.last(0)}=0\n{host:key.last(0)}>{$LIMIT}\n").unwrap();

        let results = validate_file(&path, &parallel_config(2)).unwrap();
        assert!(results.all_accepted());
        assert!(results.summary().contains("2 accepted"));
    }

    #[test]
    fn test_chunk_size_calculation() {
        assert_eq!(calculate_chunk_size(100, 4), 25);
        assert_eq!(calculate_chunk_size(10, 4), 3);
        assert_eq!(calculate_chunk_size(1, 4), 1);
        assert_eq!(calculate_chunk_size(0, 4), 1);
        assert_eq!(calculate_chunk_size(100_000, 4), 1000);
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert!(config.max_threads >= 1);
        assert!(config.max_threads <= MAX_WORKER_THREADS);
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BatchError::Empty.code(), codes::batch::EMPTY_BATCH);
        assert_eq!(
            BatchError::TooMany { count: 2, max: 1 }.code(),
            codes::batch::BATCH_TOO_LARGE
        );
    }
}
