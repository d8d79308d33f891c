use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Write as _};
use tracing::{error, info};

use crate::helpers::execution::ExecutionContext;
use crate::helpers::text::{truncate, ERROR_BODY_MAX_CHARS};
use crate::http::HttpResponse;
use crate::observability::metrics::METRICS;

/// Records shown per operation in a summary
pub const SUMMARY_SAMPLES_PER_OPERATION: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Request,
    Correlation,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Request => "request",
            ErrorKind::Correlation => "correlation",
            ErrorKind::Validation => "validation",
        }
    }
}

/// One failure, immutable once appended
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorKind,
    pub operation: String,
    /// `None` when no response was received
    pub status: Option<u16>,
    pub body: String,
    pub input: Option<Value>,
    pub context: Option<String>,
    pub worker_id: u64,
    pub sequence: u64,
}

impl ErrorRecord {
    fn render_block(&self) -> String {
        let mut block = String::new();
        let _ = writeln!(block, "==== {} error: {} ====", self.kind.as_str(), self.operation);
        let _ = writeln!(block, "time:    {}", self.timestamp.to_rfc3339());
        let _ = writeln!(block, "worker:  {} (seq {})", self.worker_id, self.sequence);
        match self.status {
            Some(status) => {
                let _ = writeln!(block, "status:  {}", status);
            }
            None => {
                let _ = writeln!(block, "status:  no response");
            }
        }
        if let Some(context) = &self.context {
            let _ = writeln!(block, "context: {}", context);
        }
        if let Some(input) = &self.input {
            let _ = writeln!(block, "input:   {}", input);
        }
        let _ = write!(block, "body:    {}", self.body);
        block
    }
}

/// Run-scoped accumulator of failures for the end-of-run report.
#[derive(Debug, Default)]
pub struct ErrorLog {
    records: Vec<ErrorRecord>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request failure and print it as a block.
    pub fn log_error(
        &mut self,
        operation: &str,
        response: Option<&HttpResponse>,
        input: Option<Value>,
        context: Option<&str>,
        ctx: &ExecutionContext,
    ) {
        self.push(ErrorKind::Request, operation, response, input, context.map(str::to_owned), ctx);
    }

    pub fn log_correlation_failure(
        &mut self,
        operation: &str,
        key: &str,
        path: &str,
        response: &HttpResponse,
        ctx: &ExecutionContext,
    ) {
        let context = format!("correlation '{}' not found at '{}'", key, path);
        self.push(ErrorKind::Correlation, operation, Some(response), None, Some(context), ctx);
    }

    pub fn log_validation_failure(
        &mut self,
        operation: &str,
        response: &HttpResponse,
        failed_checks: &[String],
        ctx: &ExecutionContext,
    ) {
        let context = format!("failed checks: {}", failed_checks.join(", "));
        self.push(ErrorKind::Validation, operation, Some(response), None, Some(context), ctx);
    }

    fn push(
        &mut self,
        kind: ErrorKind,
        operation: &str,
        response: Option<&HttpResponse>,
        input: Option<Value>,
        context: Option<String>,
        ctx: &ExecutionContext,
    ) {
        let record = ErrorRecord {
            timestamp: Utc::now(),
            kind,
            operation: operation.to_owned(),
            status: response.map(|r| r.status),
            body: response
                .map(|r| truncate(&r.body, ERROR_BODY_MAX_CHARS))
                .unwrap_or_default(),
            input,
            context,
            worker_id: ctx.worker_id,
            sequence: ctx.sequence,
        };

        METRICS.error_records.with_label_values(&[kind.as_str()]).inc();
        error!(
            kind = kind.as_str(),
            operation,
            status = ?record.status,
            worker_id = ctx.worker_id,
            sequence = ctx.sequence,
            "\n{}",
            record.render_block()
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn by_operation<'a>(&'a self, operation: &'a str) -> impl Iterator<Item = &'a ErrorRecord> {
        self.records.iter().filter(move |r| r.operation == operation)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Group records by operation, in order of first occurrence, and log the report.
    pub fn summarize(&self) -> ErrorSummary {
        let mut operations: Vec<OperationSummary> = Vec::new();
        for record in &self.records {
            let pos = match operations.iter().position(|o| o.operation == record.operation) {
                Some(pos) => pos,
                None => {
                    operations.push(OperationSummary {
                        operation: record.operation.clone(),
                        count: 0,
                        samples: Vec::new(),
                        omitted: 0,
                    });
                    operations.len() - 1
                }
            };
            let entry = &mut operations[pos];
            entry.count += 1;
            if entry.samples.len() < SUMMARY_SAMPLES_PER_OPERATION {
                entry.samples.push(record.clone());
            } else {
                entry.omitted += 1;
            }
        }

        let summary = ErrorSummary {
            total: self.records.len(),
            operations,
        };
        info!("\n{}", summary);
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationSummary {
    pub operation: String,
    pub count: usize,
    pub samples: Vec<ErrorRecord>,
    pub omitted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    pub total: usize,
    pub operations: Vec<OperationSummary>,
}

impl fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total == 0 {
            return write!(f, "no errors recorded");
        }
        writeln!(f, "error summary: {} total", self.total)?;
        for op in &self.operations {
            writeln!(f, "- {}: {}", op.operation, op.count)?;
            for record in &op.samples {
                writeln!(
                    f,
                    "    [{}] {} worker={} seq={} status={} {}",
                    record.kind.as_str(),
                    record.timestamp.to_rfc3339(),
                    record.worker_id,
                    record.sequence,
                    record.status.map_or_else(|| "-".to_owned(), |s| s.to_string()),
                    record.context.as_deref().unwrap_or(""),
                )?;
            }
            if op.omitted > 0 {
                writeln!(f, "    ... {} more omitted", op.omitted)?;
            }
        }
        Ok(())
    }
}
