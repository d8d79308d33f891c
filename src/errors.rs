//! Error kinds surfaced by the kit.
//!
//! Setup errors (`Config`, `Initialization`, required `DataLoad`) halt the
//! whole test. `DataExhausted` and a promoted `CorrelationMissing` abort the
//! current run. Everything else is local to the run that hit it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("token initialization failed: {0}")]
    Initialization(String),

    #[error("token generation failed: {0}")]
    Generation(String),

    #[error("dataset '{dataset}' could not be loaded: {reason}")]
    DataLoad { dataset: String, reason: String },

    #[error("dataset '{dataset}' exhausted: index {index} is out of bounds (rows: {len})")]
    DataExhausted {
        dataset: String,
        index: u64,
        len: usize,
    },

    #[error("dataset '{dataset}' is missing required fields: {}", missing.join(", "))]
    Schema {
        dataset: String,
        missing: Vec<String>,
    },

    #[error("required correlation values missing: {}", missing.join(", "))]
    CorrelationMissing { missing: Vec<String> },

    #[error("validation failed for '{api}': {}", failed.join(", "))]
    Validation { api: String, failed: Vec<String> },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl KitError {
    /// Whether the condition should stop the current run (or the whole test).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, KitError::Generation(_) | KitError::Validation { .. })
    }

    /// Reason string handed to the host's run-abort facility.
    pub fn abort_reason(&self) -> String {
        self.to_string()
    }
}

pub type KitResult<T> = Result<T, KitError>;
