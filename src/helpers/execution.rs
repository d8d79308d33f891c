use serde::{Deserialize, Serialize};

/// Identity of the logical run currently executing.
///
/// `worker_id` is 1-based, `sequence` counts the worker's runs starting at 0.
/// Both are supplied by the host scheduler and only read by the kit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub worker_id: u64,
    pub sequence: u64,
}

impl ExecutionContext {
    pub fn new(worker_id: u64, sequence: u64) -> Self {
        Self { worker_id, sequence }
    }
}

impl std::fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker={} seq={}", self.worker_id, self.sequence)
    }
}
