use serde::Deserialize;

pub const DEFAULT_MAX_ROWS_PER_WORKER: u64 = 1000;

/// ================================
/// Datasets
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub path: String,
    #[serde(flatten)]
    pub options: LoadOptions,
}

/// How a tabular source is parsed
#[derive(Debug, Deserialize, Clone)]
pub struct LoadOptions {
    #[serde(default = "default_true")]
    pub has_headers: bool,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// skip records whose fields are all empty
    #[serde(default = "default_true")]
    pub skip_empty_lines: bool,
    /// a missing source is fatal when set, an empty dataset otherwise
    #[serde(default = "default_true")]
    pub required: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            has_headers: true,
            delimiter: default_delimiter(),
            skip_empty_lines: true,
            required: true,
        }
    }
}

/// ================================
/// Unique allocation
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct AllocationOptions {
    /// assumed upper bound of runs a single worker performs
    #[serde(default = "default_max_rows_per_worker")]
    pub max_rows_per_worker: u64,
    #[serde(default = "default_true")]
    pub abort_on_exhaustion: bool,
}

impl Default for AllocationOptions {
    fn default() -> Self {
        Self {
            max_rows_per_worker: DEFAULT_MAX_ROWS_PER_WORKER,
            abort_on_exhaustion: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

fn default_max_rows_per_worker() -> u64 {
    DEFAULT_MAX_ROWS_PER_WORKER
}
