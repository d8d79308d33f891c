//! Unique data allocation
//!
//! Datasets are loaded once and never mutated; any number of workers read
//! them without synchronization.

pub mod allocator;
pub mod dataset;
pub mod loader;
pub mod registry;

pub use allocator::{allocation_index, check_sufficiency, get_random, get_unique, validate_schema};
pub use dataset::{Dataset, Row};
pub use loader::{load, load_str};
pub use registry::DatasetRegistry;
