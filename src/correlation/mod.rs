//! Correlation store
//!
//! Values extracted from one response and reused by later steps of the same
//! logical run.

pub mod path;
pub mod store;

pub use path::resolve_path;
pub use store::{CorrelationEntry, CorrelationStore, ExtractOptions};
