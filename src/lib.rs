//! # Load Test Kit
//!
//! Building blocks for scripted HTTP load tests: a shared bearer token that
//! refreshes itself before expiry, per-worker unique allocation of CSV test
//! data, extraction of values from JSON responses for use in later requests,
//! and response validation with an end-of-run error report.
//!
//! Modules:
//! - `config` — YAML configuration and its validation
//! - `token` — token generation, state and the per-worker cache
//! - `data` — CSV datasets and row allocation
//! - `correlation` — run-scoped values extracted from responses
//! - `validation` — response checks and the error log
//! - `http` — request/response types and the executor seam
//! - `observability` — prometheus counters

pub mod config;
pub mod correlation;
pub mod data;
pub mod errors;
pub mod helpers;
pub mod http;
pub mod observability;
pub mod token;
pub mod utils;
pub mod validation;

#[cfg(test)]
mod tests;

pub use crate::errors::{KitError, KitResult};
pub use crate::helpers::execution::ExecutionContext;
pub use crate::token::{TokenCache, TokenSnapshot};
