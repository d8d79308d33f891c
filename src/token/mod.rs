//! Token cache
//!
//! One auth token shared by every run of a worker, regenerated once 80% of its
//! configured lifetime has elapsed. Workers receive the initial state as a
//! serializable [`TokenSnapshot`] and keep their own local copy from there.

pub mod cache;
pub mod generator;
pub mod state;

pub use cache::TokenCache;
pub use state::{TokenSnapshot, TokenState};
