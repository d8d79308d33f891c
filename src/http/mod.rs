//! HTTP boundary
//!
//! The kit only builds `{method, url, headers, body}` and consumes
//! `{status, body, timing_ms}`; the transport sits behind [`HttpExecutor`].

pub mod client;
pub mod types;

pub use client::{HttpExecutor, ReqwestExecutor};
pub use types::{HttpRequest, HttpResponse};
