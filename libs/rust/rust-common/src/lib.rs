//! Shared library for cross-cutting concerns in auth-platform Rust services.
//!
//! This crate provides centralized implementations for:
//! - Tracing subscriber bootstrap (plain or JSON output)
//! - Keyed sliding-window rate limiting

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod rate_limiter;
pub mod tracing_config;

pub use rate_limiter::{RateLimitConfig, RateLimitDecision, SlidingWindowLimiter};
pub use tracing_config::{init_tracing, TracingConfig};
