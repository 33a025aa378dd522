//! Shared utilities for the valuation workspace
//!
//! This crate provides the ambient pieces every binary in the workspace needs:
//! tracing subscriber setup and the small application-level configuration that
//! drives it.

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::{LogFormat, LoggingError, init_tracing_with};
