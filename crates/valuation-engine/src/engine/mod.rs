//! Valuation engine
//!
//! Orchestrates data fetching, the valuation pipeline and the report cache

pub mod pipeline;
pub mod report;
pub mod valuation_engine;

#[cfg(test)]
pub(crate) mod fixtures;

pub use pipeline::PipelineInputs;
pub use report::{CurrentMetrics, ValuationReport};
pub use valuation_engine::ValuationEngine;
