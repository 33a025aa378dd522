//! Error types for valuation operations

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage a failure is attributed to
///
/// Peer comparison has no stage: a failing peer is dropped, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Loading the target's fundamentals and current price
    Inputs,
    ForwardEps,
    HistoricalPe,
    Fundamentals,
    Synthesis,
    FairValue,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inputs => "inputs",
            Self::ForwardEps => "forward EPS",
            Self::HistoricalPe => "historical P/E",
            Self::Fundamentals => "fundamentals",
            Self::Synthesis => "synthesis",
            Self::FairValue => "fair value",
        };
        f.write_str(name)
    }
}

/// Failures reported by the fundamentals and price collaborators
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The collaborator has nothing for this ticker (or date)
    #[error("{what} not found for {ticker}")]
    NotFound { ticker: String, what: String },

    /// The collaborator could not be reached or failed internally
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

impl FeedError {
    pub fn not_found(ticker: impl Into<String>, what: impl Into<String>) -> Self {
        Self::NotFound {
            ticker: ticker.into(),
            what: what.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Valuation specific errors
#[derive(Debug, Error)]
pub enum ValuationError {
    /// Ticker could not be normalized
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    /// The quarterly records violate a dataset invariant
    #[error("Invalid dataset for {ticker}: {reason}")]
    InvalidDataset { ticker: String, reason: String },

    /// Not enough usable data to compute a mandatory statistic
    #[error("Insufficient data for {ticker} at {stage}: {reason}")]
    InsufficientData {
        ticker: String,
        stage: Stage,
        reason: String,
    },

    /// A collaborator fetch failed; callers may fall back to a stale report
    #[error("Upstream unavailable for {ticker} at {stage}: {source}")]
    UpstreamUnavailable {
        ticker: String,
        stage: Stage,
        #[source]
        source: FeedError,
    },

    /// No live cache entry for the requested key
    #[error("No cached valuation for {0}")]
    NotCached(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ValuationError {
    pub fn insufficient(ticker: impl Into<String>, stage: Stage, reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            ticker: ticker.into(),
            stage,
            reason: reason.into(),
        }
    }

    /// Stage the failure belongs to, when it came out of the pipeline
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::InsufficientData { stage, .. } | Self::UpstreamUnavailable { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }

    /// True for collaborator failures, as opposed to computed-value failures
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }
}

/// Result type alias for valuation operations
pub type Result<T> = std::result::Result<T, ValuationError>;
