//! P/E multiple valuation engine
//!
//! This crate turns a company's quarterly fundamentals and price history into
//! a fair value estimate. It includes:
//!
//! - Forward EPS projection (growth rate and linear trend, blended)
//! - Trailing P/E history with distribution statistics
//! - Optional peer group P/E comparison with bounded concurrent fetches
//! - A fundamentals-implied P/E from growth, margin and leverage heuristics
//! - Weighted synthesis into a justified P/E range and a fair value range
//! - A TTL cache of finished reports keyed by ticker and peer set
//!
//! # Architecture
//!
//! `ValuationEngine` fetches through two collaborator traits,
//! [`FundamentalsFeed`] and [`PriceFeed`], then runs the synchronous stages
//! in [`analysis`] and stores the resulting [`ValuationReport`] in a
//! [`ValuationCache`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use valuation_engine::{InMemoryMarketData, ValuationConfig, ValuationEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let market = Arc::new(InMemoryMarketData::from_json_str(&snapshot)?);
//!     let config = Arc::new(ValuationConfig::default().with_env_overrides()?);
//!
//!     let engine = ValuationEngine::new(market.clone(), market, config)?;
//!     let report = engine.compute_valuation("AAPL", &["MSFT", "GOOGL"]).await?;
//!     println!("{}", report);
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod feeds;

// Re-export main types for convenience
pub use analysis::{Assessment, PeerComparison};
pub use cache::{TimedValuationCache, ValuationCache};
pub use config::{RiskPolicy, SynthesisWeights, ValuationConfig, ValuationConfigBuilder};
pub use domain::{PricePoint, QuarterlyDataset, QuarterlyFundamental, Ticker, ValuationRequest};
pub use engine::{CurrentMetrics, ValuationEngine, ValuationReport};
pub use error::{FeedError, Result, Stage, ValuationError};
pub use feeds::{FundamentalsFeed, InMemoryMarketData, MarketSnapshot, PriceFeed};
