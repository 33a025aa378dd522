//! Collaborator contracts for market data
//!
//! The engine never talks to providers directly. It consumes a fundamentals
//! feed and a price feed; retries, rate limits and timeouts are the
//! implementor's business.

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{QuarterlyFundamental, Ticker};
use crate::error::FeedError;

pub use memory::{InMemoryMarketData, MarketSnapshot};

/// Source of normalized quarterly fundamentals
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundamentalsFeed: Send + Sync {
    /// All known quarters for `ticker`, in any order
    ///
    /// Returns `FeedError::NotFound` for unknown tickers. A short history is
    /// not an error.
    async fn get_quarterly_fundamentals(
        &self,
        ticker: &Ticker,
    ) -> Result<Vec<QuarterlyFundamental>, FeedError>;
}

/// Source of closing prices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Close on `date`, or the nearest trading day the feed considers equivalent
    async fn get_price(&self, ticker: &Ticker, date: NaiveDate) -> Result<f64, FeedError>;

    /// Latest available price
    async fn get_current_price(&self, ticker: &Ticker) -> Result<f64, FeedError>;
}
