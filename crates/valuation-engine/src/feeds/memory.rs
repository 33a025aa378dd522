//! In-process market data, loadable from a JSON snapshot

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{FundamentalsFeed, PriceFeed};
use crate::domain::{PricePoint, QuarterlyFundamental, Ticker};
use crate::error::{FeedError, Result, ValuationError};

/// Default number of days to look back for a trading day
pub const DEFAULT_LOOKUP_WINDOW_DAYS: i64 = 5;

/// Serialized form of an [`InMemoryMarketData`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub fundamentals: Vec<QuarterlyFundamental>,
    #[serde(default)]
    pub prices: Vec<PricePoint>,
    /// Latest quotes; tickers missing here fall back to their newest price point
    #[serde(default)]
    pub current_prices: HashMap<Ticker, f64>,
}

/// Fundamentals and price feed backed by in-memory maps
///
/// Price lookups resolve to the exact date, or else to the most recent
/// earlier trading day within the lookup window.
#[derive(Debug, Clone)]
pub struct InMemoryMarketData {
    fundamentals: HashMap<Ticker, Vec<QuarterlyFundamental>>,
    prices: HashMap<Ticker, BTreeMap<NaiveDate, f64>>,
    current: HashMap<Ticker, f64>,
    lookup_window: Duration,
}

impl Default for InMemoryMarketData {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self {
            fundamentals: HashMap::new(),
            prices: HashMap::new(),
            current: HashMap::new(),
            lookup_window: Duration::days(DEFAULT_LOOKUP_WINDOW_DAYS),
        }
    }

    /// Change how far back a price lookup may reach
    pub fn with_lookup_window_days(mut self, days: i64) -> Self {
        self.lookup_window = Duration::days(days.max(0));
        self
    }

    /// Add quarterly records; they are grouped by their own ticker
    pub fn with_quarters(mut self, quarters: impl IntoIterator<Item = QuarterlyFundamental>) -> Self {
        for quarter in quarters {
            self.fundamentals
                .entry(quarter.ticker.clone())
                .or_default()
                .push(quarter);
        }
        self
    }

    pub fn with_price(mut self, ticker: &Ticker, date: NaiveDate, close: f64) -> Self {
        self.prices
            .entry(ticker.clone())
            .or_default()
            .insert(date, close);
        self
    }

    pub fn with_current_price(mut self, ticker: &Ticker, price: f64) -> Self {
        self.current.insert(ticker.clone(), price);
        self
    }

    pub fn from_snapshot(snapshot: MarketSnapshot) -> Self {
        let mut data = Self::new().with_quarters(snapshot.fundamentals);
        for point in snapshot.prices {
            data = data.with_price(&point.ticker, point.date, point.close);
        }
        data.current.extend(snapshot.current_prices);
        data
    }

    /// Parse a JSON [`MarketSnapshot`]
    pub fn from_json_str(json: &str) -> Result<Self> {
        let snapshot: MarketSnapshot = serde_json::from_str(json)
            .map_err(|e| ValuationError::ConfigError(format!("invalid market snapshot: {e}")))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Tickers that have fundamentals loaded, sorted
    pub fn tickers(&self) -> Vec<&Ticker> {
        let mut tickers: Vec<_> = self.fundamentals.keys().collect();
        tickers.sort();
        tickers
    }
}

#[async_trait]
impl FundamentalsFeed for InMemoryMarketData {
    async fn get_quarterly_fundamentals(
        &self,
        ticker: &Ticker,
    ) -> std::result::Result<Vec<QuarterlyFundamental>, FeedError> {
        self.fundamentals
            .get(ticker)
            .cloned()
            .ok_or_else(|| FeedError::not_found(ticker.as_str(), "fundamentals"))
    }
}

#[async_trait]
impl PriceFeed for InMemoryMarketData {
    async fn get_price(
        &self,
        ticker: &Ticker,
        date: NaiveDate,
    ) -> std::result::Result<f64, FeedError> {
        let history = self
            .prices
            .get(ticker)
            .ok_or_else(|| FeedError::not_found(ticker.as_str(), "price history"))?;

        let earliest = date - self.lookup_window;
        history
            .range(earliest..=date)
            .next_back()
            .map(|(_, close)| *close)
            .ok_or_else(|| FeedError::not_found(ticker.as_str(), format!("price near {date}")))
    }

    async fn get_current_price(&self, ticker: &Ticker) -> std::result::Result<f64, FeedError> {
        if let Some(price) = self.current.get(ticker) {
            return Ok(*price);
        }
        self.prices
            .get(ticker)
            .and_then(|history| history.values().next_back().copied())
            .ok_or_else(|| FeedError::not_found(ticker.as_str(), "current price"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_exact_and_nearby_price_lookup() {
        let aapl = Ticker::parse("AAPL").unwrap();
        let data = InMemoryMarketData::new()
            .with_price(&aapl, date(2024, 5, 2), 170.0)
            .with_price(&aapl, date(2024, 5, 3), 183.0);

        assert_eq!(data.get_price(&aapl, date(2024, 5, 3)).await.unwrap(), 183.0);
        // Weekend resolves to Friday's close
        assert_eq!(data.get_price(&aapl, date(2024, 5, 5)).await.unwrap(), 183.0);
        // Only earlier days are eligible
        assert!(data.get_price(&aapl, date(2024, 5, 1)).await.is_err());
        // Outside the five day window
        let err = data.get_price(&aapl, date(2024, 5, 20)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_current_price_falls_back_to_latest_close() {
        let aapl = Ticker::parse("AAPL").unwrap();
        let msft = Ticker::parse("MSFT").unwrap();
        let data = InMemoryMarketData::new()
            .with_price(&aapl, date(2024, 5, 2), 170.0)
            .with_price(&aapl, date(2024, 5, 3), 183.0)
            .with_current_price(&msft, 410.5);

        assert_eq!(data.get_current_price(&aapl).await.unwrap(), 183.0);
        assert_eq!(data.get_current_price(&msft).await.unwrap(), 410.5);
        let unknown = Ticker::parse("ZZZZ").unwrap();
        assert!(data.get_current_price(&unknown).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_ticker_fundamentals() {
        let data = InMemoryMarketData::new();
        let err = data
            .get_quarterly_fundamentals(&Ticker::parse("NOPE").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, FeedError::not_found("NOPE", "fundamentals"));
    }

    #[tokio::test]
    async fn test_snapshot_from_json() {
        let json = r#"{
            "fundamentals": [
                {"ticker": "aapl", "fiscal_quarter": "2024-Q1", "fiscal_date": "2024-03-30",
                 "reported_date": "2024-05-02", "eps": 1.53, "net_margin": 0.26}
            ],
            "prices": [{"ticker": "AAPL", "date": "2024-05-02", "close": 173.03}],
            "current_prices": {"aapl": 259.37}
        }"#;

        let data = InMemoryMarketData::from_json_str(json).unwrap();
        let aapl = Ticker::parse("AAPL").unwrap();

        let quarters = data.get_quarterly_fundamentals(&aapl).await.unwrap();
        assert_eq!(quarters.len(), 1);
        assert_eq!(quarters[0].net_margin, Some(0.26));
        assert_eq!(data.get_current_price(&aapl).await.unwrap(), 259.37);
        assert_eq!(data.tickers(), vec![&aapl]);
    }

    #[test]
    fn test_snapshot_rejects_bad_json() {
        assert!(InMemoryMarketData::from_json_str("{not json").is_err());
    }
}
