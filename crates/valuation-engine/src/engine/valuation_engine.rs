//! Valuation engine - fetches inputs, runs the pipeline, maintains the cache

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use super::pipeline::{self, PipelineInputs};
use super::report::ValuationReport;
use crate::analysis::{historical_pe, peers};
use crate::cache::{TimedValuationCache, ValuationCache};
use crate::config::ValuationConfig;
use crate::domain::{QuarterlyDataset, Ticker, ValuationRequest};
use crate::error::{FeedError, Result, Stage, ValuationError};
use crate::feeds::{FundamentalsFeed, PriceFeed};

/// P/E valuation engine
///
/// Holds the two market data collaborators, the report cache and the
/// configuration. Cheap to share behind an `Arc`; concurrent calls only
/// contend on the cache.
pub struct ValuationEngine {
    fundamentals: Arc<dyn FundamentalsFeed>,
    prices: Arc<dyn PriceFeed>,
    cache: Arc<dyn ValuationCache>,
    config: Arc<ValuationConfig>,
}

impl ValuationEngine {
    /// Create an engine with an in-memory cache using the configured TTL
    pub fn new(
        fundamentals: Arc<dyn FundamentalsFeed>,
        prices: Arc<dyn PriceFeed>,
        config: Arc<ValuationConfig>,
    ) -> Result<Self> {
        let cache = Arc::new(TimedValuationCache::new(config.cache_ttl));
        Self::with_cache(fundamentals, prices, cache, config)
    }

    /// Create an engine with a caller supplied cache
    pub fn with_cache(
        fundamentals: Arc<dyn FundamentalsFeed>,
        prices: Arc<dyn PriceFeed>,
        cache: Arc<dyn ValuationCache>,
        config: Arc<ValuationConfig>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fundamentals,
            prices,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Compute a fresh valuation and store it in the cache
    ///
    /// Always recomputes, even when a live entry exists, and restarts the
    /// entry's lifetime. On failure the cache is left untouched.
    #[instrument(skip(self, peers), fields(peers = peers.len()))]
    pub async fn compute_valuation<S: AsRef<str>>(
        &self,
        ticker: &str,
        peers: &[S],
    ) -> Result<Arc<ValuationReport>> {
        let request = ValuationRequest::new(ticker, peers)?;
        info!("Computing valuation for {}", request);

        let report = Arc::new(self.evaluate(&request).await?);
        self.cache.put(request, Arc::clone(&report)).await;
        Ok(report)
    }

    /// Return the live cached report for this request, never computing one
    #[instrument(skip(self, peers))]
    pub async fn get_cached_valuation<S: AsRef<str>>(
        &self,
        ticker: &str,
        peers: &[S],
    ) -> Result<Arc<ValuationReport>> {
        let request = ValuationRequest::new(ticker, peers)?;
        self.cache
            .get(&request)
            .await
            .ok_or_else(|| ValuationError::NotCached(request.to_string()))
    }

    /// Drop the cached report for this request, if any
    pub async fn invalidate<S: AsRef<str>>(&self, ticker: &str, peers: &[S]) -> Result<()> {
        let request = ValuationRequest::new(ticker, peers)?;
        self.cache.invalidate(&request).await;
        Ok(())
    }

    async fn evaluate(&self, request: &ValuationRequest) -> Result<ValuationReport> {
        let ticker = request.ticker();

        let quarters = self
            .fundamentals
            .get_quarterly_fundamentals(ticker)
            .await
            .map_err(|source| feed_failure(ticker, Stage::Inputs, "quarterly fundamentals", source))?;
        let dataset = QuarterlyDataset::new(ticker.clone(), quarters)?;
        dataset.require(self.config.min_quarters)?;
        let dataset = dataset.into_latest_run();
        debug!(ticker = %ticker, quarters = dataset.len(), "Fundamentals loaded");

        let price_dates = historical_pe::price_dates(&dataset);
        let (current_price, report_prices, peer_comparison) = tokio::join!(
            self.current_price(ticker),
            self.report_prices(ticker, price_dates),
            peers::compare(
                request.peers(),
                request.invalid_peers(),
                self.fundamentals.as_ref(),
                self.prices.as_ref(),
                self.config.max_concurrent_peer_fetches,
            ),
        );

        let inputs = PipelineInputs {
            dataset,
            current_price: current_price?,
            report_prices: report_prices?,
            requested_peers: request.peers().to_vec(),
            peers: peer_comparison,
        };
        pipeline::run(inputs, &self.config, Utc::now())
    }

    async fn current_price(&self, ticker: &Ticker) -> Result<f64> {
        self.prices
            .get_current_price(ticker)
            .await
            .map_err(|source| feed_failure(ticker, Stage::Inputs, "current price", source))
    }

    /// Close on each report date; dates without a price are left out
    async fn report_prices(
        &self,
        ticker: &Ticker,
        dates: Vec<NaiveDate>,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        let lookups: Vec<_> = stream::iter(dates)
            .map(|date| async move { (date, self.prices.get_price(ticker, date).await) })
            .buffered(self.config.max_concurrent_peer_fetches)
            .collect()
            .await;

        let mut prices = BTreeMap::new();
        for (date, lookup) in lookups {
            match lookup {
                Ok(close) if close.is_finite() && close > 0.0 => {
                    prices.insert(date, close);
                }
                Ok(close) => warn!(ticker = %ticker, %date, close, "Ignoring non-positive price"),
                Err(e) if e.is_not_found() => debug!(ticker = %ticker, %date, "No price near date"),
                Err(source) => {
                    return Err(ValuationError::UpstreamUnavailable {
                        ticker: ticker.to_string(),
                        stage: Stage::HistoricalPe,
                        source,
                    });
                }
            }
        }
        Ok(prices)
    }
}

/// Missing data is an input problem; anything else is an upstream outage
fn feed_failure(ticker: &Ticker, stage: Stage, what: &str, source: FeedError) -> ValuationError {
    if source.is_not_found() {
        ValuationError::insufficient(ticker.as_str(), stage, format!("no {what} available"))
    } else {
        ValuationError::UpstreamUnavailable {
            ticker: ticker.to_string(),
            stage,
            source,
        }
    }
}
