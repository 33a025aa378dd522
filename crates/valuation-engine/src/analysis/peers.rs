//! Peer group P/E comparison
//!
//! Each peer's trailing P/E is its current price over the sum of its four
//! latest quarters of EPS. Peers that cannot produce a positive P/E, or whose
//! symbol is not a valid ticker, are dropped with a reason; they never fail
//! the valuation.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::stats::Distribution;
use crate::domain::{QuarterlyDataset, TTM_QUARTERS, Ticker};
use crate::feeds::{FundamentalsFeed, PriceFeed};

/// P/E of a single usable peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerPe {
    pub ticker: Ticker,
    pub price: f64,
    pub ttm_eps: f64,
    pub pe: f64,
}

/// A requested peer that produced no P/E
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedPeer {
    /// Peer symbol as requested; not necessarily a valid ticker
    pub ticker: String,
    pub reason: String,
}

impl DroppedPeer {
    fn new(ticker: &Ticker, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    fn invalid_symbol(symbol: &str) -> Self {
        Self {
            ticker: symbol.to_string(),
            reason: "invalid ticker".to_string(),
        }
    }
}

/// Peer block of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PeerComparison {
    /// At least one peer produced a P/E
    Available {
        peers: Vec<PeerPe>,
        distribution: Distribution,
        dropped: Vec<DroppedPeer>,
    },
    /// No peers were requested, or none were usable
    Unavailable { dropped: Vec<DroppedPeer> },
}

impl PeerComparison {
    /// Average peer P/E when available
    pub fn average_pe(&self) -> Option<f64> {
        match self {
            Self::Available { distribution, .. } => Some(distribution.average),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    pub fn dropped(&self) -> &[DroppedPeer] {
        match self {
            Self::Available { dropped, .. } | Self::Unavailable { dropped } => dropped,
        }
    }

    /// Fold per-peer outcomes into the block; peers are ordered by ticker
    pub fn from_outcomes(outcomes: Vec<Result<PeerPe, DroppedPeer>>) -> Self {
        let mut peers = Vec::new();
        let mut dropped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(peer) => peers.push(peer),
                Err(peer) => dropped.push(peer),
            }
        }
        peers.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        dropped.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        let values: Vec<f64> = peers.iter().map(|p| p.pe).collect();
        match Distribution::from_values(&values) {
            Some(distribution) => Self::Available {
                peers,
                distribution,
                dropped,
            },
            None => Self::Unavailable { dropped },
        }
    }
}

/// Fetch every peer with at most `concurrency` peers in flight
///
/// `invalid` symbols are never fetched; each one is reported as dropped.
pub async fn compare(
    peers: &[Ticker],
    invalid: &[String],
    fundamentals: &dyn FundamentalsFeed,
    prices: &dyn PriceFeed,
    concurrency: usize,
) -> PeerComparison {
    if peers.is_empty() && invalid.is_empty() {
        return PeerComparison::Unavailable {
            dropped: Vec::new(),
        };
    }

    let mut outcomes: Vec<_> = stream::iter(peers)
        .map(|peer| evaluate(peer, fundamentals, prices))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    for symbol in invalid {
        warn!(peer = %symbol, "Peer dropped: invalid ticker");
        outcomes.push(Err(DroppedPeer::invalid_symbol(symbol)));
    }

    let comparison = PeerComparison::from_outcomes(outcomes);
    debug!(
        requested = peers.len() + invalid.len(),
        dropped = comparison.dropped().len(),
        average = ?comparison.average_pe(),
        "Peer comparison complete"
    );
    comparison
}

async fn evaluate(
    peer: &Ticker,
    fundamentals: &dyn FundamentalsFeed,
    prices: &dyn PriceFeed,
) -> Result<PeerPe, DroppedPeer> {
    let outcome = fetch_peer(peer, fundamentals, prices).await;
    if let Err(dropped) = &outcome {
        warn!(peer = %peer, reason = %dropped.reason, "Peer dropped");
    }
    outcome
}

async fn fetch_peer(
    peer: &Ticker,
    fundamentals: &dyn FundamentalsFeed,
    prices: &dyn PriceFeed,
) -> Result<PeerPe, DroppedPeer> {
    let quarters = fundamentals
        .get_quarterly_fundamentals(peer)
        .await
        .map_err(|e| DroppedPeer::new(peer, e.to_string()))?;
    let dataset = QuarterlyDataset::new(peer.clone(), quarters)
        .map_err(|e| DroppedPeer::new(peer, e.to_string()))?
        .into_latest_run();

    let ttm_eps = dataset.ttm_eps().ok_or_else(|| {
        DroppedPeer::new(
            peer,
            format!(
                "need {TTM_QUARTERS} consecutive quarters for trailing EPS, found {}",
                dataset.len()
            ),
        )
    })?;
    if ttm_eps <= 0.0 {
        return Err(DroppedPeer::new(
            peer,
            format!("trailing EPS {ttm_eps:.2} is not positive"),
        ));
    }

    let price = prices
        .get_current_price(peer)
        .await
        .map_err(|e| DroppedPeer::new(peer, e.to_string()))?;
    if !price.is_finite() || price <= 0.0 {
        return Err(DroppedPeer::new(peer, format!("invalid current price {price}")));
    }

    Ok(PeerPe {
        ticker: peer.clone(),
        price,
        ttm_eps,
        pe: price / ttm_eps,
    })
}
