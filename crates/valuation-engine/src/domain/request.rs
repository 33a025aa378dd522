//! Valuation request identity

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::Ticker;
use crate::error::Result;

/// Normalized target ticker plus peer set
///
/// Peers are uppercased, deduplicated, sorted, and never contain the target,
/// so two requests naming the same companies in any order are equal.
/// Peer symbols that do not parse are kept aside as invalid; only the
/// target ticker has to be well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValuationRequest {
    ticker: Ticker,
    peers: Vec<Ticker>,
    invalid_peers: Vec<String>,
}

impl ValuationRequest {
    pub fn new<S: AsRef<str>>(ticker: &str, peers: &[S]) -> Result<Self> {
        let ticker = Ticker::parse(ticker)?;
        let mut valid = BTreeSet::new();
        let mut invalid = BTreeSet::new();
        for raw in peers.iter().map(|p| p.as_ref().trim()) {
            if raw.is_empty() {
                continue;
            }
            match Ticker::parse(raw) {
                Ok(peer) if peer != ticker => {
                    valid.insert(peer);
                }
                Ok(_) => {}
                Err(_) => {
                    invalid.insert(raw.to_uppercase());
                }
            }
        }
        Ok(Self {
            ticker,
            peers: valid.into_iter().collect(),
            invalid_peers: invalid.into_iter().collect(),
        })
    }

    /// Request without a peer set
    pub fn solo(ticker: &str) -> Result<Self> {
        Self::new::<&str>(ticker, &[])
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn peers(&self) -> &[Ticker] {
        &self.peers
    }

    /// Requested peer symbols that are not valid tickers, uppercased
    pub fn invalid_peers(&self) -> &[String] {
        &self.invalid_peers
    }

    pub fn has_peers(&self) -> bool {
        !self.peers.is_empty()
    }
}

impl fmt::Display for ValuationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticker)?;
        if self.has_peers() || !self.invalid_peers.is_empty() {
            let peers: Vec<&str> = self
                .peers
                .iter()
                .map(Ticker::as_str)
                .chain(self.invalid_peers.iter().map(String::as_str))
                .collect();
            write!(f, " vs [{}]", peers.join(", "))?;
        }
        Ok(())
    }
}
