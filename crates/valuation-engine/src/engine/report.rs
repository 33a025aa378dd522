//! Valuation report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::{
    Assessment, FairValue, ForwardEps, FundamentalsPe, HistoricalPe, JustifiedPe, PeerComparison,
};
use crate::domain::Ticker;

/// Market snapshot of the target at computation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    pub price: f64,
    /// Sum of the latest four quarters of EPS
    pub ttm_eps: Option<f64>,
    /// Only present when trailing EPS is positive
    pub current_pe: Option<f64>,
}

impl CurrentMetrics {
    pub fn new(price: f64, ttm_eps: Option<f64>) -> Self {
        let current_pe = ttm_eps.filter(|eps| *eps > 0.0).map(|eps| price / eps);
        Self {
            price,
            ttm_eps,
            current_pe,
        }
    }
}

/// Immutable result of one valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub ticker: Ticker,
    /// Normalized peers that were requested, usable or not
    pub peers: Vec<Ticker>,
    pub quarters_analyzed: usize,
    pub current: CurrentMetrics,
    pub forward_eps: ForwardEps,
    pub historical_pe: HistoricalPe,
    pub peer_comparison: PeerComparison,
    pub fundamentals: FundamentalsPe,
    pub justified_pe: JustifiedPe,
    pub fair_value: FairValue,
    pub computed_at: DateTime<Utc>,
}

impl ValuationReport {
    pub fn assessment(&self) -> Assessment {
        self.fair_value.assessment
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {} ({:+.1}%) - fair value ${:.2}-${:.2} ({})",
            self.ticker,
            self.fair_value.assessment,
            self.fair_value.upside_percent,
            self.fair_value.low,
            self.fair_value.high,
            self.computed_at.format("%Y-%m-%d %H:%M UTC")
        )
    }
}

impl fmt::Display for ValuationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let forward = &self.forward_eps;
        let history = &self.historical_pe.distribution;

        writeln!(f, "{} P/E valuation", self.ticker)?;
        writeln!(
            f,
            "  Price:             ${:.2} (trailing P/E {})",
            self.current.price,
            self.current
                .current_pe
                .map_or_else(|| "n/a".to_string(), |pe| format!("{pe:.2}"))
        )?;
        writeln!(
            f,
            "  Forward EPS:       {:.2} (growth {:.2}, regression {:.2}, R² {:.2})",
            forward.recommended,
            forward.growth.forward_eps,
            forward.regression.forward_eps,
            forward.regression.r_squared
        )?;
        writeln!(
            f,
            "  Historical P/E:    avg {:.2}, median {:.2}, range {:.2}-{:.2} over {} quarters",
            history.average, history.median, history.min, history.max, history.count
        )?;
        match &self.peer_comparison {
            PeerComparison::Available {
                peers,
                distribution,
                ..
            } => writeln!(
                f,
                "  Peer P/E:          avg {:.2}, median {:.2} across {} peers",
                distribution.average,
                distribution.median,
                peers.len()
            )?,
            PeerComparison::Unavailable { .. } => writeln!(f, "  Peer P/E:          unavailable")?,
        }
        writeln!(
            f,
            "  Fundamentals P/E:  {:.2} (margins {})",
            self.fundamentals.fundamentals_pe, self.fundamentals.margin_trend
        )?;
        writeln!(
            f,
            "  Justified P/E:     {:.2}-{:.2} (mid {:.2})",
            self.justified_pe.low, self.justified_pe.high, self.justified_pe.midpoint
        )?;
        write!(
            f,
            "  Fair value:        ${:.2}-${:.2} (mid ${:.2}) => {} ({:+.2}%)",
            self.fair_value.low,
            self.fair_value.high,
            self.fair_value.midpoint,
            self.fair_value.assessment,
            self.fair_value.upside_percent
        )
    }
}
