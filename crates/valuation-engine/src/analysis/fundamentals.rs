//! Fundamentals-implied P/E
//!
//! Starts from the baseline market P/E and applies growth, margin and
//! leverage adjustments, then floors the result.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stats::mean;
use crate::config::{RiskPolicy, ValuationConfig};
use crate::domain::{QuarterlyDataset, TTM_QUARTERS};
use crate::error::{Result, Stage, ValuationError};

const QUARTERS_PER_YEAR: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginTrend {
    Improving,
    Stable,
    Declining,
}

impl fmt::Display for MarginTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Improving => f.write_str("improving"),
            Self::Stable => f.write_str("stable"),
            Self::Declining => f.write_str("declining"),
        }
    }
}

/// Fundamentals block of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsPe {
    pub base_pe: f64,
    /// Annualized EPS growth over the whole history, as a fraction
    pub eps_cagr: f64,
    /// Annualized revenue growth; informational only
    pub revenue_cagr: f64,
    pub growth_adjustment: f64,
    /// Mean net margin of the latest four quarters, as a fraction
    pub average_net_margin: f64,
    pub margin_trend: MarginTrend,
    pub margin_adjustment: f64,
    pub debt_to_equity: f64,
    pub risk_adjustment: f64,
    /// Sum of the base and adjustments before the floor
    pub unfloored_pe: f64,
    pub fundamentals_pe: f64,
}

pub fn assess(dataset: &QuarterlyDataset, config: &ValuationConfig) -> Result<FundamentalsPe> {
    let ticker = dataset.ticker().as_str();
    let quarters = dataset.quarters();

    let eps_cagr = cagr(quarters.iter().map(|q| q.eps)).unwrap_or(0.0);
    let revenue_cagr = cagr(quarters.iter().filter_map(|q| q.revenue)).unwrap_or(0.0);
    let growth_adjustment = config.growth_multiplier * eps_cagr * 100.0;

    let margins: Vec<f64> = dataset
        .recent(TTM_QUARTERS)
        .iter()
        .filter_map(|q| q.net_margin)
        .collect();
    let average_net_margin = mean(&margins);
    let margin_trend = margin_trend(&margins);

    let margin_adjustment = if average_net_margin > config.excellent_margin_threshold {
        config.margin_excellent_adjustment
    } else if margin_trend == MarginTrend::Improving {
        config.margin_improving_adjustment
    } else {
        0.0
    };

    let debt_to_equity = dataset
        .latest()
        .map(|latest| {
            let debt = latest.total_debt.unwrap_or(0.0);
            let equity = match latest.net_income {
                Some(income) if income > 0.0 => income * config.equity_income_multiple,
                _ => 1.0,
            };
            debt / equity
        })
        .unwrap_or(0.0);

    let mut penalties = Vec::with_capacity(2);
    if debt_to_equity > config.high_debt_to_equity {
        penalties.push(config.debt_risk_adjustment);
    }
    if margin_trend == MarginTrend::Declining {
        penalties.push(config.declining_margin_adjustment);
    }
    let risk_adjustment = combine_penalties(&penalties, config.risk_policy);

    let unfloored_pe = config.base_pe + growth_adjustment + margin_adjustment + risk_adjustment;
    if !unfloored_pe.is_finite() {
        return Err(ValuationError::insufficient(
            ticker,
            Stage::Fundamentals,
            "growth adjustment is not finite",
        ));
    }
    let fundamentals_pe = unfloored_pe.max(config.min_fundamentals_pe);

    debug!(
        ticker,
        eps_cagr,
        growth_adjustment,
        margin_adjustment,
        risk_adjustment,
        fundamentals_pe,
        "Fundamentals P/E computed"
    );

    Ok(FundamentalsPe {
        base_pe: config.base_pe,
        eps_cagr,
        revenue_cagr,
        growth_adjustment,
        average_net_margin,
        margin_trend,
        margin_adjustment,
        debt_to_equity,
        risk_adjustment,
        unfloored_pe,
        fundamentals_pe,
    })
}

/// Compound annual growth over the positive values of a quarterly series
///
/// `None` with fewer than four positive values.
pub fn cagr(values: impl Iterator<Item = f64>) -> Option<f64> {
    let positive: Vec<f64> = values.filter(|v| *v > 0.0).collect();
    if positive.len() < TTM_QUARTERS {
        return None;
    }
    let years = (positive.len() - 1) as f64 / QUARTERS_PER_YEAR;
    let (first, last) = (positive[0], positive[positive.len() - 1]);
    Some((last / first).powf(1.0 / years) - 1.0)
}

fn margin_trend(margins: &[f64]) -> MarginTrend {
    if margins.len() < TTM_QUARTERS {
        return MarginTrend::Stable;
    }
    let (first, last) = (margins[0], margins[margins.len() - 1]);
    if last > first {
        MarginTrend::Improving
    } else if last < first {
        MarginTrend::Declining
    } else {
        MarginTrend::Stable
    }
}

fn combine_penalties(penalties: &[f64], policy: RiskPolicy) -> f64 {
    match policy {
        RiskPolicy::Stack => penalties.iter().sum(),
        RiskPolicy::Cap => penalties.iter().copied().fold(0.0, f64::min),
    }
}
