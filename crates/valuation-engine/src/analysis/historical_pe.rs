//! Trailing P/E history of the target company

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::stats::Distribution;
use crate::domain::{QuarterlyDataset, QuarterlyFundamental, TTM_QUARTERS};
use crate::error::{Result, Stage, ValuationError};

/// Why a quarter did not contribute a P/E observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    NonPositiveTtmEps,
    MissingReportDate,
    PriceNotFound,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveTtmEps => f.write_str("trailing EPS is not positive"),
            Self::MissingReportDate => f.write_str("report date missing"),
            Self::PriceNotFound => f.write_str("no price near report date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedQuarter {
    pub fiscal_quarter: String,
    pub reason: ExclusionReason,
}

/// One trailing P/E observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeObservation {
    pub fiscal_quarter: String,
    pub report_date: NaiveDate,
    pub price: f64,
    pub ttm_eps: f64,
    pub pe: f64,
}

/// Historical P/E block of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPe {
    pub observations: Vec<PeObservation>,
    pub distribution: Distribution,
    pub excluded: Vec<ExcludedQuarter>,
}

/// A quarter with three predecessors, paired with its trailing EPS
struct Candidate<'a> {
    quarter: &'a QuarterlyFundamental,
    ttm_eps: f64,
}

fn candidates(dataset: &QuarterlyDataset) -> impl Iterator<Item = Candidate<'_>> {
    dataset
        .quarters()
        .windows(TTM_QUARTERS)
        .map(|window| Candidate {
            quarter: &window[TTM_QUARTERS - 1],
            ttm_eps: window.iter().map(|q| q.eps).sum(),
        })
}

/// Report dates that need a price lookup
///
/// Quarters that would be excluded anyway (trailing EPS not positive, no
/// report date) are skipped so the price feed is not asked for them.
pub fn price_dates(dataset: &QuarterlyDataset) -> Vec<NaiveDate> {
    candidates(dataset)
        .filter(|c| c.ttm_eps > 0.0)
        .filter_map(|c| c.quarter.reported_date)
        .collect()
}

/// Build the trailing P/E distribution
///
/// `prices` holds the close found for each report date; a date absent from
/// the map means the price feed had nothing near it.
pub fn analyze(
    dataset: &QuarterlyDataset,
    prices: &BTreeMap<NaiveDate, f64>,
) -> Result<HistoricalPe> {
    let ticker = dataset.ticker().as_str();
    let mut observations = Vec::new();
    let mut excluded = Vec::new();

    for candidate in candidates(dataset) {
        let label = &candidate.quarter.fiscal_quarter;
        let outcome = if candidate.ttm_eps <= 0.0 {
            Err(ExclusionReason::NonPositiveTtmEps)
        } else {
            match candidate.quarter.reported_date {
                None => Err(ExclusionReason::MissingReportDate),
                Some(date) => prices
                    .get(&date)
                    .map(|price| (date, *price))
                    .ok_or(ExclusionReason::PriceNotFound),
            }
        };

        match outcome {
            Ok((report_date, price)) => observations.push(PeObservation {
                fiscal_quarter: label.clone(),
                report_date,
                price,
                ttm_eps: candidate.ttm_eps,
                pe: price / candidate.ttm_eps,
            }),
            Err(reason) => {
                warn!(ticker, quarter = %label, %reason, "Quarter excluded from P/E history");
                excluded.push(ExcludedQuarter {
                    fiscal_quarter: label.clone(),
                    reason,
                });
            }
        }
    }

    let values: Vec<f64> = observations.iter().map(|o| o.pe).collect();
    let distribution = Distribution::from_values(&values).ok_or_else(|| {
        ValuationError::insufficient(
            ticker,
            Stage::HistoricalPe,
            format!(
                "no quarter produced a trailing P/E ({} excluded)",
                excluded.len()
            ),
        )
    })?;

    debug!(
        ticker,
        points = distribution.count,
        average = distribution.average,
        "Historical P/E computed"
    );

    Ok(HistoricalPe {
        observations,
        distribution,
        excluded,
    })
}
