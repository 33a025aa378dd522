//! Ordered, validated view over one ticker's quarterly history

use chrono::NaiveDate;
use std::collections::HashSet;

use super::{QuarterlyFundamental, TTM_QUARTERS, Ticker};
use crate::error::{Result, Stage, ValuationError};

/// Fiscal period ends this many days apart count as adjacent quarters.
/// The range admits calendar quarters and 13/14-week retail quarters.
const QUARTER_GAP_DAYS: std::ops::RangeInclusive<i64> = 70..=110;

/// Chronologically ordered (oldest first) quarters for a single ticker
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterlyDataset {
    ticker: Ticker,
    quarters: Vec<QuarterlyFundamental>,
}

impl QuarterlyDataset {
    /// Validate and order raw records
    ///
    /// Rejects records for another ticker, duplicate fiscal quarters and
    /// non-finite EPS. Input order does not matter.
    pub fn new(ticker: Ticker, mut quarters: Vec<QuarterlyFundamental>) -> Result<Self> {
        validate(&ticker, &quarters)?;
        quarters.sort_by_key(|q| q.fiscal_date);
        Ok(Self { ticker, quarters })
    }

    /// Fail with `InsufficientData` unless the latest `min` quarters are consecutive
    pub fn require(&self, min: usize) -> Result<()> {
        let run = self.consecutive_len();
        if run < min {
            let reason = if run == self.quarters.len() {
                format!("need at least {min} consecutive quarters, found {run}")
            } else {
                let gap_end = &self.quarters[self.quarters.len() - run];
                format!(
                    "need at least {min} consecutive quarters, found {run} since the gap before {}",
                    gap_end.fiscal_quarter
                )
            };
            return Err(ValuationError::insufficient(
                self.ticker.as_str(),
                Stage::Inputs,
                reason,
            ));
        }
        Ok(())
    }

    /// Number of quarters in the unbroken run ending at the latest quarter
    pub fn consecutive_len(&self) -> usize {
        if self.quarters.is_empty() {
            return 0;
        }
        1 + self
            .quarters
            .windows(2)
            .rev()
            .take_while(|pair| is_next_quarter(pair[0].fiscal_date, pair[1].fiscal_date))
            .count()
    }

    /// Drop history older than the latest gap in the quarterly sequence
    #[must_use]
    pub fn into_latest_run(mut self) -> Self {
        let start = self.quarters.len() - self.consecutive_len();
        self.quarters.drain(..start);
        self
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn len(&self) -> usize {
        self.quarters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quarters.is_empty()
    }

    pub fn quarters(&self) -> &[QuarterlyFundamental] {
        &self.quarters
    }

    pub fn latest(&self) -> Option<&QuarterlyFundamental> {
        self.quarters.last()
    }

    /// The most recent `n` quarters, oldest first
    pub fn recent(&self, n: usize) -> &[QuarterlyFundamental] {
        let start = self.quarters.len().saturating_sub(n);
        &self.quarters[start..]
    }

    pub fn eps(&self) -> Vec<f64> {
        self.quarters.iter().map(|q| q.eps).collect()
    }

    /// Sum of EPS over the latest four quarters
    pub fn ttm_eps(&self) -> Option<f64> {
        if self.quarters.len() < TTM_QUARTERS {
            return None;
        }
        Some(self.recent(TTM_QUARTERS).iter().map(|q| q.eps).sum())
    }
}

fn is_next_quarter(previous: NaiveDate, next: NaiveDate) -> bool {
    QUARTER_GAP_DAYS.contains(&(next - previous).num_days())
}

fn validate(ticker: &Ticker, quarters: &[QuarterlyFundamental]) -> Result<()> {
    let mut seen = HashSet::with_capacity(quarters.len());
    for quarter in quarters {
        if quarter.ticker != *ticker {
            return Err(ValuationError::InvalidDataset {
                ticker: ticker.to_string(),
                reason: format!(
                    "record {} belongs to {}",
                    quarter.fiscal_quarter, quarter.ticker
                ),
            });
        }
        if !seen.insert(quarter.fiscal_quarter.as_str()) {
            return Err(ValuationError::InvalidDataset {
                ticker: ticker.to_string(),
                reason: format!("duplicate fiscal quarter {}", quarter.fiscal_quarter),
            });
        }
        if !quarter.eps.is_finite() {
            return Err(ValuationError::InvalidDataset {
                ticker: ticker.to_string(),
                reason: format!("non-finite EPS in {}", quarter.fiscal_quarter),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn quarter(ticker: &str, label: &str, month: u32, year: i32, eps: f64) -> QuarterlyFundamental {
        QuarterlyFundamental::new(
            Ticker::parse(ticker).unwrap(),
            label,
            NaiveDate::from_ymd_opt(year, month, 28).unwrap(),
            None,
            eps,
        )
    }

    #[test]
    fn test_sorts_oldest_first() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let dataset = QuarterlyDataset::new(
            ticker,
            vec![
                quarter("AAPL", "2024-Q2", 6, 2024, 2.0),
                quarter("AAPL", "2023-Q4", 12, 2023, 1.0),
                quarter("AAPL", "2024-Q1", 3, 2024, 1.5),
            ],
        )
        .unwrap();

        assert_eq!(dataset.eps(), vec![1.0, 1.5, 2.0]);
        assert_eq!(dataset.latest().unwrap().fiscal_quarter, "2024-Q2");
    }

    #[test]
    fn test_rejects_duplicates_and_foreign_rows() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let dup = QuarterlyDataset::new(
            ticker.clone(),
            vec![
                quarter("AAPL", "2024-Q1", 3, 2024, 1.0),
                quarter("AAPL", "2024-Q1", 3, 2024, 1.1),
            ],
        );
        assert!(matches!(dup, Err(ValuationError::InvalidDataset { .. })));

        let foreign = QuarterlyDataset::new(ticker, vec![quarter("MSFT", "2024-Q1", 3, 2024, 1.0)]);
        assert!(matches!(foreign, Err(ValuationError::InvalidDataset { .. })));
    }

    #[test]
    fn test_rejects_nan_eps() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let result = QuarterlyDataset::new(ticker, vec![quarter("AAPL", "2024-Q1", 3, 2024, f64::NAN)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_require_minimum() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let dataset =
            QuarterlyDataset::new(ticker, vec![quarter("AAPL", "2024-Q1", 3, 2024, 1.0)]).unwrap();
        let err = dataset.require(8).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Inputs));
        assert!(err.to_string().contains("need at least 8 consecutive quarters, found 1"));
    }

    #[test]
    fn test_quarters_years_apart_are_not_consecutive() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let quarters = (0..8)
            .map(|i| quarter("AAPL", &format!("{}-Q4", 2010 + 2 * i), 12, 2010 + 2 * i, 1.0))
            .collect();
        let dataset = QuarterlyDataset::new(ticker, quarters).unwrap();

        assert_eq!(dataset.len(), 8);
        assert_eq!(dataset.consecutive_len(), 1);
        let err = dataset.require(8).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Inputs));
        assert!(err.to_string().contains("found 1 since the gap before 2024-Q4"));
    }

    #[test]
    fn test_latest_run_drops_history_before_gap() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let mut quarters = vec![quarter("AAPL", "2019-Q4", 12, 2019, 9.0)];
        quarters.extend((0..8).map(|i| {
            let year = 2023 + i / 4;
            let month = 3 * (i % 4) as u32 + 3;
            quarter("AAPL", &format!("{year}-Q{}", i % 4 + 1), month, year, 1.0)
        }));
        let dataset = QuarterlyDataset::new(ticker, quarters).unwrap();

        assert_eq!(dataset.consecutive_len(), 8);
        assert!(dataset.require(8).is_ok());
        let run = dataset.into_latest_run();
        assert_eq!(run.len(), 8);
        assert_eq!(run.quarters()[0].fiscal_quarter, "2023-Q1");
        assert_eq!(run.ttm_eps(), Some(4.0));
    }

    #[test]
    fn test_recent_and_ttm() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let quarters = (1..=6)
            .map(|i| quarter("AAPL", &format!("Q{i}"), i, 2024, f64::from(i)))
            .collect();
        let dataset = QuarterlyDataset::new(ticker, quarters).unwrap();

        assert_eq!(dataset.recent(2).len(), 2);
        assert_eq!(dataset.recent(10).len(), 6);
        assert_eq!(dataset.ttm_eps(), Some(3.0 + 4.0 + 5.0 + 6.0));
    }
}
