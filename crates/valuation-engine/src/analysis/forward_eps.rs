//! Forward EPS estimation
//!
//! Two independent projections of the next four quarters of EPS are made
//! from the most recent window of quarters:
//!
//! - **growth**: the mean quarter-over-quarter growth rate compounded from
//!   the latest EPS
//! - **regression**: an ordinary least squares trend over the window,
//!   extrapolated four indices forward
//!
//! The recommended forward EPS is the plain average of the two.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stats::{LinearFit, mean};
use crate::domain::{QuarterlyDataset, TTM_QUARTERS};
use crate::error::{Result, Stage, ValuationError};

/// Growth-rate projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthProjection {
    /// Quarter-over-quarter growth for each consecutive pair in the window
    pub quarterly_growth_rates: Vec<f64>,
    pub average_growth: f64,
    /// Projected EPS for each of the next four quarters
    pub quarterly_estimates: Vec<f64>,
    pub forward_eps: f64,
}

/// Linear trend projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionProjection {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Trend value at each historical index of the window
    pub fitted: Vec<f64>,
    pub quarterly_estimates: Vec<f64>,
    pub forward_eps: f64,
}

/// Forward-EPS block of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardEps {
    /// Fiscal quarter labels of the window, oldest first
    pub window: Vec<String>,
    pub growth: GrowthProjection,
    pub regression: RegressionProjection,
    pub recommended: f64,
}

/// Estimate forward EPS from the latest `window` quarters of the dataset
pub fn estimate(dataset: &QuarterlyDataset, window: usize) -> Result<ForwardEps> {
    let ticker = dataset.ticker().as_str();
    if dataset.len() < window || window < 2 {
        return Err(ValuationError::insufficient(
            ticker,
            Stage::ForwardEps,
            format!("need {window} quarters of EPS, found {}", dataset.len()),
        ));
    }

    let recent = dataset.recent(window);
    let eps: Vec<f64> = recent.iter().map(|q| q.eps).collect();

    let growth = growth_projection(ticker, recent.iter().map(|q| q.fiscal_quarter.as_str()), &eps)?;
    let regression = regression_projection(ticker, &eps)?;
    let recommended = (growth.forward_eps + regression.forward_eps) / 2.0;

    debug!(
        ticker,
        growth = growth.forward_eps,
        regression = regression.forward_eps,
        recommended,
        "Forward EPS estimated"
    );

    Ok(ForwardEps {
        window: recent.iter().map(|q| q.fiscal_quarter.clone()).collect(),
        growth,
        regression,
        recommended,
    })
}

fn growth_projection<'a>(
    ticker: &str,
    mut labels: impl Iterator<Item = &'a str>,
    eps: &[f64],
) -> Result<GrowthProjection> {
    // Skip the first label so each pair is named by its later quarter.
    labels.next();

    let mut rates = Vec::with_capacity(eps.len().saturating_sub(1));
    for (pair, label) in eps.windows(2).zip(labels) {
        let (previous, current) = (pair[0], pair[1]);
        if previous == 0.0 {
            return Err(ValuationError::insufficient(
                ticker,
                Stage::ForwardEps,
                format!("zero EPS in the quarter before {label}, growth rate undefined"),
            ));
        }
        rates.push((current - previous) / previous);
    }

    let average_growth = mean(&rates);
    let latest = eps[eps.len() - 1];
    let quarterly_estimates: Vec<f64> = (1..=TTM_QUARTERS as i32)
        .map(|i| latest * (1.0 + average_growth).powi(i))
        .collect();
    let forward_eps: f64 = quarterly_estimates.iter().sum();

    if !forward_eps.is_finite() {
        return Err(ValuationError::insufficient(
            ticker,
            Stage::ForwardEps,
            "growth projection is not finite",
        ));
    }

    Ok(GrowthProjection {
        quarterly_growth_rates: rates,
        average_growth,
        quarterly_estimates,
        forward_eps,
    })
}

fn regression_projection(ticker: &str, eps: &[f64]) -> Result<RegressionProjection> {
    let xs: Vec<f64> = (1..=eps.len()).map(|i| i as f64).collect();
    let fit = LinearFit::fit(&xs, eps).ok_or_else(|| {
        ValuationError::insufficient(ticker, Stage::ForwardEps, "cannot fit an EPS trend")
    })?;

    let fitted = xs.iter().map(|x| fit.predict(*x)).collect();
    let next = eps.len() + 1;
    let quarterly_estimates: Vec<f64> = (next..next + TTM_QUARTERS)
        .map(|i| fit.predict(i as f64).max(0.0))
        .collect();
    let forward_eps: f64 = quarterly_estimates.iter().sum();

    Ok(RegressionProjection {
        slope: fit.slope,
        intercept: fit.intercept,
        r_squared: fit.r_squared,
        fitted,
        quarterly_estimates,
        forward_eps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QuarterlyFundamental, Ticker};
    use chrono::NaiveDate;

    fn dataset(eps: &[f64]) -> QuarterlyDataset {
        let ticker = Ticker::parse("AAPL").unwrap();
        let quarters = eps
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let year = 2022 + (i / 4) as i32;
                let month = 3 * (i % 4) as u32 + 1;
                QuarterlyFundamental::new(
                    ticker.clone(),
                    format!("{year}-Q{}", i % 4 + 1),
                    NaiveDate::from_ymd_opt(year, month, 28).unwrap(),
                    None,
                    *value,
                )
            })
            .collect();
        QuarterlyDataset::new(ticker, quarters).unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let data = dataset(&[2.18, 1.53, 1.40, 0.97, 2.40, 1.65, 1.57, 1.85]);
        let estimate = estimate(&data, 8).unwrap();

        assert_eq!(estimate.growth.quarterly_growth_rates.len(), 7);
        assert!((estimate.growth.average_growth - 0.0859).abs() < 1e-4);
        assert!((estimate.growth.forward_eps - 9.1317).abs() < 1e-3);
        assert!((estimate.regression.slope - 0.000833).abs() < 1e-5);
        assert!((estimate.regression.intercept - 1.69).abs() < 1e-9);
        assert!((estimate.regression.forward_eps - 6.795).abs() < 1e-9);
        assert!((estimate.recommended - 7.9633).abs() < 1e-3);
        assert_eq!(estimate.window.first().map(String::as_str), Some("2022-Q1"));
    }

    #[test]
    fn test_recommended_is_exact_average() {
        let data = dataset(&[1.0, 1.1, 1.3, 1.2, 1.4, 1.5, 1.45, 1.6]);
        let estimate = estimate(&data, 8).unwrap();
        assert_eq!(
            estimate.recommended,
            (estimate.growth.forward_eps + estimate.regression.forward_eps) / 2.0
        );
    }

    #[test]
    fn test_flat_trend_projects_the_mean() {
        let data = dataset(&[1.0, 2.0, 2.0, 1.0, 1.0, 2.0, 2.0, 1.0]);
        let regression = estimate(&data, 8).unwrap().regression;

        assert_eq!(regression.slope, 0.0);
        assert_eq!(regression.r_squared, 0.0);
        assert_eq!(regression.quarterly_estimates, vec![1.5; 4]);
        assert_eq!(regression.forward_eps, 6.0);
    }

    #[test]
    fn test_zero_eps_denominator_fails() {
        let data = dataset(&[1.0, 0.0, 1.2, 1.3, 1.4, 1.5, 1.6, 1.7]);
        let err = estimate(&data, 8).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::ForwardEps));
        assert!(err.to_string().contains("2022-Q3"));
    }

    #[test]
    fn test_uses_only_the_latest_window() {
        let mut eps = vec![0.0; 4];
        eps.extend([1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 1.6, 1.7]);
        let estimate = estimate(&dataset(&eps), 8).unwrap();
        assert_eq!(estimate.window.len(), 8);
        assert_eq!(estimate.window[0], "2023-Q1");
    }

    #[test]
    fn test_negative_regression_projection_clamped() {
        let data = dataset(&[8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        let regression = estimate(&data, 8).unwrap().regression;
        assert_eq!(regression.quarterly_estimates, vec![0.0; 4]);
        assert_eq!(regression.forward_eps, 0.0);
    }

    #[test]
    fn test_short_dataset_rejected() {
        let err = estimate(&dataset(&[1.0, 1.1, 1.2]), 8).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::ForwardEps));
    }
}
