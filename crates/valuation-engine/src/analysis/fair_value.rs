//! Fair value range and assessment

use std::fmt;

use serde::{Deserialize, Serialize};

use super::justified_pe::JustifiedPe;
use crate::domain::Ticker;
use crate::error::{Result, Stage, ValuationError};

/// Where the current price sits against the fair value range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    Undervalued,
    FairlyValued,
    Overvalued,
}

impl Assessment {
    /// Bounds are inclusive: a price on either edge is fairly valued
    pub fn classify(price: f64, low: f64, high: f64) -> Self {
        if price < low {
            Self::Undervalued
        } else if price > high {
            Self::Overvalued
        } else {
            Self::FairlyValued
        }
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undervalued => f.write_str("Undervalued"),
            Self::FairlyValued => f.write_str("Fairly Valued"),
            Self::Overvalued => f.write_str("Overvalued"),
        }
    }
}

/// Fair value block of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValue {
    pub forward_eps: f64,
    pub low: f64,
    pub midpoint: f64,
    pub high: f64,
    pub current_price: f64,
    /// Distance from the current price to the midpoint, in percent
    pub upside_percent: f64,
    pub assessment: Assessment,
}

pub fn calculate(
    ticker: &Ticker,
    forward_eps: f64,
    pe: &JustifiedPe,
    current_price: f64,
) -> Result<FairValue> {
    if !current_price.is_finite() || current_price <= 0.0 {
        return Err(ValuationError::insufficient(
            ticker.as_str(),
            Stage::FairValue,
            format!("current price {current_price} is not positive"),
        ));
    }
    if !forward_eps.is_finite() || forward_eps <= 0.0 {
        return Err(ValuationError::insufficient(
            ticker.as_str(),
            Stage::FairValue,
            format!("forward EPS {forward_eps:.2} is not positive"),
        ));
    }

    let low = forward_eps * pe.low;
    let high = forward_eps * pe.high;
    let midpoint = (low + high) / 2.0;

    Ok(FairValue {
        forward_eps,
        low,
        midpoint,
        high,
        current_price,
        upside_percent: (midpoint - current_price) / current_price * 100.0,
        assessment: Assessment::classify(current_price, low, high),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValuationConfig;

    fn range(low: f64, high: f64) -> JustifiedPe {
        JustifiedPe {
            low,
            midpoint: (low + high) / 2.0,
            high,
            spread: (high - low) / 2.0,
            weights: ValuationConfig::default().weights_without_peers,
            used_peers: false,
        }
    }

    fn ticker() -> Ticker {
        Ticker::parse("AAPL").unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let value = calculate(&ticker(), 7.963_33, &range(16.42, 36.45), 259.37).unwrap();

        assert!((value.low - 130.76).abs() < 0.1);
        assert!((value.high - 290.26).abs() < 0.1);
        assert!((value.midpoint - 210.51).abs() < 0.1);
        assert!((value.upside_percent + 18.84).abs() < 0.1);
        assert_eq!(value.assessment, Assessment::FairlyValued);
        assert_eq!(value.assessment.to_string(), "Fairly Valued");
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        assert_eq!(Assessment::classify(100.0, 100.0, 120.0), Assessment::FairlyValued);
        assert_eq!(Assessment::classify(120.0, 100.0, 120.0), Assessment::FairlyValued);
        assert_eq!(Assessment::classify(99.99, 100.0, 120.0), Assessment::Undervalued);
        assert_eq!(Assessment::classify(120.01, 100.0, 120.0), Assessment::Overvalued);
    }

    #[test]
    fn test_undervalued_has_positive_upside() {
        let value = calculate(&ticker(), 5.0, &range(20.0, 30.0), 90.0).unwrap();
        assert_eq!(value.midpoint, 125.0);
        assert_eq!(value.assessment, Assessment::Undervalued);
        assert!(value.upside_percent > 0.0);
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        let err = calculate(&ticker(), 5.0, &range(20.0, 30.0), 0.0).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::FairValue));

        let err = calculate(&ticker(), -1.0, &range(20.0, 30.0), 50.0).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::FairValue));
    }
}
