//! Weighted synthesis of the P/E sources into a justified range

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{SynthesisWeights, ValuationConfig};
use crate::domain::Ticker;
use crate::error::{Result, Stage, ValuationError};

/// P/E inputs to the synthesis, tagged by peer availability
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeInputs {
    NoPeers {
        historical_average: f64,
        historical_std_dev: f64,
        fundamentals: f64,
    },
    WithPeers {
        historical_average: f64,
        historical_std_dev: f64,
        peer_average: f64,
        fundamentals: f64,
    },
}

impl PeInputs {
    fn historical_std_dev(&self) -> f64 {
        match self {
            Self::NoPeers {
                historical_std_dev, ..
            }
            | Self::WithPeers {
                historical_std_dev, ..
            } => *historical_std_dev,
        }
    }
}

/// Justified P/E block of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JustifiedPe {
    pub low: f64,
    pub midpoint: f64,
    pub high: f64,
    pub spread: f64,
    pub weights: SynthesisWeights,
    pub used_peers: bool,
}

/// Blend the sources and widen the midpoint into a range
pub fn synthesize(ticker: &Ticker, inputs: PeInputs, config: &ValuationConfig) -> Result<JustifiedPe> {
    let (weights, midpoint) = match inputs {
        PeInputs::NoPeers {
            historical_average,
            fundamentals,
            ..
        } => {
            let w = config.weights_without_peers;
            (w, w.historical * historical_average + w.fundamentals * fundamentals)
        }
        PeInputs::WithPeers {
            historical_average,
            peer_average,
            fundamentals,
            ..
        } => {
            let w = config.weights_with_peers;
            (
                w,
                w.historical * historical_average
                    + w.peer * peer_average
                    + w.fundamentals * fundamentals,
            )
        }
    };

    if !midpoint.is_finite() || midpoint <= 0.0 {
        return Err(ValuationError::insufficient(
            ticker.as_str(),
            Stage::Synthesis,
            format!("blended P/E midpoint {midpoint} is not positive"),
        ));
    }

    let spread = (config.spread_fraction * midpoint)
        .max(config.spread_std_devs * inputs.historical_std_dev());
    let used_peers = matches!(inputs, PeInputs::WithPeers { .. });

    debug!(ticker = %ticker, midpoint, spread, used_peers, "Justified P/E synthesized");

    Ok(JustifiedPe {
        low: midpoint - spread,
        midpoint,
        high: midpoint + spread,
        spread,
        weights,
        used_peers,
    })
}
