//! Synchronous valuation pipeline over already fetched data

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use super::report::{CurrentMetrics, ValuationReport};
use crate::analysis::{
    PeInputs, PeerComparison, fair_value, forward_eps, fundamentals, historical_pe, justified_pe,
};
use crate::config::ValuationConfig;
use crate::domain::{QuarterlyDataset, Ticker};
use crate::error::Result;

/// Everything the stages need, gathered up front
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub dataset: QuarterlyDataset,
    pub current_price: f64,
    /// Close found for each report date the historical stage asked for
    pub report_prices: BTreeMap<NaiveDate, f64>,
    pub requested_peers: Vec<Ticker>,
    pub peers: PeerComparison,
}

/// Run every stage in order and assemble the report
///
/// Fails on the first stage that cannot produce its block; the error names
/// that stage.
pub fn run(
    inputs: PipelineInputs,
    config: &ValuationConfig,
    computed_at: DateTime<Utc>,
) -> Result<ValuationReport> {
    let PipelineInputs {
        dataset,
        current_price,
        report_prices,
        requested_peers,
        peers,
    } = inputs;
    let ticker = dataset.ticker().clone();

    dataset.require(config.min_quarters)?;
    let dataset = dataset.into_latest_run();

    let forward_eps = forward_eps::estimate(&dataset, config.forward_window)?;
    let historical_pe = historical_pe::analyze(&dataset, &report_prices)?;
    let fundamentals = fundamentals::assess(&dataset, config)?;

    let history = &historical_pe.distribution;
    let pe_inputs = match peers.average_pe() {
        Some(peer_average) => PeInputs::WithPeers {
            historical_average: history.average,
            historical_std_dev: history.std_dev,
            peer_average,
            fundamentals: fundamentals.fundamentals_pe,
        },
        None => PeInputs::NoPeers {
            historical_average: history.average,
            historical_std_dev: history.std_dev,
            fundamentals: fundamentals.fundamentals_pe,
        },
    };
    let justified_pe = justified_pe::synthesize(&ticker, pe_inputs, config)?;
    let fair_value =
        fair_value::calculate(&ticker, forward_eps.recommended, &justified_pe, current_price)?;

    info!(
        ticker = %ticker,
        assessment = %fair_value.assessment,
        upside = fair_value.upside_percent,
        "Valuation complete"
    );

    Ok(ValuationReport {
        current: CurrentMetrics::new(current_price, dataset.ttm_eps()),
        quarters_analyzed: dataset.len(),
        ticker,
        peers: requested_peers,
        forward_eps,
        historical_pe,
        peer_comparison: peers,
        fundamentals,
        justified_pe,
        fair_value,
        computed_at,
    })
}
