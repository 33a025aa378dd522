//! Shared test data: an eight quarter history with known valuation outputs

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};

use super::pipeline::{self, PipelineInputs};
use super::report::ValuationReport;
use crate::analysis::PeerComparison;
use crate::config::ValuationConfig;
use crate::domain::{QuarterlyDataset, QuarterlyFundamental, Ticker};
use crate::feeds::InMemoryMarketData;

pub const SCENARIO_EPS: [f64; 8] = [2.18, 1.53, 1.40, 0.97, 2.40, 1.65, 1.57, 1.85];

/// Closing prices on the report dates of quarters four through eight
pub const REPORT_PRICES: [f64; 5] = [150.0, 160.0, 170.0, 180.0, 190.0];

pub const TARGET_PRICE: f64 = 200.0;

const FISCAL_DATES: [(i32, u32, u32); 8] = [
    (2023, 3, 31),
    (2023, 6, 30),
    (2023, 9, 30),
    (2023, 12, 31),
    (2024, 3, 31),
    (2024, 6, 30),
    (2024, 9, 30),
    (2024, 12, 31),
];

const NET_MARGINS: [f64; 8] = [0.22, 0.23, 0.22, 0.21, 0.24, 0.25, 0.26, 0.26];

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Records for `ticker` shaped like the reference scenario
pub fn scenario_quarters(ticker: &str) -> Vec<QuarterlyFundamental> {
    let ticker = Ticker::parse(ticker).unwrap();
    SCENARIO_EPS
        .iter()
        .zip(FISCAL_DATES)
        .zip(NET_MARGINS)
        .enumerate()
        .map(|(i, ((eps, (year, month, day)), margin))| {
            let fiscal_date = date(year, month, day);
            QuarterlyFundamental::new(
                ticker.clone(),
                format!("{year}-Q{}", i % 4 + 1),
                fiscal_date,
                Some(fiscal_date + chrono::Duration::days(30)),
                *eps,
            )
            .with_revenue(90e9 + i as f64 * 1e9)
            .with_net_income(25e9)
            .with_net_margin(margin)
            .with_total_debt(100e9)
        })
        .collect()
}

pub fn scenario_dataset(ticker: &str) -> QuarterlyDataset {
    QuarterlyDataset::new(Ticker::parse(ticker).unwrap(), scenario_quarters(ticker)).unwrap()
}

pub fn report_prices(dataset: &QuarterlyDataset) -> BTreeMap<NaiveDate, f64> {
    dataset
        .quarters()
        .iter()
        .skip(3)
        .filter_map(|q| q.reported_date)
        .zip(REPORT_PRICES)
        .collect()
}

/// Market data holding the scenario target plus one usable peer, `MSFT`
pub fn scenario_market(ticker: &str) -> InMemoryMarketData {
    let target = Ticker::parse(ticker).unwrap();
    let dataset = scenario_dataset(ticker);
    let peer = Ticker::parse("MSFT").unwrap();

    let mut market = InMemoryMarketData::new()
        .with_quarters(scenario_quarters(ticker))
        .with_current_price(&target, TARGET_PRICE)
        .with_current_price(&peer, 330.0);
    for (report_date, close) in report_prices(&dataset) {
        market = market.with_price(&target, report_date, close);
    }

    let peer_quarters = [2.5, 2.6, 2.7, 2.8].iter().enumerate().map(|(i, eps)| {
        QuarterlyFundamental::new(
            peer.clone(),
            format!("2024-Q{}", i + 1),
            date(2024, 3 * i as u32 + 3, 28),
            None,
            *eps,
        )
    });
    market.with_quarters(peer_quarters)
}

pub fn sample_report(ticker: &str) -> ValuationReport {
    let dataset = scenario_dataset(ticker);
    let report_prices = report_prices(&dataset);
    let inputs = PipelineInputs {
        dataset,
        current_price: TARGET_PRICE,
        report_prices,
        requested_peers: Vec::new(),
        peers: PeerComparison::Unavailable {
            dropped: Vec::new(),
        },
    };
    pipeline::run(inputs, &ValuationConfig::default(), Utc::now()).unwrap()
}
