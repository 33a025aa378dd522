//! Quarterly fundamentals and price observations

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Ticker;

/// One fiscal quarter of fundamentals as delivered by the ingestion layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyFundamental {
    pub ticker: Ticker,
    /// Fiscal quarter label, e.g. `2024-Q3`
    pub fiscal_quarter: String,
    /// Fiscal period-end date
    pub fiscal_date: NaiveDate,
    /// Date the quarter's results were disclosed
    #[serde(default)]
    pub reported_date: Option<NaiveDate>,
    pub eps: f64,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub gross_income: Option<f64>,
    #[serde(default)]
    pub net_income: Option<f64>,
    #[serde(default)]
    pub gross_margin: Option<f64>,
    #[serde(default)]
    pub net_margin: Option<f64>,
    #[serde(default)]
    pub free_cash_flow: Option<f64>,
    #[serde(default)]
    pub capex: Option<f64>,
    #[serde(default)]
    pub cash_balance: Option<f64>,
    #[serde(default)]
    pub total_debt: Option<f64>,
}

impl QuarterlyFundamental {
    /// Minimal record carrying only what the EPS-driven stages need
    pub fn new(
        ticker: Ticker,
        fiscal_quarter: impl Into<String>,
        fiscal_date: NaiveDate,
        reported_date: Option<NaiveDate>,
        eps: f64,
    ) -> Self {
        Self {
            ticker,
            fiscal_quarter: fiscal_quarter.into(),
            fiscal_date,
            reported_date,
            eps,
            revenue: None,
            gross_income: None,
            net_income: None,
            gross_margin: None,
            net_margin: None,
            free_cash_flow: None,
            capex: None,
            cash_balance: None,
            total_debt: None,
        }
    }

    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue = Some(revenue);
        self
    }

    pub fn with_net_income(mut self, net_income: f64) -> Self {
        self.net_income = Some(net_income);
        self
    }

    pub fn with_net_margin(mut self, net_margin: f64) -> Self {
        self.net_margin = Some(net_margin);
        self
    }

    pub fn with_total_debt(mut self, total_debt: f64) -> Self {
        self.total_debt = Some(total_debt);
        self
    }
}

/// Closing price for a ticker on a trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ticker: Ticker,
    pub date: NaiveDate,
    pub close: f64,
}
