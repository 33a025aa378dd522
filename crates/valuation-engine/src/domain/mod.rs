//! Domain model consumed and produced by the valuation pipeline

mod dataset;
mod quarter;
mod request;
mod ticker;

pub use dataset::QuarterlyDataset;
pub use quarter::{PricePoint, QuarterlyFundamental};
pub use request::ValuationRequest;
pub use ticker::Ticker;

/// Quarters summed into a trailing-twelve-month figure
pub const TTM_QUARTERS: usize = 4;
