//! Valuation stages
//!
//! Every stage is a function of already fetched data and configuration,
//! except the peer comparison which fetches its own peers.

pub mod fair_value;
pub mod forward_eps;
pub mod fundamentals;
pub mod historical_pe;
pub mod justified_pe;
pub mod peers;
pub mod stats;

pub use fair_value::{Assessment, FairValue};
pub use forward_eps::{ForwardEps, GrowthProjection, RegressionProjection};
pub use fundamentals::{FundamentalsPe, MarginTrend};
pub use historical_pe::{ExcludedQuarter, ExclusionReason, HistoricalPe, PeObservation};
pub use justified_pe::{JustifiedPe, PeInputs};
pub use peers::{DroppedPeer, PeerComparison, PeerPe};
pub use stats::{Distribution, LinearFit};
