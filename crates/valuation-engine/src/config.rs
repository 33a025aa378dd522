//! Configuration for valuation operations

use crate::error::{Result, ValuationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// How the debt and declining-margin penalties combine when both apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskPolicy {
    /// Penalties add up (-2 + -2 = -4)
    #[default]
    Stack,
    /// Combined penalty never exceeds the larger single penalty
    Cap,
}

/// Blend weights for one synthesis configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisWeights {
    pub historical: f64,
    pub peer: f64,
    pub fundamentals: f64,
}

impl SynthesisWeights {
    pub fn total(&self) -> f64 {
        self.historical + self.peer + self.fundamentals
    }

    fn validate(&self, label: &str) -> Result<()> {
        let parts = [self.historical, self.peer, self.fundamentals];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ValuationError::ConfigError(format!(
                "{label} weights must be finite and non-negative"
            )));
        }
        if (self.total() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ValuationError::ConfigError(format!(
                "{label} weights must sum to 1.0, got {}",
                self.total()
            )));
        }
        Ok(())
    }
}

/// Configuration for valuation operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Baseline market P/E the fundamentals adjustments start from
    pub base_pe: f64,

    /// P/E points added per percentage point of EPS CAGR
    pub growth_multiplier: f64,

    /// Minimum quarters required before any valuation is attempted
    pub min_quarters: usize,

    /// Quarters fed to the forward EPS estimator
    pub forward_window: usize,

    /// Lifetime of a cached valuation report
    pub cache_ttl: Duration,

    /// Average net margin above which the excellent-margin bonus applies
    pub excellent_margin_threshold: f64,

    /// Bonus for excellent margins
    pub margin_excellent_adjustment: f64,

    /// Bonus for an improving margin trend
    pub margin_improving_adjustment: f64,

    /// Debt-to-equity above which the leverage penalty applies
    pub high_debt_to_equity: f64,

    /// Leverage penalty
    pub debt_risk_adjustment: f64,

    /// Declining margin penalty
    pub declining_margin_adjustment: f64,

    /// How the two risk penalties combine
    pub risk_policy: RiskPolicy,

    /// Equity is approximated as positive net income times this multiple
    pub equity_income_multiple: f64,

    /// Floor for the fundamentals-implied P/E
    pub min_fundamentals_pe: f64,

    /// Blend used when no peer produced usable data
    pub weights_without_peers: SynthesisWeights,

    /// Blend used when at least one peer produced a P/E
    pub weights_with_peers: SynthesisWeights,

    /// Minimum half-width of the justified range as a fraction of the midpoint
    pub spread_fraction: f64,

    /// Historical standard deviations used as the alternative half-width
    pub spread_std_devs: f64,

    /// Upper bound on in-flight feed requests for peers and for report-date prices
    pub max_concurrent_peer_fetches: usize,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            base_pe: 22.0,
            growth_multiplier: 0.5,
            min_quarters: 8,
            forward_window: 8,
            cache_ttl: Duration::from_secs(24 * 3600), // 24 hours
            excellent_margin_threshold: 0.20,
            margin_excellent_adjustment: 3.0,
            margin_improving_adjustment: 2.0,
            high_debt_to_equity: 1.5,
            debt_risk_adjustment: -2.0,
            declining_margin_adjustment: -2.0,
            risk_policy: RiskPolicy::Stack,
            equity_income_multiple: 20.0,
            min_fundamentals_pe: 5.0,
            weights_without_peers: SynthesisWeights {
                historical: 0.57,
                peer: 0.0,
                fundamentals: 0.43,
            },
            weights_with_peers: SynthesisWeights {
                historical: 0.40,
                peer: 0.30,
                fundamentals: 0.30,
            },
            spread_fraction: 0.10,
            spread_std_devs: 1.0,
            max_concurrent_peer_fetches: 4,
        }
    }
}

impl ValuationConfig {
    /// Create a new configuration builder
    pub fn builder() -> ValuationConfigBuilder {
        ValuationConfigBuilder::default()
    }

    /// Override values from `PE_BASE_MARKET`, `PE_GROWTH_MULTIPLIER`,
    /// `MIN_QUARTERS_FOR_VALUATION` and `VALUATION_CACHE_HOURS`
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(value) = env_parse::<f64>("PE_BASE_MARKET")? {
            self.base_pe = value;
        }
        if let Some(value) = env_parse::<f64>("PE_GROWTH_MULTIPLIER")? {
            self.growth_multiplier = value;
        }
        if let Some(value) = env_parse::<usize>("MIN_QUARTERS_FOR_VALUATION")? {
            self.min_quarters = value;
        }
        if let Some(hours) = env_parse::<u64>("VALUATION_CACHE_HOURS")? {
            self.cache_ttl = cache_ttl_from_hours(hours)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.base_pe.is_finite() || self.base_pe <= 0.0 {
            return Err(ValuationError::ConfigError(
                "base_pe must be a positive number".to_string(),
            ));
        }

        if !self.growth_multiplier.is_finite() {
            return Err(ValuationError::ConfigError(
                "growth_multiplier must be finite".to_string(),
            ));
        }

        // The forward estimator and the TTM windows both need this many quarters.
        if self.forward_window < 2 {
            return Err(ValuationError::ConfigError(
                "forward_window must be at least 2".to_string(),
            ));
        }
        if self.min_quarters < self.forward_window.max(4) {
            return Err(ValuationError::ConfigError(format!(
                "min_quarters must be at least {}",
                self.forward_window.max(4)
            )));
        }

        if self.cache_ttl.is_zero() {
            return Err(ValuationError::ConfigError(
                "cache_ttl must be greater than 0".to_string(),
            ));
        }

        if !self.spread_fraction.is_finite() || self.spread_fraction < 0.0 {
            return Err(ValuationError::ConfigError(
                "spread_fraction must be non-negative".to_string(),
            ));
        }

        if self.max_concurrent_peer_fetches == 0 {
            return Err(ValuationError::ConfigError(
                "max_concurrent_peer_fetches must be greater than 0".to_string(),
            ));
        }

        if self.weights_without_peers.peer != 0.0 {
            return Err(ValuationError::ConfigError(
                "no-peer weights cannot assign weight to peers".to_string(),
            ));
        }
        self.weights_without_peers.validate("no-peer")?;
        self.weights_with_peers.validate("peer")?;

        Ok(())
    }
}

fn cache_ttl_from_hours(hours: u64) -> Result<Duration> {
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ValuationError::ConfigError(format!("VALUATION_CACHE_HOURS={hours} is too large"))
        })
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ValuationError::ConfigError(format!("{name} has invalid value '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Builder for ValuationConfig
#[derive(Debug, Default)]
pub struct ValuationConfigBuilder {
    base_pe: Option<f64>,
    growth_multiplier: Option<f64>,
    min_quarters: Option<usize>,
    cache_ttl: Option<Duration>,
    risk_policy: Option<RiskPolicy>,
    min_fundamentals_pe: Option<f64>,
    weights_without_peers: Option<SynthesisWeights>,
    weights_with_peers: Option<SynthesisWeights>,
    max_concurrent_peer_fetches: Option<usize>,
}

impl ValuationConfigBuilder {
    /// Set the baseline market P/E
    pub fn base_pe(mut self, value: f64) -> Self {
        self.base_pe = Some(value);
        self
    }

    /// Set the growth adjustment multiplier
    pub fn growth_multiplier(mut self, value: f64) -> Self {
        self.growth_multiplier = Some(value);
        self
    }

    /// Set the minimum number of quarters
    pub fn min_quarters(mut self, value: usize) -> Self {
        self.min_quarters = Some(value);
        self
    }

    /// Set cache TTL for valuation reports
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.cache_ttl = Some(duration);
        self
    }

    /// Set the risk penalty combination policy
    pub fn risk_policy(mut self, policy: RiskPolicy) -> Self {
        self.risk_policy = Some(policy);
        self
    }

    /// Set the fundamentals P/E floor
    pub fn min_fundamentals_pe(mut self, value: f64) -> Self {
        self.min_fundamentals_pe = Some(value);
        self
    }

    /// Set the no-peer blend weights
    pub fn weights_without_peers(mut self, weights: SynthesisWeights) -> Self {
        self.weights_without_peers = Some(weights);
        self
    }

    /// Set the with-peer blend weights
    pub fn weights_with_peers(mut self, weights: SynthesisWeights) -> Self {
        self.weights_with_peers = Some(weights);
        self
    }

    /// Set the peer fetch concurrency bound
    pub fn max_concurrent_peer_fetches(mut self, value: usize) -> Self {
        self.max_concurrent_peer_fetches = Some(value);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ValuationConfig> {
        let defaults = ValuationConfig::default();

        let config = ValuationConfig {
            base_pe: self.base_pe.unwrap_or(defaults.base_pe),
            growth_multiplier: self.growth_multiplier.unwrap_or(defaults.growth_multiplier),
            min_quarters: self.min_quarters.unwrap_or(defaults.min_quarters),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            risk_policy: self.risk_policy.unwrap_or(defaults.risk_policy),
            min_fundamentals_pe: self
                .min_fundamentals_pe
                .unwrap_or(defaults.min_fundamentals_pe),
            weights_without_peers: self
                .weights_without_peers
                .unwrap_or(defaults.weights_without_peers),
            weights_with_peers: self
                .weights_with_peers
                .unwrap_or(defaults.weights_with_peers),
            max_concurrent_peer_fetches: self
                .max_concurrent_peer_fetches
                .unwrap_or(defaults.max_concurrent_peer_fetches),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}
