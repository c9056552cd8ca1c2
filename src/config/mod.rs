use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

pub mod factors;
pub mod loader;

pub const DEFAULT_STALE_THRESHOLD_DAYS: f64 = 10.0;
pub const DEFAULT_TIME_DECAY_DAYS: f64 = 30.0;
pub const DEFAULT_STD_DEV_TOLERANCE: f64 = 1.28;

/// Tunables driving the weight model and the selection bound.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct FactorConfig {
    /// Quotes stale for more days than this are excluded from pricing
    pub stale_threshold_days: f64,
    /// Day-decay horizon; below 1 switches recency weighting to intraday minutes
    pub time_decay_days: f64,
    /// Number of standard deviations a bid may sit from the midpoint
    pub std_dev_tolerance: f64,
}

impl Default for FactorConfig {
    fn default() -> Self {
        FactorConfig {
            stale_threshold_days: DEFAULT_STALE_THRESHOLD_DAYS,
            time_decay_days: DEFAULT_TIME_DECAY_DAYS,
            std_dev_tolerance: DEFAULT_STD_DEV_TOLERANCE,
        }
    }
}

/// Values found in the factor source; anything missing falls back to the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct FactorOverrides {
    pub stale_threshold_days: Option<f64>,
    pub time_decay_days: Option<f64>,
    pub std_dev_tolerance: Option<f64>,
}

impl FactorConfig {
    pub fn from_overrides(overrides: FactorOverrides) -> Result<Self> {
        let defaults = FactorConfig::default();
        let config = FactorConfig {
            stale_threshold_days: overrides.stale_threshold_days.unwrap_or(defaults.stale_threshold_days),
            time_decay_days: overrides.time_decay_days.unwrap_or(defaults.time_decay_days),
            std_dev_tolerance: overrides.std_dev_tolerance.unwrap_or(defaults.std_dev_tolerance),
        };
        config.validate()?;
        Ok(config)
    }

    /// Zero or negative factors turn the weight ratios into 0/0.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("stale_threshold_days", self.stale_threshold_days),
            ("time_decay_days", self.time_decay_days),
            ("std_dev_tolerance", self.std_dev_tolerance),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidFactor { name, value });
            }
        }
        Ok(())
    }

    /// Intraday mode weights recency by minutes since the quote instead of days unchanged.
    pub fn is_intraday(&self) -> bool {
        self.time_decay_days < 1.0
    }
}
