use async_trait::async_trait;
use crate::config::FactorConfig;
use crate::error::Result;
use crate::staleness::prior_day::PriorDayState;
use crate::types::quote::RawQuote;
use crate::weighting::hierarchy::DealerHierarchy;

/// Everything a pricing run reads before it starts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InputSource: Send + Sync {
    async fn load_factors(&self) -> Result<FactorConfig>;
    async fn load_hierarchy(&self) -> Result<DealerHierarchy>;
    async fn load_prior_day(&self) -> Result<PriorDayState>;
    async fn load_quotes(&self) -> Result<Vec<RawQuote>>;
}
