use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use goblin_data::{DataError, DataProvider};
use goblin_models::{CollectedData, PipelineState, PipelineStep, ToolResult};
use tracing::{debug, warn};

use super::into_record;
use crate::error::AgentError;
use crate::stage::Stage;

/// Fetches market data, company info, profile and financials. Individual
/// fetch failures are stored as absent; a fetch that times out fails the stage.
pub struct DataCollectionStage {
    data: Arc<dyn DataProvider>,
    timeout: Duration,
}

impl DataCollectionStage {
    pub fn new(data: Arc<dyn DataProvider>, timeout: Duration) -> Self {
        Self { data, timeout }
    }

    async fn fetch<T>(
        &self,
        what: &str,
        call: impl Future<Output = ToolResult<T>>,
    ) -> Result<Option<T>, AgentError> {
        let result = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| DataError::Timeout(self.timeout.as_secs()))?;
        if !result.success {
            warn!(fetch = what, error = ?result.error, "Data fetch failed; continuing without it");
        }
        Ok(result.into_data())
    }

    async fn collect(&self, symbol: &str, date: NaiveDate) -> Result<CollectedData, AgentError> {
        let market_data = self
            .fetch("market_data", self.data.market_data(symbol, date))
            .await?;
        let company_info = self
            .fetch("company_info", self.data.company_info(symbol))
            .await?;
        let company_profile = self
            .fetch("company_profile", self.data.company_profile(symbol))
            .await?;
        let basic_financials = self
            .fetch("basic_financials", self.data.basic_financials(symbol))
            .await?;

        debug!(
            symbol = %symbol,
            market_data = market_data.is_some(),
            company_info = company_info.is_some(),
            company_profile = company_profile.is_some(),
            basic_financials = basic_financials.is_some(),
            "Data collected"
        );

        Ok(CollectedData {
            analysis_date: date,
            market_data,
            company_info,
            company_profile,
            basic_financials,
        })
    }
}

#[async_trait]
impl Stage for DataCollectionStage {
    fn name(&self) -> &str {
        "data_collection"
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let outcome = self.collect(&state.symbol, state.analysis_date).await;
        let result = into_record(&state.symbol, outcome);

        state.record_outcome(&result);
        state.data_collection_results = Some(result);
        state.current_step = PipelineStep::DataCollectionComplete;
        Ok(state)
    }
}
