use async_trait::async_trait;
use goblin_data::compute_indicators;
use goblin_models::{IndicatorSnapshot, PipelineState, PipelineStep, TechnicalAnalysis};

use super::into_record;
use crate::error::AgentError;
use crate::stage::Stage;

/// Computes indicators over the collected daily history.
pub struct TechnicalAnalysisStage {
    min_history_bars: usize,
}

impl TechnicalAnalysisStage {
    pub fn new(min_history_bars: usize) -> Self {
        Self { min_history_bars }
    }

    fn analyze(&self, state: &PipelineState) -> Result<TechnicalAnalysis, AgentError> {
        let date = state.analysis_date;
        let market = state.market_data().ok_or_else(|| {
            AgentError::Precondition(format!("No historical data available upto {date}"))
        })?;

        let technical_indicators =
            compute_indicators(&market.historical_data, date, self.min_history_bars)
                .into_result()
                .map_err(AgentError::Precondition)?;

        let current_price = Some(market.current_price)
            .filter(|price| price.is_finite() && *price > 0.0)
            .or_else(|| market.historical_data.last().map(|bar| bar.close))
            .unwrap_or(0.0);

        Ok(TechnicalAnalysis {
            indicators: IndicatorSnapshot {
                technical_indicators,
                current_price,
            },
        })
    }
}

#[async_trait]
impl Stage for TechnicalAnalysisStage {
    fn name(&self) -> &str {
        "technical_analysis"
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let outcome = self.analyze(&state);
        let result = into_record(&state.symbol, outcome);

        state.record_outcome(&result);
        state.technical_analysis_results = Some(result);
        state.current_step = PipelineStep::TechnicalAnalysisCompleted;
        Ok(state)
    }
}
