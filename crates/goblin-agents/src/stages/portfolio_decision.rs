use std::sync::Arc;

use async_trait::async_trait;
use goblin_models::{PipelineState, PipelineStep, StageResult, TradingDecision};
use tracing::{debug, info};

use super::into_record;
use crate::error::AgentError;
use crate::interpreter::Interpreter;
use crate::model::LanguageModel;
use crate::prompts::{portfolio_prompt, PortfolioBrief};
use crate::stage::Stage;
use crate::validator::validate_decision;

/// Asks the portfolio model for a trading decision once every upstream stage
/// has succeeded, then validates and normalizes the answer.
pub struct PortfolioDecisionStage {
    model: Arc<dyn LanguageModel>,
    interpreter: Interpreter,
}

impl PortfolioDecisionStage {
    pub fn new(model: Arc<dyn LanguageModel>, interpreter: Interpreter) -> Self {
        Self { model, interpreter }
    }

    async fn analyze(&self, state: &PipelineState) -> Result<TradingDecision, AgentError> {
        let symbol = &state.symbol;

        let technical = state
            .technical_analysis_results
            .as_ref()
            .and_then(StageResult::payload)
            .ok_or_else(|| precondition("No valid technical analysis data provided"))?;
        let collected = state
            .data_collection_results
            .as_ref()
            .and_then(StageResult::payload)
            .ok_or_else(|| precondition("No valid company data provided"))?;
        let news = state
            .news_intelligence_results
            .as_ref()
            .and_then(StageResult::payload)
            .ok_or_else(|| precondition("No valid news intelligence data provided"))?;

        let current_price = technical.indicators.current_price;
        if !(current_price.is_finite() && current_price > 0.0) {
            return Err(AgentError::Precondition(format!(
                "No valid current price available for {symbol}"
            )));
        }

        let brief = PortfolioBrief {
            symbol,
            analysis_date: state.analysis_date,
            current_price,
            indicators: &technical.indicators.technical_indicators,
            collected,
            news: &news.nlp_features,
        };

        self.decide(&brief).await.map_err(|e| {
            AgentError::Precondition(format!("Trading signal generation failed: {e}"))
        })
    }

    /// Single attempt: one model call, no retry.
    async fn decide(&self, brief: &PortfolioBrief<'_>) -> Result<TradingDecision, AgentError> {
        self.model.ensure_available().await?;

        let response = self.model.complete(&portfolio_prompt(brief)).await?;
        debug!(model = self.model.name(), len = response.len(), "Portfolio model responded");

        let record = self.interpreter.interpret(&response).ok_or_else(|| {
            AgentError::Parse("No JSON record in model response".to_string())
        })?;
        let decision = validate_decision(&record)?;

        info!(
            symbol = %brief.symbol,
            signal = %decision.trading_signal(),
            confidence = %decision.confidence_level(),
            position = decision.position_size(),
            "Trading decision"
        );
        Ok(decision)
    }
}

fn precondition(message: &str) -> AgentError {
    AgentError::Precondition(message.to_string())
}

#[async_trait]
impl Stage for PortfolioDecisionStage {
    fn name(&self) -> &str {
        "portfolio_manager"
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let outcome = self.analyze(&state).await;
        let result = into_record(&state.symbol, outcome);

        state.record_outcome(&result);
        state.portfolio_manager_results = Some(result);
        state.current_step = PipelineStep::PortfolioManagementComplete;
        Ok(state)
    }
}
