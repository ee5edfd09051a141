mod data_collection;
mod news_intelligence;
mod portfolio_decision;
mod technical_analysis;

pub use data_collection::DataCollectionStage;
pub use news_intelligence::{aggregate_news_features, NewsIntelligenceStage};
pub use portfolio_decision::PortfolioDecisionStage;
pub use technical_analysis::TechnicalAnalysisStage;

use goblin_models::StageResult;

use crate::error::AgentError;

/// Wrap a stage's analysis outcome into its result record.
fn into_record<P>(symbol: &str, outcome: Result<P, AgentError>) -> StageResult<P> {
    match outcome {
        Ok(payload) => StageResult::success(symbol, payload),
        Err(e) => StageResult::failure(symbol, e.to_string()),
    }
}
