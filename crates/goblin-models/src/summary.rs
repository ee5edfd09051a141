use serde::{Deserialize, Serialize};

use crate::pipeline_state::{
    DataCollectionResult, NewsIntelligenceResult, PipelineState, PipelineStep,
    PortfolioDecisionResult, TechnicalAnalysisResult,
};

/// Per-stage records of a finished run. Stages that did not run are `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageResults {
    pub data_collection: Option<DataCollectionResult>,
    pub technical_analysis: Option<TechnicalAnalysisResult>,
    pub news_intelligence: Option<NewsIntelligenceResult>,
    pub portfolio_manager: Option<PortfolioDecisionResult>,
}

/// The orchestrator ran to the end. Individual stages may still have failed;
/// see `error` and the per-stage records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedAnalysis {
    pub success: bool,
    pub session_id: String,
    pub analysis_date: String,
    pub symbol: String,
    pub results: StageResults,
    pub final_step: PipelineStep,
    pub error: Option<String>,
}

/// Orchestration itself failed: no results are reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AbortedAnalysis {
    pub success: bool,
    pub error: String,
    pub symbol: String,
    pub session_id: String,
    pub analysis_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Completed(CompletedAnalysis),
    Aborted(AbortedAnalysis),
}

impl AnalysisOutcome {
    pub fn from_state(state: PipelineState) -> Self {
        Self::Completed(CompletedAnalysis {
            success: true,
            session_id: state.session_id,
            analysis_date: state.analysis_date.format("%Y-%m-%d").to_string(),
            symbol: state.symbol,
            results: StageResults {
                data_collection: state.data_collection_results,
                technical_analysis: state.technical_analysis_results,
                news_intelligence: state.news_intelligence_results,
                portfolio_manager: state.portfolio_manager_results,
            },
            final_step: state.current_step,
            error: state.error,
        })
    }

    pub fn aborted(
        symbol: impl Into<String>,
        session_id: impl Into<String>,
        analysis_date: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::Aborted(AbortedAnalysis {
            success: false,
            error: error.into(),
            symbol: symbol.into(),
            session_id: session_id.into(),
            analysis_date: analysis_date.into(),
        })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Completed(c) => &c.symbol,
            Self::Aborted(a) => &a.symbol,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::Completed(c) => &c.session_id,
            Self::Aborted(a) => &a.session_id,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Completed(c) => c.error.as_deref(),
            Self::Aborted(a) => Some(&a.error),
        }
    }
}
