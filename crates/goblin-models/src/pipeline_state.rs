use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::market::{BasicFinancials, CompanyInfo, CompanyProfile, IndicatorSnapshot, MarketData};
use crate::news_feature::NlpFeatures;
use crate::trading_decision::TradingDecision;

/// Marker for the last stage that ran.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Initialized,
    DataCollectionComplete,
    TechnicalAnalysisCompleted,
    NewsIntelligenceComplete,
    PortfolioManagementComplete,
}

/// Output record of one stage. On success the payload is flattened into the
/// record; on failure only `symbol`, `success` and `error` are present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageResult<P> {
    pub symbol: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Option<P>,
}

impl<P> StageResult<P> {
    pub fn success(symbol: impl Into<String>, payload: P) -> Self {
        Self {
            symbol: symbol.into(),
            success: true,
            error: None,
            payload: Some(payload),
        }
    }

    pub fn failure(symbol: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            success: false,
            error: Some(error.into()),
            payload: None,
        }
    }

    /// Payload when the stage succeeded.
    pub fn payload(&self) -> Option<&P> {
        if self.success {
            self.payload.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectedData {
    pub analysis_date: NaiveDate,
    pub market_data: Option<MarketData>,
    pub company_info: Option<CompanyInfo>,
    pub company_profile: Option<CompanyProfile>,
    pub basic_financials: Option<BasicFinancials>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalAnalysis {
    pub indicators: IndicatorSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsIntelligence {
    pub nlp_features: NlpFeatures,
    /// Articles returned by the news source, before the processing cap.
    pub total_news: usize,
}

pub type DataCollectionResult = StageResult<CollectedData>;
pub type TechnicalAnalysisResult = StageResult<TechnicalAnalysis>;
pub type NewsIntelligenceResult = StageResult<NewsIntelligence>;
pub type PortfolioDecisionResult = StageResult<TradingDecision>;

/// State threaded through the pipeline. Each stage takes it by value and hands
/// back the updated value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineState {
    pub symbol: String,
    pub session_id: String,
    pub analysis_date: NaiveDate,
    pub current_step: PipelineStep,
    pub data_collection_results: Option<DataCollectionResult>,
    pub technical_analysis_results: Option<TechnicalAnalysisResult>,
    pub news_intelligence_results: Option<NewsIntelligenceResult>,
    pub portfolio_manager_results: Option<PortfolioDecisionResult>,
    /// Most recent stage failure. Later successes do not clear it.
    pub error: Option<String>,
}

impl PipelineState {
    pub fn new(
        symbol: impl Into<String>,
        session_id: impl Into<String>,
        analysis_date: NaiveDate,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            session_id: session_id.into(),
            analysis_date,
            current_step: PipelineStep::Initialized,
            data_collection_results: None,
            technical_analysis_results: None,
            news_intelligence_results: None,
            portfolio_manager_results: None,
            error: None,
        }
    }

    /// Record a stage outcome in the shared error slot. Failures overwrite the
    /// slot; successes leave it alone.
    pub fn record_outcome<P>(&mut self, result: &StageResult<P>) {
        if !result.success {
            self.error = Some(
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Stage failed".to_string()),
            );
        }
    }

    /// Success flag of the stage that completes with `step`, or `None` if that
    /// stage has not run.
    pub fn step_succeeded(&self, step: PipelineStep) -> Option<bool> {
        match step {
            PipelineStep::Initialized => None,
            PipelineStep::DataCollectionComplete => {
                self.data_collection_results.as_ref().map(|r| r.success)
            }
            PipelineStep::TechnicalAnalysisCompleted => {
                self.technical_analysis_results.as_ref().map(|r| r.success)
            }
            PipelineStep::NewsIntelligenceComplete => {
                self.news_intelligence_results.as_ref().map(|r| r.success)
            }
            PipelineStep::PortfolioManagementComplete => {
                self.portfolio_manager_results.as_ref().map(|r| r.success)
            }
        }
    }

    pub fn market_data(&self) -> Option<&MarketData> {
        self.data_collection_results
            .as_ref()
            .and_then(StageResult::payload)
            .and_then(|data| data.market_data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading_decision::TradingSignal;
    use rust_decimal::Decimal;

    fn state() -> PipelineState {
        PipelineState::new(
            "AAPL",
            "analysis_1",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
    }

    #[test]
    fn new_state_has_only_inputs() {
        let state = state();
        assert_eq!(state.current_step, PipelineStep::Initialized);
        assert!(state.data_collection_results.is_none());
        assert!(state.error.is_none());
        assert_eq!(state.step_succeeded(PipelineStep::DataCollectionComplete), None);
    }

    #[test]
    fn error_slot_is_last_write_wins() {
        let mut state = state();
        state.record_outcome(&StageResult::<()>::failure("AAPL", "first"));
        state.record_outcome(&StageResult::<()>::failure("AAPL", "second"));
        assert_eq!(state.error.as_deref(), Some("second"));

        state.record_outcome(&StageResult::success("AAPL", ()));
        assert_eq!(state.error.as_deref(), Some("second"));
    }

    #[test]
    fn failure_record_omits_payload() {
        let result: TechnicalAnalysisResult =
            StageResult::failure("AAPL", "Insufficient historical data available upto 2024-03-01");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["success"], false);
        assert!(json.get("indicators").is_none());
        assert!(result.payload().is_none());
    }

    #[test]
    fn success_record_flattens_payload() {
        let decision = TradingDecision::normalized(TradingSignal::Buy, Decimal::new(7, 1), 40);
        let result: PortfolioDecisionResult = StageResult::success("AAPL", decision);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["trading_signal"], "BUY");
        assert_eq!(json["position_size"], 40);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn step_serializes_snake_case() {
        let json = serde_json::to_value(PipelineStep::TechnicalAnalysisCompleted).unwrap();
        assert_eq!(json, "technical_analysis_completed");
    }
}
