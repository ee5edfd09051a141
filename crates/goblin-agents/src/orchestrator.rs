use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use goblin_data::DataProvider;
use goblin_models::{AnalysisOutcome, GoblinConfig, PipelineState};
use tracing::{error, info, warn, Instrument};

use crate::error::AgentError;
use crate::interpreter::Interpreter;
use crate::model::LanguageModel;
use crate::stage::Stage;
use crate::stages::{
    DataCollectionStage, NewsIntelligenceStage, PortfolioDecisionStage, TechnicalAnalysisStage,
};

/// Runs the pipeline stages strictly in order, threading the state through.
pub struct Orchestrator {
    stages: Vec<Arc<dyn Stage>>,
    continue_on_stage_failure: bool,
}

impl Orchestrator {
    /// The standard four-stage pipeline:
    /// data collection, technical analysis, news intelligence, portfolio decision.
    pub fn new(
        data: Arc<dyn DataProvider>,
        news_model: Arc<dyn LanguageModel>,
        portfolio_model: Arc<dyn LanguageModel>,
        config: &GoblinConfig,
    ) -> Self {
        let pipeline = &config.pipeline;
        let interpreter = Interpreter::from_config(pipeline);
        let fetch_timeout = Duration::from_secs(config.providers.request_timeout_seconds);

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(DataCollectionStage::new(Arc::clone(&data), fetch_timeout)),
            Arc::new(TechnicalAnalysisStage::new(pipeline.min_history_bars)),
            Arc::new(NewsIntelligenceStage::new(
                data,
                news_model,
                interpreter.clone(),
                pipeline.max_news_articles,
                fetch_timeout,
            )),
            Arc::new(PortfolioDecisionStage::new(portfolio_model, interpreter)),
        ];

        Self::with_stages(stages, pipeline.continue_on_stage_failure)
    }

    pub fn with_stages(stages: Vec<Arc<dyn Stage>>, continue_on_stage_failure: bool) -> Self {
        Self {
            stages,
            continue_on_stage_failure,
        }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Parse the date, build the initial state and run the pipeline. The
    /// symbol is upper-cased here and nowhere else.
    pub async fn run_analysis(
        &self,
        symbol: &str,
        analysis_date: &str,
        session_id: &str,
    ) -> AnalysisOutcome {
        let symbol = symbol.trim().to_uppercase();
        match NaiveDate::parse_from_str(analysis_date, "%Y-%m-%d") {
            Ok(date) => self.run(PipelineState::new(symbol, session_id, date)).await,
            Err(e) => {
                error!(symbol = %symbol, analysis_date, error = %e, "Invalid analysis date");
                AnalysisOutcome::aborted(
                    symbol,
                    session_id,
                    analysis_date,
                    format!("Invalid analysis date '{analysis_date}': {e}"),
                )
            }
        }
    }

    /// Run every stage in order. Stage failures are recorded in the state and
    /// the run continues unless `continue_on_stage_failure` is off. A stage
    /// that panics or returns an error aborts the run.
    pub async fn run(&self, initial: PipelineState) -> AnalysisOutcome {
        let start = Instant::now();
        let symbol = initial.symbol.clone();
        let session_id = initial.session_id.clone();
        let analysis_date = initial.analysis_date.format("%Y-%m-%d").to_string();
        info!(symbol = %symbol, session_id = %session_id, analysis_date = %analysis_date, "Starting analysis");

        let mut state = initial;
        for stage in &self.stages {
            let stage = Arc::clone(stage);
            let name = stage.name().to_string();
            let stage_start = Instant::now();

            let handle = tokio::spawn(async move { stage.run(state).await }.in_current_span());
            state = match handle.await {
                Ok(Ok(next)) => next,
                Ok(Err(e)) => return abort(&name, e, symbol, session_id, analysis_date),
                Err(e) => {
                    let e = AgentError::StagePanicked {
                        stage: name.clone(),
                        reason: e.to_string(),
                    };
                    return abort(&name, e, symbol, session_id, analysis_date);
                }
            };

            let success = state.step_succeeded(state.current_step).unwrap_or(false);
            let elapsed_ms = stage_start.elapsed().as_millis() as u64;
            if success {
                info!(stage = %name, success, elapsed_ms, "Stage complete");
            } else {
                warn!(stage = %name, success, error = ?state.error, elapsed_ms, "Stage reported failure");
                if !self.continue_on_stage_failure {
                    warn!(stage = %name, "Stopping pipeline after failed stage");
                    break;
                }
            }
        }

        if let Some(decision) = state
            .portfolio_manager_results
            .as_ref()
            .and_then(|r| r.payload())
        {
            info!(
                symbol = %symbol,
                signal = %decision.trading_signal(),
                confidence = %decision.confidence_level(),
                position = decision.position_size(),
                "Recommendation"
            );
        }
        info!(
            symbol = %symbol,
            final_step = ?state.current_step,
            error = ?state.error,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        AnalysisOutcome::from_state(state)
    }
}

fn abort(
    stage: &str,
    e: AgentError,
    symbol: String,
    session_id: String,
    analysis_date: String,
) -> AnalysisOutcome {
    error!(stage, error = %e, "Orchestration failed");
    AnalysisOutcome::aborted(symbol, session_id, analysis_date, e.to_string())
}
