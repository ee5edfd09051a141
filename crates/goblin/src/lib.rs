//! Goblin - LLM-assisted single-stock analysis.
//!
//! Collects market data, fundamentals and news for one ticker, computes
//! technical indicators, extracts news features with a language model and asks
//! a second model for a bounded BUY/SELL/HOLD recommendation.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use goblin::models::GoblinConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = GoblinConfig::default();
//! let outcome =
//!     goblin::run_analysis(&config, "AAPL", "2024-03-01", &goblin::new_session_id()).await;
//! println!("{}", goblin::report::render(&outcome));
//! # Ok(())
//! # }
//! ```

pub mod report;

pub use goblin_agents as agents;
pub use goblin_data as data;
pub use goblin_models as models;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use goblin_agents::{build_model, Orchestrator};
use goblin_data::LiveDataProvider;
use goblin_models::{AnalysisOutcome, GoblinConfig};
use tracing::{error, info};
use uuid::Uuid;

/// Load configuration from `path`, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<GoblinConfig> {
    let Some(path) = path else {
        return Ok(GoblinConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

pub fn parse_config(raw: &str) -> Result<GoblinConfig> {
    Ok(toml::from_str(raw)?)
}

/// Build the live four-stage pipeline from configuration.
pub fn build_orchestrator(config: &GoblinConfig) -> Orchestrator {
    let data = Arc::new(LiveDataProvider::from_config(&config.providers));
    let news_model = build_model(&config.models.news);
    let portfolio_model = build_model(&config.models.portfolio);
    Orchestrator::new(data, news_model, portfolio_model, config)
}

/// Build the live pipeline from `config` and run one analysis.
pub async fn run_analysis(
    config: &GoblinConfig,
    symbol: &str,
    analysis_date: &str,
    session_id: &str,
) -> AnalysisOutcome {
    build_orchestrator(config)
        .run_analysis(symbol, analysis_date, session_id)
        .await
}

pub fn new_session_id() -> String {
    format!("analysis_{}", Uuid::new_v4())
}

/// Log how the run ended. An aborted run becomes an error for the caller.
pub fn finish(outcome: &AnalysisOutcome) -> Result<()> {
    let symbol = outcome.symbol();
    match outcome {
        AnalysisOutcome::Aborted(run) => {
            error!(symbol, session_id = %run.session_id, error = %run.error, "Analysis aborted");
            anyhow::bail!("Analysis aborted: {}", run.error)
        }
        AnalysisOutcome::Completed(run) => {
            info!(
                symbol,
                session_id = %run.session_id,
                final_step = ?run.final_step,
                last_error = run.error.as_deref(),
                "Analysis finished"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use goblin_models::{ModelProvider, PipelineState};

    #[test]
    fn missing_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, GoblinConfig::default());
    }

    #[test]
    fn unreadable_path_names_the_file() {
        let err = load_config(Some(Path::new("/nonexistent/goblin.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/goblin.toml"));
    }

    #[test]
    fn bundled_config_parses() {
        let config = parse_config(include_str!("../../../config/goblin.toml")).unwrap();
        assert!(config.pipeline.continue_on_stage_failure);
        assert_eq!(config.pipeline.max_news_articles, 3);
        assert_eq!(config.models.news.provider, ModelProvider::ChatCompletions);
        assert_eq!(config.models.portfolio.model, "openai/gpt-oss-120b");
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(parse_config("[pipeline]\nmax_news_articles = \"three\"").is_err());
    }

    #[test]
    fn session_ids_are_prefixed_and_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert!(a.starts_with("analysis_"));
        assert_ne!(a, b);
    }

    #[test]
    fn aborted_outcome_is_an_error() {
        let outcome = AnalysisOutcome::aborted("AAPL", "s1", "bad", "Invalid analysis date 'bad'");
        let err = finish(&outcome).unwrap_err();
        assert_eq!(err.to_string(), "Analysis aborted: Invalid analysis date 'bad'");
    }

    #[test]
    fn completed_outcome_with_stage_errors_still_succeeds() {
        let mut state = PipelineState::new(
            "AAPL",
            "s1",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        state.error = Some("No news data found for AAPL".to_string());
        assert!(finish(&AnalysisOutcome::from_state(state)).is_ok());
    }

    #[test]
    fn live_pipeline_has_four_stages_in_order() {
        let orchestrator = build_orchestrator(&GoblinConfig::default());
        assert_eq!(
            orchestrator.stage_names(),
            vec![
                "data_collection",
                "technical_analysis",
                "news_intelligence",
                "portfolio_manager"
            ]
        );
    }
}
