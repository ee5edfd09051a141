//! End-to-end pipeline runs over in-memory data and scripted models.
//!
//! Each test builds the standard four-stage orchestrator from configuration,
//! feeds it a `StaticDataProvider` and `ScriptedModel`s, and checks the
//! finished `AnalysisOutcome`.

use std::sync::Arc;

use chrono::NaiveDate;
use goblin_agents::test_support::{
    decision_response, news_feature_response, rising_bars, sample_articles, ScriptedModel,
    StaticDataProvider,
};
use goblin_agents::{validate_value, Orchestrator};
use goblin_models::{
    AnalysisOutcome, CompletedAnalysis, GoblinConfig, PipelineStep, TradingSignal,
};
use rust_decimal_macros::dec;

const SYMBOL: &str = "AAPL";
const DATE: &str = "2024-03-01";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

struct Harness {
    news_model: Arc<ScriptedModel>,
    portfolio_model: Arc<ScriptedModel>,
    orchestrator: Orchestrator,
}

fn harness(
    provider: StaticDataProvider,
    news_responses: Vec<String>,
    portfolio_responses: Vec<String>,
    config: &GoblinConfig,
) -> Harness {
    let news_model = Arc::new(ScriptedModel::new(news_responses));
    let portfolio_model = Arc::new(ScriptedModel::new(portfolio_responses));
    let orchestrator = Orchestrator::new(
        Arc::new(provider),
        news_model.clone(),
        portfolio_model.clone(),
        config,
    );
    Harness {
        news_model,
        portfolio_model,
        orchestrator,
    }
}

fn three_news_responses() -> Vec<String> {
    vec![
        news_feature_response("Apple beats estimates", "positive"),
        news_feature_response("Supplier delays", "negative"),
        news_feature_response("New product line", "neutral"),
    ]
}

fn completed(outcome: AnalysisOutcome) -> CompletedAnalysis {
    match outcome {
        AnalysisOutcome::Completed(completed) => completed,
        AnalysisOutcome::Aborted(aborted) => panic!("run aborted: {}", aborted.error),
    }
}

#[tokio::test]
async fn healthy_run_produces_normalized_decision() {
    let provider = StaticDataProvider::healthy(SYMBOL, rising_bars(40, date()), sample_articles(5));
    let fenced = "Here's the result:\n```json\n{\"trading_signal\":\"buy\",\"confidence_level\":1.4,\"position_size\":37}\n```";
    let h = harness(
        provider,
        three_news_responses(),
        vec![fenced.to_string()],
        &GoblinConfig::default(),
    );

    let run = completed(h.orchestrator.run_analysis("aapl", DATE, "analysis_1").await);

    assert!(run.success);
    assert_eq!(run.symbol, SYMBOL);
    assert_eq!(run.analysis_date, DATE);
    assert_eq!(run.final_step, PipelineStep::PortfolioManagementComplete);
    assert!(run.error.is_none());

    let decision = run.results.portfolio_manager.unwrap().payload.unwrap();
    assert_eq!(decision.trading_signal(), TradingSignal::Buy);
    assert_eq!(decision.confidence_level(), dec!(1.0));
    assert_eq!(decision.position_size(), 30);

    let news = run.results.news_intelligence.unwrap().payload.unwrap();
    assert_eq!(news.total_news, 5);
    assert_eq!(news.nlp_features.total_analyzed, 3);
    assert_eq!(h.news_model.calls().await, 3);

    let prompt = &h.portfolio_model.prompts().await[0];
    assert!(prompt.contains("[SYMBOL: AAPL]"));
    assert!(prompt.contains("[ANALYSIS DATE: 2024-03-01]"));
}

#[tokio::test]
async fn revalidating_a_reported_decision_is_idempotent() {
    let provider = StaticDataProvider::healthy(SYMBOL, rising_bars(40, date()), sample_articles(3));
    let h = harness(
        provider,
        three_news_responses(),
        vec![decision_response("sell", 0.04, 255)],
        &GoblinConfig::default(),
    );

    let run = completed(h.orchestrator.run_analysis(SYMBOL, DATE, "s").await);
    let decision = run.results.portfolio_manager.unwrap().payload.unwrap();
    assert_eq!(decision.trading_signal(), TradingSignal::Sell);
    assert_eq!(decision.confidence_level(), dec!(0.1));
    assert_eq!(decision.position_size(), 100);

    let json = serde_json::to_value(&decision).unwrap();
    assert_eq!(validate_value(&json).unwrap(), decision);
}

#[tokio::test]
async fn unknown_signal_fails_portfolio_stage() {
    let provider = StaticDataProvider::healthy(SYMBOL, rising_bars(40, date()), sample_articles(3));
    let h = harness(
        provider,
        three_news_responses(),
        vec![decision_response("STRONG_BUY", 0.8, 50)],
        &GoblinConfig::default(),
    );

    let run = completed(h.orchestrator.run_analysis(SYMBOL, DATE, "s").await);
    let portfolio = run.results.portfolio_manager.unwrap();
    assert!(!portfolio.success);
    assert!(portfolio.payload.is_none());
    assert!(run
        .error
        .unwrap()
        .contains("Invalid trading signal: STRONG_BUY"));
}

#[tokio::test]
async fn prose_decision_is_a_stage_failure_not_a_crash() {
    let provider = StaticDataProvider::healthy(SYMBOL, rising_bars(40, date()), sample_articles(3));
    let h = harness(
        provider,
        three_news_responses(),
        vec!["I'd lean towards buying, maybe half a position.".to_string()],
        &GoblinConfig::default(),
    );

    let run = completed(h.orchestrator.run_analysis(SYMBOL, DATE, "s").await);
    assert_eq!(run.final_step, PipelineStep::PortfolioManagementComplete);
    let portfolio = run.results.portfolio_manager.unwrap();
    assert!(!portfolio.success);
    assert_eq!(h.portfolio_model.calls().await, 1);
}

#[tokio::test]
async fn short_history_still_runs_news_and_skips_model() {
    let provider = StaticDataProvider::healthy(SYMBOL, rising_bars(10, date()), sample_articles(3));
    let h = harness(
        provider,
        three_news_responses(),
        vec![decision_response("BUY", 0.5, 50)],
        &GoblinConfig::default(),
    );

    let run = completed(h.orchestrator.run_analysis(SYMBOL, DATE, "s").await);

    let technical = run.results.technical_analysis.unwrap();
    assert!(!technical.success);
    assert_eq!(
        technical.error.as_deref(),
        Some("Insufficient historical data available upto 2024-03-01")
    );

    assert!(run.results.news_intelligence.unwrap().success);
    assert_eq!(h.news_model.calls().await, 3);

    assert!(!run.results.portfolio_manager.unwrap().success);
    assert_eq!(h.portfolio_model.calls().await, 0);
    assert_eq!(run.final_step, PipelineStep::PortfolioManagementComplete);
    assert_eq!(
        run.error.as_deref(),
        Some("No valid technical analysis data provided")
    );
}

#[tokio::test]
async fn undecodable_article_is_skipped_in_order() {
    let provider = StaticDataProvider::healthy(SYMBOL, rising_bars(40, date()), sample_articles(5));
    let h = harness(
        provider,
        vec![
            news_feature_response("first", "positive"),
            "The article is about chips.".to_string(),
            news_feature_response("third", "negative"),
        ],
        vec![decision_response("HOLD", 0.5, 50)],
        &GoblinConfig::default(),
    );

    let run = completed(h.orchestrator.run_analysis(SYMBOL, DATE, "s").await);
    let news = run.results.news_intelligence.unwrap().payload.unwrap();
    let headlines: Vec<&str> = news
        .nlp_features
        .news_features
        .iter()
        .map(|r| r.headline.as_str())
        .collect();
    assert_eq!(headlines, vec!["first", "third"]);
    assert_eq!(news.nlp_features.total_analyzed, 2);
    assert_eq!(h.news_model.calls().await, 3);
}

#[tokio::test]
async fn stop_on_failure_ends_after_failed_stage() {
    let mut config = GoblinConfig::default();
    config.pipeline.continue_on_stage_failure = false;

    let provider = StaticDataProvider::healthy(SYMBOL, rising_bars(10, date()), sample_articles(3));
    let h = harness(
        provider,
        three_news_responses(),
        vec![decision_response("BUY", 0.5, 50)],
        &config,
    );

    let run = completed(h.orchestrator.run_analysis(SYMBOL, DATE, "s").await);
    assert_eq!(run.final_step, PipelineStep::TechnicalAnalysisCompleted);
    assert!(run.results.news_intelligence.is_none());
    assert!(run.results.portfolio_manager.is_none());
    assert_eq!(h.news_model.calls().await, 0);
    assert_eq!(h.portfolio_model.calls().await, 0);
}

#[tokio::test]
async fn invalid_date_aborts_without_results() {
    let provider = StaticDataProvider::healthy(SYMBOL, rising_bars(40, date()), sample_articles(3));
    let h = harness(provider, vec![], vec![], &GoblinConfig::default());

    let outcome = h.orchestrator.run_analysis(SYMBOL, "2024-13-45", "s").await;
    assert!(!outcome.is_completed());
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["kind"], "aborted");
    assert_eq!(json["success"], false);
    assert!(json.get("results").is_none());
}

#[tokio::test]
async fn completed_outcome_serializes_stage_records() {
    let provider = StaticDataProvider::healthy(SYMBOL, rising_bars(40, date()), sample_articles(3));
    let h = harness(
        provider,
        three_news_responses(),
        vec![decision_response("HOLD", 0.55, 45)],
        &GoblinConfig::default(),
    );

    let outcome = h.orchestrator.run_analysis(SYMBOL, DATE, "analysis_x").await;
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["kind"], "completed");
    assert_eq!(json["session_id"], "analysis_x");
    assert_eq!(json["results"]["portfolio_manager"]["trading_signal"], "HOLD");
    assert_eq!(json["results"]["portfolio_manager"]["position_size"], 40);
    assert_eq!(json["results"]["technical_analysis"]["success"], true);
    assert!(json["results"]["technical_analysis"]["indicators"]["technical_indicators"]["RSI"]
        .is_number());
}
