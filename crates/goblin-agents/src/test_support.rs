//! In-memory collaborators and fixtures for exercising stages and the
//! orchestrator without network access.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use goblin_data::yahoo::build_market_data;
use goblin_data::DataProvider;
use goblin_models::{
    BasicFinancials, BollingerValues, CollectedData, CompanyInfo, CompanyNews, CompanyProfile,
    HistoricalBar, IndicatorSnapshot, MacdValues, MarketData, NewsArticle, NewsIntelligence,
    NlpFeatures, PipelineState, PipelineStep, StageResult, TechnicalAnalysis, TechnicalIndicators,
    ToolResult,
};
use serde_json::{json, Map};
use tokio::sync::Mutex;

use crate::error::AgentError;
use crate::model::LanguageModel;

/// Language model that replays canned responses in order and records every
/// prompt it receives.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    available: bool,
}

impl ScriptedModel {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            available: true,
        }
    }

    /// A model whose availability check fails.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new())
        }
    }

    pub async fn calls(&self) -> usize {
        self.prompts.lock().await.len()
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn ensure_available(&self) -> Result<(), AgentError> {
        if self.available {
            Ok(())
        } else {
            Err(AgentError::ModelUnavailable(
                "scripted model disabled".to_string(),
            ))
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        self.prompts.lock().await.push(prompt.to_string());
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AgentError::Cli("No scripted response left".to_string()))
    }
}

/// Data provider serving fixed results, optionally after a delay.
#[derive(Clone)]
pub struct StaticDataProvider {
    market_data: ToolResult<MarketData>,
    company_info: ToolResult<CompanyInfo>,
    company_profile: ToolResult<CompanyProfile>,
    basic_financials: ToolResult<BasicFinancials>,
    company_news: ToolResult<CompanyNews>,
    delay: Option<Duration>,
}

impl StaticDataProvider {
    /// Every fetch succeeds. Market data is built from `bars` as of the date of
    /// the last bar, so an empty history yields a failed market data fetch.
    pub fn healthy(symbol: &str, bars: Vec<HistoricalBar>, articles: Vec<NewsArticle>) -> Self {
        let market_data = match bars.last().map(|bar| bar.date) {
            Some(date) => build_market_data(symbol, date, bars),
            None => ToolResult::failure(format!("No data available for {symbol}")),
        };
        let total_count = articles.len();

        Self {
            market_data,
            company_info: ToolResult::ok(CompanyInfo {
                symbol: symbol.to_string(),
                name: Some(format!("{symbol} Inc.")),
                exchange: Some("NMS".to_string()),
                sector: Some("Technology".to_string()),
                industry: Some("Consumer Electronics".to_string()),
                quote_type: Some("EQUITY".to_string()),
            }),
            company_profile: ToolResult::ok(company_profile(symbol)),
            basic_financials: ToolResult::ok(basic_financials(symbol)),
            company_news: ToolResult::ok(CompanyNews {
                symbol: symbol.to_string(),
                news: articles,
                total_count,
                period: "2024-02-25 to 2024-03-01".to_string(),
            }),
            delay: None,
        }
    }

    pub fn with_market_data(mut self, result: ToolResult<MarketData>) -> Self {
        self.market_data = result;
        self
    }

    pub fn with_company_profile(mut self, result: ToolResult<CompanyProfile>) -> Self {
        self.company_profile = result;
        self
    }

    pub fn with_basic_financials(mut self, result: ToolResult<BasicFinancials>) -> Self {
        self.basic_financials = result;
        self
    }

    pub fn with_company_news(mut self, result: ToolResult<CompanyNews>) -> Self {
        self.company_news = result;
        self
    }

    /// Sleep this long before answering any fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DataProvider for StaticDataProvider {
    async fn market_data(&self, _symbol: &str, _date: NaiveDate) -> ToolResult<MarketData> {
        self.pause().await;
        self.market_data.clone()
    }

    async fn company_info(&self, _symbol: &str) -> ToolResult<CompanyInfo> {
        self.pause().await;
        self.company_info.clone()
    }

    async fn company_profile(&self, _symbol: &str) -> ToolResult<CompanyProfile> {
        self.pause().await;
        self.company_profile.clone()
    }

    async fn basic_financials(&self, _symbol: &str) -> ToolResult<BasicFinancials> {
        self.pause().await;
        self.basic_financials.clone()
    }

    async fn company_news(&self, _symbol: &str, _date: NaiveDate) -> ToolResult<CompanyNews> {
        self.pause().await;
        self.company_news.clone()
    }
}

/// `count` consecutive daily bars ending on `end`, closing at 100, 101, ...
pub fn rising_bars(count: usize, end: NaiveDate) -> Vec<HistoricalBar> {
    (0..count)
        .map(|i| {
            let close = 100.0 + i as f64;
            HistoricalBar {
                date: end - ChronoDuration::days((count - 1 - i) as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0 + i as f64 * 1_000.0,
            }
        })
        .collect()
}

pub fn sample_articles(count: usize) -> Vec<NewsArticle> {
    (0..count)
        .map(|i| NewsArticle {
            category: "company".to_string(),
            datetime: 1_709_251_200 - i as i64 * 3_600,
            headline: format!("Headline {i}"),
            id: i as i64 + 1,
            related: "AAPL".to_string(),
            source: "Reuters".to_string(),
            summary: format!("Summary of story {i}"),
            url: format!("https://example.com/news/{i}"),
            ..NewsArticle::default()
        })
        .collect()
}

/// A fenced JSON news feature record as a model would write it.
pub fn news_feature_response(headline: &str, sentiment: &str) -> String {
    let record = json!({
        "headline": headline,
        "published_date": "2024-03-01",
        "source": "Reuters",
        "key_points": [format!("{headline} matters")],
        "sentiment": sentiment,
        "impact": "medium",
        "category": "product",
    });
    format!("```json\n{record}\n```")
}

/// A fenced JSON trading decision as a model would write it.
pub fn decision_response(signal: &str, confidence: f64, position: i64) -> String {
    let decision = json!({
        "trading_signal": signal,
        "confidence_level": confidence,
        "position_size": position,
    });
    format!("```json\n{decision}\n```")
}

pub fn company_profile(symbol: &str) -> CompanyProfile {
    CompanyProfile {
        symbol: symbol.to_string(),
        name: format!("{symbol} Inc."),
        country: "US".to_string(),
        currency: "USD".to_string(),
        exchange: "NASDAQ".to_string(),
        industry: "Technology".to_string(),
        ipo: "1980-12-12".to_string(),
        market_cap: 2_800_000.0,
        shares_outstanding: 15_500.0,
        ..CompanyProfile::default()
    }
}

pub fn basic_financials(symbol: &str) -> BasicFinancials {
    let mut metrics = Map::new();
    metrics.insert("peBasicExclExtraTTM".to_string(), json!(28.4));
    metrics.insert("roeRfy".to_string(), json!(147.2));
    metrics.insert("currentRatioAnnual".to_string(), json!(0.99));
    metrics.insert("52WeekHigh".to_string(), json!(199.6));
    metrics.insert("52WeekLow".to_string(), json!(164.1));
    BasicFinancials {
        symbol: symbol.to_string(),
        metrics,
        series: json!({}),
        updated: Utc::now(),
    }
}

/// State after a successful data collection over `bars`.
pub fn collected_state(symbol: &str, date: NaiveDate, bars: Vec<HistoricalBar>) -> PipelineState {
    let mut state = PipelineState::new(symbol, "test_session", date);
    let collected = CollectedData {
        analysis_date: date,
        market_data: build_market_data(symbol, date, bars).into_data(),
        company_info: None,
        company_profile: Some(company_profile(symbol)),
        basic_financials: Some(basic_financials(symbol)),
    };
    state.data_collection_results = Some(StageResult::success(symbol, collected));
    state.current_step = PipelineStep::DataCollectionComplete;
    state
}

/// State with data collection, technical analysis and news intelligence all
/// successful, ready for the portfolio decision.
pub fn ready_for_decision(symbol: &str, date: NaiveDate) -> PipelineState {
    let mut state = collected_state(symbol, date, rising_bars(30, date));

    let indicators = TechnicalIndicators {
        sma: 119.5,
        ema: 120.3,
        rsi: 71.0,
        macd: MacdValues {
            macd: 3.1,
            signal: 2.9,
            histogram: 0.2,
        },
        bbands: BollingerValues {
            upper: 131.0,
            middle: 119.5,
            lower: 108.0,
        },
        adx: Some(45.0),
        cci: 110.0,
    };
    state.technical_analysis_results = Some(StageResult::success(
        symbol,
        TechnicalAnalysis {
            indicators: IndicatorSnapshot {
                technical_indicators: indicators,
                current_price: 129.0,
            },
        },
    ));

    let records = sample_articles(2)
        .iter()
        .filter_map(|article| {
            serde_json::from_value(json!({
                "headline": article.headline,
                "published_date": "2024-03-01",
                "source": article.source,
                "key_points": ["Demand is strong"],
                "sentiment": "positive",
                "impact": "high",
                "category": "earnings",
            }))
            .ok()
        })
        .collect();
    state.news_intelligence_results = Some(StageResult::success(
        symbol,
        NewsIntelligence {
            nlp_features: NlpFeatures::from_records(records),
            total_news: 2,
        },
    ));
    state.current_step = PipelineStep::NewsIntelligenceComplete;
    state
}
