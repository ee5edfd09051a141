pub mod canonical;
pub mod config;
pub mod market;
pub mod news_feature;
pub mod pipeline_state;
pub mod summary;
pub mod tool_result;
pub mod trading_decision;

pub use canonical::{canonicalize_key, canonicalize_keys};
pub use config::{
    GoblinConfig, ModelConfig, ModelProvider, ModelsConfig, PipelineConfig, ProvidersConfig,
};
pub use market::{
    BasicFinancials, BollingerValues, CompanyInfo, CompanyNews, CompanyProfile, HistoricalBar,
    IndicatorSnapshot, MacdValues, MarketData, NewsArticle, PriceData, TechnicalIndicators,
};
pub use news_feature::{Impact, NewsCategory, NewsFeatureRecord, NlpFeatures, Sentiment};
pub use pipeline_state::{
    CollectedData, DataCollectionResult, NewsIntelligence, NewsIntelligenceResult,
    PipelineState, PipelineStep, PortfolioDecisionResult, StageResult, TechnicalAnalysis,
    TechnicalAnalysisResult,
};
pub use summary::{AbortedAnalysis, AnalysisOutcome, CompletedAnalysis, StageResults};
pub use tool_result::ToolResult;
pub use trading_decision::{TradingDecision, TradingSignal};
