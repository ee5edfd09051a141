use async_trait::async_trait;
use chrono::NaiveDate;
use goblin_models::{
    BasicFinancials, CompanyInfo, CompanyNews, CompanyProfile, MarketData, ProvidersConfig,
    ToolResult,
};

use crate::finnhub::FinnhubClient;
use crate::yahoo::YahooClient;

/// Source of market, company and news data. Mockable for testing.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn market_data(&self, symbol: &str, date: NaiveDate) -> ToolResult<MarketData>;
    async fn company_info(&self, symbol: &str) -> ToolResult<CompanyInfo>;
    async fn company_profile(&self, symbol: &str) -> ToolResult<CompanyProfile>;
    async fn basic_financials(&self, symbol: &str) -> ToolResult<BasicFinancials>;
    async fn company_news(&self, symbol: &str, date: NaiveDate) -> ToolResult<CompanyNews>;
}

/// Yahoo Finance for quotes and company descriptors, Finnhub for profile,
/// financials and news.
pub struct LiveDataProvider {
    yahoo: YahooClient,
    finnhub: FinnhubClient,
}

impl LiveDataProvider {
    pub fn new(yahoo: YahooClient, finnhub: FinnhubClient) -> Self {
        Self { yahoo, finnhub }
    }

    pub fn from_config(config: &ProvidersConfig) -> Self {
        Self::new(
            YahooClient::new(config.history_lookback_days),
            FinnhubClient::from_config(config),
        )
    }
}

#[async_trait]
impl DataProvider for LiveDataProvider {
    async fn market_data(&self, symbol: &str, date: NaiveDate) -> ToolResult<MarketData> {
        self.yahoo.market_data(symbol, date).await
    }

    async fn company_info(&self, symbol: &str) -> ToolResult<CompanyInfo> {
        self.yahoo.company_info(symbol).await
    }

    async fn company_profile(&self, symbol: &str) -> ToolResult<CompanyProfile> {
        self.finnhub.company_profile(symbol).await
    }

    async fn basic_financials(&self, symbol: &str) -> ToolResult<BasicFinancials> {
        self.finnhub.basic_financials(symbol).await
    }

    async fn company_news(&self, symbol: &str, date: NaiveDate) -> ToolResult<CompanyNews> {
        self.finnhub.company_news(symbol, date).await
    }
}
