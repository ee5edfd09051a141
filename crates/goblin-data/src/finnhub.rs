use chrono::{Duration, NaiveDate, Utc};
use goblin_models::{BasicFinancials, CompanyNews, CompanyProfile, NewsArticle, ProvidersConfig, ToolResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DataError;
use crate::rate_limit::RateLimiter;

const KEY_NOT_CONFIGURED: &str = "Finnhub API key not configured";

/// Finnhub REST client. Every request first waits on the fixed-interval
/// [`RateLimiter`].
pub struct FinnhubClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    rate_limiter: RateLimiter,
    news_lookback_days: i64,
}

impl FinnhubClient {
    pub fn new(api_key: Option<String>, config: &ProvidersConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: config.finnhub_base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::from_millis(config.rate_limit_interval_ms),
            news_lookback_days: config.news_lookback_days,
        }
    }

    /// Read the API key from the environment variable named in the config.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let api_key = std::env::var(&config.finnhub_api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(
                env = %config.finnhub_api_key_env,
                "Finnhub API key not set; profile, financials and news will be unavailable"
            );
        }
        Self::new(api_key, config)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn company_profile(&self, symbol: &str) -> ToolResult<CompanyProfile> {
        let symbol = symbol.to_uppercase();
        let raw: ProfileResponse = match self.get("stock/profile2", &[("symbol", symbol.as_str())]).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return ToolResult::failure(KEY_NOT_CONFIGURED),
            Err(e) => {
                return ToolResult::failure(format!("Failed to fetch company profile : {e}"))
            }
        };
        profile_from_response(&symbol, raw)
    }

    pub async fn basic_financials(&self, symbol: &str) -> ToolResult<BasicFinancials> {
        let symbol = symbol.to_uppercase();
        let query = [("symbol", symbol.as_str()), ("metric", "all")];
        let raw: MetricResponse = match self.get("stock/metric", &query).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return ToolResult::failure(KEY_NOT_CONFIGURED),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Finnhub metric request failed");
                return ToolResult::failure(format!(
                    "Failed to fetch financial analysis for {symbol}"
                ));
            }
        };
        financials_from_response(&symbol, raw)
    }

    /// News for the `news_lookback_days` window ending on `date`.
    pub async fn company_news(&self, symbol: &str, date: NaiveDate) -> ToolResult<CompanyNews> {
        let symbol = symbol.to_uppercase();
        let (from, to) = news_window(date, self.news_lookback_days);
        let query = [("symbol", symbol.as_str()), ("from", from.as_str()), ("to", to.as_str())];
        let news: Vec<NewsArticle> = match self.get("company-news", &query).await {
            Ok(Some(news)) => news,
            Ok(None) => return ToolResult::failure(KEY_NOT_CONFIGURED),
            Err(e) => return ToolResult::failure(format!("Failed to fetch {symbol} news : {e}")),
        };

        ToolResult::ok(CompanyNews {
            total_count: news.len(),
            symbol,
            news,
            period: format!("{from} to {to}"),
        })
    }

    /// `Ok(None)` when no API key is configured; no request or wait happens.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, DataError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };

        self.rate_limiter.wait().await;

        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(url = %url, "Finnhub request");
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("token", api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::Api(format!("Finnhub API error {status}: {body}")));
        }

        Ok(Some(response.json::<T>().await?))
    }
}

fn news_window(date: NaiveDate, lookback_days: i64) -> (String, String) {
    let start = date - Duration::days(lookback_days);
    (
        start.format("%Y-%m-%d").to_string(),
        date.format("%Y-%m-%d").to_string(),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProfileResponse {
    ticker: Option<String>,
    name: String,
    country: String,
    currency: String,
    exchange: String,
    finnhub_industry: String,
    ipo: String,
    logo: String,
    market_capitalization: f64,
    share_outstanding: f64,
    weburl: String,
}

fn profile_from_response(symbol: &str, raw: ProfileResponse) -> ToolResult<CompanyProfile> {
    // Finnhub answers unknown tickers with `{}`.
    if raw.ticker.is_none() && raw.name.is_empty() {
        return ToolResult::failure(format!("No company profile found for {symbol}"));
    }
    ToolResult::ok(CompanyProfile {
        symbol: raw.ticker.unwrap_or_else(|| symbol.to_string()),
        name: raw.name,
        country: raw.country,
        currency: raw.currency,
        exchange: raw.exchange,
        industry: raw.finnhub_industry,
        ipo: raw.ipo,
        logo: raw.logo,
        market_cap: raw.market_capitalization,
        shares_outstanding: raw.share_outstanding,
        weburl: raw.weburl,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetricResponse {
    metric: Option<Map<String, Value>>,
    series: Value,
}

fn financials_from_response(symbol: &str, raw: MetricResponse) -> ToolResult<BasicFinancials> {
    match raw.metric {
        Some(metrics) if !metrics.is_empty() => ToolResult::ok(BasicFinancials {
            symbol: symbol.to_string(),
            metrics,
            series: raw.series,
            updated: Utc::now(),
        }),
        _ => ToolResult::failure(format!("No financial data found for {symbol}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration as StdDuration, Instant};

    #[tokio::test]
    async fn missing_key_fails_without_waiting() {
        let config = ProvidersConfig {
            rate_limit_interval_ms: 5_000,
            ..ProvidersConfig::default()
        };
        let client = FinnhubClient::new(None, &config);
        assert!(!client.has_api_key());

        let start = Instant::now();
        let result = client
            .company_news("AAPL", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await;
        assert!(start.elapsed() < StdDuration::from_millis(1_000));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(KEY_NOT_CONFIGURED));

        let profile = client.company_profile("AAPL").await;
        assert_eq!(profile.error.as_deref(), Some(KEY_NOT_CONFIGURED));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let client = FinnhubClient::new(Some("  ".to_string()), &ProvidersConfig::default());
        assert!(!client.has_api_key());
    }

    #[test]
    fn news_window_spans_lookback() {
        let (from, to) = news_window(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 5);
        assert_eq!(from, "2024-02-25");
        assert_eq!(to, "2024-03-01");
    }

    #[test]
    fn profile_maps_finnhub_fields() {
        let raw: ProfileResponse = serde_json::from_str(
            r#"{"ticker": "AAPL", "name": "Apple Inc", "finnhubIndustry": "Technology",
                "marketCapitalization": 2900000.5, "shareOutstanding": 15441.88,
                "country": "US", "currency": "USD"}"#,
        )
        .unwrap();
        let profile = profile_from_response("AAPL", raw).into_data().unwrap();
        assert_eq!(profile.industry, "Technology");
        assert_eq!(profile.market_cap, 2900000.5);
        assert_eq!(profile.shares_outstanding, 15441.88);
    }

    #[test]
    fn empty_profile_is_a_failure() {
        let raw: ProfileResponse = serde_json::from_str("{}").unwrap();
        let result = profile_from_response("ZZZZ", raw);
        assert_eq!(result.error.as_deref(), Some("No company profile found for ZZZZ"));
    }

    #[test]
    fn financials_require_metric_block() {
        let raw: MetricResponse =
            serde_json::from_str(r#"{"metric": {"roeRfy": 150.1}, "series": {}}"#).unwrap();
        let data = financials_from_response("AAPL", raw).into_data().unwrap();
        assert_eq!(data.metric("roeRfy"), Some(150.1));

        let raw: MetricResponse = serde_json::from_str(r#"{"series": {}}"#).unwrap();
        assert!(!financials_from_response("AAPL", raw).success);
    }
}
