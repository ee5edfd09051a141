use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One daily OHLCV observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Latest session plus the change against the prior close.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceData {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub previous_close: Option<f64>,
    pub price_change: Option<f64>,
    /// Percent, e.g. `1.25` for +1.25%.
    pub price_change_pct: Option<f64>,
}

/// Market snapshot for a symbol as of the analysis date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketData {
    pub symbol: String,
    pub date: NaiveDate,
    pub current_price: f64,
    pub price_data: PriceData,
    /// Oldest first.
    pub historical_data: Vec<HistoricalBar>,
}

/// Descriptive company information from the quote provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompanyInfo {
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub quote_type: Option<String>,
}

/// Company profile from Finnhub.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: String,
    pub country: String,
    pub currency: String,
    pub exchange: String,
    pub industry: String,
    pub ipo: String,
    pub logo: String,
    /// In millions of `currency`.
    pub market_cap: f64,
    pub shares_outstanding: f64,
    pub weburl: String,
}

/// Basic financial metrics from Finnhub, keyed by Finnhub's metric names
/// (`peBasicExclExtraTTM`, `roeRfy`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasicFinancials {
    pub symbol: String,
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub series: Value,
    pub updated: DateTime<Utc>,
}

impl BasicFinancials {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(Value::as_f64)
    }
}

/// A single news article as returned by the news provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NewsArticle {
    pub category: String,
    /// UNIX seconds.
    pub datetime: i64,
    pub headline: String,
    pub id: i64,
    pub image: String,
    pub related: String,
    pub source: String,
    pub summary: String,
    pub url: String,
}

impl NewsArticle {
    pub fn published_date(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.datetime, 0).map(|dt| dt.date_naive())
    }
}

/// News window for a symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyNews {
    pub symbol: String,
    pub news: Vec<NewsArticle>,
    pub total_count: usize,
    /// Human readable window, `"YYYY-MM-DD to YYYY-MM-DD"`.
    pub period: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MacdValues {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BollingerValues {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Latest indicator readings. Serialized with the conventional upper-case
/// indicator names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalIndicators {
    #[serde(rename = "SMA")]
    pub sma: f64,
    #[serde(rename = "EMA")]
    pub ema: f64,
    #[serde(rename = "RSI")]
    pub rsi: f64,
    #[serde(rename = "MACD")]
    pub macd: MacdValues,
    #[serde(rename = "BBANDS")]
    pub bbands: BollingerValues,
    /// `None` when the history is too short for a smoothed ADX.
    #[serde(rename = "ADX")]
    pub adx: Option<f64>,
    #[serde(rename = "CCI")]
    pub cci: f64,
}

impl TechnicalIndicators {
    /// SMA over EMA; `None` when the EMA is zero.
    pub fn moving_average_ratio(&self) -> Option<f64> {
        (self.ema != 0.0).then(|| self.sma / self.ema)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSnapshot {
    pub technical_indicators: TechnicalIndicators,
    pub current_price: f64,
}
