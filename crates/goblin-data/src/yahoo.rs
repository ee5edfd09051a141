use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use goblin_models::{CompanyInfo, HistoricalBar, MarketData, PriceData, ToolResult};
use serde::Deserialize;
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

use crate::error::DataError;

const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; goblin/0.1)";

/// Daily quotes and company descriptors from Yahoo Finance.
pub struct YahooClient {
    http: reqwest::Client,
    lookback_days: i64,
}

impl YahooClient {
    pub fn new(lookback_days: i64) -> Self {
        Self {
            http: reqwest::Client::new(),
            lookback_days,
        }
    }

    /// Daily bars for the `lookback_days` window ending on `date`, plus the
    /// latest session's price change.
    pub async fn market_data(&self, symbol: &str, date: NaiveDate) -> ToolResult<MarketData> {
        let symbol = symbol.to_uppercase();
        match self.fetch_bars(&symbol, date).await {
            Ok(bars) => build_market_data(&symbol, date, bars),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Yahoo history fetch failed");
                ToolResult::failure(format!("Error getting market data for {symbol} : {e}"))
            }
        }
    }

    pub async fn company_info(&self, symbol: &str) -> ToolResult<CompanyInfo> {
        let symbol = symbol.to_uppercase();
        match self.search(&symbol).await {
            Ok(response) => company_info_from_search(&symbol, response),
            Err(e) => ToolResult::failure(format!("Error getting company info for {symbol}: {e}")),
        }
    }

    async fn fetch_bars(&self, symbol: &str, date: NaiveDate) -> Result<Vec<HistoricalBar>, DataError> {
        let provider =
            yahoo::YahooConnector::new().map_err(|e| DataError::Yahoo(e.to_string()))?;

        let start = to_offset(date - Duration::days(self.lookback_days))?;
        let end = to_offset(date + Duration::days(1))?;

        let response = provider
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| DataError::Yahoo(e.to_string()))?;
        let quotes = response
            .quotes()
            .map_err(|e| DataError::Yahoo(e.to_string()))?;

        Ok(quotes
            .iter()
            .filter_map(|q| {
                let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
                Some(HistoricalBar {
                    date,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume as f64,
                })
            })
            .collect())
    }

    async fn search(&self, symbol: &str) -> Result<SearchResponse, DataError> {
        let response = self
            .http
            .get(SEARCH_URL)
            .query(&[("q", symbol), ("quotesCount", "5"), ("newsCount", "0")])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::Api(format!("Yahoo search error {status}: {body}")));
        }

        Ok(response.json::<SearchResponse>().await?)
    }
}

fn to_offset(date: NaiveDate) -> Result<OffsetDateTime, DataError> {
    let timestamp = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| DataError::Yahoo(format!("Invalid timestamp for {date}: {e}")))
}

/// Assemble a snapshot from daily bars. Bars after `date` are ignored.
pub fn build_market_data(
    symbol: &str,
    date: NaiveDate,
    mut bars: Vec<HistoricalBar>,
) -> ToolResult<MarketData> {
    bars.retain(|bar| bar.date <= date);
    bars.sort_by_key(|bar| bar.date);

    let Some(latest) = bars.last().cloned() else {
        return ToolResult::failure(format!("No data available for {symbol}"));
    };

    let previous_close = bars.len().checked_sub(2).map(|i| bars[i].close);
    let price_change = previous_close.map(|prev| latest.close - prev);
    let price_change_pct = previous_close.zip(price_change).map(|(prev, change)| {
        if prev != 0.0 {
            change / prev * 100.0
        } else {
            0.0
        }
    });

    ToolResult::ok(MarketData {
        symbol: symbol.to_string(),
        date,
        current_price: latest.close,
        price_data: PriceData {
            open: latest.open,
            high: latest.high,
            low: latest.low,
            close: latest.close,
            volume: latest.volume.max(0.0) as u64,
            previous_close,
            price_change,
            price_change_pct,
        },
        historical_data: bars,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuote {
    #[serde(default)]
    symbol: String,
    longname: Option<String>,
    shortname: Option<String>,
    exchange: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    quote_type: Option<String>,
}

/// Pick the search hit whose ticker matches `symbol` exactly.
pub fn company_info_from_search(symbol: &str, response: SearchResponse) -> ToolResult<CompanyInfo> {
    let hit = response
        .quotes
        .into_iter()
        .find(|quote| quote.symbol.eq_ignore_ascii_case(symbol));

    match hit {
        Some(quote) => ToolResult::ok(CompanyInfo {
            symbol: symbol.to_string(),
            name: quote.longname.or(quote.shortname),
            exchange: quote.exchange,
            sector: quote.sector,
            industry: quote.industry,
            quote_type: quote.quote_type,
        }),
        None => ToolResult::failure(format!("No company info available for symbol : {symbol}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> HistoricalBar {
        HistoricalBar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_000.0,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn empty_history_fails() {
        let result = build_market_data("AAPL", date(5), vec![]);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No data available for AAPL"));
    }

    #[test]
    fn price_change_against_previous_close() {
        let result = build_market_data("AAPL", date(5), vec![bar(4, 100.0), bar(5, 102.0)]);
        let data = result.into_data().unwrap();
        assert_eq!(data.current_price, 102.0);
        assert_eq!(data.price_data.previous_close, Some(100.0));
        assert_eq!(data.price_data.price_change, Some(2.0));
        assert!((data.price_data.price_change_pct.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(data.price_data.volume, 1_000);
    }

    #[test]
    fn single_bar_has_no_change() {
        let data = build_market_data("AAPL", date(5), vec![bar(5, 50.0)])
            .into_data()
            .unwrap();
        assert_eq!(data.price_data.previous_close, None);
        assert_eq!(data.price_data.price_change_pct, None);
    }

    #[test]
    fn zero_previous_close_gives_zero_pct() {
        let data = build_market_data("AAPL", date(5), vec![bar(4, 0.0), bar(5, 3.0)])
            .into_data()
            .unwrap();
        assert_eq!(data.price_data.price_change_pct, Some(0.0));
    }

    #[test]
    fn bars_after_analysis_date_are_dropped() {
        let data = build_market_data(
            "AAPL",
            date(5),
            vec![bar(6, 110.0), bar(4, 100.0), bar(5, 101.0)],
        )
        .into_data()
        .unwrap();
        assert_eq!(data.historical_data.len(), 2);
        assert_eq!(data.current_price, 101.0);
    }

    #[test]
    fn search_hit_must_match_symbol() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"quotes": [
                {"symbol": "AAPL.MX", "shortname": "Apple MX"},
                {"symbol": "AAPL", "longname": "Apple Inc.", "shortname": "Apple",
                 "exchange": "NMS", "quoteType": "EQUITY", "sector": "Technology",
                 "industry": "Consumer Electronics"}
            ]}"#,
        )
        .unwrap();
        let info = company_info_from_search("AAPL", response).into_data().unwrap();
        assert_eq!(info.name.as_deref(), Some("Apple Inc."));
        assert_eq!(info.quote_type.as_deref(), Some("EQUITY"));
        assert_eq!(info.sector.as_deref(), Some("Technology"));
    }

    #[test]
    fn search_without_match_fails() {
        let result = company_info_from_search("ZZZZ", SearchResponse::default());
        assert!(!result.success);
    }
}
