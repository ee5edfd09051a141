use chrono::NaiveDate;
use goblin_models::{CollectedData, NewsArticle, NlpFeatures, TechnicalIndicators};
use serde_json::{json, Value};

const DIGEST_ARTICLES: usize = 2;
const HEADLINE_CHARS: usize = 80;
const KEY_POINT_CHARS: usize = 100;

/// Finnhub metric keys passed to the portfolio model, with their prompt labels.
pub const ESSENTIAL_METRICS: [(&str, &str); 10] = [
    ("pe_ratio", "peBasicExclExtraTTM"),
    ("pb_ratio", "pbAnnual"),
    ("roe", "roeRfy"),
    ("roa", "roaRfy"),
    ("debt_equity", "totalDebt/totalEquityAnnual"),
    ("current_ratio", "currentRatioAnnual"),
    ("profit_margin", "netProfitMarginTTM"),
    ("revenue_growth", "revenueGrowthTTM"),
    ("eps", "epsBasicExclExtraItemsTTM"),
    ("dividend_yield", "dividendYieldIndicatedAnnual"),
];

pub fn news_feature_prompt(article: &NewsArticle) -> String {
    let example = json!({
        "headline": "",
        "published_date": "",
        "source": "",
        "key_points": ["Main point 1", "Main point 2", "Main point 3"],
        "sentiment": "positive | negative | neutral",
        "impact": "high | medium | low",
        "category": "earnings | product | regulatory | litigation | macro | management | \
                     competitive | analyst_ratings | supply_chain | other"
    });

    format!(
        "You extract investor-relevant features from a single financial news article.\n\n\
         Rules:\n\
         - Be concise and factual; do not rewrite the article.\n\
         - Keep only signals that bear on the stock's price, outlook or risk.\n\
         - Use \"N/A\" for anything the article does not say.\n\n\
         ## ARTICLE\n\n\
         Headline: {headline}\n\
         Summary: {summary}\n\
         Source: {source}\n\
         URL: {url}\n\n\
         ## OUTPUT\n\n\
         Respond with one JSON object with exactly these fields:\n\
         {example}\n",
        headline = article.headline,
        summary = article.summary,
        source = article.source,
        url = article.url,
        example = serde_json::to_string_pretty(&example).unwrap_or_default(),
    )
}

/// Everything the portfolio model sees about one symbol.
pub struct PortfolioBrief<'a> {
    pub symbol: &'a str,
    pub analysis_date: NaiveDate,
    pub current_price: f64,
    pub indicators: &'a TechnicalIndicators,
    pub collected: &'a CollectedData,
    pub news: &'a NlpFeatures,
}

impl PortfolioBrief<'_> {
    pub fn essential_financials(&self) -> Value {
        let financials = self.collected.basic_financials.as_ref();
        let map = ESSENTIAL_METRICS
            .iter()
            .map(|(label, key)| {
                let value = financials
                    .and_then(|f| f.metric(key))
                    .map_or(Value::Null, Value::from);
                (label.to_string(), value)
            })
            .collect();
        Value::Object(map)
    }

    pub fn company_profile(&self) -> Value {
        match &self.collected.company_profile {
            Some(profile) => json!({
                "name": profile.name,
                "industry": profile.industry,
                "market_cap": profile.market_cap,
            }),
            None => json!({
                "name": self.symbol,
                "industry": "Unknown",
                "market_cap": 0,
            }),
        }
    }

    pub fn price_history(&self) -> Value {
        let price = self.collected.market_data.as_ref().map(|m| &m.price_data);
        json!({
            "prev_close": price.and_then(|p| p.previous_close),
            "change": price.and_then(|p| p.price_change),
            "change_pct": price.and_then(|p| p.price_change_pct),
        })
    }

    /// The first two news records, headline and top key point truncated.
    pub fn news_digest(&self) -> Value {
        self.news
            .news_features
            .iter()
            .take(DIGEST_ARTICLES)
            .map(|record| {
                json!({
                    "headline": truncate(&record.headline, HEADLINE_CHARS),
                    "sentiment": record.sentiment,
                    "top_point": record
                        .key_points
                        .first()
                        .map(|point| truncate(point, KEY_POINT_CHARS))
                        .unwrap_or_default(),
                })
            })
            .collect()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn compact(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

pub fn portfolio_prompt(brief: &PortfolioBrief<'_>) -> String {
    let ind = brief.indicators;
    let example = json!({
        "trading_signal": "BUY",
        "confidence_level": 0.7,
        "position_size": 60
    });

    format!(
        "You are a quantitative portfolio manager making a decisive trading call.\n\n\
         [ANALYSIS DATE: {date}]\n\
         [SYMBOL: {symbol}]\n\
         [CURRENT PRICE: ${price:.2}]\n\n\
         ## COMPANY PROFILE\n{profile}\n\n\
         ## FUNDAMENTAL METRICS\n{financials}\n\n\
         ## NEWS SENTIMENT\n{news}\n\n\
         ## RECENT PRICE ACTION\n{history}\n\n\
         ## TECHNICAL INDICATORS\n\
         - SMA(20): {sma:.4}\n\
         - EMA(20): {ema:.4}\n\
         - SMA/EMA ratio: {ratio}\n\
         - RSI(14): {rsi:.2}\n\
         - MACD: {macd}\n\
         - Bollinger Bands: {bbands}\n\
         - ADX(14): {adx}\n\
         - CCI(20): {cci:.2}\n\n\
         ## DECISION FRAMEWORK\n\n\
         Signals:\n\
         - BUY: expect upward movement (positive momentum, or bullish news with neutral technicals).\n\
         - SELL: expect downward movement (negative momentum, or bearish news with neutral technicals).\n\
         - HOLD: only when the data is genuinely contradictory or insufficient.\n\n\
         Technicals first:\n\
         - RSI < 40 leans BUY, RSI > 60 leans SELL, in between follow MACD and news.\n\
         - Positive MACD histogram favors BUY, negative favors SELL.\n\
         - Price above SMA is an uptrend, below is a downtrend.\n\
         - ADX measures trend strength; CCI beyond +/-100 marks strong momentum.\n\
         News adjusts conviction: agreement raises confidence, disagreement shrinks position size.\n\n\
         Position size: 60-100 strong alignment, 40-60 moderate, 20-40 conflicting, 10-20 weak.\n\
         Confidence: 0.8-1.0 aligned, 0.6-0.7 mostly aligned, 0.4-0.5 mixed, 0.2-0.3 weak, 0.1 ambiguous.\n\n\
         ## OUTPUT\n\n\
         Return ONLY this JSON object with lowercase underscore keys:\n\
         {example}\n\n\
         trading_signal is one of BUY, SELL, HOLD. confidence_level is 0.1 to 1.0 in steps of 0.1. \
         position_size is 10 to 100 in steps of 10.\n",
        date = brief.analysis_date.format("%Y-%m-%d"),
        symbol = brief.symbol,
        price = brief.current_price,
        profile = compact(&brief.company_profile()),
        financials = compact(&brief.essential_financials()),
        news = compact(&brief.news_digest()),
        history = compact(&brief.price_history()),
        sma = ind.sma,
        ema = ind.ema,
        ratio = ind
            .moving_average_ratio()
            .map_or_else(|| "N/A".to_string(), |r| format!("{r:.4}")),
        rsi = ind.rsi,
        macd = compact(&ind.macd),
        bbands = compact(&ind.bbands),
        adx = ind.adx.map_or_else(|| "N/A".to_string(), |a| format!("{a:.2}")),
        cci = ind.cci,
        example = serde_json::to_string_pretty(&example).unwrap_or_default(),
    )
}
