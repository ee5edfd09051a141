use std::fmt;

use goblin_agents::prompts::ESSENTIAL_METRICS;
use goblin_models::{
    AbortedAnalysis, AnalysisOutcome, CollectedData, CompletedAnalysis, NewsIntelligence,
    StageResult, TechnicalAnalysis, TradingDecision,
};

/// Plain-text rendering of a finished analysis.
pub struct Report<'a>(pub &'a AnalysisOutcome);

pub fn render(outcome: &AnalysisOutcome) -> String {
    Report(outcome).to_string()
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            AnalysisOutcome::Completed(run) => completed(f, run),
            AnalysisOutcome::Aborted(run) => aborted(f, run),
        }
    }
}

fn aborted(f: &mut fmt::Formatter<'_>, run: &AbortedAnalysis) -> fmt::Result {
    writeln!(
        f,
        "=== {} | {} | session {} ===",
        run.symbol, run.analysis_date, run.session_id
    )?;
    writeln!(f, "Analysis aborted: {}", run.error)
}

fn completed(f: &mut fmt::Formatter<'_>, run: &CompletedAnalysis) -> fmt::Result {
    writeln!(
        f,
        "=== {} | {} | session {} ===",
        run.symbol, run.analysis_date, run.session_id
    )?;

    let results = &run.results;
    section(f, "Market Data", results.data_collection.as_ref(), market)?;
    section(f, "Fundamentals", results.data_collection.as_ref(), fundamentals)?;
    section(f, "Technical Indicators", results.technical_analysis.as_ref(), technical)?;
    section(f, "News", results.news_intelligence.as_ref(), news)?;
    section(f, "Recommendation", results.portfolio_manager.as_ref(), recommendation)?;

    writeln!(f)?;
    writeln!(f, "Final step: {:?}", run.final_step)?;
    if let Some(error) = &run.error {
        writeln!(f, "Last error: {error}")?;
    }
    Ok(())
}

/// Write a section heading, then either the payload or why it is missing.
fn section<P>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    result: Option<&StageResult<P>>,
    body: fn(&mut fmt::Formatter<'_>, &P) -> fmt::Result,
) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "--- {title} ---")?;
    match result {
        None => writeln!(f, "  not run"),
        Some(result) => match result.payload() {
            Some(payload) => body(f, payload),
            None => writeln!(
                f,
                "  unavailable: {}",
                result.error.as_deref().unwrap_or("unknown error")
            ),
        },
    }
}

fn market(f: &mut fmt::Formatter<'_>, data: &CollectedData) -> fmt::Result {
    match &data.market_data {
        Some(market) => {
            let price = &market.price_data;
            writeln!(f, "  Price:  ${:.2}", market.current_price)?;
            if let (Some(change), Some(pct)) = (price.price_change, price.price_change_pct) {
                writeln!(f, "  Change: {change:+.2} ({pct:+.2}%)")?;
            }
            writeln!(
                f,
                "  Range:  {:.2} - {:.2}  Volume: {}",
                price.low, price.high, price.volume
            )?;
            writeln!(f, "  History: {} daily bars", market.historical_data.len())?;
        }
        None => writeln!(f, "  No market data")?,
    }
    if let Some(info) = &data.company_info {
        let name = info.name.as_deref().unwrap_or(&info.symbol);
        let sector = info.sector.as_deref().unwrap_or("Unknown");
        writeln!(f, "  Company: {name} ({sector})")?;
    }
    Ok(())
}

fn fundamentals(f: &mut fmt::Formatter<'_>, data: &CollectedData) -> fmt::Result {
    if let Some(profile) = &data.company_profile {
        writeln!(
            f,
            "  {} | {} | market cap {:.0}M {}",
            profile.name, profile.industry, profile.market_cap, profile.currency
        )?;
    }
    let Some(financials) = &data.basic_financials else {
        return writeln!(f, "  No financial data");
    };
    for (label, key) in ESSENTIAL_METRICS {
        match financials.metric(key) {
            Some(value) => writeln!(f, "  {label:<15} {value:.2}")?,
            None => writeln!(f, "  {label:<15} N/A")?,
        }
    }
    Ok(())
}

fn technical(f: &mut fmt::Formatter<'_>, analysis: &TechnicalAnalysis) -> fmt::Result {
    let ind = &analysis.indicators.technical_indicators;
    writeln!(f, "  SMA(20)   {:.2}", ind.sma)?;
    writeln!(f, "  EMA(20)   {:.2}", ind.ema)?;
    writeln!(f, "  RSI(14)   {:.2}", ind.rsi)?;
    writeln!(
        f,
        "  MACD      {:.2} signal {:.2} hist {:.2}",
        ind.macd.macd, ind.macd.signal, ind.macd.histogram
    )?;
    writeln!(
        f,
        "  BBANDS    {:.2} / {:.2} / {:.2}",
        ind.bbands.upper, ind.bbands.middle, ind.bbands.lower
    )?;
    match ind.adx {
        Some(adx) => writeln!(f, "  ADX(14)   {adx:.2}")?,
        None => writeln!(f, "  ADX(14)   N/A")?,
    }
    writeln!(f, "  CCI(20)   {:.2}", ind.cci)
}

fn news(f: &mut fmt::Formatter<'_>, news: &NewsIntelligence) -> fmt::Result {
    let features = &news.nlp_features;
    writeln!(
        f,
        "  {} of {} articles analyzed",
        features.total_analyzed, news.total_news
    )?;
    for record in &features.news_features {
        writeln!(
            f,
            "  [{:?}/{:?}] {} ({:?})",
            record.sentiment, record.impact, record.headline, record.category
        )?;
        for point in &record.key_points {
            writeln!(f, "    - {point}")?;
        }
    }
    Ok(())
}

fn recommendation(f: &mut fmt::Formatter<'_>, decision: &TradingDecision) -> fmt::Result {
    writeln!(f, "  Signal:     {}", decision.trading_signal())?;
    writeln!(f, "  Confidence: {}", decision.confidence_level())?;
    writeln!(f, "  Position:   {}%", decision.position_size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use goblin_models::{PipelineState, PipelineStep, TradingSignal};
    use rust_decimal::Decimal;

    fn state() -> PipelineState {
        PipelineState::new(
            "AAPL",
            "analysis_1",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
    }

    #[test]
    fn aborted_report_shows_error_only() {
        let outcome = AnalysisOutcome::aborted("AAPL", "s1", "bad", "Invalid analysis date 'bad'");
        let text = render(&outcome);
        assert!(text.contains("Analysis aborted: Invalid analysis date 'bad'"));
        assert!(!text.contains("Recommendation"));
    }

    #[test]
    fn stages_not_run_are_marked() {
        let text = render(&AnalysisOutcome::from_state(state()));
        assert!(text.contains("--- Market Data ---\n  not run"));
        assert!(text.contains("Final step: Initialized"));
    }

    #[test]
    fn failed_stage_shows_reason_and_last_error() {
        let mut state = state();
        let failure = StageResult::failure("AAPL", "No valid technical analysis data provided");
        state.record_outcome(&failure);
        state.portfolio_manager_results = Some(failure);
        state.current_step = PipelineStep::PortfolioManagementComplete;

        let text = render(&AnalysisOutcome::from_state(state));
        assert!(text.contains("unavailable: No valid technical analysis data provided"));
        assert!(text.contains("Last error: No valid technical analysis data provided"));
    }

    #[test]
    fn recommendation_is_rendered() {
        let mut state = state();
        let decision = TradingDecision::normalized(TradingSignal::Sell, Decimal::new(6, 1), 40);
        state.portfolio_manager_results = Some(StageResult::success("AAPL", decision));

        let text = render(&AnalysisOutcome::from_state(state));
        assert!(text.contains("Signal:     SELL"));
        assert!(text.contains("Confidence: 0.6"));
        assert!(text.contains("Position:   40%"));
        assert!(!text.contains("Last error"));
    }
}
