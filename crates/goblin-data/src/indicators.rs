use chrono::NaiveDate;
use goblin_models::{BollingerValues, HistoricalBar, MacdValues, TechnicalIndicators, ToolResult};
use ta::indicators::{
    BollingerBands, CommodityChannelIndex, ExponentialMovingAverage,
    MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
};
use ta::{Close, High, Low, Next};

use crate::error::DataError;

const MA_PERIOD: usize = 20;
const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BBANDS_STD_DEV: f64 = 2.0;
const ADX_PERIOD: usize = 14;
const CCI_PERIOD: usize = 20;

/// Latest indicator readings over the bars dated on or before `analysis_date`.
/// Fails when fewer than `min_bars` of those bars exist.
pub fn compute_indicators(
    bars: &[HistoricalBar],
    analysis_date: NaiveDate,
    min_bars: usize,
) -> ToolResult<TechnicalIndicators> {
    let window: Vec<&HistoricalBar> = bars.iter().filter(|b| b.date <= analysis_date).collect();
    if window.is_empty() || window.len() < min_bars {
        return ToolResult::failure(format!(
            "Insufficient historical data available upto {analysis_date}"
        ));
    }

    match indicators(&window) {
        Ok(indicators) => ToolResult::ok(indicators),
        Err(e) => ToolResult::failure(e.to_string()),
    }
}

/// Lets `ta` read a bar without copying it into a validated `DataItem`.
struct Bar<'a>(&'a HistoricalBar);

impl Close for Bar<'_> {
    fn close(&self) -> f64 {
        self.0.close
    }
}

impl High for Bar<'_> {
    fn high(&self) -> f64 {
        self.0.high
    }
}

impl Low for Bar<'_> {
    fn low(&self) -> f64 {
        self.0.low
    }
}

fn indicators(bars: &[&HistoricalBar]) -> Result<TechnicalIndicators, DataError> {
    let mut sma = SimpleMovingAverage::new(MA_PERIOD).map_err(indicator_error)?;
    let mut ema = ExponentialMovingAverage::new(MA_PERIOD).map_err(indicator_error)?;
    let mut rsi = RelativeStrengthIndex::new(RSI_PERIOD).map_err(indicator_error)?;
    let mut bbands = BollingerBands::new(MA_PERIOD, BBANDS_STD_DEV).map_err(indicator_error)?;
    let mut macd = MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
        .map_err(indicator_error)?;
    let mut cci = CommodityChannelIndex::new(CCI_PERIOD).map_err(indicator_error)?;

    let mut latest = None;
    for &bar in bars {
        let close = bar.close;
        let lines = macd.next(close);
        let bands = bbands.next(close);
        latest = Some(TechnicalIndicators {
            sma: sma.next(close),
            ema: ema.next(close),
            rsi: rsi.next(close),
            macd: MacdValues {
                macd: lines.macd,
                signal: lines.signal,
                histogram: lines.histogram,
            },
            bbands: BollingerValues {
                upper: bands.upper,
                middle: bands.average,
                lower: bands.lower,
            },
            adx: None,
            cci: cci.next(&Bar(bar)),
        });
    }

    let mut indicators =
        latest.ok_or_else(|| DataError::Indicator("No closing prices".to_string()))?;
    // ta has no ADX
    indicators.adx = average_directional_index(bars, ADX_PERIOD);
    Ok(indicators)
}

fn indicator_error(e: impl std::fmt::Display) -> DataError {
    DataError::Indicator(e.to_string())
}

/// Wilder's ADX. Needs `2 * period` bars: one period to seed the smoothed
/// directional movement and another to seed the ADX average.
fn average_directional_index(bars: &[&HistoricalBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < 2 * period {
        return None;
    }

    let mut true_range = Vec::with_capacity(bars.len() - 1);
    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        true_range.push(
            (cur.high - cur.low)
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs()),
        );
        let up = cur.high - prev.high;
        let down = prev.low - cur.low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }

    let n = period as f64;
    let mut tr_sum: f64 = true_range[..period].iter().sum();
    let mut plus_sum: f64 = plus_dm[..period].iter().sum();
    let mut minus_sum: f64 = minus_dm[..period].iter().sum();

    let mut dx = vec![directional_index(plus_sum, minus_sum, tr_sum)];
    for i in period..true_range.len() {
        tr_sum = tr_sum - tr_sum / n + true_range[i];
        plus_sum = plus_sum - plus_sum / n + plus_dm[i];
        minus_sum = minus_sum - minus_sum / n + minus_dm[i];
        dx.push(directional_index(plus_sum, minus_sum, tr_sum));
    }

    let mut adx = dx[..period].iter().sum::<f64>() / n;
    for value in &dx[period..] {
        adx = (adx * (n - 1.0) + value) / n;
    }
    Some(adx)
}

fn directional_index(plus_dm: f64, minus_dm: f64, true_range: f64) -> f64 {
    if true_range == 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * plus_dm / true_range;
    let minus_di = 100.0 * minus_dm / true_range;
    let total = plus_di + minus_di;
    if total == 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const MIN_BARS: usize = 20;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn trending_bars(count: usize) -> Vec<HistoricalBar> {
        (0..count)
            .map(|i| {
                let close = 1.0 + i as f64;
                HistoricalBar {
                    date: start() + Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect()
    }

    fn flat_bars(count: usize) -> Vec<HistoricalBar> {
        (0..count)
            .map(|i| HistoricalBar {
                date: start() + Duration::days(i as i64),
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0,
                volume: 0.0,
            })
            .collect()
    }

    #[test]
    fn too_few_bars_fails() {
        let bars = trending_bars(19);
        let date = start() + Duration::days(30);
        let result = compute_indicators(&bars, date, MIN_BARS);
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Insufficient historical data"));
    }

    #[test]
    fn bars_after_analysis_date_are_ignored() {
        let bars = trending_bars(40);
        // Only the first 15 bars are on or before this date.
        let date = start() + Duration::days(14);
        assert!(!compute_indicators(&bars, date, MIN_BARS).success);
    }

    #[test]
    fn minimum_counts_only_bars_up_to_the_date() {
        let bars = trending_bars(40);
        let date = start() + Duration::days(14);
        assert!(compute_indicators(&bars, date, 15).success);
        assert!(!compute_indicators(&bars, date, 16).success);
    }

    #[test]
    fn no_bars_fails_even_without_a_minimum() {
        let result = compute_indicators(&[], start(), 0);
        assert!(result.error.unwrap().starts_with("Insufficient historical data"));
    }

    #[test]
    fn uptrend_readings() {
        let bars = trending_bars(40);
        let date = start() + Duration::days(39);
        let ind = compute_indicators(&bars, date, MIN_BARS).into_data().unwrap();

        // Closes 21..=40
        assert!((ind.sma - 30.5).abs() < 1e-9);
        assert!((ind.bbands.middle - 30.5).abs() < 1e-9);
        assert!(ind.bbands.upper > ind.bbands.middle && ind.bbands.middle > ind.bbands.lower);
        assert!(ind.ema > ind.sma);
        assert!(ind.macd.macd > 0.0);
        assert!(ind.rsi > 70.0);
        assert!(ind.adx.unwrap() > 99.0);
        assert!(ind.cci > 100.0);
        assert!((ind.macd.histogram - (ind.macd.macd - ind.macd.signal)).abs() < 1e-9);
    }

    #[test]
    fn adx_needs_two_periods() {
        let bars = trending_bars(27);
        let date = start() + Duration::days(26);
        let ind = compute_indicators(&bars, date, MIN_BARS).into_data().unwrap();
        assert_eq!(ind.adx, None);
    }

    #[test]
    fn flat_series_has_zero_dispersion_readings() {
        let bars = flat_bars(30);
        let date = start() + Duration::days(29);
        let ind = compute_indicators(&bars, date, MIN_BARS).into_data().unwrap();
        assert_eq!(ind.cci, 0.0);
        assert_eq!(ind.adx, Some(0.0));
        assert!((ind.sma - 10.0).abs() < 1e-9);
        assert!(ind.macd.histogram.abs() < 1e-9);
    }
}
