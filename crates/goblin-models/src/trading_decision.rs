use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradingSignal {
    Buy,
    Sell,
    Hold,
}

impl TradingSignal {
    /// Case-insensitive parse of `BUY` / `SELL` / `HOLD`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            "HOLD" => Some(Self::Hold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for TradingSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bounded trading recommendation.
///
/// `confidence_level` is always in `[0.1, 1.0]` with one decimal place and
/// `position_size` is always a multiple of 10 in `[10, 100]`. The fields are
/// private so the only ways in are [`TradingDecision::normalized`] and
/// deserialization, which routes through the same clamping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "DecisionFields")]
pub struct TradingDecision {
    trading_signal: TradingSignal,
    #[serde(with = "rust_decimal::serde::float")]
    confidence_level: Decimal,
    position_size: u32,
}

#[derive(Deserialize)]
struct DecisionFields {
    trading_signal: TradingSignal,
    #[serde(with = "rust_decimal::serde::float")]
    confidence_level: Decimal,
    position_size: i64,
}

impl From<DecisionFields> for TradingDecision {
    fn from(fields: DecisionFields) -> Self {
        Self::normalized(
            fields.trading_signal,
            fields.confidence_level,
            fields.position_size,
        )
    }
}

const MIN_POSITION: i64 = 10;
const MAX_POSITION: i64 = 100;
const POSITION_STEP: i64 = 10;

impl TradingDecision {
    /// Round confidence to one decimal (half-to-even on the exact value, so
    /// a float-derived 0.65 rounds up) and clamp it to
    /// `[0.1, 1.0]`; floor position to a multiple of 10 and clamp it to
    /// `[10, 100]`.
    pub fn normalized(signal: TradingSignal, confidence: Decimal, position: i64) -> Self {
        let confidence_level = confidence
            .round_dp(1)
            .clamp(Decimal::new(1, 1), Decimal::ONE);
        let floored = position.div_euclid(POSITION_STEP) * POSITION_STEP;
        let position_size = floored.clamp(MIN_POSITION, MAX_POSITION) as u32;

        Self {
            trading_signal: signal,
            confidence_level,
            position_size,
        }
    }

    pub fn trading_signal(&self) -> TradingSignal {
        self.trading_signal
    }

    pub fn confidence_level(&self) -> Decimal {
        self.confidence_level
    }

    pub fn position_size(&self) -> u32 {
        self.position_size
    }
}
