use goblin_models::{TradingDecision, TradingSignal};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use thiserror::Error;

pub const REQUIRED_FIELDS: [&str; 3] = ["trading_signal", "confidence_level", "position_size"];

/// Raw numbers are clamped to this magnitude before conversion.
const NUMERIC_LIMIT: f64 = 1_000_000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid trading signal: {0}")]
    InvalidSignal(String),

    #[error("{field} is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("Decision is not a JSON object")]
    NotAnObject,
}

/// Check a canonical-keyed mapping and normalize it into a [`TradingDecision`].
/// Extra keys are ignored.
pub fn validate_decision(map: &Map<String, Value>) -> Result<TradingDecision, ValidationError> {
    let field = |name: &'static str| map.get(name).ok_or(ValidationError::MissingField(name));

    let signal_value = field("trading_signal")?;
    let confidence_value = field("confidence_level")?;
    let position_value = field("position_size")?;

    let signal = match signal_value {
        Value::String(raw) => {
            TradingSignal::parse(raw).ok_or_else(|| ValidationError::InvalidSignal(raw.clone()))?
        }
        other => return Err(ValidationError::InvalidSignal(other.to_string())),
    };
    let confidence = coerce_decimal("confidence_level", confidence_value)?;
    let position = coerce_integer("position_size", position_value)?;

    Ok(TradingDecision::normalized(signal, confidence, position))
}

pub fn validate_value(value: &Value) -> Result<TradingDecision, ValidationError> {
    match value {
        Value::Object(map) => validate_decision(map),
        _ => Err(ValidationError::NotAnObject),
    }
}

fn not_numeric(field: &'static str, value: &Value) -> ValidationError {
    ValidationError::NotNumeric {
        field,
        value: value.to_string(),
    }
}

fn coerce_decimal(field: &'static str, value: &Value) -> Result<Decimal, ValidationError> {
    let decimal = match value {
        Value::Number(n) => number_to_decimal(n),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(float_to_decimal),
        _ => None,
    };
    decimal.ok_or_else(|| not_numeric(field, value))
}

fn number_to_decimal(n: &Number) -> Option<Decimal> {
    match n.as_i64() {
        Some(i) => Some(Decimal::from(i)),
        None => n.as_f64().and_then(float_to_decimal),
    }
}

/// Keeps the exact binary value of the float, so rounding to one decimal
/// agrees with rounding the float itself (0.65 is just above the midpoint).
fn float_to_decimal(f: f64) -> Option<Decimal> {
    if !f.is_finite() {
        return None;
    }
    let f = f.clamp(-NUMERIC_LIMIT, NUMERIC_LIMIT);
    Decimal::from_f64_retain(f).or_else(|| Decimal::from_f64(f))
}

/// Integers as-is, fractional numbers truncated toward zero. Strings must hold
/// an integer.
fn coerce_integer(field: &'static str, value: &Value) -> Result<i64, ValidationError> {
    let integer = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc().clamp(-NUMERIC_LIMIT, NUMERIC_LIMIT) as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    integer.ok_or_else(|| not_numeric(field, value))
}
