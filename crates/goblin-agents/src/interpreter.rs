use goblin_models::{canonicalize_keys, PipelineConfig};
use serde_json::{Map, Value};
use tracing::debug;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// One way of locating a JSON record in free-form model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Text after ```` ```json ```` up to the next fence, or to the end.
    JsonFence,
    /// Text after the first ```` ``` ```` up to the next fence, or to the end.
    AnyFence,
    /// The whole response.
    WholeText,
    /// The first balanced `{ ... }` anywhere in the response.
    EmbeddedObject,
}

impl ExtractionStrategy {
    /// Decode the candidate this strategy finds. `None` when the strategy does
    /// not apply or the candidate is not valid JSON.
    pub fn extract(&self, text: &str) -> Option<Value> {
        let candidate = match self {
            Self::JsonFence => fenced(text, JSON_FENCE)?,
            Self::AnyFence => fenced(text, FENCE)?,
            Self::WholeText => text,
            Self::EmbeddedObject => first_balanced_object(text)?,
        };
        serde_json::from_str(candidate.trim()).ok()
    }
}

fn fenced<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    Some(rest.find(FENCE).map_or(rest, |end| &rest[..end]))
}

/// Find the first balanced { ... } in the text, skipping braces inside strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' if start.is_some() => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Turns raw model text into a canonical-keyed JSON object by trying each
/// strategy in order.
#[derive(Debug, Clone)]
pub struct Interpreter {
    strategies: Vec<ExtractionStrategy>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(vec![
            ExtractionStrategy::JsonFence,
            ExtractionStrategy::AnyFence,
            ExtractionStrategy::WholeText,
        ])
    }
}

impl Interpreter {
    pub fn new(strategies: Vec<ExtractionStrategy>) -> Self {
        Self { strategies }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut interpreter = Self::default();
        if config.embedded_object_fallback {
            interpreter
                .strategies
                .push(ExtractionStrategy::EmbeddedObject);
        }
        interpreter
    }

    pub fn strategies(&self) -> &[ExtractionStrategy] {
        &self.strategies
    }

    /// The first JSON object any strategy decodes, with its top-level keys
    /// canonicalized. Arrays and scalars do not count.
    pub fn interpret(&self, text: &str) -> Option<Map<String, Value>> {
        let text = text.trim();
        for strategy in &self.strategies {
            match strategy.extract(text) {
                Some(Value::Object(map)) => {
                    debug!(?strategy, keys = map.len(), "Decoded model response");
                    return Some(canonicalize_keys(map));
                }
                Some(_) => debug!(?strategy, "Decoded value is not an object"),
                None => {}
            }
        }
        debug!(len = text.len(), "No decodable record in model response");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fence_with_preamble() {
        let text = "Here's the result:\n```json\n{\"trading_signal\":\"buy\",\"confidence_level\":1.4,\"position_size\":37}\n```";
        let map = Interpreter::default().interpret(text).unwrap();
        assert_eq!(map["trading_signal"], "buy");
        assert_eq!(map["position_size"], 37);
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let text = "```json\n{\"sentiment\": \"positive\"}";
        let map = Interpreter::default().interpret(text).unwrap();
        assert_eq!(map["sentiment"], "positive");
    }

    #[test]
    fn bare_fence() {
        let text = "Result:\n```\n{\"Trading Signal\": \"SELL\"}\n```\nDone.";
        let map = Interpreter::default().interpret(text).unwrap();
        assert_eq!(map["trading_signal"], "SELL");
    }

    #[test]
    fn whole_text_json() {
        let text = "  {\"Confidence-Level\": 0.5}  ";
        let map = Interpreter::default().interpret(text).unwrap();
        assert_eq!(map["confidence_level"], 0.5);
    }

    #[test]
    fn broken_json_fence_falls_through_to_later_strategies() {
        // The json fence holds garbage, but nothing later decodes either.
        let text = "```json\n{not json}\n```";
        assert!(Interpreter::default().interpret(text).is_none());
    }

    #[test]
    fn plain_prose_yields_nothing() {
        assert!(Interpreter::default()
            .interpret("I think you should buy, with high confidence.")
            .is_none());
    }

    #[test]
    fn arrays_are_not_records() {
        assert!(Interpreter::default().interpret("[1, 2, 3]").is_none());
    }

    #[test]
    fn embedded_object_only_when_enabled() {
        let text = "Based on my analysis: {\"trading_signal\": \"HOLD\", \"note\": \"range {low} to {high}\"} hope that helps";
        assert!(Interpreter::default().interpret(text).is_none());

        let config = PipelineConfig {
            embedded_object_fallback: true,
            ..PipelineConfig::default()
        };
        let interpreter = Interpreter::from_config(&config);
        assert_eq!(interpreter.strategies().len(), 4);
        let map = interpreter.interpret(text).unwrap();
        assert_eq!(map["trading_signal"], "HOLD");
        assert_eq!(map["note"], "range {low} to {high}");
    }

    #[test]
    fn first_balanced_object_handles_nesting_and_escapes() {
        let text = r#"prefix {"a": {"b": "quote \" and }"}, "c": 1} suffix {"d": 2}"#;
        let object = first_balanced_object(text).unwrap();
        let value: Value = serde_json::from_str(object).unwrap();
        assert_eq!(value["c"], 1);
        assert_eq!(value["a"]["b"], "quote \" and }");
    }
}
