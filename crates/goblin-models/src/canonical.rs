use serde_json::{Map, Value};

/// Characters folded into `_` when a key is canonicalized.
const SEPARATOR_TABLE: &[(char, char)] = &[(' ', '_'), ('-', '_')];

/// Canonical form of a model-supplied key: lower-case, with spaces and hyphens
/// replaced by underscores. `"Trading Signal"` and `"trading-signal"` both
/// become `"trading_signal"`.
pub fn canonicalize_key(key: &str) -> String {
    key.chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            SEPARATOR_TABLE
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect()
}

/// Canonicalize every top-level key of a decoded mapping. Nested values are
/// left untouched. When two keys collapse to the same canonical form the later
/// one wins.
pub fn canonicalize_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (canonicalize_key(&key), value))
        .collect()
}
