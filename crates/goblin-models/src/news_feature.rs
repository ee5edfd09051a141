use serde::{Deserialize, Deserializer, Serialize};

use crate::canonical::canonicalize_key;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl TryFrom<String> for Sentiment {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match canonicalize_key(raw.trim()).as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            _ => Err(format!("unknown sentiment: {raw}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl TryFrom<String> for Impact {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match canonicalize_key(raw.trim()).as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("unknown impact: {raw}")),
        }
    }
}

/// Topic of a news article. Anything unrecognised folds into `Other`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum NewsCategory {
    Earnings,
    Product,
    Regulatory,
    Litigation,
    Macro,
    Management,
    Competitive,
    AnalystRatings,
    SupplyChain,
    #[default]
    Other,
}

impl From<String> for NewsCategory {
    fn from(raw: String) -> Self {
        match canonicalize_key(raw.trim()).as_str() {
            "earnings" => Self::Earnings,
            "product" => Self::Product,
            "regulatory" => Self::Regulatory,
            "litigation" => Self::Litigation,
            "macro" => Self::Macro,
            "management" => Self::Management,
            "competitive" => Self::Competitive,
            "analyst_ratings" => Self::AnalystRatings,
            "supply_chain" => Self::SupplyChain,
            _ => Self::Other,
        }
    }
}

/// Structured features extracted from one news article by the language model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsFeatureRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub headline: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub published_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub key_points: Vec<String>,
    pub sentiment: Sentiment,
    pub impact: Impact,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: NewsCategory,
}

/// Models write `null` for fields they could not fill.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyPoints {
    One(String),
    Many(Vec<String>),
}

/// A single key point sometimes arrives as a bare string.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<KeyPoints>::deserialize(deserializer)? {
        Some(KeyPoints::One(point)) => vec![point],
        Some(KeyPoints::Many(points)) => points,
        None => Vec::new(),
    })
}

/// Aggregated news features; `total_analyzed` counts the kept records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NlpFeatures {
    pub news_features: Vec<NewsFeatureRecord>,
    pub total_analyzed: usize,
}

impl NlpFeatures {
    pub fn from_records(news_features: Vec<NewsFeatureRecord>) -> Self {
        let total_analyzed = news_features.len();
        Self {
            news_features,
            total_analyzed,
        }
    }
}
