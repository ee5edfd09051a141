use serde::{Deserialize, Deserializer, Serialize};

/// Top-level configuration. Every section has defaults, so an empty file is a
/// valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoblinConfig {
    pub pipeline: PipelineConfig,
    pub providers: ProvidersConfig,
    pub models: ModelsConfig,
}

/// Behaviour of the orchestrator and stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Keep running downstream stages after a stage reports failure.
    pub continue_on_stage_failure: bool,
    /// Articles passed through feature extraction per run.
    pub max_news_articles: usize,
    /// Minimum daily bars needed by technical analysis.
    pub min_history_bars: usize,
    /// Also try the first balanced `{...}` in free text when decoding model output.
    pub embedded_object_fallback: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            continue_on_stage_failure: true,
            max_news_articles: 3,
            min_history_bars: 20,
            embedded_object_fallback: false,
        }
    }
}

/// External data sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Environment variable holding the Finnhub API key.
    pub finnhub_api_key_env: String,
    pub finnhub_base_url: String,
    /// Fixed delay before every Finnhub request (60s / 50 calls).
    pub rate_limit_interval_ms: u64,
    pub request_timeout_seconds: u64,
    pub history_lookback_days: i64,
    pub news_lookback_days: i64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key_env: "FINNHUB_API_KEY".to_string(),
            finnhub_base_url: "https://finnhub.io/api/v1".to_string(),
            rate_limit_interval_ms: 1200,
            request_timeout_seconds: 30,
            history_lookback_days: 90,
            news_lookback_days: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    /// OpenAI-compatible `/chat/completions` endpoint.
    #[default]
    ChatCompletions,
    /// Local `claude` CLI.
    ClaudeCli,
}

/// One language model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key. Unused by `claude_cli`.
    pub api_key_env: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::ChatCompletions,
            model: "llama-3.3-70b-versatile".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 1000,
            timeout_seconds: 60,
        }
    }
}

impl ModelConfig {
    /// Defaults for the portfolio decision model.
    pub fn portfolio() -> Self {
        Self {
            model: "openai/gpt-oss-120b".to_string(),
            temperature: 0.7,
            ..Self::default()
        }
    }
}

/// Fields present in a `[models.*]` table, laid over that model's defaults.
#[derive(Deserialize)]
struct ModelOverrides {
    provider: Option<ModelProvider>,
    model: Option<String>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    timeout_seconds: Option<u64>,
}

impl ModelOverrides {
    fn over(self, base: ModelConfig) -> ModelConfig {
        ModelConfig {
            provider: self.provider.unwrap_or(base.provider),
            model: self.model.unwrap_or(base.model),
            base_url: self.base_url.unwrap_or(base.base_url),
            api_key_env: self.api_key_env.unwrap_or(base.api_key_env),
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            timeout_seconds: self.timeout_seconds.unwrap_or(base.timeout_seconds),
        }
    }
}

fn portfolio_model<'de, D>(deserializer: D) -> Result<ModelConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ModelOverrides::deserialize(deserializer)?.over(ModelConfig::portfolio()))
}

/// Models used by the news and portfolio stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    pub news: ModelConfig,
    #[serde(deserialize_with = "portfolio_model")]
    pub portfolio: ModelConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            news: ModelConfig::default(),
            portfolio: ModelConfig::portfolio(),
        }
    }
}
