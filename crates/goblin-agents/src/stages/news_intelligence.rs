use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use goblin_data::{DataError, DataProvider};
use goblin_models::{
    NewsArticle, NewsFeatureRecord, NewsIntelligence, NlpFeatures, PipelineState, PipelineStep,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::into_record;
use crate::error::AgentError;
use crate::interpreter::Interpreter;
use crate::model::LanguageModel;
use crate::prompts::news_feature_prompt;
use crate::stage::Stage;

/// Fetches recent company news and extracts structured features from the
/// first few articles, one model call per article.
pub struct NewsIntelligenceStage {
    data: Arc<dyn DataProvider>,
    model: Arc<dyn LanguageModel>,
    interpreter: Interpreter,
    max_articles: usize,
    fetch_timeout: Duration,
}

impl NewsIntelligenceStage {
    pub fn new(
        data: Arc<dyn DataProvider>,
        model: Arc<dyn LanguageModel>,
        interpreter: Interpreter,
        max_articles: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            data,
            model,
            interpreter,
            max_articles,
            fetch_timeout,
        }
    }

    async fn analyze(&self, state: &PipelineState) -> Result<NewsIntelligence, AgentError> {
        let symbol = &state.symbol;
        let news = tokio::time::timeout(
            self.fetch_timeout,
            self.data.company_news(symbol, state.analysis_date),
        )
        .await
        .map_err(|_| DataError::Timeout(self.fetch_timeout.as_secs()))?;

        if let Some(error) = news.error.as_deref() {
            debug!(symbol = %symbol, error, "News fetch failed");
        }
        let news = news
            .into_data()
            .ok_or_else(|| AgentError::Precondition(format!("No news data found for {symbol}")))?;

        let features = aggregate_news_features(
            self.model.as_ref(),
            &self.interpreter,
            &news.news,
            self.max_articles,
        )
        .await?;

        if features.is_empty() {
            return Err(AgentError::Precondition(
                "NLP feature extraction failed".to_string(),
            ));
        }

        Ok(NewsIntelligence {
            nlp_features: NlpFeatures::from_records(features),
            total_news: news.total_count,
        })
    }
}

/// Extract features from at most `max_articles` articles, sequentially and in
/// order. Articles whose response does not decode into a record are skipped.
/// Fails without calling the model when the model is unavailable.
pub async fn aggregate_news_features(
    model: &dyn LanguageModel,
    interpreter: &Interpreter,
    articles: &[NewsArticle],
    max_articles: usize,
) -> Result<Vec<NewsFeatureRecord>, AgentError> {
    model.ensure_available().await?;

    let batch = &articles[..articles.len().min(max_articles)];
    info!(model = model.name(), articles = batch.len(), "Extracting news features");

    let mut records = Vec::with_capacity(batch.len());
    for (idx, article) in batch.iter().enumerate() {
        let response = match model.complete(&news_feature_prompt(article)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(article = idx + 1, error = %e, "Model call failed; skipping article");
                continue;
            }
        };

        let Some(map) = interpreter.interpret(&response) else {
            warn!(article = idx + 1, "No JSON record in model response; skipping article");
            continue;
        };

        match serde_json::from_value::<NewsFeatureRecord>(Value::Object(map)) {
            Ok(record) => records.push(record),
            Err(e) => warn!(article = idx + 1, error = %e, "Malformed news feature record; skipping article"),
        }
    }

    info!(kept = records.len(), processed = batch.len(), "News feature extraction done");
    Ok(records)
}

#[async_trait]
impl Stage for NewsIntelligenceStage {
    fn name(&self) -> &str {
        "news_intelligence"
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        let outcome = self.analyze(&state).await;
        let result = into_record(&state.symbol, outcome);

        state.record_outcome(&result);
        state.news_intelligence_results = Some(result);
        state.current_step = PipelineStep::NewsIntelligenceComplete;
        Ok(state)
    }
}
