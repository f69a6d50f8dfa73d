use crate::parsing::{parse_explanation, parse_intent, strip_code_fences, truncate_chars};
use crate::stage::PipelineStage;
use async_trait::async_trait;
use shopinsight_ai::{
    CompletionProvider, LLMResult, PromptTemplate, PromptVariables, INTENT_CLASSIFICATION,
    QUERY_GENERATION, RESULT_EXPLANATION,
};
use shopinsight_cache::{NoopCache, ResultCache};
use shopinsight_core::{
    AnalysisResponse, CacheKey, Confidence, Domain, ExecutionResult, Explanation, Intent,
    PipelineConfig, QueryValidator, Result, ShopInsightError,
};
use shopinsight_platform::DataPlatform;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// How long an executed query result stays cached.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(300);

/// Answers natural-language questions about one store.
///
/// Each call to [`process_question`](Self::process_question) runs the stages
/// in order: classify the intent, generate a query, execute it (through the
/// cache), then explain the result. Stages never run concurrently within a
/// question; separate questions share nothing but the cache.
pub struct AnalyticsAgent {
    store_id: String,
    completion: Arc<dyn CompletionProvider>,
    cache: Arc<dyn ResultCache>,
    platform: Arc<dyn DataPlatform>,
    pipeline: PipelineConfig,
    result_ttl: Duration,
}

pub struct AnalyticsAgentBuilder {
    store_id: Option<String>,
    completion: Option<Arc<dyn CompletionProvider>>,
    cache: Option<Arc<dyn ResultCache>>,
    platform: Option<Arc<dyn DataPlatform>>,
    pipeline: PipelineConfig,
    result_ttl: Duration,
}

impl Default for AnalyticsAgentBuilder {
    fn default() -> Self {
        Self {
            store_id: None,
            completion: None,
            cache: None,
            platform: None,
            pipeline: PipelineConfig::default(),
            result_ttl: DEFAULT_RESULT_TTL,
        }
    }
}

impl AnalyticsAgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_id<S: Into<String>>(mut self, store_id: S) -> Self {
        self.store_id = Some(store_id.into());
        self
    }

    /// Without a completion provider only [`AnalyticsAgent::execute`] is
    /// usable; questions fail at query generation.
    pub fn completion(mut self, completion: Arc<dyn CompletionProvider>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Defaults to [`NoopCache`] when not set.
    pub fn cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn platform(mut self, platform: Arc<dyn DataPlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn pipeline_config(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn result_ttl(mut self, ttl: Duration) -> Self {
        self.result_ttl = ttl;
        self
    }

    pub fn build(self) -> Result<AnalyticsAgent> {
        let store_id = self
            .store_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ShopInsightError::Config("store_id is required".to_string()))?;
        let platform = self
            .platform
            .ok_or_else(|| ShopInsightError::Config("data platform is required".to_string()))?;

        Ok(AnalyticsAgent {
            store_id,
            completion: self
                .completion
                .unwrap_or_else(|| Arc::new(UnconfiguredCompletion)),
            cache: self.cache.unwrap_or_else(|| Arc::new(NoopCache)),
            platform,
            pipeline: self.pipeline,
            result_ttl: self.result_ttl,
        })
    }
}

struct UnconfiguredCompletion;

#[async_trait]
impl CompletionProvider for UnconfiguredCompletion {
    async fn complete(
        &self,
        _template: &PromptTemplate,
        _variables: &PromptVariables,
    ) -> LLMResult<String> {
        Err(anyhow::anyhow!("no completion provider configured"))
    }
}

impl AnalyticsAgent {
    pub fn builder() -> AnalyticsAgentBuilder {
        AnalyticsAgentBuilder::new()
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Run the full pipeline for one question.
    #[instrument(skip(self), fields(store_id = %self.store_id))]
    pub async fn process_question(&self, question: &str) -> Result<AnalysisResponse> {
        let start = Instant::now();
        info!(stage = %PipelineStage::Start, "Processing question");

        match self.run_stages(question).await {
            Ok(response) => {
                info!(
                    stage = %PipelineStage::Done,
                    data_points = response.data_points,
                    confidence = %response.confidence,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Question answered"
                );
                Ok(response)
            }
            Err(e) => {
                error!(stage = %PipelineStage::Failed, error = %e, "Error in analytics pipeline");
                Err(e)
            }
        }
    }

    async fn run_stages(&self, question: &str) -> Result<AnalysisResponse> {
        let intent = self.classify_intent(question).await;
        info!(
            stage = %PipelineStage::IntentClassified,
            domain = %intent.domain,
            time_period = %intent.time_period,
            "Classified intent"
        );

        let query = self.generate_query(question, &intent).await?;
        info!(stage = %PipelineStage::QueryGenerated, %query, "Generated query");

        let result = self.execute_validated(intent.domain, &query).await?;
        let data_points = result.data_points();
        info!(stage = %PipelineStage::ResultObtained, data_points, "Retrieved data");

        let explanation = self.explain_result(question, &result, &query).await;
        info!(
            stage = %PipelineStage::Explained,
            confidence = %explanation.confidence,
            "Explained result"
        );

        Ok(AnalysisResponse {
            answer: explanation.answer,
            confidence: explanation.confidence,
            query_used: Some(query),
            data_points,
            reasoning: explanation.reasoning,
        })
    }

    /// Validate and execute a query directly, bypassing the completion
    /// stages. Results go through the cache like pipeline queries.
    pub async fn execute(&self, domain: Domain, query: &str) -> Result<ExecutionResult> {
        let query = strip_code_fences(query);
        if let Err(rejection) = QueryValidator::check(query) {
            warn!(%rejection, "Rejected query");
            return Err(ShopInsightError::QueryValidation {
                query: query.to_string(),
            });
        }
        self.execute_validated(domain, query).await
    }

    /// One completion call bounded by the pipeline timeout.
    async fn complete(
        &self,
        template: &PromptTemplate,
        variables: PromptVariables,
    ) -> Result<String> {
        let timeout = self.pipeline.completion_timeout();
        match tokio::time::timeout(timeout, self.completion.complete(template, &variables)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ShopInsightError::Completion(format!(
                "{}: {}",
                template.name, e
            ))),
            Err(_) => Err(ShopInsightError::Completion(format!(
                "{} timed out after {}s",
                template.name,
                timeout.as_secs()
            ))),
        }
    }

    async fn classify_intent(&self, question: &str) -> Intent {
        let variables = PromptVariables::new().with("question", question);

        let raw = match self.complete(&INTENT_CLASSIFICATION, variables).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Intent classification failed, using fallback intent");
                return Intent::fallback();
            }
        };

        parse_intent(&raw).unwrap_or_else(|| {
            warn!("Intent classification was not valid JSON, using fallback intent");
            debug!(raw = %raw, "Unparsed classification");
            Intent::fallback()
        })
    }

    async fn generate_query(&self, question: &str, intent: &Intent) -> Result<String> {
        let variables = PromptVariables::new()
            .with("question", question)
            .with("intent", serde_json::to_string(intent)?)
            .with("domain", intent.domain.as_str());

        let raw = self.complete(&QUERY_GENERATION, variables).await?;
        let query = strip_code_fences(&raw).to_string();

        if let Err(rejection) = QueryValidator::check(&query) {
            warn!(%rejection, %query, "Generated query failed validation");
            return Err(ShopInsightError::QueryValidation { query });
        }

        Ok(query)
    }

    async fn execute_validated(&self, domain: Domain, query: &str) -> Result<ExecutionResult> {
        let key = CacheKey::new(&self.store_id, domain, query);

        if let Some(cached) = self.cache.get(key.as_str()).await {
            info!(%domain, "Returning cached result");
            return Ok(ExecutionResult::from_value(cached));
        }

        let result = self.platform.query(domain, query).await?;

        if !self.cache.set(key.as_str(), &result.to_value(), self.result_ttl).await {
            debug!(%domain, backend = self.cache.backend_name(), "Result not cached");
        }

        Ok(result)
    }

    async fn explain_result(
        &self,
        question: &str,
        result: &ExecutionResult,
        query: &str,
    ) -> Explanation {
        let serialized = result.to_value().to_string();
        let data = truncate_chars(&serialized, self.pipeline.explanation_char_limit);

        let variables = PromptVariables::new()
            .with("question", question)
            .with("data", data)
            .with("query", query);

        match self.complete(&RESULT_EXPLANATION, variables).await {
            Ok(raw) => parse_explanation(&raw).unwrap_or_else(|| {
                warn!("Explanation was not valid JSON, returning raw text");
                Explanation::fallback(raw)
            }),
            Err(e) => {
                warn!(error = %e, "Explanation failed, returning summary answer");
                Explanation {
                    answer: format!(
                        "Found {} data points for this question, but no summary could be generated.",
                        result.data_points()
                    ),
                    confidence: Confidence::Low,
                    reasoning: Some(e.to_string()),
                }
            }
        }
    }
}
