use shopinsight_agent::AnalyticsAgent;
use shopinsight_ai::{CompletionProvider, LLMProviderFactory};
use shopinsight_cache::{InMemoryCache, NoopCache, RedisCache, ResultCache};
use shopinsight_core::{CacheConfig, PlatformConfig, Result, ShopInsightConfig, ShopInsightError};
use shopinsight_platform::{DataPlatform, ShopifyClient, ShopifyConfig};
use std::sync::Arc;
use tracing::info;

/// Store credentials carried by one request.
#[derive(Debug, Clone)]
pub struct StoreCredentials {
    pub store_id: String,
    pub access_token: String,
    pub api_version: Option<String>,
}

/// Builds a platform client for the store named in a request.
pub trait PlatformFactory: Send + Sync {
    fn create(&self, credentials: &StoreCredentials) -> Result<Arc<dyn DataPlatform>>;
}

/// Creates [`ShopifyClient`]s from the configured platform settings.
pub struct ShopifyPlatformFactory {
    platform: PlatformConfig,
}

impl ShopifyPlatformFactory {
    pub fn new(platform: PlatformConfig) -> Self {
        Self { platform }
    }
}

impl PlatformFactory for ShopifyPlatformFactory {
    fn create(&self, credentials: &StoreCredentials) -> Result<Arc<dyn DataPlatform>> {
        let mut config = ShopifyConfig::from_platform_config(
            &credentials.store_id,
            &credentials.access_token,
            &self.platform,
        );
        if let Some(version) = &credentials.api_version {
            config = config.with_api_version(version);
        }

        Ok(Arc::new(ShopifyClient::new(config)?))
    }
}

/// Picks the cache backend from configuration: disabled, Redis (degrading
/// when unreachable) or in-process.
pub async fn build_cache(config: &CacheConfig) -> Arc<dyn ResultCache> {
    if !config.enabled {
        info!("Result caching disabled");
        return Arc::new(NoopCache);
    }

    match &config.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url, config.connect_timeout()).await),
        None => {
            info!("No Redis URL configured, using in-process cache");
            Arc::new(InMemoryCache::new())
        }
    }
}

/// Process-wide services shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ShopInsightConfig>,
    pub cache: Arc<dyn ResultCache>,
    pub completion: Arc<dyn CompletionProvider>,
    pub platforms: Arc<dyn PlatformFactory>,
}

impl AppState {
    pub async fn new(config: Arc<ShopInsightConfig>) -> Result<Self> {
        let completion = LLMProviderFactory::create_completion(&config.llm)
            .map_err(|e| ShopInsightError::Config(e.to_string()))?;
        let cache = build_cache(&config.cache).await;
        let platforms = Arc::new(ShopifyPlatformFactory::new(config.platform.clone()));

        Ok(Self::from_parts(config, cache, completion, platforms))
    }

    pub fn from_parts(
        config: Arc<ShopInsightConfig>,
        cache: Arc<dyn ResultCache>,
        completion: Arc<dyn CompletionProvider>,
        platforms: Arc<dyn PlatformFactory>,
    ) -> Self {
        Self {
            config,
            cache,
            completion,
            platforms,
        }
    }

    /// A pipeline bound to one store's credentials.
    pub fn agent_for(&self, credentials: &StoreCredentials) -> Result<AnalyticsAgent> {
        let platform = self.platforms.create(credentials)?;

        AnalyticsAgent::builder()
            .store_id(credentials.store_id.clone())
            .completion(self.completion.clone())
            .cache(self.cache.clone())
            .platform(platform)
            .pipeline_config(self.config.pipeline.clone())
            .result_ttl(self.config.cache.ttl())
            .build()
    }
}
