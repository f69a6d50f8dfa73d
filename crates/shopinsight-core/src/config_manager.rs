use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for ShopInsight
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopInsightConfig {
    /// Completion backend used by the pipeline
    #[serde(default)]
    pub llm: LLMConfig,

    /// Result cache backend
    #[serde(default)]
    pub cache: CacheConfig,

    /// Shopify Admin API settings
    #[serde(default)]
    pub platform: PlatformConfig,

    /// HTTP service settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Pipeline limits
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM configuration for the completion capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// LLM provider: "openai", "anthropic", "openai-compatible"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier; provider default when unset
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL for OpenAI-compatible endpoints
    #[serde(default)]
    pub base_url: Option<String>,

    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// OpenAI organization sent with each request
    #[serde(default)]
    pub openai_organization: Option<String>,

    /// Anthropic API key
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on transport failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            base_url: None,
            openai_api_key: None,
            openai_organization: None,
            anthropic_api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disable to run without any result caching
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Redis connection URL; in-process cache when unset
    #[serde(default = "default_redis_url")]
    pub redis_url: Option<String>,

    /// Lifetime of a cached execution result
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Budget for the startup connectivity check
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: default_redis_url(),
            ttl_secs: default_cache_ttl_secs(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Shopify Admin API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_platform_timeout_secs")]
    pub timeout_secs: u64,

    /// Row limit sent when the query names none
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            timeout_secs: default_platform_timeout_secs(),
            default_limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Pipeline limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound for each completion call
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,

    /// Characters of serialized result passed to the explanation prompt
    #[serde(default = "default_explanation_char_limit")]
    pub explanation_char_limit: usize,
}

impl PipelineConfig {
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            completion_timeout_secs: default_completion_timeout_secs(),
            explanation_char_limit: default_explanation_char_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> usize {
    2048
}
fn default_llm_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_redis_url() -> Option<String> {
    Some("redis://localhost:6379/0".to_string())
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_connect_timeout_ms() -> u64 {
    2000
}
fn default_api_version() -> String {
    "2024-01".to_string()
}
fn default_platform_timeout_secs() -> u64 {
    10
}
fn default_limit() -> u32 {
    50
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_completion_timeout_secs() -> u64 {
    60
}
fn default_explanation_char_limit() -> usize {
    2000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: ShopInsightConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.shopinsight.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading ShopInsight configuration...");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load from an explicit file, still applying environment overrides.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(
        config: ShopInsightConfig,
        config_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        info!("Configuration loaded successfully");
        match config_path {
            Some(ref path) => info!("   Config file: {}", path.display()),
            None => info!("   Config file: NONE (using defaults)"),
        }
        info!("   LLM provider: {}", config.llm.provider);
        info!(
            "   Result cache: {}",
            match (config.cache.enabled, config.cache.redis_url.as_deref()) {
                (false, _) => "disabled",
                (true, Some(_)) => "redis",
                (true, None) => "in-memory",
            }
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".shopinsight.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .shopinsight.env: {}", e);
                } else {
                    info!("Loaded .shopinsight.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.shopinsight.toml (current directory)
    /// 2. ~/.shopinsight/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(ShopInsightConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".shopinsight.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".shopinsight").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((ShopInsightConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<ShopInsightConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(config: ShopInsightConfig) -> ShopInsightConfig {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    fn apply_overrides<F>(mut config: ShopInsightConfig, var: F) -> ShopInsightConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        // LLM configuration
        if let Some(provider) =
            var("SHOPINSIGHT_LLM_PROVIDER").or_else(|| var("LLM_PROVIDER"))
        {
            config.llm.provider = provider.to_lowercase();
        }
        if let Some(model) = var("SHOPINSIGHT_MODEL") {
            config.llm.model = Some(model);
        }
        if let Some(url) = var("SHOPINSIGHT_LLM_BASE_URL") {
            config.llm.base_url = Some(url);
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }
        if let Some(org) = var("OPENAI_ORG_ID") {
            config.llm.openai_organization = Some(org);
        }
        if let Some(key) = var("ANTHROPIC_API_KEY") {
            config.llm.anthropic_api_key = Some(key);
        }
        if let Some(timeout) = var("SHOPINSIGHT_COMPLETION_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.pipeline.completion_timeout_secs = secs;
            }
        }

        // Cache configuration
        if let Some(url) = var("REDIS_URL") {
            config.cache.redis_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(enabled) = var("SHOPINSIGHT_CACHE_ENABLED") {
            config.cache.enabled = enabled == "true" || enabled == "1";
        }

        // Platform configuration
        if let Some(version) = var("SHOPIFY_API_VERSION") {
            config.platform.api_version = version;
        }

        // Server configuration
        if let Some(host) = var("SHOPINSIGHT_HOST") {
            config.server.host = host;
        }
        if let Some(port) = var("SHOPINSIGHT_PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }

        if let Some(level) = var("RUST_LOG") {
            // Only take simple levels; directive strings stay with the env filter.
            if matches!(
                level.as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ) {
                config.logging.level = level;
            }
        }

        config
    }

    /// Validate configuration
    fn validate_config(config: &ShopInsightConfig) -> Result<(), ConfigError> {
        match config.llm.provider.as_str() {
            "openai" | "anthropic" | "openai-compatible" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid LLM provider: {}. Must be one of: openai, anthropic, openai-compatible",
                    other
                )))
            }
        }

        if config.llm.provider == "openai-compatible" && config.llm.base_url.is_none() {
            return Err(ConfigError::ValidationError(
                "openai-compatible provider requires llm.base_url".to_string(),
            ));
        }

        if config.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be greater than zero".to_string(),
            ));
        }

        if config.pipeline.completion_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.completion_timeout_secs must be greater than zero".to_string(),
            ));
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ShopInsightConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = ShopInsightConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

impl From<ShopInsightConfig> for ConfigManager {
    fn from(config: ShopInsightConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }
}
