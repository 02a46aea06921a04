use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub appdir: Option<String>,
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(alias = "apiKey", rename = "apikey")]
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(alias = "baseUrl", rename = "baseurl")]
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
    #[serde(alias = "imageBaseUrl", rename = "imagebaseurl")]
    #[serde(default = "default_tmdb_image_base_url")]
    pub image_base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(alias = "batchSize", rename = "batchsize")]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between enrichment batches, in milliseconds.
    #[serde(alias = "batchDelay", rename = "batchdelay")]
    #[serde(default = "default_batch_delay")]
    pub batch_delay: u64,
    #[serde(alias = "maxAttempts", rename = "maxattempts")]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Listing cache lifetime in seconds.
    #[serde(alias = "listingCache", rename = "listingcache")]
    #[serde(default = "default_listing_cache")]
    pub listing_cache: u64,
    /// Detail cache lifetime in seconds.
    #[serde(alias = "detailCache", rename = "detailcache")]
    #[serde(default = "default_detail_cache")]
    pub detail_cache: u64,
    /// Maximum number of entries held by each response cache.
    #[serde(alias = "cacheCapacity", rename = "cachecapacity")]
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_tmdb_base_url(),
            image_base_url: default_tmdb_image_base_url(),
            language: default_language(),
            region: default_region(),
            timeout: default_timeout(),
            batch_size: default_batch_size(),
            batch_delay: default_batch_delay(),
            max_attempts: default_max_attempts(),
            listing_cache: default_listing_cache(),
            detail_cache: default_detail_cache(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl TmdbConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_cache)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_cache)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(alias = "apiKey", rename = "apikey")]
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(alias = "baseUrl", rename = "baseurl")]
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(alias = "maxOutputTokens", rename = "maxoutputtokens")]
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Send commentary prompts to a remote `{prompt, mode}` proxy instead
    /// of calling Gemini directly.
    #[serde(alias = "proxyUrl", rename = "proxyurl")]
    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            proxy_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PredictorConfig {
    #[serde(default)]
    pub url: Option<String>,
}

fn default_port() -> String {
    "3000".to_string()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_base_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_region() -> String {
    "US".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    5
}

fn default_listing_cache() -> u64 {
    3600
}

fn default_detail_cache() -> u64 {
    86400
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    256
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_string(), e))?;

        config.apply_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Credentials and the predictor endpoint may come from the environment
    /// instead of the config file; a non-empty variable wins.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("TMDB_API_KEY") {
            self.tmdb.api_key = Some(key);
        }
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(url) = lookup("PREDICT_URL") {
            self.predictor.url = Some(url);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}
