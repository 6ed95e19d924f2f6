use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Top-level scraper configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScraperConfig {
    /// Page fetching behaviour
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Thresholds used by the heuristic extractors
    #[serde(default)]
    pub extraction: ExtractionPolicy,
}

/// Configuration for the HTTP page fetcher
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the first attempt, for retryable statuses only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay in milliseconds; doubles on every retry
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// HTTP statuses that are worth retrying
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,
    /// User agents rotated across requests
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    /// Retry once without certificate verification when TLS fails
    #[serde(default = "default_insecure_tls_fallback")]
    pub insecure_tls_fallback: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            retry_statuses: default_retry_statuses(),
            user_agents: default_user_agents(),
            insecure_tls_fallback: default_insecure_tls_fallback(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before retry number `retry` (1-based): backoff, 2x, 4x, ...
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

/// Tunable thresholds for the heuristic HTML chains.
///
/// Raising them trades recall for precision.
#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionPolicy {
    /// Cleaned instructions shorter than this are treated as headers
    #[serde(default = "default_min_instruction_chars")]
    pub min_instruction_chars: usize,
    /// Minimum length for the last-resort "numbered paragraph" instructions
    #[serde(default = "default_min_fallback_paragraph_chars")]
    pub min_fallback_paragraph_chars: usize,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            min_instruction_chars: default_min_instruction_chars(),
            min_fallback_paragraph_chars: default_min_fallback_paragraph_chars(),
        }
    }
}

// Default value functions
fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0".to_string(),
    ]
}

fn default_insecure_tls_fallback() -> bool {
    true
}

fn default_min_instruction_chars() -> usize {
    10
}

fn default_min_fallback_paragraph_chars() -> usize {
    50
}

impl ScraperConfig {
    /// Load configuration from file and environment variables
    ///
    /// See [`load_config`].
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
///
/// Configuration is loaded with the following priority (highest to lowest):
/// 1. Environment variables with RECIPE_SCRAPER__ prefix
/// 2. config.toml file in current directory
/// 3. Default values
///
/// Environment variable format: RECIPE_SCRAPER__FETCH__TIMEOUT_SECS
pub fn load_config() -> Result<ScraperConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: RECIPE_SCRAPER__FETCH__MAX_RETRIES
        .add_source(
            Environment::with_prefix("RECIPE_SCRAPER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
