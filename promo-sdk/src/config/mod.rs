//! Configuration management for the promo SDK
//!
//! This module provides utilities for loading and validating configuration
//! for the generation client, with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, ServiceError};
use crate::resilience::{CircuitBreakerConfig, RetryConfig, RetryExecutor};
use crate::util::parse_duration;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "https://ollama.com";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-oss:120b-cloud";

/// Default publication name used in prompts
pub const DEFAULT_PUBLICATION: &str = "AI Daily Post";

/// Default overall deadline for one generate call
///
/// Four attempts of up to 60s plus 7s of backoff fit inside it.
pub const DEFAULT_GENERATION_DEADLINE: Duration = Duration::from_secs(300);

/// Reject a deadline that could expire before the retry loop gives up
///
/// Deadline expiry is reported as cancellation and never reaches the
/// breaker, so a deadline shorter than the retry budget would keep a hung
/// dependency from ever opening it.
pub fn ensure_deadline_covers_retries(
    deadline: Duration,
    retry: &RetryConfig,
    attempt_timeout: Duration,
) -> Result<()> {
    let budget = RetryExecutor::new(retry.clone()).worst_case_elapsed(attempt_timeout);
    if deadline < budget {
        return Err(ServiceError::configuration(format!(
            "Generation deadline of {:?} is shorter than the retry budget of {:?} ({} attempts of up to {:?} plus backoff)",
            deadline, budget, retry.max_attempts, attempt_timeout
        )));
    }
    Ok(())
}

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a float configuration value
    fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<f64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid float for key {}: {}", key, e)))
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ServiceError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a duration such as "30s", "500ms" or a bare number of seconds
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        parse_duration(&value).ok_or_else(|| {
            ServiceError::configuration(format!("Invalid duration for key {}: {}", key, value))
        })
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get a typed configuration value by parsing from string
    fn get_parsed<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: fmt::Display,
    {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ServiceError::configuration(format!("Invalid value for key {}: {}", key, e)))
    }

    /// Whether `key` is set at all
    fn contains_key(&self, key: &str) -> bool {
        self.get_string(key).is_ok()
    }

    /// Parse `key` when it is set; a missing key is `None`, a malformed one an error
    fn get_parsed_opt<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        <T as FromStr>::Err: fmt::Display,
    {
        if !self.contains_key(key) {
            return Ok(None);
        }
        self.get_parsed(key).map(Some)
    }

    /// Parse `key`, falling back to `default` only when the key is missing
    fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: fmt::Display,
    {
        Ok(self.get_parsed_opt(key)?.unwrap_or(default))
    }

    /// Duration at `key` when it is set; a malformed value is an error
    fn get_duration_opt(&self, key: &str) -> Result<Option<Duration>> {
        if !self.contains_key(key) {
            return Ok(None);
        }
        self.get_duration(key).map(Some)
    }

    /// Duration at `key`, falling back to `default` only when the key is missing
    fn get_duration_or(&self, key: &str, default: Duration) -> Result<Duration> {
        Ok(self.get_duration_opt(key)?.unwrap_or(default))
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "PROMO")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// A composite config provider that tries multiple providers in order
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl Debug for CompositeConfigProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeConfigProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl Default for CompositeConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeConfigProvider {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a provider to the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Add a provider and return self (builder pattern)
    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.add_provider(provider);
        self
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.get_string(key).ok())
            .ok_or_else(|| {
                ServiceError::configuration(format!(
                    "Configuration key not found in any provider: {}",
                    key
                ))
            })
    }
}

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Settings for the copy generation client
///
/// Keys are read without a prefix, so `from_env` looks at `OLLAMA_API_KEY`,
/// `OLLAMA_MODEL`, `RETRY_MAX_ATTEMPTS` and so on.
#[derive(Clone)]
pub struct GenerationConfig {
    /// Bearer token for the Ollama endpoint
    pub api_key: String,

    /// Base URL of the Ollama endpoint
    pub base_url: String,

    /// Chat model name
    pub model: String,

    /// Sampling temperature, 0.0 to 2.0
    pub temperature: f32,

    /// Token budget per requested variation
    pub max_tokens_per_variation: u32,

    /// Per-request HTTP timeout
    pub timeout_seconds: u64,

    /// Publication name woven into prompts
    pub publication: String,

    /// Circuit breaker settings
    pub breaker: CircuitBreakerConfig,

    /// Retry settings
    pub retry: RetryConfig,

    /// Overall deadline for one generate call, `None` disables it
    ///
    /// Must be at least the retry budget: `max_attempts` times the HTTP
    /// timeout plus every backoff sleep.
    pub request_deadline: Option<Duration>,
}

impl Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens_per_variation", &self.max_tokens_per_variation)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("publication", &self.publication)
            .field("breaker", &self.breaker)
            .field("retry", &self.retry)
            .field("request_deadline", &self.request_deadline)
            .finish()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.8,
            max_tokens_per_variation: 500,
            timeout_seconds: 60,
            publication: DEFAULT_PUBLICATION.to_string(),
            breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
            request_deadline: Some(DEFAULT_GENERATION_DEADLINE),
        }
    }
}

impl GenerationConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let api_key = provider.get_string("ollama_api_key")?;
        let base_url = provider.get_string_or("ollama_api_url", &defaults.base_url);
        let model = provider.get_string_or("ollama_model", &defaults.model);
        let temperature = provider.get_parsed_or("ollama_temperature", defaults.temperature)?;
        let max_tokens_per_variation =
            provider.get_parsed_or("ollama_max_tokens", defaults.max_tokens_per_variation)?;
        let timeout_seconds =
            provider.get_parsed_or("ollama_timeout_seconds", defaults.timeout_seconds)?;
        let publication = provider.get_string_or("promo_publication", &defaults.publication);

        let breaker = CircuitBreakerConfig {
            failure_threshold: provider
                .get_parsed_or("breaker_failure_threshold", defaults.breaker.failure_threshold)?,
            open_timeout: provider
                .get_duration_or("breaker_open_timeout", defaults.breaker.open_timeout)?,
            success_threshold: provider
                .get_parsed_or("breaker_success_threshold", defaults.breaker.success_threshold)?,
        };

        let retry = RetryConfig {
            max_attempts: provider.get_parsed_or("retry_max_attempts", defaults.retry.max_attempts)?,
            base_delay: provider.get_duration_or("retry_base_delay", defaults.retry.base_delay)?,
            ..defaults.retry
        };

        // Zero turns the deadline off
        let request_deadline = match provider.get_duration_opt("generation_deadline")? {
            Some(d) if d.is_zero() => None,
            Some(d) => Some(d),
            None => defaults.request_deadline,
        };

        let config = Self {
            api_key,
            base_url,
            model,
            temperature,
            max_tokens_per_variation,
            timeout_seconds,
            publication,
            breaker,
            retry,
            request_deadline,
        };

        config.validate()?;
        log::debug!("Loaded generation config: {:?}", config);
        Ok(config)
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_provider(&EnvConfigProvider::new())
    }

    /// Per-request HTTP timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ServiceConfig for GenerationConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ServiceError::configuration("Ollama API key is required"));
        }

        if let Err(e) = url::Url::parse(&self.base_url) {
            return Err(ServiceError::configuration(format!(
                "Invalid Ollama base URL {}: {}",
                self.base_url, e
            )));
        }

        if self.model.trim().is_empty() {
            return Err(ServiceError::configuration("Model name is required"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ServiceError::configuration(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if self.max_tokens_per_variation == 0 {
            return Err(ServiceError::configuration("Max tokens must be at least 1"));
        }

        if self.breaker.failure_threshold == 0 || self.breaker.success_threshold == 0 {
            return Err(ServiceError::configuration(
                "Circuit breaker thresholds must be at least 1",
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ServiceError::configuration("Retry attempts must be at least 1"));
        }

        if let Some(deadline) = self.request_deadline {
            ensure_deadline_covers_retries(deadline, &self.retry, self.timeout())?;
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "ollama"
    }
}
