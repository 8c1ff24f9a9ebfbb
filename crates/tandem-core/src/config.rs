use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TandemError};

/// Top-level tandem configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub question_model: ModelConfig,
}

/// Remote graph platform connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Deployment host (`example.us.langgraph.app`) or full base URL.
    #[serde(default)]
    pub url: String,
    /// Sent as the `x-api-key` header.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Graph name of the math agent on the platform.
    #[serde(default = "default_math_assistant_id")]
    pub math_assistant_id: String,
    /// Bytes per read when decoding a run stream.
    #[serde(default = "default_stream_chunk_size")]
    pub stream_chunk_size: usize,
    /// Ceiling for one non-streaming request (thread, run, state). Default: 30.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            math_assistant_id: default_math_assistant_id(),
            stream_chunk_size: default_stream_chunk_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PlatformConfig {
    /// Base URL with a scheme; bare hosts are assumed to be HTTPS.
    pub fn base_url(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_math_assistant_id() -> String { "math_agent".to_string() }
fn default_stream_chunk_size() -> usize { 1024 }
fn default_request_timeout_secs() -> u64 { 30 }

/// Bounds for the polling fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Total time to wait for a run before giving up. Default: 30.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Delay between thread-state checks. Default: 2.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: default_max_wait_secs(),
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

impl PollingConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

fn default_max_wait_secs() -> u64 { 30 }
fn default_check_interval_secs() -> u64 { 2 }

/// Model used by the local question agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: default_model_id(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_provider() -> String { "openai".to_string() }
fn default_model_id() -> String { "gpt-4o-mini".to_string() }
fn default_max_tokens() -> u32 { 1024 }
fn default_temperature() -> f32 { 0.0 }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| TandemError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| TandemError::Config(e.to_string()))
    }

    /// Build a config from well-known environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("LANGGRAPH_PLATFORM_URL") {
            config.platform.url = url;
        }
        config.platform.api_key = non_empty_env("LANGGRAPH_API_KEY");
        config.question_model.api_key = non_empty_env("OPENAI_API_KEY");
        config
    }

    /// Names of required credentials that are unset or still placeholders.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.platform.url.trim().is_empty() {
            missing.push("platform.url");
        }
        if !is_configured(self.platform.api_key.as_deref()) {
            missing.push("platform.api_key");
        }
        if !is_configured(self.question_model.api_key.as_deref()) {
            missing.push("question_model.api_key");
        }
        missing
    }

    /// Fail with a config error naming every missing credential.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_credentials();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TandemError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }

    /// Human-readable summary with credentials masked.
    pub fn summary(&self) -> String {
        let mark = |key: Option<&str>| {
            if is_configured(key) {
                "configured"
            } else {
                "not configured"
            }
        };
        [
            format!("Platform URL:      {}", self.platform.base_url()),
            format!("Math Agent ID:     {}", self.platform.math_assistant_id),
            format!("Question Model:    {}/{}", self.question_model.provider, self.question_model.model_id),
            format!("Max Wait Time:     {}s", self.polling.max_wait_secs),
            format!("Check Interval:    {}s", self.polling.check_interval_secs),
            format!("Stream Chunk Size: {}", self.platform.stream_chunk_size),
            format!("Request Timeout:   {}s", self.platform.request_timeout_secs),
            format!("Platform API Key:  {}", mark(self.platform.api_key.as_deref())),
            format!("Model API Key:     {}", mark(self.question_model.api_key.as_deref())),
        ]
        .join("\n")
    }
}

fn is_configured(key: Option<&str>) -> bool {
    match key {
        Some(k) => !k.is_empty() && !k.starts_with("your_") && !k.starts_with("${"),
        None => false,
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Left as-is so missing_credentials() can flag it
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}
