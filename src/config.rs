//! Harness Configuration
//!
//! Backend selection and call settings are an explicit value handed to the
//! runner. The environment is read once, at the binary edge, through
//! [`Config::from_env`].
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `LLM` | `backend` | `XGen` |
//! | `XGEN_ENDPOINT` | `endpoint` | `http://localhost:8080/v1` |
//! | `XGEN_API_KEY` | `api_key` | none |
//! | `LLM_MAX_TOKENS` | `max_tokens` | 2048 |
//! | `LLM_STREAM` | `call_mode` | single-shot |

use crate::errors::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default model endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/v1";

/// Default completion budget
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Default results directory, relative to the workspace root
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Model backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    /// Salesforce XGen completion service
    #[default]
    #[serde(rename = "XGen")]
    XGen,
    /// Recognized but not implemented
    #[serde(rename = "OpenAI")]
    OpenAi,
}

impl Backend {
    /// Resolve a selector string (case-insensitive)
    pub fn resolve(name: &str) -> HarnessResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "xgen" => Ok(Backend::XGen),
            "openai" => Ok(Backend::OpenAi),
            _ => Err(HarnessError::unknown_backend(name)),
        }
    }

    /// Canonical selector string
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::XGen => "XGen",
            Backend::OpenAi => "OpenAI",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the model is called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallMode {
    /// One request, one complete response
    #[default]
    SingleShot,
    /// Incremental chunks folded by the stream consumer
    Streaming,
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Model backend
    pub backend: Backend,
    /// Base URL of the model service
    pub endpoint: String,
    /// Bearer token, if the service needs one
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Completion token budget
    pub max_tokens: u32,
    /// Single-shot or streaming
    pub call_mode: CallMode,
    /// Results directory relative to the workspace root
    pub results_dir: String,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            call_mode: CallMode::default(),
            results_dir: DEFAULT_RESULTS_DIR.to_string(),
            timeout_secs: 120,
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> HarnessResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(name) = lookup("LLM") {
            config.backend = Backend::resolve(&name)?;
        }
        if let Some(endpoint) = lookup("XGEN_ENDPOINT") {
            config.endpoint = endpoint;
        }
        config.api_key = lookup("XGEN_API_KEY").filter(|key| !key.is_empty());
        if let Some(raw) = lookup("LLM_MAX_TOKENS") {
            config.max_tokens = raw
                .trim()
                .parse()
                .ok()
                .filter(|tokens: &u32| *tokens > 0)
                .ok_or_else(|| {
                    HarnessError::invalid_config(format!(
                        "LLM_MAX_TOKENS must be a positive integer, got '{}'",
                        raw
                    ))
                })?;
        }
        if let Some(raw) = lookup("LLM_STREAM") {
            if matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.call_mode = CallMode::Streaming;
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HarnessErrorKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_resolve_backend() {
        assert_eq!(Backend::resolve("XGen").unwrap(), Backend::XGen);
        assert_eq!(Backend::resolve("openai").unwrap(), Backend::OpenAi);
        let err = Backend::resolve("Gemini").unwrap_err();
        assert_eq!(err.kind, HarnessErrorKind::UnknownBackend);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.call_mode, CallMode::SingleShot);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("LLM", "OpenAI"),
            ("XGEN_ENDPOINT", "https://example.test/v2"),
            ("XGEN_API_KEY", "secret"),
            ("LLM_MAX_TOKENS", "512"),
            ("LLM_STREAM", "true"),
        ]))
        .unwrap();
        assert_eq!(config.backend, Backend::OpenAi);
        assert_eq!(config.endpoint, "https://example.test/v2");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.call_mode, CallMode::Streaming);
    }

    #[test]
    fn test_bad_max_tokens() {
        let err = Config::from_lookup(lookup(&[("LLM_MAX_TOKENS", "lots")])).unwrap_err();
        assert_eq!(err.kind, HarnessErrorKind::InvalidConfig);
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let err = Config::from_lookup(lookup(&[("LLM_MAX_TOKENS", "0")])).unwrap_err();
        assert_eq!(err.kind, HarnessErrorKind::InvalidConfig);
        assert!(err.message.contains("positive integer"));
    }
}
