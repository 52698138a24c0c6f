//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Hugging Face router endpoint.
pub const DEFAULT_INFERENCE_URL: &str = "https://router.huggingface.co";

/// Default chat model for reply drafting.
pub const DEFAULT_GENERATION_MODEL: &str = "Qwen/Qwen2.5-1.5B-Instruct";

/// Default NLI model for zero-shot importance classification.
pub const DEFAULT_CLASSIFIER_MODEL: &str = "facebook/bart-large-mnli";

/// Model gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the inference service (no trailing slash).
    pub base_url: String,
    /// Bearer token. Optional for self-hosted endpoints.
    pub api_token: Option<SecretString>,
    pub generation_model: String,
    pub classifier_model: String,
    /// HTTP timeout applied by the gateway client.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INFERENCE_URL.to_string(),
            api_token: None,
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            classifier_model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// HTTP listen address.
    pub bind_addr: SocketAddr,
    pub gateway: GatewayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./mails.db"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            gateway: GatewayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = get("MAIL_TRIAGE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let bind_addr = match get("MAIL_TRIAGE_BIND") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "MAIL_TRIAGE_BIND".into(),
                message: format!("'{raw}' is not a socket address: {e}"),
            })?,
            None => defaults.bind_addr,
        };

        let timeout = match get("MAIL_TRIAGE_GATEWAY_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: "MAIL_TRIAGE_GATEWAY_TIMEOUT_SECS".into(),
                    message: format!("'{raw}' is not a number of seconds: {e}"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "MAIL_TRIAGE_GATEWAY_TIMEOUT_SECS".into(),
                        message: "must be greater than zero".into(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.gateway.timeout,
        };

        let gateway = GatewayConfig {
            base_url: get("MAIL_TRIAGE_INFERENCE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gateway.base_url),
            api_token: get("HF_TOKEN").map(SecretString::from),
            generation_model: get("MAIL_TRIAGE_GENERATION_MODEL")
                .unwrap_or(defaults.gateway.generation_model),
            classifier_model: get("MAIL_TRIAGE_CLASSIFIER_MODEL")
                .unwrap_or(defaults.gateway.classifier_model),
            timeout,
        };

        Ok(Self {
            db_path,
            bind_addr,
            gateway,
        })
    }
}
