//! Runtime configuration for the tutor service.
//!
//! Values come from environment variables with sensible defaults so the
//! server can start with nothing but an inference API key.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::progress::ids::UserId;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default base URL for speech-to-text models.
const DEFAULT_STT_BASE_URL: &str = "https://router.huggingface.co/hf-inference/models";
/// Default speech-to-text model.
const DEFAULT_STT_MODEL: &str = "openai/whisper-large-v3";
/// Default base URL for `OpenAI`-compatible chat completions.
const DEFAULT_CHAT_BASE_URL: &str = "https://router.huggingface.co/v1";
/// Default chat model.
const DEFAULT_CHAT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

/// Values shipped in `.env.example` that must be treated as "not configured".
const PLACEHOLDER_SUPABASE_URL: &str = "your_supabase_project_url_here";
const PLACEHOLDER_SUPABASE_KEY: &str = "your_supabase_anon_key_here";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or otherwise unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// A URL could not be parsed.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Top-level service configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TutorConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Hosted inference endpoints.
    pub inference: InferenceConfig,
    /// Local snapshot storage.
    pub storage: StorageConfig,
    /// Remote mirror settings.
    pub sync: SyncConfig,
}

impl TutorConfig {
    /// Build the configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = env_var("TUTOR_PORT").and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }
        if let Some(dir) = env_var("TUTOR_STATIC_DIR") {
            config.server.static_dir = PathBuf::from(dir);
        }
        if let Some(path) = env_var("TUTOR_DB_PATH") {
            config.storage.sqlite_path = PathBuf::from(path);
        }

        config.inference.api_key = env_var("HUGGINGFACE_API_KEY");
        if let Some(url) = env_var("TUTOR_STT_BASE_URL") {
            config.inference.stt_base_url = url;
        }
        if let Some(model) = env_var("TUTOR_STT_MODEL") {
            config.inference.stt_model = model;
        }
        if let Some(url) = env_var("TUTOR_CHAT_BASE_URL") {
            config.inference.chat_base_url = url;
        }
        if let Some(model) = env_var("TUTOR_CHAT_MODEL") {
            config.inference.chat_model = model;
        }

        config.sync.supabase_url = env_var("SUPABASE_URL");
        config.sync.supabase_anon_key = env_var("SUPABASE_ANON_KEY");
        config.sync.user_id = env_var("TUTOR_USER_ID").and_then(|id| id.parse().ok());
        if let Some(attempts) = env_var("TUTOR_SYNC_MAX_ATTEMPTS").and_then(|a| a.parse().ok()) {
            config.sync.max_attempts = attempts;
        }

        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".to_string()));
        }

        Url::parse(&self.inference.stt_base_url)?;
        Url::parse(&self.inference.chat_base_url)?;

        if self.inference.stt_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "inference.stt_model must not be empty".to_string(),
            ));
        }
        if self.inference.chat_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "inference.chat_model must not be empty".to_string(),
            ));
        }
        if self.inference.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "inference.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.sync.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "sync.max_attempts must be > 0".to_string(),
            ));
        }
        if let Some((url, _)) = self.sync.credentials() {
            Url::parse(url)?;
        }

        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Directory of static client files.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Hosted inference endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Bearer token for the inference provider.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL; the model id is appended as a path.
    pub stt_base_url: String,
    /// Speech-to-text model id.
    pub stt_model: String,
    /// Base URL of an `OpenAI`-compatible API.
    pub chat_base_url: String,
    /// Chat model id.
    pub chat_model: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            stt_base_url: DEFAULT_STT_BASE_URL.to_string(),
            stt_model: DEFAULT_STT_MODEL.to_string(),
            chat_base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

impl InferenceConfig {
    /// Point both endpoints at the same base URL (used against mock servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.stt_base_url.clone_from(&base_url);
        self.chat_base_url = base_url;
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Local snapshot storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database file.
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("lingo_tutor.sqlite"),
        }
    }
}

/// Remote mirror settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Project URL of the relational store.
    pub supabase_url: Option<String>,
    /// Anonymous API key.
    #[serde(skip_serializing)]
    pub supabase_anon_key: Option<String>,
    /// Owner id override; otherwise the snapshot's id is used.
    pub user_id: Option<UserId>,
    /// Delivery attempts per record before giving up.
    pub max_attempts: u32,
    /// Base delay between attempts, multiplied by the attempt number.
    pub retry_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            user_id: None,
            max_attempts: 3,
            retry_delay_ms: 500,
        }
    }
}

impl SyncConfig {
    /// URL and key, if both are set to real (non-placeholder) values.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let url = self.supabase_url.as_deref()?.trim();
        let key = self.supabase_anon_key.as_deref()?.trim();
        if url.is_empty() || key.is_empty() {
            return None;
        }
        if url == PLACEHOLDER_SUPABASE_URL || key == PLACEHOLDER_SUPABASE_KEY {
            return None;
        }
        Some((url, key))
    }

    /// Whether remote mirroring should run.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.credentials().is_some()
    }

    /// Set remote credentials.
    #[must_use]
    pub fn with_credentials(mut self, url: impl Into<String>, key: impl Into<String>) -> Self {
        self.supabase_url = Some(url.into());
        self.supabase_anon_key = Some(key.into());
        self
    }

    /// Base retry delay as a `Duration`.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
