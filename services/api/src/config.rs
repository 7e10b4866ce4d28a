use secrecy::SecretString;
use std::net::SocketAddr;
use tracing::Level;

/// Maximum number of sessions kept in memory at once.
pub const SESSION_CAPACITY: usize = 1024;
/// Sessions older than this are evicted regardless of state.
pub const SESSION_TTL_MINUTES: i64 = 120;

/// Chat models probed at startup, in preference order. A `CHAT_MODEL`
/// environment variable is tried first when set.
pub const CANDIDATE_CHAT_MODELS: &[&str] =
    &["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini", "gpt-3.5-turbo"];

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub llm_api_key: SecretString,
    pub llm_base_url: String,
    pub chat_models: Vec<String>,
    pub transcribe_api_key: SecretString,
    pub transcribe_host: String,
    pub tts_model: String,
    pub default_speaker: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "0.0.0.0:5000".
    /// *   `OPENAI_API_KEY`: Secret key for the chat-completion and speech-synthesis APIs. Required.
    /// *   `LLM_BASE_URL`: (Optional) Base URL of the OpenAI-compatible API.
    /// *   `CHAT_MODEL`: (Optional) Preferred chat model, probed before the built-in candidates.
    /// *   `TRANSCRIBE_API_KEY`: Secret key for the streaming transcription service. Required.
    /// *   `TRANSCRIBE_HOST`: (Optional) Websocket host of the transcription service.
    /// *   `TTS_MODEL`: (Optional) Speech-synthesis model. Defaults to "tts-1".
    /// *   `TTS_SPEAKER`: (Optional) Default speaker voice. Defaults to "alloy".
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let llm_api_key: SecretString = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?
            .into();
        let llm_base_url = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());

        let mut chat_models: Vec<String> = CANDIDATE_CHAT_MODELS
            .iter()
            .map(|m| m.to_string())
            .collect();
        if let Ok(preferred) = std::env::var("CHAT_MODEL") {
            chat_models.insert(0, preferred);
        }

        let transcribe_api_key: SecretString = std::env::var("TRANSCRIBE_API_KEY")
            .map_err(|_| ConfigError::MissingVar("TRANSCRIBE_API_KEY".to_string()))?
            .into();
        let transcribe_host = std::env::var("TRANSCRIBE_HOST")
            .unwrap_or_else(|_| "wss://streaming.assemblyai.com".to_string());

        let tts_model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        let default_speaker =
            std::env::var("TTS_SPEAKER").unwrap_or_else(|_| "alloy".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            llm_api_key,
            llm_base_url,
            chat_models,
            transcribe_api_key,
            transcribe_host,
            tts_model,
            default_speaker,
            log_level,
        })
    }
}
