use std::io;

/// Custom error type for delivery_hooks operations
#[derive(Debug, thiserror::Error)]
pub enum HooksError {
    #[error("GitHub request to {url} failed: {response_text}")]
    GitHub { url: String, response_text: String },

    #[error("CircleCI request to {url} failed: {response_text}")]
    CircleCi { url: String, response_text: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown quality tool in report header")]
    UnknownQualityTool,

    #[error("Malformed report: missing '{0}' field")]
    MalformedReport(&'static str),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),
}

/// Helper type for Results that use HooksError
pub type Result<T> = std::result::Result<T, HooksError>;
