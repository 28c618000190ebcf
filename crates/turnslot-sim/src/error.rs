use thiserror::Error;

use turnslot::ConfigError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid arbiter config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
