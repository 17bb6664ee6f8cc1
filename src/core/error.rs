use thiserror::Error;

use crate::strategy::PricingError;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("all {attempts} fetch attempts failed, last error: {last}")]
    TransportExhausted { attempts: u32, last: String },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("registry error: {0}")]
    Registry(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl BotError {
    pub fn transport(err: reqwest::Error) -> Self {
        BotError::Transport(err.to_string())
    }

    pub fn auth(err: impl std::fmt::Display) -> Self {
        BotError::Auth(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
