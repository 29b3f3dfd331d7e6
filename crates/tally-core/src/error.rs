//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown processor: {0}")]
    UnknownProcessor(String),

    #[error("Format error ({processor}): {message}")]
    Format { processor: String, message: String },

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Unknown partner: {0}")]
    UnknownPartner(i64),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a format error for a parser
    pub fn format(processor: &str, message: impl Into<String>) -> Self {
        Self::Format {
            processor: processor.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error came from the underlying store (I/O or constraint failure)
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Pool(_))
    }

    /// Whether this is a user-correctable validation failure raised before any write
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAccount(_)
                | Self::UnknownProcessor(_)
                | Self::UnknownTransaction(_)
                | Self::UnknownPartner(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
