// In crates/notification/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to build the notification client: {0}")]
    ClientBuildError(String),
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(#[from] serde_json::Error),
    #[error("Message rejected: code {code}, description: {description}")]
    Rejected { code: i64, description: String },
    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),
}

pub type Result<T> = std::result::Result<T, Error>;
