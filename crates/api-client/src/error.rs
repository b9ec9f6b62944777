// In crates/api-client/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to build the API client: {0}")]
    ClientBuildError(String),
    /// The feed could not be reached, or timed out.
    #[error("Chart request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Chart body could not be decoded: {0}")]
    DeserializationFailed(#[from] serde_json::Error),
    /// The chart API answered with an error other than "Not Found".
    #[error("Chart API error ({code}): {msg}")]
    ApiError { code: String, msg: String },
    /// A non-JSON answer with a non-success status, e.g. a gateway error page.
    #[error("Chart API answered HTTP {0}")]
    HttpStatus(u16),
}

pub type Result<T> = std::result::Result<T, Error>;
