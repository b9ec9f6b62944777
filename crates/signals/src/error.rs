// In crates/signals/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Not a failure of the feed: the series is simply too short to say anything yet.
    #[error("Insufficient data: {available} bars available, {required} required")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid indicator parameters: {0}")]
    InvalidParameters(String),

    #[error("Bar at {open_time} has a non-numeric {field}")]
    NonNumeric { open_time: i64, field: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
