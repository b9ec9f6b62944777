// In crates/engine/src/error.rs

use core_types::UnavailableReason;
use std::fmt;
use thiserror::Error;

/// Which of the two bar series a per-symbol failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Short,
    Long,
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizon::Short => f.write_str("short"),
            Horizon::Long => f.write_str("long"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// No signal yet. The symbol is skipped for this tick.
    #[error("Insufficient {horizon}-horizon data: {available} bars available, {required} required")]
    InsufficientData {
        horizon: Horizon,
        required: usize,
        available: usize,
    },

    #[error("Market data unavailable on the {horizon} horizon: {source}")]
    FetchUnavailable {
        horizon: Horizon,
        #[source]
        source: api_client::Error,
    },

    /// The feed answered, but the bars could not be evaluated.
    #[error("Malformed {horizon}-horizon data: {source}")]
    MalformedData {
        horizon: Horizon,
        #[source]
        source: signals::Error,
    },

    #[error("Advisory unavailable: {reason}")]
    AdvisoryUnavailable { reason: UnavailableReason },

    #[error("Notification failed: {0}")]
    NotificationFailed(#[from] notification::Error),

    /// Fatal. Raised only while the session is being set up.
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),
}

impl Error {
    pub(crate) fn from_indicator(horizon: Horizon, source: signals::Error) -> Self {
        match source {
            signals::Error::InsufficientData { required, available } => Error::InsufficientData {
                horizon,
                required,
                available,
            },
            source => Error::MalformedData { horizon, source },
        }
    }

    /// Whether this error means the feed itself could not be reached or understood.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::FetchUnavailable { .. })
    }
}

impl From<app_config::Error> for Error {
    fn from(e: app_config::Error) -> Self {
        Error::ConfigurationInvalid(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
