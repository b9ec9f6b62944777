// In crates/advisory/src/error.rs

use thiserror::Error;

/// Errors raised while setting an advisor up. Calls themselves never fail;
/// see `AdviceResult::Unavailable`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to build the advisory client: {0}")]
    ClientBuildError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
