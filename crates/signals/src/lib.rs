// In crates/signals/src/lib.rs

pub mod crossover;
pub mod engine;
pub mod error;
pub mod types;

// Re-export public types
pub use crossover::CrossoverDetector;
pub use engine::IndicatorEngine;
pub use error::{Error, Result};
pub use types::{EmaPair, IndicatorSettings, IndicatorSnapshot};
