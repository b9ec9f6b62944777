// In crates/engine/src/lib.rs

pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod monitor;
pub mod state;

// Re-export public types
pub use cooldown::{CooldownGate, CooldownRecord, CooldownState};
pub use dispatcher::{AlertDispatcher, AlertSignal, compose_message};
pub use error::{Error, Horizon, Result};
pub use monitor::{
    Collaborators, HorizonSpec, MonitorConfig, MonitorLoop, SkippedSymbol, TickReport, next_delay,
};
pub use state::{CachedAdvice, MonitorPhase, MonitorState, StatusView};
