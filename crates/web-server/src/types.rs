// In crates/web-server/src/types.rs

use chrono::{DateTime, Utc};
use core_types::Symbol;
use serde::{Deserialize, Serialize};

/// The largest page a client may ask for.
pub const MAX_PAGE_SIZE: usize = 200;

/// Represents a paginated list of items.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total_items: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Represents the pagination query parameters from the URL (e.g., ?page=1&page_size=50).
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// One entry of `GET /api/advice`.
#[derive(Debug, Serialize)]
pub struct AdviceEntry {
    pub symbol: Symbol,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// One entry of the cooldown table in `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct CooldownEntry {
    pub symbol: Symbol,
    pub last_alert: DateTime<Utc>,
    pub dispatches: u32,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: engine::StatusView,
    pub cooldowns: Vec<CooldownEntry>,
}

// Helper functions for serde defaults.
fn default_page() -> usize { 1 }
fn default_page_size() -> usize { 50 }
