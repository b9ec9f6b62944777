// --- Broadcast Message Structures (shared by the engine, the tracing layer and the web server) ---

use chrono::{DateTime, Utc};
use core_types::{AlertRecord, CrossoverEvent, Symbol};
use serde::Serialize;
use signals::IndicatorSnapshot;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// The sending half every producer of `MonitorEvent`s holds.
pub type EventSender = broadcast::Sender<MonitorEvent>;

/// Capacity of the broadcast channel. Slow subscribers lag rather than block producers.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub fn channel() -> EventSender {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// The maximum number of messages to keep in the replay cache.
pub const REPLAY_CACHE_SIZE: usize = 200;

/// Recent messages replayed to WebSocket clients when they connect.
#[derive(Debug, Clone)]
pub struct ReplayCache {
    inner: Arc<Mutex<VecDeque<MonitorEvent>>>,
    capacity: usize,
}

impl ReplayCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, event: MonitorEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        while cache.len() >= self.capacity {
            cache.pop_front();
        }
        cache.push_back(event);
    }

    /// The cached messages, oldest first.
    pub fn snapshot(&self) -> Vec<MonitorEvent> {
        let cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        cache.iter().cloned().collect()
    }
}

impl Default for ReplayCache {
    fn default() -> Self {
        Self::new(REPLAY_CACHE_SIZE)
    }
}

/// Represents a log message event to be sent to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct WsLogMessage {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

/// Latest indicator state of one symbol on both horizons.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotUpdate {
    pub symbol: Symbol,
    pub short_term: IndicatorSnapshot,
    pub long_term: IndicatorSnapshot,
    pub event: CrossoverEvent,
    pub evaluated_at: DateTime<Utc>,
}

/// A crossover that was detected but not dispatched because of the cooldown window.
#[derive(Debug, Clone, Serialize)]
pub struct SuppressedAlert {
    pub symbol: Symbol,
    pub event: CrossoverEvent,
    pub at: DateTime<Utc>,
    pub last_dispatch: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickSummary {
    pub at: DateTime<Utc>,
    pub alerts: usize,
    pub suppressed: usize,
    pub skipped: usize,
}

/// The top-level message enum.
/// `tag` and `content` are used by serde for clean JSON representation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum MonitorEvent {
    Log(WsLogMessage),
    Snapshot(Box<SnapshotUpdate>),
    Alert(AlertRecord),
    Suppressed(SuppressedAlert),
    Tick(TickSummary),
}
