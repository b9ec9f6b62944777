// In crates/notification/src/lib.rs

use async_trait::async_trait;

pub mod error;
pub mod telegram;

// Re-export public types
pub use error::{Error, Result};
pub use telegram::TelegramNotifier;

/// The universal interface for a notification transport.
///
/// Delivery is best effort: callers log a failed `send` and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// The name of the transport (e.g., "Telegram", "Log").
    fn name(&self) -> &'static str;

    /// Whether messages sent through this transport leave the process.
    fn delivers(&self) -> bool {
        true
    }

    /// Sends a pre-formatted message to `destination` (a chat id, channel name, ...).
    async fn send(&self, destination: &str, message: &str) -> Result<()>;
}

/// A transport that only writes alerts to the log. Used when notifications are disabled.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "Log"
    }

    fn delivers(&self) -> bool {
        false
    }

    async fn send(&self, destination: &str, message: &str) -> Result<()> {
        tracing::info!(destination, message, "Alert (notifications disabled).");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_accepts_everything_without_delivering() {
        let notifier = LogNotifier;
        assert!(!notifier.delivers());
        assert!(notifier.send("", "hello").await.is_ok());
    }
}
