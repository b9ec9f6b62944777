// In app/src/main.rs

use advisory::{AdvisoryClient, DisabledAdvisor, GeminiAdvisor};
use anyhow::Result;
use app_config::Settings;
use chrono::Utc;
use clap::{Parser, Subcommand};
use core_types::Symbol;
use engine::{Collaborators, MonitorConfig, MonitorLoop, MonitorState};
use events::{EventSender, ReplayCache};
use notification::{LogNotifier, Notifier, TelegramNotifier};
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use web_server::AppState;

use self::tracing_layer::{WsBroadcastLayer, log_filter};
mod tracing_layer;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Watches symbols for moving-average crossovers and sends alerts."
)]
struct Cli {
    /// Base configuration file, without its extension.
    #[arg(long, global = true, default_value = app_config::DEFAULT_BASE_FILE)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the monitor loop (and the web server, when enabled) until Ctrl-C.
    Run,

    /// Evaluates one symbol once and prints both snapshots. Nothing is dispatched.
    Check {
        /// The symbol to evaluate (e.g., "AAPL").
        #[arg(short, long)]
        symbol: String,
    },
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Settings are loaded before logging so the configured level applies from the start.
    let settings = app_config::load_settings_from(&cli.config);
    let log_level = settings
        .as_ref()
        .ok()
        .and_then(|s| s.app.log_level.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);

    // --- WebSocket and Tracing Setup ---
    let ws_tx = events::channel();
    let ws_cache = ReplayCache::default();
    let filter = log_filter(log_level);
    let ws_layer = WsBroadcastLayer::new(ws_tx.clone(), ws_cache.clone()).with_filter(filter.clone());
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).with(ws_layer).init();

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, config = %cli.config, "Configuration invalid. Refusing to start.");
            return Err(e.into());
        }
    };
    tracing::info!(environment = %settings.app.environment, "Application settings loaded successfully.");

    match cli.command {
        Commands::Run => run_app(settings, ws_tx, ws_cache).await?,
        Commands::Check { symbol } => handle_check(settings, &symbol, ws_tx).await?,
    }

    tracing::info!("Trendwatch has finished.");
    Ok(())
}

// --- "Run" Subcommand Logic ---

/// Builds every collaborator from the settings and runs until Ctrl-C.
async fn run_app(settings: Settings, ws_tx: EventSender, ws_cache: ReplayCache) -> Result<()> {
    let config = MonitorConfig::from_settings(&settings.monitor)?;
    let state = Arc::new(MonitorState::new(
        config.symbols.clone(),
        settings.monitor.alert_history_size,
    ));

    let collaborators = build_collaborators(&settings)?;
    let monitor = MonitorLoop::new(config, collaborators, state.clone(), ws_tx.clone())?;

    if settings.server.enabled {
        let app_state = AppState {
            monitor: state,
            ws_tx,
            ws_cache,
        };
        tokio::select! {
            _ = monitor.run() => {}
            result = web_server::run(&settings.server, app_state) => result?,
            _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl-C received. Shutting down."),
        }
    } else {
        tokio::select! {
            _ = monitor.run() => {}
            _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl-C received. Shutting down."),
        }
    }

    Ok(())
}

fn build_collaborators(settings: &Settings) -> Result<Collaborators> {
    let feed = Arc::new(api_client::new(&settings.market_data)?);

    let advisor: Arc<dyn AdvisoryClient> = if settings.advisory.enabled {
        Arc::new(GeminiAdvisor::new(&settings.advisory)?)
    } else {
        tracing::warn!("Advisory is disabled; alerts will carry a placeholder.");
        Arc::new(DisabledAdvisor)
    };

    let notifier: Arc<dyn Notifier> = if settings.notification.enabled {
        Arc::new(TelegramNotifier::new(&settings.notification)?)
    } else {
        tracing::warn!("Notifications are disabled; alerts will only be logged.");
        Arc::new(LogNotifier)
    };

    Ok(Collaborators {
        feed,
        advisor,
        notifier,
        destination: settings.notification.chat_id.clone(),
    })
}

// --- "Check" Subcommand Logic ---

async fn handle_check(settings: Settings, symbol: &str, ws_tx: EventSender) -> Result<()> {
    let symbol = Symbol::parse(symbol)?;

    let mut config = MonitorConfig::from_settings(&settings.monitor)?;
    config.symbols = vec![symbol.clone()];

    let state = Arc::new(MonitorState::new(config.symbols.clone(), 0));
    let collaborators = Collaborators {
        feed: Arc::new(api_client::new(&settings.market_data)?),
        advisor: Arc::new(DisabledAdvisor),
        notifier: Arc::new(LogNotifier),
        destination: String::new(),
    };
    let monitor = MonitorLoop::new(config, collaborators, state, ws_tx)?;

    let update = monitor.evaluate_symbol(&symbol, Utc::now()).await?;
    tracing::info!(symbol = %symbol, event = %update.event, "Check complete.");
    println!("{}", serde_json::to_string_pretty(&update)?);

    Ok(())
}
