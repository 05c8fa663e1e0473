pub mod composer;
pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod intent;
pub mod knowledge;
pub mod logging;
pub mod metrics;
pub mod nft;
pub mod persona;
pub mod session;
pub mod shell;
pub mod trades;
pub mod typing;

use config::ChatConfig;
use db::Database;
use engine::ChatEngine;
use metrics::{MetricsClient, TokenMetrics};
use nft::NftListing;
use session::{ChatMessage, SessionStore};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use trades::{Trade, TradeFeed};

/// Everything a running chat surface owns. Dropping it without `shutdown` leaves timers running.
pub struct App {
    config: ChatConfig,
    db: Arc<Database>,
    engine: Arc<ChatEngine>,
    trades: Arc<TradeFeed>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl App {
    pub fn engine(&self) -> &Arc<ChatEngine> {
        &self.engine
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

// ============ App Initialization ============

/// Open the default database, start logging, load config and history, start the feeds.
/// Must be called inside a tokio runtime.
pub fn init_app(config_override: Option<ChatConfig>) -> Result<App, String> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // Keep the last 7 days of logs
    let _ = logging::cleanup_old_logs();

    let path = db::default_db_path().map_err(|e| e.to_string())?;
    let db = Database::open(&path).map_err(|e| e.to_string())?;
    init_app_with_db(db, config_override)
}

/// Same as `init_app` over an already opened database
pub fn init_app_with_db(db: Database, config_override: Option<ChatConfig>) -> Result<App, String> {
    let db = Arc::new(db);
    let config = match config_override {
        Some(config) => config.sanitized(),
        None => ChatConfig::load(&db),
    };

    let store = SessionStore::load(Box::new(db.clone()), &config.session_key);
    let cancel = CancellationToken::new();

    let client = MetricsClient::new(&config.metrics_endpoint, config.request_timeout()).map_err(|e| e.to_string())?;
    let (metrics_rx, metrics_task) =
        metrics::spawn_metrics_poller(client, config.metrics_poll_interval(), cancel.child_token());

    let trades = Arc::new(TradeFeed::seeded(chrono::Utc::now()));
    let trades_task = trades::spawn_trade_feed(
        trades.clone(),
        Duration::from_secs(config.trade_interval_min_secs),
        Duration::from_secs(config.trade_interval_max_secs),
        config.rng_seed,
        cancel.child_token(),
    );

    let engine = Arc::new(ChatEngine::new(config.clone(), store, metrics_rx, cancel.child_token()));

    logging::log_session(Some(engine.session_id()), &format!(
        "App initialized with {} messages in history",
        engine.history().len()
    ));

    Ok(App {
        config,
        db,
        engine,
        trades,
        cancel,
        tasks: Mutex::new(vec![metrics_task, trades_task]),
    })
}

// ============ Commands ============

pub async fn send_message(app: &App, text: &str) -> Result<ChatMessage, String> {
    app.engine.send_message(text).await.map_err(|e| e.to_string())
}

pub fn get_chat_history(app: &App) -> Vec<ChatMessage> {
    app.engine.history()
}

pub fn reset_chat(app: &App) -> Result<(), String> {
    if app.cancel.is_cancelled() {
        return Err("App is shut down".to_string());
    }
    app.engine.reset_chat();
    Ok(())
}

pub fn get_token_metrics(app: &App) -> TokenMetrics {
    app.engine.latest_metrics()
}

pub async fn get_nft_listings(app: &App) -> Vec<NftListing> {
    nft::get_nfts(&app.cancel).await
}

pub fn get_recent_trades(app: &App) -> Vec<Trade> {
    app.trades.recent()
}

pub fn save_config(app: &App, config: &ChatConfig) -> Result<(), String> {
    config.save(&app.db).map_err(|e| e.to_string())
}

/// Cancel every timer and pending reply, then wait for the background tasks to stop
pub async fn shutdown(app: &App) {
    app.engine.dispose();
    app.cancel.cancel();

    let tasks: Vec<JoinHandle<()>> = app
        .tasks
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .drain(..)
        .collect();
    for task in tasks {
        if let Err(e) = task.await {
            logging::log_error(None, &format!("Background task ended abnormally: {}", e));
        }
    }
    logging::log_session(Some(app.engine.session_id()), "App shut down");
}

pub fn run() {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return;
        }
    };

    runtime.block_on(async {
        let app = match init_app(None) {
            Ok(app) => app,
            Err(e) => {
                eprintln!("Failed to start SewerKing: {}", e);
                return;
            }
        };

        logging::set_console_output(false);
        shell::run_shell(&app).await;
        shutdown(&app).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use session::Role;

    fn offline_config() -> ChatConfig {
        ChatConfig {
            typing_base_delay_ms: 1,
            typing_jitter_ms: 0,
            network_delay_min_ms: 1,
            network_delay_max_ms: 2,
            metrics_endpoint: "http://127.0.0.1:9/pairs".to_string(),
            request_timeout_secs: 1,
            rng_seed: Some(21),
            ..ChatConfig::default()
        }
    }

    #[tokio::test]
    async fn test_commands_round_trip() {
        let app = init_app_with_db(Database::open_in_memory().unwrap(), Some(offline_config())).unwrap();

        assert_eq!(get_chat_history(&app).len(), 1);
        let reply = send_message(&app, "how do i buy?").await.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.contains("jup.ag"));
        assert_eq!(get_chat_history(&app).len(), 3);

        assert_eq!(get_nft_listings(&app).await.len(), 6);
        assert!(get_recent_trades(&app).len() >= 3);
        assert!(get_token_metrics(&app).is_valid());

        reset_chat(&app).unwrap();
        assert_eq!(get_chat_history(&app).len(), 1);

        shutdown(&app).await;
    }

    #[tokio::test]
    async fn test_history_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sewerking.db");

        let app = init_app_with_db(Database::open(&path).unwrap(), Some(offline_config())).unwrap();
        send_message(&app, "gm").await.unwrap();
        let before = get_chat_history(&app);
        shutdown(&app).await;

        let app = init_app_with_db(Database::open(&path).unwrap(), Some(offline_config())).unwrap();
        assert_eq!(get_chat_history(&app), before);
        shutdown(&app).await;
    }

    #[tokio::test]
    async fn test_config_override_is_not_persisted_but_save_is() {
        let db = Database::open_in_memory().unwrap();
        let app = init_app_with_db(db, Some(offline_config())).unwrap();

        save_config(&app, app.config()).unwrap();
        assert_eq!(ChatConfig::load(&app.db), *app.config());
        shutdown(&app).await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_everything() {
        let app = init_app_with_db(Database::open_in_memory().unwrap(), Some(offline_config())).unwrap();
        shutdown(&app).await;

        assert!(app.engine().is_disposed());
        assert!(send_message(&app, "still there?").await.is_err());
        assert!(reset_chat(&app).is_err());
        assert!(get_nft_listings(&app).await.is_empty());
    }
}
