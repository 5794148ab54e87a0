#![forbid(unsafe_code)]

use rifa_server::{
    build_router, spawn_event_logger, spawn_sweeper, validate_startup_config, ApiConfig, AppState,
    DisabledRelay, ProofRelay, SweeperConfig, TelegramRelay,
};
use rifa_store::RaffleStore;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("RIFA_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_relay() -> Arc<dyn ProofRelay> {
    let bot_token = env::var("RIFA_TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.is_empty());
    let chat_id = env::var("RIFA_TELEGRAM_CHAT_ID").ok().filter(|v| !v.is_empty());
    match (bot_token, chat_id) {
        (Some(token), Some(chat)) => Arc::new(TelegramRelay::new(token, chat)),
        _ => {
            warn!("telegram relay not configured; proof uploads will be rejected");
            Arc::new(DisabledRelay)
        }
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env::var("RIFA_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let db_path = PathBuf::from(
        env::var("RIFA_DB_PATH").unwrap_or_else(|_| "artifacts/rifa.sqlite".to_string()),
    );

    let api_cfg = ApiConfig {
        max_body_bytes: env_usize("RIFA_MAX_BODY_BYTES", 2 * 1024 * 1024),
        availability_ttl: env_duration_ms("RIFA_AVAILABILITY_TTL_MS", 5000),
        event_channel_capacity: env_usize("RIFA_EVENT_CHANNEL_CAPACITY", 256),
    };
    let sweeper_cfg = SweeperConfig {
        interval: env_duration_ms("RIFA_SWEEP_INTERVAL_MS", 300_000),
        enabled: env_bool("RIFA_SWEEP_ENABLED", true),
    };
    validate_startup_config(&api_cfg, &sweeper_cfg)?;

    let store = RaffleStore::open(&db_path).map_err(|e| format!("failed to open store: {e}"))?;
    let state = AppState::with_config(store.clone(), build_relay(), api_cfg);

    spawn_event_logger(&state.events);
    if sweeper_cfg.enabled {
        spawn_sweeper(store, sweeper_cfg.interval);
        info!(interval_ms = sweeper_cfg.interval.as_millis() as u64, "expiration sweeper started");
    } else {
        warn!("expiration sweeper disabled; overdue receipts will not be released");
    }

    let app = build_router(state);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!("rifa-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|e| format!("server failed: {e}"))
}
