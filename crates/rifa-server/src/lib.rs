#![forbid(unsafe_code)]

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use rifa_store::{RaffleStore, StoreError};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

mod config;
pub mod events;
mod http;
pub mod relay;
pub mod reservation;
pub mod sweeper;

pub use config::{validate_startup_config, ApiConfig, SweeperConfig};
pub use events::{spawn_event_logger, DomainEvent, EventBus};
pub use relay::{DisabledRelay, FakeRelay, ProofRelay, ProofUpload, RelayError, TelegramRelay};
pub use sweeper::{run_sweep_once, spawn_sweeper, SweepOutcome};

pub const CRATE_NAME: &str = "rifa-server";

#[derive(Clone)]
pub struct AppState {
    pub store: RaffleStore,
    pub api: ApiConfig,
    pub relay: Arc<dyn ProofRelay>,
    pub events: EventBus,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: RaffleStore, relay: Arc<dyn ProofRelay>) -> Self {
        Self::with_config(store, relay, ApiConfig::default())
    }

    #[must_use]
    pub fn with_config(store: RaffleStore, relay: Arc<dyn ProofRelay>, api: ApiConfig) -> Self {
        Self {
            store,
            events: EventBus::new(api.event_channel_capacity),
            relay,
            api,
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::healthz_handler))
        .route("/readyz", get(http::readyz_handler))
        .route(
            "/v1/raffles",
            get(http::raffles::list_raffles_handler).post(http::raffles::create_raffle_handler),
        )
        .route(
            "/v1/raffles/:id",
            get(http::raffles::get_raffle_handler).delete(http::raffles::delete_raffle_handler),
        )
        .route(
            "/v1/raffles/:id/status",
            patch(http::raffles::update_raffle_status_handler),
        )
        .route(
            "/v1/raffles/:id/available",
            get(http::raffles::available_numbers_handler),
        )
        .route("/v1/raffles/:id/winner", get(http::raffles::winner_handler))
        .route(
            "/v1/raffles/:id/reserve",
            post(http::raffles::reserve_handler),
        )
        .route(
            "/v1/raffles/:id/receipts",
            get(http::receipts::receipts_for_raffle_handler),
        )
        .route(
            "/v1/receipts/:receipt_id",
            get(http::receipts::get_receipt_handler),
        )
        .route(
            "/v1/receipts/:receipt_id/proof",
            post(http::receipts::upload_proof_handler),
        )
        .route(
            "/v1/receipts/:receipt_id/status",
            patch(http::receipts::update_receipt_status_handler),
        )
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}

/// Store calls are blocking rusqlite work; hop off the async executor.
pub(crate) async fn with_store<T, F>(store: &RaffleStore, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&RaffleStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| StoreError::Internal(format!("storage task failed: {e}")))?
}
