use crate::{with_store, AppState};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rifa_api::ApiError;
use rifa_store::StoreError;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::error;

pub(crate) mod raffles;
pub(crate) mod receipts;

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> Response {
    match with_store(&state.store, rifa_store::RaffleStore::ping).await {
        Ok(()) => Json(json!({"status": "ready"})).into_response(),
        Err(err) => {
            error!(error = %err, "readiness probe failed");
            api_error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::internal("store unavailable"),
            )
        }
    }
}

pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    (status, Json(json!({"error": err}))).into_response()
}

/// Maps storage failures to the wire taxonomy. Internal details are logged,
/// never echoed to callers.
pub(crate) fn store_error_response(err: &StoreError) -> Response {
    match err {
        StoreError::RaffleNotFound => {
            api_error_response(StatusCode::NOT_FOUND, ApiError::not_found("raffle"))
        }
        StoreError::ReceiptNotFound => {
            api_error_response(StatusCode::NOT_FOUND, ApiError::not_found("receipt"))
        }
        StoreError::RaffleNotSellable => api_error_response(
            StatusCode::BAD_REQUEST,
            ApiError::not_sellable(err.to_string()),
        ),
        StoreError::Conflict {
            number,
            page_number,
        } => api_error_response(StatusCode::CONFLICT, ApiError::conflict(*number, *page_number)),
        StoreError::DuplicateReceiptId { .. } => api_error_response(
            StatusCode::BAD_REQUEST,
            ApiError::invalid_input(err.to_string()),
        ),
        StoreError::Internal(message) => {
            error!(error = %message, "storage failure");
            api_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal("unexpected storage failure"),
            )
        }
    }
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    make_request_id(state)
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub(crate) fn if_none_match(headers: &HeaderMap) -> Option<String> {
    headers
        .get("if-none-match")
        .and_then(|v| v.to_str().ok())
        .map(std::string::ToString::to_string)
}

pub(crate) fn put_cache_headers(headers: &mut HeaderMap, ttl: Duration, etag: &str) {
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
        headers.insert("cache-control", value);
    }
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert("etag", value);
    }
}

pub(crate) fn payload_etag(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("\"{:x}\"", hasher.finalize())
}
