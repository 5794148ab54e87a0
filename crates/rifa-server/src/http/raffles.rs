use crate::http::{
    api_error_response, if_none_match, payload_etag, propagated_request_id, put_cache_headers,
    store_error_response, with_request_id,
};
use crate::reservation::{self, ReserveError};
use crate::{with_store, AppState};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use rifa_api::{
    raffle_to_dto, winner_to_dto, ApiError, AvailableNumbersDto, CreateRaffleRequest,
    RaffleStatsDto, RaffleSummaryDto, ReserveRequest, ReserveResponse, UpdateRaffleStatusRequest,
};
use rifa_model::{
    AvailablePage, BuyerContact, ClaimedNumber, NewRaffle, RaffleId, RaffleStatus, ReceiptId,
};
use std::collections::HashMap;
use tracing::info;

fn parse_raffle_id(raw: &str) -> Result<RaffleId, Response> {
    RaffleId::parse(raw).map_err(|e| {
        api_error_response(StatusCode::BAD_REQUEST, ApiError::invalid_input(e.to_string()))
    })
}

pub(crate) async fn list_raffles_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let rows = match with_store(&state.store, |s| s.list_raffles()).await {
        Ok(rows) => rows,
        Err(err) => return with_request_id(store_error_response(&err), &request_id),
    };
    let summaries: Vec<RaffleSummaryDto> = rows
        .into_iter()
        .map(|(raffle, taken)| RaffleSummaryDto {
            stats: RaffleStatsDto {
                total: raffle.total_numbers,
                taken,
                available: raffle.total_numbers.saturating_sub(taken),
            },
            raffle: raffle_to_dto(&raffle),
        })
        .collect();
    with_request_id(Json(summaries).into_response(), &request_id)
}

pub(crate) async fn create_raffle_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRaffleRequest>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let new = NewRaffle {
        title: body.title,
        end_date: body.end_date,
        total_numbers: body.total_numbers,
        price_cents: body.price_cents,
        expiration_minutes: body.expiration_minutes,
    };
    if let Err(err) = new.validate() {
        return with_request_id(
            api_error_response(StatusCode::BAD_REQUEST, ApiError::invalid_input(err.to_string())),
            &request_id,
        );
    }
    let now = Utc::now();
    match with_store(&state.store, move |s| s.create_raffle(&new, now)).await {
        Ok(raffle) => {
            info!(raffle_id = %raffle.id, "raffle created");
            with_request_id(
                (StatusCode::CREATED, Json(raffle_to_dto(&raffle))).into_response(),
                &request_id,
            )
        }
        Err(err) => with_request_id(store_error_response(&err), &request_id),
    }
}

pub(crate) async fn get_raffle_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let raffle_id = match parse_raffle_id(&id) {
        Ok(v) => v,
        Err(resp) => return with_request_id(resp, &request_id),
    };
    match with_store(&state.store, move |s| s.get_raffle(&raffle_id)).await {
        Ok(raffle) => with_request_id(Json(raffle_to_dto(&raffle)).into_response(), &request_id),
        Err(err) => with_request_id(store_error_response(&err), &request_id),
    }
}

pub(crate) async fn update_raffle_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateRaffleStatusRequest>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let raffle_id = match parse_raffle_id(&id) {
        Ok(v) => v,
        Err(resp) => return with_request_id(resp, &request_id),
    };
    if body.status == RaffleStatus::Closed && body.winning_receipt_id.is_none() {
        return with_request_id(
            api_error_response(
                StatusCode::BAD_REQUEST,
                ApiError::invalid_input("winning_receipt_id is required when closing a raffle"),
            ),
            &request_id,
        );
    }
    let winner = match body.winning_receipt_id.as_deref().map(ReceiptId::parse) {
        Some(Err(err)) => {
            return with_request_id(
                api_error_response(
                    StatusCode::BAD_REQUEST,
                    ApiError::invalid_input(err.to_string()),
                ),
                &request_id,
            )
        }
        Some(Ok(id)) => Some(id),
        None => None,
    };
    let status = body.status;
    match with_store(&state.store, move |s| {
        s.set_raffle_status(&raffle_id, status, winner.as_ref())
    })
    .await
    {
        Ok(raffle) => {
            info!(raffle_id = %raffle.id, status = %raffle.status, "raffle status updated");
            with_request_id(Json(raffle_to_dto(&raffle)).into_response(), &request_id)
        }
        Err(err) => with_request_id(store_error_response(&err), &request_id),
    }
}

pub(crate) async fn delete_raffle_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let raffle_id = match parse_raffle_id(&id) {
        Ok(v) => v,
        Err(resp) => return with_request_id(resp, &request_id),
    };
    let log_id = raffle_id.clone();
    match with_store(&state.store, move |s| s.delete_raffle(&raffle_id)).await {
        Ok(()) => {
            info!(raffle_id = %log_id, "raffle deleted, ledger entries released");
            with_request_id(
                Json(serde_json::json!({"deleted": true})).into_response(),
                &request_id,
            )
        }
        Err(err) => with_request_id(store_error_response(&err), &request_id),
    }
}

pub(crate) async fn winner_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let raffle_id = match parse_raffle_id(&id) {
        Ok(v) => v,
        Err(resp) => return with_request_id(resp, &request_id),
    };
    let result = with_store(&state.store, move |s| {
        let raffle = s.get_raffle(&raffle_id)?;
        Ok(match raffle.winning_receipt_id {
            Some(winner) => Some(s.get_receipt(&winner)?),
            None => None,
        })
    })
    .await;
    match result {
        Ok(Some(receipt)) => {
            with_request_id(Json(winner_to_dto(&receipt)).into_response(), &request_id)
        }
        Ok(None) => with_request_id(
            api_error_response(
                StatusCode::NOT_FOUND,
                ApiError::not_found("winner for this raffle"),
            ),
            &request_id,
        ),
        Err(err) => with_request_id(store_error_response(&err), &request_id),
    }
}

pub(crate) async fn available_numbers_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let raffle_id = match parse_raffle_id(&id) {
        Ok(v) => v,
        Err(resp) => return with_request_id(resp, &request_id),
    };
    let page = match params.get("page").map_or(Ok(1), |raw| raw.parse::<u32>()) {
        Ok(page) => page,
        Err(_) => {
            return with_request_id(
                api_error_response(
                    StatusCode::BAD_REQUEST,
                    ApiError::invalid_input("page must be a positive integer"),
                ),
                &request_id,
            )
        }
    };

    let result = with_store(&state.store, move |s| {
        let raffle = s.get_raffle(&raffle_id)?;
        let taken = s.taken_numbers(&raffle.id, page)?;
        Ok((raffle, taken))
    })
    .await;
    let (raffle, taken) = match result {
        Ok(v) => v,
        Err(err) => return with_request_id(store_error_response(&err), &request_id),
    };

    let Some(available) = AvailablePage::compute(page, raffle.total_numbers, taken) else {
        return with_request_id(
            api_error_response(
                StatusCode::BAD_REQUEST,
                ApiError::invalid_input(format!("invalid page number: {page}")),
            ),
            &request_id,
        );
    };
    let dto = AvailableNumbersDto {
        page: available.page,
        total_pages: available.total_pages,
        start_number: available.start_number,
        end_number: available.end_number,
        available_numbers: available.available_numbers,
        taken_numbers: available.taken_numbers,
    };
    let body = match serde_json::to_vec(&dto) {
        Ok(bytes) => bytes,
        Err(err) => {
            return with_request_id(
                api_error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::internal(format!("serialization failed: {err}")),
                ),
                &request_id,
            )
        }
    };
    let etag = payload_etag(&body);
    if if_none_match(&headers).as_deref() == Some(etag.as_str()) {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        put_cache_headers(response.headers_mut(), state.api.availability_ttl, &etag);
        return with_request_id(response, &request_id);
    }
    let mut response = Json(dto).into_response();
    put_cache_headers(response.headers_mut(), state.api.availability_ttl, &etag);
    with_request_id(response, &request_id)
}

pub(crate) async fn reserve_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReserveRequest>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let raffle_id = match parse_raffle_id(&id) {
        Ok(v) => v,
        Err(resp) => return with_request_id(resp, &request_id),
    };
    let requested_receipt_id = match body.receipt_id.as_deref().map(ReceiptId::parse) {
        Some(Err(err)) => {
            return with_request_id(
                api_error_response(
                    StatusCode::BAD_REQUEST,
                    ApiError::invalid_input(err.to_string()),
                ),
                &request_id,
            )
        }
        Some(Ok(id)) => Some(id),
        None => None,
    };
    let claims: Vec<ClaimedNumber> = body.numbers.into_iter().map(Into::into).collect();
    let contact = BuyerContact {
        x_handle: body.contact.x_handle,
        instagram_handle: body.contact.instagram_handle,
        whatsapp: body.contact.whatsapp,
        preferred_contact: body.contact.preferred_contact,
    };

    match reservation::reserve(
        state.store.clone(),
        state.events.clone(),
        raffle_id,
        claims,
        contact,
        requested_receipt_id,
    )
    .await
    {
        Ok(receipt) => with_request_id(
            (
                StatusCode::CREATED,
                Json(ReserveResponse {
                    receipt_id: receipt.receipt_id.as_str().to_string(),
                }),
            )
                .into_response(),
            &request_id,
        ),
        Err(err) => with_request_id(reserve_error_response(&err), &request_id),
    }
}

fn reserve_error_response(err: &ReserveError) -> Response {
    match err {
        ReserveError::RaffleNotFound => {
            api_error_response(StatusCode::NOT_FOUND, ApiError::not_found("raffle"))
        }
        ReserveError::NotSellable(reason) => {
            api_error_response(StatusCode::BAD_REQUEST, ApiError::not_sellable(reason.clone()))
        }
        ReserveError::MissingContact | ReserveError::EmptyBatch => {
            api_error_response(StatusCode::BAD_REQUEST, ApiError::invalid_input(err.to_string()))
        }
        ReserveError::InvalidClaim(claim_err) => api_error_response(
            StatusCode::BAD_REQUEST,
            ApiError::invalid_input(claim_err.to_string()),
        ),
        ReserveError::Conflict {
            number,
            page_number,
        } => api_error_response(StatusCode::CONFLICT, ApiError::conflict(*number, *page_number)),
        ReserveError::ReceiptIdTaken { .. } => {
            api_error_response(StatusCode::BAD_REQUEST, ApiError::invalid_input(err.to_string()))
        }
        ReserveError::Store(store_err) => store_error_response(store_err),
    }
}
