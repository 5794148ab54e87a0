use crate::http::{
    api_error_response, propagated_request_id, store_error_response, with_request_id,
};
use crate::relay::ProofUpload;
use crate::{with_store, AppState};
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use rifa_api::{receipt_to_dto, ApiError, UpdateReceiptStatusRequest};
use rifa_model::{plan_transition, Receipt, ReceiptId, TransitionEvent};
use tracing::{info, warn};

fn parse_receipt_id(raw: &str) -> Result<ReceiptId, Response> {
    ReceiptId::parse(raw).map_err(|e| {
        api_error_response(StatusCode::BAD_REQUEST, ApiError::invalid_input(e.to_string()))
    })
}

pub(crate) async fn get_receipt_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(receipt_id): Path<String>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let receipt_id = match parse_receipt_id(&receipt_id) {
        Ok(v) => v,
        Err(resp) => return with_request_id(resp, &request_id),
    };
    match with_store(&state.store, move |s| s.get_receipt(&receipt_id)).await {
        Ok(receipt) => with_request_id(Json(receipt_to_dto(&receipt)).into_response(), &request_id),
        Err(err) => with_request_id(store_error_response(&err), &request_id),
    }
}

pub(crate) async fn receipts_for_raffle_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let raffle_id = match rifa_model::RaffleId::parse(&id) {
        Ok(v) => v,
        Err(err) => {
            return with_request_id(
                api_error_response(
                    StatusCode::BAD_REQUEST,
                    ApiError::invalid_input(err.to_string()),
                ),
                &request_id,
            )
        }
    };
    let result = with_store(&state.store, move |s| {
        // Listing an unknown raffle is a 404, not an empty list.
        s.get_raffle(&raffle_id)?;
        s.receipts_for_raffle(&raffle_id)
    })
    .await;
    match result {
        Ok(receipts) => with_request_id(
            Json(receipts.iter().map(receipt_to_dto).collect::<Vec<_>>()).into_response(),
            &request_id,
        ),
        Err(err) => with_request_id(store_error_response(&err), &request_id),
    }
}

/// Accepts the buyer's payment proof, relays it to the external channel and
/// only then moves the receipt to `receipt_uploaded`. A relay failure leaves
/// the receipt untouched so the buyer can retry.
pub(crate) async fn upload_proof_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(receipt_id): Path<String>,
    multipart: Multipart,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let receipt_id = match parse_receipt_id(&receipt_id) {
        Ok(v) => v,
        Err(resp) => return with_request_id(resp, &request_id),
    };

    let lookup_id = receipt_id.clone();
    let result = with_store(&state.store, move |s| {
        let receipt = s.get_receipt(&lookup_id)?;
        let raffle_title = s
            .get_raffle(&receipt.raffle_id)
            .map(|r| r.title)
            .unwrap_or_else(|_| "unknown raffle".to_string());
        Ok((receipt, raffle_title))
    })
    .await;
    let (receipt, raffle_title) = match result {
        Ok(v) => v,
        Err(err) => return with_request_id(store_error_response(&err), &request_id),
    };

    // Status gate first: a paid or expired receipt must not trigger any
    // relay call.
    let now = Utc::now();
    let plan = match plan_transition(&receipt, TransitionEvent::ProofUploaded, now) {
        Ok(plan) => plan,
        Err(err) => {
            return with_request_id(
                api_error_response(StatusCode::BAD_REQUEST, ApiError::invalid_input(err.to_string())),
                &request_id,
            )
        }
    };

    let upload = match read_proof_field(multipart, &receipt, &raffle_title).await {
        Ok(upload) => upload,
        Err(resp) => return with_request_id(resp, &request_id),
    };

    if let Err(err) = state.relay.send_proof(upload).await {
        warn!(receipt_id = %receipt.receipt_id, error = %err, "proof relay failed");
        return with_request_id(
            api_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::upstream_unavailable("failed to relay payment proof"),
            ),
            &request_id,
        );
    }

    let commit_id = receipt.receipt_id.clone();
    match with_store(&state.store, move |s| s.commit_transition(&commit_id, &plan)).await {
        Ok(updated) => {
            info!(receipt_id = %updated.receipt_id, "payment proof relayed, receipt marked uploaded");
            with_request_id(Json(receipt_to_dto(&updated)).into_response(), &request_id)
        }
        Err(err) => with_request_id(store_error_response(&err), &request_id),
    }
}

async fn read_proof_field(
    mut multipart: Multipart,
    receipt: &Receipt,
    raffle_title: &str,
) -> Result<ProofUpload, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return Err(api_error_response(
                    StatusCode::BAD_REQUEST,
                    ApiError::invalid_input("multipart field 'file' is required"),
                ))
            }
            Err(err) => {
                return Err(api_error_response(
                    StatusCode::BAD_REQUEST,
                    ApiError::invalid_input(format!("malformed multipart body: {err}")),
                ))
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .unwrap_or("payment-proof")
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => {
                return Err(api_error_response(
                    StatusCode::BAD_REQUEST,
                    ApiError::invalid_input(format!("failed to read proof upload: {err}")),
                ))
            }
        };
        return Ok(ProofUpload {
            file_name,
            content_type,
            bytes,
            caption: proof_caption(receipt, raffle_title),
        });
    }
}

fn proof_caption(receipt: &Receipt, raffle_title: &str) -> String {
    format!(
        "Payment proof\nRaffle: {}\nAmount: {}\nBuyer: {}\nContact via: {}\nReceipt: {}",
        raffle_title,
        format_amount(receipt.total_amount_cents),
        receipt.contact.display_handle().unwrap_or("unknown"),
        receipt.contact.preferred_contact,
        receipt.receipt_id,
    )
}

fn format_amount(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

pub(crate) async fn update_receipt_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(receipt_id): Path<String>,
    Json(body): Json<UpdateReceiptStatusRequest>,
) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let receipt_id = match parse_receipt_id(&receipt_id) {
        Ok(v) => v,
        Err(resp) => return with_request_id(resp, &request_id),
    };
    let now = Utc::now();
    let result = with_store(&state.store, move |s| {
        let receipt = s.get_receipt(&receipt_id)?;
        let plan = plan_transition(
            &receipt,
            TransitionEvent::AdminOverride {
                status: body.status,
                changed_by: body.changed_by,
                note: body.note,
            },
            now,
        )
        .map_err(|e| rifa_store::StoreError::Internal(e.to_string()))?;
        s.commit_transition(&receipt.receipt_id, &plan)
    })
    .await;
    match result {
        Ok(updated) => {
            info!(
                receipt_id = %updated.receipt_id,
                status = %updated.status,
                "receipt status updated"
            );
            with_request_id(Json(receipt_to_dto(&updated)).into_response(), &request_id)
        }
        Err(err) => with_request_id(store_error_response(&err), &request_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rifa_model::{BuyerContact, ClaimedNumber, ContactChannel, RaffleId, ReceiptStatus, StatusChange};

    #[test]
    fn caption_names_the_raffle_amount_and_receipt() {
        let now = Utc::now();
        let receipt = Receipt {
            receipt_id: ReceiptId::parse("7KM2N9PQRSTUV").expect("id"),
            raffle_id: RaffleId::parse("r1").expect("id"),
            status: ReceiptStatus::WaitingPayment,
            numbers: vec![ClaimedNumber {
                number: 5,
                page_number: 1,
            }],
            contact: BuyerContact {
                x_handle: None,
                instagram_handle: Some("@buyer".to_string()),
                whatsapp: None,
                preferred_contact: ContactChannel::Instagram,
            },
            total_amount_cents: 2050,
            created_at: now,
            expires_at: now + Duration::minutes(30),
            paid_at: None,
            status_history: vec![StatusChange {
                status: ReceiptStatus::WaitingPayment,
                changed_at: now,
                changed_by: None,
                note: None,
            }],
        };
        let caption = proof_caption(&receipt, "summer raffle");
        assert!(caption.contains("summer raffle"));
        assert!(caption.contains("20.50"));
        assert!(caption.contains("@buyer"));
        assert!(caption.contains("7KM2N9PQRSTUV"));
    }

    #[test]
    fn amounts_format_with_two_decimal_places() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(1000), "10.00");
    }
}
