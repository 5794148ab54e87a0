//! The reservation engine: the one operation that turns a batch of requested
//! numbers into a receipt plus ledger entries, atomically. Two buyers racing
//! for the same number get exactly one success; the loser learns the exact
//! conflicting pair.

use crate::events::{DomainEvent, EventBus};
use chrono::{DateTime, Duration, Utc};
use rifa_model::{
    generate_receipt_id, BuyerContact, ClaimError, ClaimedNumber, RaffleId, Receipt, ReceiptId,
};
use rifa_store::{NewReservation, RaffleStore, StoreError};
use std::fmt::{Display, Formatter};
use tracing::info;

/// Collision retries for the readable id before falling back to a UUID.
const MAX_ID_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub enum ReserveError {
    RaffleNotFound,
    NotSellable(String),
    MissingContact,
    EmptyBatch,
    InvalidClaim(ClaimError),
    Conflict { number: u32, page_number: u32 },
    ReceiptIdTaken { receipt_id: String },
    Store(StoreError),
}

impl Display for ReserveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RaffleNotFound => write!(f, "raffle not found"),
            Self::NotSellable(reason) => write!(f, "{reason}"),
            Self::MissingContact => write!(
                f,
                "at least one contact channel (x, instagram or whatsapp) is required"
            ),
            Self::EmptyBatch => write!(f, "at least one number must be selected"),
            Self::InvalidClaim(err) => write!(f, "{err}"),
            Self::Conflict {
                number,
                page_number,
            } => write!(
                f,
                "number {number} on page {page_number} is already selected"
            ),
            Self::ReceiptIdTaken { receipt_id } => {
                write!(f, "receipt id {receipt_id} is already in use")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ReserveError {}

impl From<StoreError> for ReserveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RaffleNotFound => Self::RaffleNotFound,
            StoreError::RaffleNotSellable => Self::NotSellable(err.to_string()),
            StoreError::Conflict {
                number,
                page_number,
            } => Self::Conflict {
                number,
                page_number,
            },
            StoreError::DuplicateReceiptId { receipt_id } => Self::ReceiptIdTaken { receipt_id },
            other => Self::Store(other),
        }
    }
}

/// Synchronous core, also used directly by tests that drive the engine from
/// plain threads. Validation happens strictly before any mutation; the store
/// transaction is the only step that writes.
pub fn reserve_sync(
    store: &RaffleStore,
    raffle_id: &RaffleId,
    claims: &[ClaimedNumber],
    contact: &BuyerContact,
    requested_receipt_id: Option<ReceiptId>,
    now: DateTime<Utc>,
) -> Result<Receipt, ReserveError> {
    let raffle = store.get_raffle(raffle_id).map_err(ReserveError::from)?;
    let sellable = raffle
        .sellable(now)
        .map_err(|e| ReserveError::NotSellable(e.to_string()))?;

    if !contact.has_contact_channel() {
        return Err(ReserveError::MissingContact);
    }
    if claims.is_empty() {
        return Err(ReserveError::EmptyBatch);
    }
    for claim in claims {
        claim
            .validate(sellable.total_numbers)
            .map_err(ReserveError::InvalidClaim)?;
    }

    let receipt_id = match requested_receipt_id {
        Some(id) => id,
        None => choose_receipt_id(store)?,
    };

    let reservation = NewReservation {
        raffle_id: raffle_id.clone(),
        receipt_id,
        claims: claims.to_vec(),
        contact: contact.clone(),
        total_amount_cents: claims.len() as i64 * sellable.price_cents,
        now,
        expires_at: now + Duration::minutes(i64::from(sellable.expiration_minutes)),
    };
    let receipt = store.create_reservation(&reservation)?;
    info!(
        receipt_id = %receipt.receipt_id,
        raffle_id = %receipt.raffle_id,
        numbers = receipt.numbers.len(),
        "reservation created"
    );
    Ok(receipt)
}

fn choose_receipt_id(store: &RaffleStore) -> Result<ReceiptId, ReserveError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = generate_receipt_id();
        if !store.receipt_exists(&candidate).map_err(ReserveError::Store)? {
            return Ok(candidate);
        }
    }
    // Readability traded for guaranteed uniqueness; the flow never blocks on
    // repeated collisions.
    ReceiptId::parse(&uuid::Uuid::new_v4().to_string())
        .map_err(|e| ReserveError::Store(StoreError::Internal(e.to_string())))
}

/// Async entry point used by the HTTP layer. Emits one `selection:created`
/// event per claimed number after the commit; event delivery is best-effort
/// and cannot fail the reservation.
pub async fn reserve(
    store: RaffleStore,
    events: EventBus,
    raffle_id: RaffleId,
    claims: Vec<ClaimedNumber>,
    contact: BuyerContact,
    requested_receipt_id: Option<ReceiptId>,
) -> Result<Receipt, ReserveError> {
    let now = Utc::now();
    let receipt = tokio::task::spawn_blocking(move || {
        reserve_sync(
            &store,
            &raffle_id,
            &claims,
            &contact,
            requested_receipt_id,
            now,
        )
    })
    .await
    .map_err(|e| ReserveError::Store(StoreError::Internal(format!("reserve task failed: {e}"))))??;

    for claim in &receipt.numbers {
        events.publish(DomainEvent::SelectionCreated {
            raffle_id: receipt.raffle_id.clone(),
            number: claim.number,
            page_number: claim.page_number,
        });
    }
    Ok(receipt)
}
