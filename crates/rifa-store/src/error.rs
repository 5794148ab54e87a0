// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    RaffleNotFound,
    ReceiptNotFound,
    /// The raffle exists but is closed, waiting, or past its end date.
    RaffleNotSellable,
    /// The ledger already holds a live entry for this pair. Carries the
    /// exact pair so callers can deselect it and retry with the rest.
    Conflict { number: u32, page_number: u32 },
    DuplicateReceiptId { receipt_id: String },
    Internal(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RaffleNotFound => write!(f, "raffle not found"),
            Self::ReceiptNotFound => write!(f, "receipt not found"),
            Self::RaffleNotSellable => write!(f, "raffle is not open for reservations"),
            Self::Conflict {
                number,
                page_number,
            } => write!(
                f,
                "number {number} on page {page_number} is already selected"
            ),
            Self::DuplicateReceiptId { receipt_id } => {
                write!(f, "receipt id {receipt_id} is already in use")
            }
            Self::Internal(message) => write!(f, "storage failure: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
