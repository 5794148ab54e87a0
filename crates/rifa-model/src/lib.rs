// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub const CRATE_NAME: &str = "rifa-model";

mod contact;
mod ids;
mod numbers;
mod raffle;
mod receipt;
mod receipt_id;
mod transition;

pub use contact::{BuyerContact, ContactChannel};
pub use ids::{RaffleId, ReceiptId, ValidationError};
pub use numbers::{
    page_for, page_number_range, total_pages, AvailablePage, ClaimError, ClaimedNumber, PAGE_SIZE,
};
pub use raffle::{NewRaffle, Raffle, RaffleStatus, SellabilityError, SellableRaffle};
pub use receipt::{Receipt, ReceiptStatus, StatusChange};
pub use receipt_id::{generate_receipt_id, RECEIPT_ID_ALPHABET, RECEIPT_ID_LEN};
pub use transition::{plan_transition, TransitionError, TransitionEvent, TransitionPlan};

/// Minimum ticket count a raffle may be created with. One full page.
pub const MIN_TOTAL_NUMBERS: u32 = 100;
