// SPDX-License-Identifier: Apache-2.0

use crate::contact::BuyerContact;
use crate::ids::{RaffleId, ReceiptId, ValidationError};
use crate::numbers::ClaimedNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Canonical receipt lifecycle. `waiting_payment` is the entry state;
/// `paid` and `expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    WaitingPayment,
    ReceiptUploaded,
    Paid,
    Expired,
}

impl ReceiptStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitingPayment => "waiting_payment",
            Self::ReceiptUploaded => "receipt_uploaded",
            Self::Paid => "paid",
            Self::Expired => "expired",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "waiting_payment" => Ok(Self::WaitingPayment),
            "receipt_uploaded" => Ok(Self::ReceiptUploaded),
            "paid" => Ok(Self::Paid),
            "expired" => Ok(Self::Expired),
            other => Err(ValidationError(format!("unknown receipt status: {other}"))),
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Expired)
    }
}

impl Display for ReceiptStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only history entry. Entries are never mutated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusChange {
    pub status: ReceiptStatus,
    pub changed_at: DateTime<Utc>,
    #[serde(default)]
    pub changed_by: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Immutable receipt value. Loaded from the store, transitioned through
/// [`crate::plan_transition`], then persisted — transitions never mutate a
/// receipt in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub receipt_id: ReceiptId,
    pub raffle_id: RaffleId,
    pub status: ReceiptStatus,
    pub numbers: Vec<ClaimedNumber>,
    pub contact: BuyerContact,
    pub total_amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub status_history: Vec<StatusChange>,
}

impl Receipt {
    #[must_use]
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_paid_and_expired() {
        assert!(!ReceiptStatus::WaitingPayment.is_terminal());
        assert!(!ReceiptStatus::ReceiptUploaded.is_terminal());
        assert!(ReceiptStatus::Paid.is_terminal());
        assert!(ReceiptStatus::Expired.is_terminal());
    }

    #[test]
    fn status_wire_names_round_trip() {
        for status in [
            ReceiptStatus::WaitingPayment,
            ReceiptStatus::ReceiptUploaded,
            ReceiptStatus::Paid,
            ReceiptStatus::Expired,
        ] {
            assert_eq!(ReceiptStatus::parse(status.as_str()), Ok(status));
        }
        assert!(ReceiptStatus::parse("created").is_err());
    }
}
