// SPDX-License-Identifier: Apache-2.0

//! The receipt status machine as a pure function: `(receipt, event, now)`
//! yields a [`TransitionPlan`] describing the new status, the history entry
//! to append and the side effects the store must apply atomically. Nothing
//! here touches storage, so a failed persist leaves no partial mutation.

use crate::receipt::{Receipt, ReceiptStatus, StatusChange};
use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};

pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEvent {
    /// Buyer submitted payment proof and the relay accepted it.
    ProofUploaded,
    /// Time-driven expiry (sweeper). Strictly forward-only: rejected on
    /// terminal receipts.
    Expire { note: Option<String> },
    /// Admin-driven change. May move between any two states; always recorded.
    AdminOverride {
        status: ReceiptStatus,
        changed_by: Option<String>,
        note: Option<String>,
    },
}

/// What the store must persist for one transition. `release_numbers` is set
/// only when the receipt enters `expired` — the single transition that gives
/// claimed numbers back to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub new_status: ReceiptStatus,
    pub entry: StatusChange,
    pub set_paid_at: Option<DateTime<Utc>>,
    pub release_numbers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Proof can only be uploaded while the receipt waits for payment.
    NotAwaitingPayment { current: ReceiptStatus },
    /// System-driven expiry of an already-terminal receipt.
    AlreadyTerminal { current: ReceiptStatus },
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAwaitingPayment { current } => {
                write!(f, "proof already uploaded or processed (status: {current})")
            }
            Self::AlreadyTerminal { current } => {
                write!(f, "receipt is already in terminal status {current}")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

pub fn plan_transition(
    receipt: &Receipt,
    event: TransitionEvent,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, TransitionError> {
    let (new_status, changed_by, note) = match event {
        TransitionEvent::ProofUploaded => {
            if receipt.status != ReceiptStatus::WaitingPayment {
                return Err(TransitionError::NotAwaitingPayment {
                    current: receipt.status,
                });
            }
            (
                ReceiptStatus::ReceiptUploaded,
                Some(SYSTEM_ACTOR.to_string()),
                Some("payment proof uploaded by buyer".to_string()),
            )
        }
        TransitionEvent::Expire { note } => {
            if receipt.status.is_terminal() {
                return Err(TransitionError::AlreadyTerminal {
                    current: receipt.status,
                });
            }
            (
                ReceiptStatus::Expired,
                Some(SYSTEM_ACTOR.to_string()),
                note,
            )
        }
        TransitionEvent::AdminOverride {
            status,
            changed_by,
            note,
        } => (status, changed_by, note),
    };

    let set_paid_at = if new_status == ReceiptStatus::Paid && receipt.paid_at.is_none() {
        Some(now)
    } else {
        None
    };

    Ok(TransitionPlan {
        new_status,
        entry: StatusChange {
            status: new_status,
            changed_at: now,
            changed_by,
            note,
        },
        set_paid_at,
        release_numbers: new_status == ReceiptStatus::Expired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuyerContact, ClaimedNumber, ContactChannel, RaffleId, ReceiptId};
    use chrono::Duration;

    fn receipt(status: ReceiptStatus, paid_at: Option<DateTime<Utc>>) -> Receipt {
        let now = Utc::now();
        Receipt {
            receipt_id: ReceiptId::parse("7KM2N9PQRSTUV").expect("id"),
            raffle_id: RaffleId::parse("r1").expect("id"),
            status,
            numbers: vec![ClaimedNumber {
                number: 5,
                page_number: 1,
            }],
            contact: BuyerContact {
                x_handle: Some("@buyer".to_string()),
                instagram_handle: None,
                whatsapp: None,
                preferred_contact: ContactChannel::X,
            },
            total_amount_cents: 1000,
            created_at: now,
            expires_at: now + Duration::minutes(30),
            paid_at,
            status_history: vec![StatusChange {
                status: ReceiptStatus::WaitingPayment,
                changed_at: now,
                changed_by: None,
                note: None,
            }],
        }
    }

    #[test]
    fn proof_upload_only_from_waiting_payment() {
        let now = Utc::now();
        let plan = plan_transition(
            &receipt(ReceiptStatus::WaitingPayment, None),
            TransitionEvent::ProofUploaded,
            now,
        )
        .expect("legal transition");
        assert_eq!(plan.new_status, ReceiptStatus::ReceiptUploaded);
        assert!(!plan.release_numbers);
        assert!(plan.set_paid_at.is_none());

        for status in [
            ReceiptStatus::ReceiptUploaded,
            ReceiptStatus::Paid,
            ReceiptStatus::Expired,
        ] {
            assert_eq!(
                plan_transition(&receipt(status, None), TransitionEvent::ProofUploaded, now),
                Err(TransitionError::NotAwaitingPayment { current: status })
            );
        }
    }

    #[test]
    fn system_expiry_rejected_on_terminal_receipts_and_releases_otherwise() {
        let now = Utc::now();
        for status in [ReceiptStatus::WaitingPayment, ReceiptStatus::ReceiptUploaded] {
            let plan = plan_transition(
                &receipt(status, None),
                TransitionEvent::Expire {
                    note: Some("automatic timeout".to_string()),
                },
                now,
            )
            .expect("non-terminal expiry");
            assert_eq!(plan.new_status, ReceiptStatus::Expired);
            assert!(plan.release_numbers);
            assert_eq!(plan.entry.changed_by.as_deref(), Some(SYSTEM_ACTOR));
        }
        assert!(plan_transition(
            &receipt(ReceiptStatus::Paid, Some(now)),
            TransitionEvent::Expire { note: None },
            now,
        )
        .is_err());
    }

    #[test]
    fn paid_at_is_set_once_and_never_reset() {
        let now = Utc::now();
        let first = plan_transition(
            &receipt(ReceiptStatus::ReceiptUploaded, None),
            TransitionEvent::AdminOverride {
                status: ReceiptStatus::Paid,
                changed_by: Some("admin".to_string()),
                note: None,
            },
            now,
        )
        .expect("admin paid");
        assert_eq!(first.set_paid_at, Some(now));

        let earlier = now - Duration::minutes(5);
        let again = plan_transition(
            &receipt(ReceiptStatus::Paid, Some(earlier)),
            TransitionEvent::AdminOverride {
                status: ReceiptStatus::Paid,
                changed_by: Some("admin".to_string()),
                note: None,
            },
            now,
        )
        .expect("paid to paid is a legal admin override");
        assert!(again.set_paid_at.is_none());
    }

    #[test]
    fn admin_override_moves_between_any_states_and_always_appends() {
        let now = Utc::now();
        let plan = plan_transition(
            &receipt(ReceiptStatus::Expired, None),
            TransitionEvent::AdminOverride {
                status: ReceiptStatus::WaitingPayment,
                changed_by: Some("admin".to_string()),
                note: Some("buyer paid late, reinstating".to_string()),
            },
            now,
        )
        .expect("override out of terminal state");
        assert_eq!(plan.new_status, ReceiptStatus::WaitingPayment);
        assert!(!plan.release_numbers);
        assert_eq!(plan.entry.changed_by.as_deref(), Some("admin"));
    }
}
