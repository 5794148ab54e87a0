//! Expiration sweeper: a timer-driven background pass that expires overdue
//! receipts and gives their numbers back to the ledger. Each receipt is
//! processed independently; one failure never aborts the rest of the pass.

use chrono::{DateTime, Utc};
use rifa_model::{plan_transition, ReceiptId, TransitionError, TransitionEvent};
use rifa_store::{RaffleStore, StoreError};
use std::time::Duration;
use tracing::{error, info, warn};

pub const AUTO_EXPIRE_NOTE: &str = "automatic timeout";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Receipts matching the non-terminal, past-deadline filter.
    pub matched: usize,
    pub expired: usize,
    /// Receipts that reached a terminal state between scan and commit.
    pub skipped: usize,
    pub failed: usize,
}

/// One sweep pass. Idempotent: the scan filter only matches non-terminal
/// receipts, so a second pass over the same state finds nothing.
pub fn run_sweep_once(store: &RaffleStore, now: DateTime<Utc>) -> SweepOutcome {
    let ids = match store.expired_receipt_ids(now) {
        Ok(ids) => ids,
        Err(err) => {
            error!(error = %err, "expiration scan failed");
            return SweepOutcome::default();
        }
    };

    let mut outcome = SweepOutcome {
        matched: ids.len(),
        ..SweepOutcome::default()
    };
    for receipt_id in ids {
        match expire_one(store, &receipt_id, now) {
            Ok(true) => {
                outcome.expired += 1;
                info!(receipt_id = %receipt_id, "receipt expired, numbers released");
            }
            Ok(false) => outcome.skipped += 1,
            Err(err) => {
                outcome.failed += 1;
                warn!(receipt_id = %receipt_id, error = %err, "failed to expire receipt");
            }
        }
    }
    outcome
}

fn expire_one(
    store: &RaffleStore,
    receipt_id: &ReceiptId,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let receipt = store.get_receipt(receipt_id)?;
    match plan_transition(
        &receipt,
        TransitionEvent::Expire {
            note: Some(AUTO_EXPIRE_NOTE.to_string()),
        },
        now,
    ) {
        Ok(plan) => {
            store.commit_transition(receipt_id, &plan)?;
            Ok(true)
        }
        // An admin finalized the receipt between scan and commit.
        Err(TransitionError::AlreadyTerminal { .. }) => Ok(false),
        Err(other) => Err(StoreError::Internal(other.to_string())),
    }
}

pub fn spawn_sweeper(store: RaffleStore, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let store = store.clone();
            match tokio::task::spawn_blocking(move || run_sweep_once(&store, Utc::now())).await {
                Ok(outcome) if outcome.matched > 0 => {
                    info!(
                        matched = outcome.matched,
                        expired = outcome.expired,
                        skipped = outcome.skipped,
                        failed = outcome.failed,
                        "expiration sweep completed"
                    );
                }
                Ok(_) => {}
                Err(err) => error!(error = %err, "expiration sweep task failed"),
            }
        }
    })
}
