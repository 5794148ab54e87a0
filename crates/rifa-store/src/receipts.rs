// SPDX-License-Identifier: Apache-2.0

use crate::error::{is_constraint_violation, StoreError};
use crate::raffles::load_raffle;
use crate::{fmt_ts, parse_ts, RaffleStore};
use chrono::{DateTime, Utc};
use rifa_model::{
    BuyerContact, ClaimedNumber, ContactChannel, RaffleId, Receipt, ReceiptId, ReceiptStatus,
    StatusChange, TransitionPlan,
};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Input for the one atomic write of the reservation flow. The caller has
/// already validated claims against the raffle's range and checked the
/// raffle's sellability; both are re-checked here inside the transaction so
/// a raffle closed mid-request cannot take on new claims.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub raffle_id: RaffleId,
    pub receipt_id: ReceiptId,
    pub claims: Vec<ClaimedNumber>,
    pub contact: BuyerContact,
    pub total_amount_cents: i64,
    pub now: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RaffleStore {
    pub fn receipt_exists(&self, receipt_id: &ReceiptId) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM receipts WHERE receipt_id = ?1",
            params![receipt_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All-or-nothing claim of a batch plus receipt creation. Any conflicting
    /// pair aborts the whole transaction: no receipt, no ledger rows. The
    /// losing writer of a race on the same pair is rejected by the UNIQUE
    /// constraint, and the offending pair is surfaced to the caller.
    pub fn create_reservation(&self, new: &NewReservation) -> Result<Receipt, StoreError> {
        let mut guard = self.lock_conn()?;
        let conn = &mut *guard;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raffle = load_raffle(&tx, &new.raffle_id)?;
        if raffle.sellable(new.now).is_err() {
            return Err(StoreError::RaffleNotSellable);
        }

        if let Err(err) = tx.execute(
            "INSERT INTO receipts (receipt_id, raffle_id, status, x_handle, instagram_handle, \
             whatsapp, preferred_contact, total_amount_cents, created_at, expires_at, paid_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)",
            params![
                new.receipt_id.as_str(),
                new.raffle_id.as_str(),
                ReceiptStatus::WaitingPayment.as_str(),
                new.contact.x_handle,
                new.contact.instagram_handle,
                new.contact.whatsapp,
                new.contact.preferred_contact.as_str(),
                new.total_amount_cents,
                fmt_ts(new.now),
                fmt_ts(new.expires_at),
            ],
        ) {
            if is_constraint_violation(&err) {
                return Err(StoreError::DuplicateReceiptId {
                    receipt_id: new.receipt_id.as_str().to_string(),
                });
            }
            return Err(err.into());
        }

        tx.execute(
            "INSERT INTO receipt_status_history (receipt_id, status, changed_at, changed_by, note) \
             VALUES (?1, ?2, ?3, NULL, NULL)",
            params![
                new.receipt_id.as_str(),
                ReceiptStatus::WaitingPayment.as_str(),
                fmt_ts(new.now),
            ],
        )?;

        for (position, claim) in new.claims.iter().enumerate() {
            tx.execute(
                "INSERT INTO receipt_numbers (receipt_id, position, number, page_number) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    new.receipt_id.as_str(),
                    position as u32,
                    claim.number,
                    claim.page_number,
                ],
            )?;
        }

        for claim in &new.claims {
            if let Err(err) = tx.execute(
                "INSERT INTO selections (raffle_id, receipt_id, number, page_number, x_handle, \
                 instagram_handle, whatsapp, preferred_contact, selected_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    new.raffle_id.as_str(),
                    new.receipt_id.as_str(),
                    claim.number,
                    claim.page_number,
                    new.contact.x_handle,
                    new.contact.instagram_handle,
                    new.contact.whatsapp,
                    new.contact.preferred_contact.as_str(),
                    fmt_ts(new.now),
                ],
            ) {
                // Dropping the transaction rolls everything back, including
                // in-batch duplicates conflicting with themselves.
                if is_constraint_violation(&err) {
                    return Err(StoreError::Conflict {
                        number: claim.number,
                        page_number: claim.page_number,
                    });
                }
                return Err(err.into());
            }
        }

        tx.commit()?;
        load_receipt(&guard, &new.receipt_id)
    }

    pub fn get_receipt(&self, receipt_id: &ReceiptId) -> Result<Receipt, StoreError> {
        let conn = self.lock_conn()?;
        load_receipt(&conn, receipt_id)
    }

    /// Receipts for one raffle, newest first.
    pub fn receipts_for_raffle(&self, raffle_id: &RaffleId) -> Result<Vec<Receipt>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT receipt_id FROM receipts WHERE raffle_id = ?1 ORDER BY created_at DESC",
        )?;
        let ids = stmt.query_map(params![raffle_id.as_str()], |row| {
            row.get::<_, String>(0)
        })?;
        let mut receipts = Vec::new();
        for id in ids {
            let id = id?;
            let receipt_id =
                ReceiptId::parse(&id).map_err(|e| StoreError::Internal(e.to_string()))?;
            receipts.push(load_receipt(&conn, &receipt_id)?);
        }
        Ok(receipts)
    }

    /// Non-terminal receipts past their deadline — the sweeper's work list.
    /// The filter makes the sweep idempotent: an expired receipt never
    /// matches again.
    pub fn expired_receipt_ids(&self, now: DateTime<Utc>) -> Result<Vec<ReceiptId>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT receipt_id FROM receipts \
             WHERE status IN (?1, ?2) AND expires_at <= ?3 ORDER BY expires_at",
        )?;
        let rows = stmt.query_map(
            params![
                ReceiptStatus::WaitingPayment.as_str(),
                ReceiptStatus::ReceiptUploaded.as_str(),
                fmt_ts(now),
            ],
            |row| row.get::<_, String>(0),
        )?;
        let mut ids = Vec::new();
        for raw in rows {
            ids.push(ReceiptId::parse(&raw?).map_err(|e| StoreError::Internal(e.to_string()))?);
        }
        Ok(ids)
    }

    /// Persists one planned status transition atomically: status update,
    /// history append, write-once `paid_at`, and — only when the plan says
    /// so — release of the receipt's ledger entries.
    pub fn commit_transition(
        &self,
        receipt_id: &ReceiptId,
        plan: &TransitionPlan,
    ) -> Result<Receipt, StoreError> {
        let mut guard = self.lock_conn()?;
        let conn = &mut *guard;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            "UPDATE receipts SET status = ?1 WHERE receipt_id = ?2",
            params![plan.new_status.as_str(), receipt_id.as_str()],
        )?;
        if updated == 0 {
            return Err(StoreError::ReceiptNotFound);
        }
        if let Some(paid_at) = plan.set_paid_at {
            // COALESCE keeps the first paid timestamp even if two paid
            // transitions race on the same receipt.
            tx.execute(
                "UPDATE receipts SET paid_at = COALESCE(paid_at, ?1) WHERE receipt_id = ?2",
                params![fmt_ts(paid_at), receipt_id.as_str()],
            )?;
        }
        append_history(&tx, receipt_id, &plan.entry)?;
        if plan.release_numbers {
            tx.execute(
                "DELETE FROM selections WHERE receipt_id = ?1",
                params![receipt_id.as_str()],
            )?;
        }
        tx.commit()?;
        load_receipt(&guard, receipt_id)
    }
}

fn append_history(
    tx: &Transaction<'_>,
    receipt_id: &ReceiptId,
    entry: &StatusChange,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO receipt_status_history (receipt_id, status, changed_at, changed_by, note) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            receipt_id.as_str(),
            entry.status.as_str(),
            fmt_ts(entry.changed_at),
            entry.changed_by,
            entry.note,
        ],
    )?;
    Ok(())
}

pub(crate) fn load_receipt(
    conn: &Connection,
    receipt_id: &ReceiptId,
) -> Result<Receipt, StoreError> {
    struct ReceiptRow {
        raffle_id: String,
        status: String,
        x_handle: Option<String>,
        instagram_handle: Option<String>,
        whatsapp: Option<String>,
        preferred_contact: String,
        total_amount_cents: i64,
        created_at: String,
        expires_at: String,
        paid_at: Option<String>,
    }

    let row = conn
        .query_row(
            "SELECT raffle_id, status, x_handle, instagram_handle, whatsapp, preferred_contact, \
             total_amount_cents, created_at, expires_at, paid_at \
             FROM receipts WHERE receipt_id = ?1",
            params![receipt_id.as_str()],
            |row| {
                Ok(ReceiptRow {
                    raffle_id: row.get(0)?,
                    status: row.get(1)?,
                    x_handle: row.get(2)?,
                    instagram_handle: row.get(3)?,
                    whatsapp: row.get(4)?,
                    preferred_contact: row.get(5)?,
                    total_amount_cents: row.get(6)?,
                    created_at: row.get(7)?,
                    expires_at: row.get(8)?,
                    paid_at: row.get(9)?,
                })
            },
        )
        .optional()?
        .ok_or(StoreError::ReceiptNotFound)?;

    let mut stmt = conn.prepare(
        "SELECT number, page_number FROM receipt_numbers \
         WHERE receipt_id = ?1 ORDER BY position",
    )?;
    let number_rows = stmt.query_map(params![receipt_id.as_str()], |row| {
        Ok(ClaimedNumber {
            number: row.get(0)?,
            page_number: row.get(1)?,
        })
    })?;
    let mut numbers = Vec::new();
    for number in number_rows {
        numbers.push(number?);
    }

    let mut stmt = conn.prepare(
        "SELECT status, changed_at, changed_by, note FROM receipt_status_history \
         WHERE receipt_id = ?1 ORDER BY id",
    )?;
    let history_rows = stmt.query_map(params![receipt_id.as_str()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;
    let mut status_history = Vec::new();
    for entry in history_rows {
        let (status, changed_at, changed_by, note) = entry?;
        status_history.push(StatusChange {
            status: ReceiptStatus::parse(&status)
                .map_err(|e| StoreError::Internal(e.to_string()))?,
            changed_at: parse_ts(&changed_at)?,
            changed_by,
            note,
        });
    }

    Ok(Receipt {
        receipt_id: receipt_id.clone(),
        raffle_id: RaffleId::parse(&row.raffle_id)
            .map_err(|e| StoreError::Internal(e.to_string()))?,
        status: ReceiptStatus::parse(&row.status)
            .map_err(|e| StoreError::Internal(e.to_string()))?,
        numbers,
        contact: BuyerContact {
            x_handle: row.x_handle,
            instagram_handle: row.instagram_handle,
            whatsapp: row.whatsapp,
            preferred_contact: ContactChannel::parse(&row.preferred_contact)
                .map_err(|e| StoreError::Internal(e.to_string()))?,
        },
        total_amount_cents: row.total_amount_cents,
        created_at: parse_ts(&row.created_at)?,
        expires_at: parse_ts(&row.expires_at)?,
        paid_at: row.paid_at.as_deref().map(parse_ts).transpose()?,
        status_history,
    })
}
