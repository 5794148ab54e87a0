// SPDX-License-Identifier: Apache-2.0

use crate::error::StoreError;
use crate::{fmt_ts, parse_ts, RaffleStore};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rifa_model::{NewRaffle, Raffle, RaffleId, RaffleStatus, ReceiptId};

const RAFFLE_COLUMNS: &str = "id, title, status, end_date, total_numbers, price_cents, \
     expiration_minutes, winning_receipt_id, created_at";

pub(crate) fn raffle_from_row(row: &Row<'_>) -> Result<Raffle, StoreError> {
    let id: String = row.get(0)?;
    let status: String = row.get(2)?;
    let end_date: String = row.get(3)?;
    let winning: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;
    Ok(Raffle {
        id: RaffleId::parse(&id).map_err(|e| StoreError::Internal(e.to_string()))?,
        title: row.get(1)?,
        status: RaffleStatus::parse(&status).map_err(|e| StoreError::Internal(e.to_string()))?,
        end_date: parse_ts(&end_date)?,
        total_numbers: row.get(4)?,
        price_cents: row.get(5)?,
        expiration_minutes: row.get(6)?,
        winning_receipt_id: winning
            .map(|w| ReceiptId::parse(&w).map_err(|e| StoreError::Internal(e.to_string())))
            .transpose()?,
        created_at: parse_ts(&created_at)?,
    })
}

pub(crate) fn load_raffle(conn: &Connection, id: &RaffleId) -> Result<Raffle, StoreError> {
    conn.query_row(
        &format!("SELECT {RAFFLE_COLUMNS} FROM raffles WHERE id = ?1"),
        params![id.as_str()],
        |row| Ok(raffle_from_row(row)),
    )
    .optional()?
    .ok_or(StoreError::RaffleNotFound)?
}

impl RaffleStore {
    pub fn create_raffle(
        &self,
        new: &NewRaffle,
        now: DateTime<Utc>,
    ) -> Result<Raffle, StoreError> {
        new.validate()
            .map_err(|e| StoreError::Internal(format!("unvalidated raffle input: {e}")))?;
        let id = RaffleId::parse(&uuid::Uuid::new_v4().to_string())
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO raffles (id, title, status, end_date, total_numbers, price_cents, \
             expiration_minutes, winning_receipt_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8)",
            params![
                id.as_str(),
                new.title,
                RaffleStatus::Open.as_str(),
                fmt_ts(new.end_date),
                new.total_numbers,
                new.price_cents,
                new.expiration_minutes,
                fmt_ts(now),
            ],
        )?;
        load_raffle(&conn, &id)
    }

    pub fn get_raffle(&self, id: &RaffleId) -> Result<Raffle, StoreError> {
        let conn = self.lock_conn()?;
        load_raffle(&conn, id)
    }

    /// All raffles, newest first, with the count of live ledger entries.
    pub fn list_raffles(&self) -> Result<Vec<(Raffle, u32)>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.title, r.status, r.end_date, r.total_numbers, r.price_cents, \
             r.expiration_minutes, r.winning_receipt_id, r.created_at, COUNT(s.number) \
             FROM raffles r LEFT JOIN selections s ON s.raffle_id = r.id \
             GROUP BY r.id ORDER BY r.created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let taken: u32 = row.get(9)?;
            Ok((raffle_from_row(row), taken))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (raffle, taken) = row?;
            out.push((raffle?, taken));
        }
        Ok(out)
    }

    /// Status changes are admin actions and are not validated against a
    /// forward-only order; reopening a closed raffle is allowed.
    pub fn set_raffle_status(
        &self,
        id: &RaffleId,
        status: RaffleStatus,
        winning_receipt_id: Option<&ReceiptId>,
    ) -> Result<Raffle, StoreError> {
        let conn = self.lock_conn()?;
        let updated = match winning_receipt_id {
            Some(winner) => conn.execute(
                "UPDATE raffles SET status = ?1, winning_receipt_id = ?2 WHERE id = ?3",
                params![status.as_str(), winner.as_str(), id.as_str()],
            )?,
            None => conn.execute(
                "UPDATE raffles SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.as_str()],
            )?,
        };
        if updated == 0 {
            return Err(StoreError::RaffleNotFound);
        }
        load_raffle(&conn, id)
    }

    /// Deleting a raffle cascades to its ledger entries (FK). Receipts are
    /// kept as historical record.
    pub fn delete_raffle(&self, id: &RaffleId) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        let deleted = conn.execute("DELETE FROM raffles WHERE id = ?1", params![id.as_str()])?;
        if deleted == 0 {
            return Err(StoreError::RaffleNotFound);
        }
        Ok(())
    }
}
