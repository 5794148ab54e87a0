// SPDX-License-Identifier: Apache-2.0

use crate::error::StoreError;
use crate::RaffleStore;
use rifa_model::RaffleId;
use rifa_model::ReceiptId;
use rusqlite::params;

impl RaffleStore {
    /// Live claims on one page, ascending. Availability is this subtracted
    /// from the page's number range; that math lives in `rifa-model`.
    pub fn taken_numbers(&self, raffle_id: &RaffleId, page: u32) -> Result<Vec<u32>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT number FROM selections \
             WHERE raffle_id = ?1 AND page_number = ?2 ORDER BY number",
        )?;
        let rows = stmt.query_map(params![raffle_id.as_str(), page], |row| row.get(0))?;
        let mut taken = Vec::new();
        for number in rows {
            taken.push(number?);
        }
        Ok(taken)
    }

    pub fn is_claimed(
        &self,
        raffle_id: &RaffleId,
        number: u32,
        page_number: u32,
    ) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM selections \
             WHERE raffle_id = ?1 AND number = ?2 AND page_number = ?3",
            params![raffle_id.as_str(), number, page_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Gives a receipt's numbers back to the ledger. Idempotent: releasing a
    /// receipt with no live entries is a no-op.
    pub fn release_receipt_numbers(&self, receipt_id: &ReceiptId) -> Result<usize, StoreError> {
        let conn = self.lock_conn()?;
        let deleted = conn.execute(
            "DELETE FROM selections WHERE receipt_id = ?1",
            params![receipt_id.as_str()],
        )?;
        Ok(deleted)
    }
}
