// SPDX-License-Identifier: Apache-2.0

use rusqlite::Connection;

/// Idempotent DDL. The UNIQUE constraint on
/// `selections(raffle_id, number, page_number)` is the system's core
/// correctness contract: concurrent writers racing for a number are
/// serialized here, not by application locking.
pub(crate) fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS raffles (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            status TEXT NOT NULL,
            end_date TEXT NOT NULL,
            total_numbers INTEGER NOT NULL,
            price_cents INTEGER NOT NULL,
            expiration_minutes INTEGER NOT NULL,
            winning_receipt_id TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS selections (
            raffle_id TEXT NOT NULL REFERENCES raffles(id) ON DELETE CASCADE,
            receipt_id TEXT NOT NULL,
            number INTEGER NOT NULL,
            page_number INTEGER NOT NULL,
            x_handle TEXT,
            instagram_handle TEXT,
            whatsapp TEXT,
            preferred_contact TEXT NOT NULL,
            selected_at TEXT NOT NULL,
            UNIQUE (raffle_id, number, page_number)
        );
        CREATE INDEX IF NOT EXISTS idx_selections_receipt
            ON selections (receipt_id);
        CREATE INDEX IF NOT EXISTS idx_selections_raffle_page
            ON selections (raffle_id, page_number);

        CREATE TABLE IF NOT EXISTS receipts (
            receipt_id TEXT PRIMARY KEY,
            raffle_id TEXT NOT NULL,
            status TEXT NOT NULL,
            x_handle TEXT,
            instagram_handle TEXT,
            whatsapp TEXT,
            preferred_contact TEXT NOT NULL,
            total_amount_cents INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            paid_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_receipts_raffle
            ON receipts (raffle_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_receipts_status_expiry
            ON receipts (status, expires_at);

        CREATE TABLE IF NOT EXISTS receipt_numbers (
            receipt_id TEXT NOT NULL REFERENCES receipts(receipt_id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            number INTEGER NOT NULL,
            page_number INTEGER NOT NULL,
            PRIMARY KEY (receipt_id, position)
        );

        CREATE TABLE IF NOT EXISTS receipt_status_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            receipt_id TEXT NOT NULL REFERENCES receipts(receipt_id) ON DELETE CASCADE,
            status TEXT NOT NULL,
            changed_at TEXT NOT NULL,
            changed_by TEXT,
            note TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_history_receipt
            ON receipt_status_history (receipt_id, id);",
    )
}
