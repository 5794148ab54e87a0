// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use rifa_model::{ClaimedNumber, ContactChannel, RaffleStatus, ReceiptStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaffleDto {
    pub id: String,
    pub title: String,
    pub status: RaffleStatus,
    pub end_date: DateTime<Utc>,
    pub total_numbers: u32,
    pub total_pages: u32,
    pub price_cents: i64,
    pub expiration_minutes: u32,
    #[serde(default)]
    pub winning_receipt_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaffleStatsDto {
    pub total: u32,
    pub taken: u32,
    pub available: u32,
}

/// Listing row: raffle plus occupancy counts. No `deny_unknown_fields`
/// here — serde does not support it together with `flatten`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleSummaryDto {
    #[serde(flatten)]
    pub raffle: RaffleDto,
    pub stats: RaffleStatsDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRaffleRequest {
    pub title: String,
    pub end_date: DateTime<Utc>,
    pub total_numbers: u32,
    pub price_cents: i64,
    pub expiration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRaffleStatusRequest {
    pub status: RaffleStatus,
    #[serde(default)]
    pub winning_receipt_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AvailableNumbersDto {
    pub page: u32,
    pub total_pages: u32,
    pub start_number: u32,
    pub end_number: u32,
    pub available_numbers: Vec<u32>,
    pub taken_numbers: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimDto {
    pub number: u32,
    pub page_number: u32,
}

impl From<ClaimDto> for ClaimedNumber {
    fn from(dto: ClaimDto) -> Self {
        Self {
            number: dto.number,
            page_number: dto.page_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactDto {
    #[serde(default)]
    pub x_handle: Option<String>,
    #[serde(default)]
    pub instagram_handle: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    pub preferred_contact: ContactChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReserveRequest {
    #[serde(default)]
    pub receipt_id: Option<String>,
    pub numbers: Vec<ClaimDto>,
    pub contact: ContactDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReserveResponse {
    pub receipt_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusChangeDto {
    pub status: ReceiptStatus,
    pub changed_at: DateTime<Utc>,
    #[serde(default)]
    pub changed_by: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiptDto {
    pub receipt_id: String,
    pub raffle_id: String,
    pub status: ReceiptStatus,
    pub numbers: Vec<ClaimDto>,
    pub contact: ContactDto,
    pub total_amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    pub status_history: Vec<StatusChangeDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReceiptStatusRequest {
    pub status: ReceiptStatus,
    #[serde(default)]
    pub changed_by: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Public winner view. Contact handles are redacted to presence markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedactedContactDto {
    #[serde(default)]
    pub x_handle: Option<String>,
    #[serde(default)]
    pub instagram_handle: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WinnerDto {
    pub receipt_id: String,
    pub numbers: Vec<u32>,
    pub contact: RedactedContactDto,
    pub total_amount_cents: i64,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}
