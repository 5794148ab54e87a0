// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub const CRATE_NAME: &str = "rifa-api";

mod convert;
mod dto;
mod errors;

pub use convert::{raffle_to_dto, receipt_to_dto, winner_to_dto};
pub use dto::{
    AvailableNumbersDto, ClaimDto, ContactDto, CreateRaffleRequest, RaffleDto, RaffleStatsDto,
    RaffleSummaryDto, ReceiptDto, RedactedContactDto, ReserveRequest, ReserveResponse,
    StatusChangeDto, UpdateRaffleStatusRequest, UpdateReceiptStatusRequest, WinnerDto,
};
pub use errors::{ApiError, ApiErrorCode};
