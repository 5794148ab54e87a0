// SPDX-License-Identifier: Apache-2.0

use crate::ids::{RaffleId, ReceiptId, ValidationError};
use crate::numbers::total_pages;
use crate::MIN_TOTAL_NUMBERS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaffleStatus {
    Open,
    Waiting,
    Closed,
}

impl RaffleStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Waiting => "waiting",
            Self::Closed => "closed",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "open" => Ok(Self::Open),
            "waiting" => Ok(Self::Waiting),
            "closed" => Ok(Self::Closed),
            other => Err(ValidationError(format!("unknown raffle status: {other}"))),
        }
    }
}

impl Display for RaffleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Raffle {
    pub id: RaffleId,
    pub title: String,
    pub status: RaffleStatus,
    pub end_date: DateTime<Utc>,
    pub total_numbers: u32,
    pub price_cents: i64,
    pub expiration_minutes: u32,
    pub winning_receipt_id: Option<ReceiptId>,
    pub created_at: DateTime<Utc>,
}

impl Raffle {
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_numbers)
    }

    /// Read contract for the reservation engine. Sellability is evaluated
    /// against `now` on every call; callers must not cache the answer across
    /// a claim attempt.
    pub fn sellable(&self, now: DateTime<Utc>) -> Result<SellableRaffle, SellabilityError> {
        if self.status != RaffleStatus::Open {
            return Err(SellabilityError::NotOpen(self.status));
        }
        if now >= self.end_date {
            return Err(SellabilityError::Ended);
        }
        Ok(SellableRaffle {
            id: self.id.clone(),
            total_numbers: self.total_numbers,
            total_pages: self.total_pages(),
            price_cents: self.price_cents,
            expiration_minutes: self.expiration_minutes,
        })
    }
}

/// The slice of raffle state the reservation engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellableRaffle {
    pub id: RaffleId,
    pub total_numbers: u32,
    pub total_pages: u32,
    pub price_cents: i64,
    pub expiration_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellabilityError {
    NotOpen(RaffleStatus),
    Ended,
}

impl Display for SellabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOpen(status) => write!(f, "raffle is not open (status: {status})"),
            Self::Ended => write!(f, "raffle has ended"),
        }
    }
}

impl std::error::Error for SellabilityError {}

/// Validated input for raffle creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRaffle {
    pub title: String,
    pub end_date: DateTime<Utc>,
    pub total_numbers: u32,
    pub price_cents: i64,
    pub expiration_minutes: u32,
}

impl NewRaffle {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError("title must not be empty".to_string()));
        }
        if self.total_numbers < MIN_TOTAL_NUMBERS {
            return Err(ValidationError(format!(
                "total_numbers must be >= {MIN_TOTAL_NUMBERS}"
            )));
        }
        if self.price_cents < 0 {
            return Err(ValidationError("price must be >= 0".to_string()));
        }
        if self.expiration_minutes < 1 {
            return Err(ValidationError(
                "expiration_minutes must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn raffle(status: RaffleStatus, end_in_minutes: i64) -> Raffle {
        let now = Utc::now();
        Raffle {
            id: RaffleId::parse("r1").expect("id"),
            title: "t".to_string(),
            status,
            end_date: now + Duration::minutes(end_in_minutes),
            total_numbers: 200,
            price_cents: 1000,
            expiration_minutes: 30,
            winning_receipt_id: None,
            created_at: now,
        }
    }

    #[test]
    fn sellable_requires_open_status_and_future_end_date() {
        let now = Utc::now();
        assert!(raffle(RaffleStatus::Open, 10).sellable(now).is_ok());
        assert_eq!(
            raffle(RaffleStatus::Waiting, 10).sellable(now),
            Err(SellabilityError::NotOpen(RaffleStatus::Waiting))
        );
        assert_eq!(
            raffle(RaffleStatus::Open, -1).sellable(now),
            Err(SellabilityError::Ended)
        );
    }

    #[test]
    fn new_raffle_validation_bounds() {
        let ok = NewRaffle {
            title: "summer".to_string(),
            end_date: Utc::now(),
            total_numbers: 100,
            price_cents: 0,
            expiration_minutes: 1,
        };
        assert!(ok.validate().is_ok());

        let mut bad = ok.clone();
        bad.total_numbers = 99;
        assert!(bad.validate().is_err());

        let mut bad = ok.clone();
        bad.expiration_minutes = 0;
        assert!(bad.validate().is_err());

        let mut bad = ok;
        bad.price_cents = -1;
        assert!(bad.validate().is_err());
    }
}
