// SPDX-License-Identifier: Apache-2.0

use crate::dto::{
    ClaimDto, ContactDto, RaffleDto, ReceiptDto, RedactedContactDto, StatusChangeDto, WinnerDto,
};
use rifa_model::{Raffle, Receipt};

#[must_use]
pub fn raffle_to_dto(raffle: &Raffle) -> RaffleDto {
    RaffleDto {
        id: raffle.id.as_str().to_string(),
        title: raffle.title.clone(),
        status: raffle.status,
        end_date: raffle.end_date,
        total_numbers: raffle.total_numbers,
        total_pages: raffle.total_pages(),
        price_cents: raffle.price_cents,
        expiration_minutes: raffle.expiration_minutes,
        winning_receipt_id: raffle
            .winning_receipt_id
            .as_ref()
            .map(|id| id.as_str().to_string()),
        created_at: raffle.created_at,
    }
}

#[must_use]
pub fn receipt_to_dto(receipt: &Receipt) -> ReceiptDto {
    ReceiptDto {
        receipt_id: receipt.receipt_id.as_str().to_string(),
        raffle_id: receipt.raffle_id.as_str().to_string(),
        status: receipt.status,
        numbers: receipt
            .numbers
            .iter()
            .map(|n| ClaimDto {
                number: n.number,
                page_number: n.page_number,
            })
            .collect(),
        contact: ContactDto {
            x_handle: receipt.contact.x_handle.clone(),
            instagram_handle: receipt.contact.instagram_handle.clone(),
            whatsapp: receipt.contact.whatsapp.clone(),
            preferred_contact: receipt.contact.preferred_contact,
        },
        total_amount_cents: receipt.total_amount_cents,
        created_at: receipt.created_at,
        expires_at: receipt.expires_at,
        paid_at: receipt.paid_at,
        status_history: receipt
            .status_history
            .iter()
            .map(|entry| StatusChangeDto {
                status: entry.status,
                changed_at: entry.changed_at,
                changed_by: entry.changed_by.clone(),
                note: entry.note.clone(),
            })
            .collect(),
    }
}

fn redact(handle: Option<&String>) -> Option<String> {
    handle
        .filter(|h| !h.trim().is_empty())
        .map(|_| "***".to_string())
}

/// Public winner view: the numbers and amount are public record, the
/// contact handles are reduced to presence markers.
#[must_use]
pub fn winner_to_dto(receipt: &Receipt) -> WinnerDto {
    let mut numbers: Vec<u32> = receipt.numbers.iter().map(|n| n.number).collect();
    numbers.sort_unstable();
    WinnerDto {
        receipt_id: receipt.receipt_id.as_str().to_string(),
        numbers,
        contact: RedactedContactDto {
            x_handle: redact(receipt.contact.x_handle.as_ref()),
            instagram_handle: redact(receipt.contact.instagram_handle.as_ref()),
            whatsapp: redact(receipt.contact.whatsapp.as_ref()),
        },
        total_amount_cents: receipt.total_amount_cents,
        paid_at: receipt.paid_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rifa_model::{
        BuyerContact, ClaimedNumber, ContactChannel, RaffleId, ReceiptId, ReceiptStatus,
        StatusChange,
    };

    fn sample_receipt() -> Receipt {
        let now = Utc::now();
        Receipt {
            receipt_id: ReceiptId::parse("7KM2N9PQRSTUV").expect("id"),
            raffle_id: RaffleId::parse("r1").expect("id"),
            status: ReceiptStatus::Paid,
            numbers: vec![
                ClaimedNumber {
                    number: 17,
                    page_number: 1,
                },
                ClaimedNumber {
                    number: 5,
                    page_number: 1,
                },
            ],
            contact: BuyerContact {
                x_handle: Some("@buyer".to_string()),
                instagram_handle: None,
                whatsapp: Some("  ".to_string()),
                preferred_contact: ContactChannel::X,
            },
            total_amount_cents: 2000,
            created_at: now,
            expires_at: now + Duration::minutes(30),
            paid_at: Some(now),
            status_history: vec![StatusChange {
                status: ReceiptStatus::WaitingPayment,
                changed_at: now,
                changed_by: None,
                note: None,
            }],
        }
    }

    #[test]
    fn winner_view_redacts_present_handles_and_sorts_numbers() {
        let dto = winner_to_dto(&sample_receipt());
        assert_eq!(dto.numbers, vec![5, 17]);
        assert_eq!(dto.contact.x_handle.as_deref(), Some("***"));
        assert_eq!(dto.contact.instagram_handle, None);
        // Blank handles count as absent, not as redactable content.
        assert_eq!(dto.contact.whatsapp, None);
    }

    #[test]
    fn receipt_dto_preserves_claim_order() {
        let dto = receipt_to_dto(&sample_receipt());
        assert_eq!(dto.numbers[0].number, 17);
        assert_eq!(dto.numbers[1].number, 5);
        assert_eq!(dto.status_history.len(), 1);
    }
}
