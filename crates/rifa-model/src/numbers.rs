// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

/// Raffle numbers are partitioned into pages of 100 sequential numbers.
pub const PAGE_SIZE: u32 = 100;

#[must_use]
pub fn total_pages(total_numbers: u32) -> u32 {
    total_numbers.div_ceil(PAGE_SIZE)
}

/// The page a global ticket number belongs to: `ceil(number / 100)`.
#[must_use]
pub fn page_for(number: u32) -> u32 {
    number.div_ceil(PAGE_SIZE)
}

/// Global number range covered by `page`, truncated on the last page.
/// `None` when the page is out of bounds for the raffle.
#[must_use]
pub fn page_number_range(page: u32, total_numbers: u32) -> Option<RangeInclusive<u32>> {
    if page < 1 || page > total_pages(total_numbers) {
        return None;
    }
    let start = (page - 1) * PAGE_SIZE + 1;
    let end = (page * PAGE_SIZE).min(total_numbers);
    Some(start..=end)
}

/// One claimed (number, page) pair as submitted by a buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimedNumber {
    pub number: u32,
    pub page_number: u32,
}

impl ClaimedNumber {
    /// Range and consistency checks, performed before any uniqueness check.
    /// A pair whose page does not match its number violates the ledger's
    /// `page = ceil(number / 100)` invariant and is rejected outright.
    pub fn validate(&self, total_numbers: u32) -> Result<(), ClaimError> {
        let pages = total_pages(total_numbers);
        if self.page_number < 1 || self.page_number > pages {
            return Err(ClaimError::PageOutOfRange {
                page_number: self.page_number,
                total_pages: pages,
            });
        }
        if self.number < 1 || self.number > total_numbers {
            return Err(ClaimError::NumberOutOfRange {
                number: self.number,
                total_numbers,
            });
        }
        if page_for(self.number) != self.page_number {
            return Err(ClaimError::PageMismatch {
                number: self.number,
                page_number: self.page_number,
                expected_page: page_for(self.number),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    PageOutOfRange { page_number: u32, total_pages: u32 },
    NumberOutOfRange { number: u32, total_numbers: u32 },
    PageMismatch {
        number: u32,
        page_number: u32,
        expected_page: u32,
    },
}

impl Display for ClaimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PageOutOfRange {
                page_number,
                total_pages,
            } => write!(
                f,
                "invalid page number: {page_number} (valid range 1..={total_pages})"
            ),
            Self::NumberOutOfRange {
                number,
                total_numbers,
            } => write!(
                f,
                "invalid number: {number} (valid range 1..={total_numbers})"
            ),
            Self::PageMismatch {
                number,
                page_number,
                expected_page,
            } => write!(
                f,
                "number {number} belongs to page {expected_page}, not page {page_number}"
            ),
        }
    }
}

impl std::error::Error for ClaimError {}

/// One page of availability: the page's full range minus the taken numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailablePage {
    pub page: u32,
    pub total_pages: u32,
    pub start_number: u32,
    pub end_number: u32,
    pub available_numbers: Vec<u32>,
    pub taken_numbers: Vec<u32>,
}

impl AvailablePage {
    /// Computes availability for `page` given the taken numbers on that page.
    /// `None` when the page is out of bounds.
    #[must_use]
    pub fn compute(page: u32, total_numbers: u32, mut taken: Vec<u32>) -> Option<Self> {
        let range = page_number_range(page, total_numbers)?;
        taken.sort_unstable();
        taken.dedup();
        let available = range
            .clone()
            .filter(|n| taken.binary_search(n).is_err())
            .collect();
        Some(Self {
            page,
            total_pages: total_pages(total_numbers),
            start_number: *range.start(),
            end_number: *range.end(),
            available_numbers: available,
            taken_numbers: taken,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn last_page_truncates_to_total_numbers() {
        assert_eq!(total_pages(100), 1);
        assert_eq!(total_pages(101), 2);
        assert_eq!(total_pages(250), 3);
        assert_eq!(page_number_range(3, 250), Some(201..=250));
        assert_eq!(page_number_range(4, 250), None);
        assert_eq!(page_number_range(0, 250), None);
    }

    #[test]
    fn claim_validation_rejects_out_of_range_and_mismatched_pairs() {
        let claim = ClaimedNumber {
            number: 150,
            page_number: 2,
        };
        assert!(matches!(
            claim.validate(100),
            Err(ClaimError::PageOutOfRange { .. })
        ));

        let claim = ClaimedNumber {
            number: 150,
            page_number: 1,
        };
        assert!(matches!(
            claim.validate(100),
            Err(ClaimError::NumberOutOfRange { .. })
        ));

        let claim = ClaimedNumber {
            number: 5,
            page_number: 2,
        };
        assert!(matches!(
            claim.validate(200),
            Err(ClaimError::PageMismatch {
                expected_page: 1,
                ..
            })
        ));

        let claim = ClaimedNumber {
            number: 105,
            page_number: 2,
        };
        assert!(claim.validate(200).is_ok());
    }

    #[test]
    fn availability_is_page_range_minus_taken() {
        let page = AvailablePage::compute(1, 100, vec![5, 17, 5]).expect("page in range");
        assert_eq!(page.start_number, 1);
        assert_eq!(page.end_number, 100);
        assert_eq!(page.taken_numbers, vec![5, 17]);
        assert_eq!(page.available_numbers.len(), 98);
        assert!(!page.available_numbers.contains(&5));
        assert!(!page.available_numbers.contains(&17));

        assert!(AvailablePage::compute(2, 100, vec![]).is_none());
    }

    proptest! {
        #[test]
        fn every_number_in_range_lands_on_exactly_one_page(
            total in 100_u32..=1000,
            number in 1_u32..=1000,
        ) {
            prop_assume!(number <= total);
            let page = page_for(number);
            let range = page_number_range(page, total).expect("page of an in-range number");
            prop_assert!(range.contains(&number));
            let claimed = ClaimedNumber { number, page_number: page };
            prop_assert!(claimed.validate(total).is_ok());
        }

        #[test]
        fn page_ranges_tile_the_whole_raffle(total in 100_u32..=1000) {
            let mut covered = 0_u32;
            for page in 1..=total_pages(total) {
                let range = page_number_range(page, total).expect("valid page");
                prop_assert_eq!(*range.start(), covered + 1);
                covered = *range.end();
            }
            prop_assert_eq!(covered, total);
        }
    }
}
