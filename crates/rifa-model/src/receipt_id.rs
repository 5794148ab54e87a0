// SPDX-License-Identifier: Apache-2.0

use crate::ids::ReceiptId;
use rand::Rng;

/// 32 symbols with 0/1/I/O removed so ids survive handwriting and dictation.
pub const RECEIPT_ID_ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// 13 symbols over a 32-symbol alphabet: 65 bits of entropy.
pub const RECEIPT_ID_LEN: usize = 13;

#[must_use]
pub fn generate_receipt_id() -> ReceiptId {
    let mut rng = rand::thread_rng();
    let raw: String = (0..RECEIPT_ID_LEN)
        .map(|_| RECEIPT_ID_ALPHABET[rng.gen_range(0..RECEIPT_ID_ALPHABET.len())] as char)
        .collect();
    ReceiptId::from_generated(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_use_only_the_unambiguous_alphabet() {
        for _ in 0..256 {
            let id = generate_receipt_id();
            assert_eq!(id.as_str().len(), RECEIPT_ID_LEN);
            assert!(id
                .as_str()
                .bytes()
                .all(|b| RECEIPT_ID_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn generated_ids_do_not_trivially_collide() {
        let ids: HashSet<String> = (0..1000)
            .map(|_| generate_receipt_id().into_inner())
            .collect();
        assert_eq!(ids.len(), 1000);
    }
}
