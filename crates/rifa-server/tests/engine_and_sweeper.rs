use chrono::{Duration, Utc};
use rifa_model::{
    BuyerContact, ClaimedNumber, ContactChannel, NewRaffle, Raffle, RaffleStatus, ReceiptId,
    ReceiptStatus,
};
use rifa_server::reservation::{reserve, reserve_sync, ReserveError};
use rifa_server::{run_sweep_once, DomainEvent, EventBus};
use rifa_store::RaffleStore;
use std::thread;

fn buyer() -> BuyerContact {
    BuyerContact {
        x_handle: Some("@buyer".to_string()),
        instagram_handle: None,
        whatsapp: None,
        preferred_contact: ContactChannel::X,
    }
}

fn no_contact() -> BuyerContact {
    BuyerContact {
        x_handle: None,
        instagram_handle: Some("   ".to_string()),
        whatsapp: None,
        preferred_contact: ContactChannel::Instagram,
    }
}

fn make_raffle(store: &RaffleStore, total_numbers: u32) -> Raffle {
    store
        .create_raffle(
            &NewRaffle {
                title: "summer raffle".to_string(),
                end_date: Utc::now() + Duration::days(7),
                total_numbers,
                price_cents: 10,
                expiration_minutes: 30,
            },
            Utc::now(),
        )
        .expect("create raffle")
}

fn claim(number: u32, page_number: u32) -> ClaimedNumber {
    ClaimedNumber {
        number,
        page_number,
    }
}

#[test]
fn concurrent_reservations_for_one_number_yield_exactly_one_winner() {
    let store = RaffleStore::open_in_memory().expect("store");
    let raffle = make_raffle(&store, 100);
    let now = Utc::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let raffle_id = raffle.id.clone();
            thread::spawn(move || {
                reserve_sync(&store, &raffle_id, &[claim(5, 1)], &buyer(), None, now)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one claim must succeed");
    for result in results.iter().filter(|r| r.is_err()) {
        match result {
            Err(ReserveError::Conflict {
                number: 5,
                page_number: 1,
            }) => {}
            other => panic!("loser must see the exact conflicting pair, got {other:?}"),
        }
    }
    assert_eq!(store.taken_numbers(&raffle.id, 1).expect("taken"), vec![5]);
}

#[test]
fn validation_happens_before_any_mutation() {
    let store = RaffleStore::open_in_memory().expect("store");
    let raffle = make_raffle(&store, 100);
    let now = Utc::now();

    let err = reserve_sync(&store, &raffle.id, &[claim(5, 1)], &no_contact(), None, now)
        .expect_err("contact required");
    assert!(matches!(err, ReserveError::MissingContact));

    let err = reserve_sync(&store, &raffle.id, &[], &buyer(), None, now)
        .expect_err("empty batch rejected");
    assert!(matches!(err, ReserveError::EmptyBatch));

    let err = reserve_sync(&store, &raffle.id, &[claim(150, 2)], &buyer(), None, now)
        .expect_err("out of range");
    assert!(matches!(err, ReserveError::InvalidClaim(_)));

    // Page inconsistent with the number violates the ledger invariant.
    let err = reserve_sync(&store, &raffle.id, &[claim(5, 2)], &buyer(), None, now)
        .expect_err("mismatched page");
    assert!(matches!(err, ReserveError::InvalidClaim(_)));

    assert!(store.taken_numbers(&raffle.id, 1).expect("taken").is_empty());
}

#[test]
fn sellability_is_checked_at_claim_time() {
    let store = RaffleStore::open_in_memory().expect("store");
    let raffle = make_raffle(&store, 100);

    store
        .set_raffle_status(&raffle.id, RaffleStatus::Waiting, None)
        .expect("pause");
    let err = reserve_sync(&store, &raffle.id, &[claim(5, 1)], &buyer(), None, Utc::now())
        .expect_err("not open");
    assert!(matches!(err, ReserveError::NotSellable(_)));

    store
        .set_raffle_status(&raffle.id, RaffleStatus::Open, None)
        .expect("reopen");
    let past_end = Utc::now() + Duration::days(8);
    let err = reserve_sync(&store, &raffle.id, &[claim(5, 1)], &buyer(), None, past_end)
        .expect_err("ended");
    assert!(matches!(err, ReserveError::NotSellable(_)));
}

#[test]
fn caller_supplied_receipt_id_collision_is_a_caller_error() {
    let store = RaffleStore::open_in_memory().expect("store");
    let raffle = make_raffle(&store, 100);
    let now = Utc::now();
    let id = ReceiptId::parse("RCPTA").expect("id");

    reserve_sync(&store, &raffle.id, &[claim(1, 1)], &buyer(), Some(id.clone()), now)
        .expect("first use of the id");
    let err = reserve_sync(&store, &raffle.id, &[claim(2, 1)], &buyer(), Some(id), now)
        .expect_err("id reuse");
    assert!(matches!(err, ReserveError::ReceiptIdTaken { .. }));
    assert!(!store.is_claimed(&raffle.id, 2, 1).expect("is_claimed"));
}

#[test]
fn generated_receipt_ids_use_the_readable_alphabet() {
    let store = RaffleStore::open_in_memory().expect("store");
    let raffle = make_raffle(&store, 100);

    let receipt = reserve_sync(&store, &raffle.id, &[claim(9, 1)], &buyer(), None, Utc::now())
        .expect("reserve");
    assert_eq!(receipt.receipt_id.as_str().len(), rifa_model::RECEIPT_ID_LEN);
    assert!(receipt
        .receipt_id
        .as_str()
        .bytes()
        .all(|b| rifa_model::RECEIPT_ID_ALPHABET.contains(&b)));
}

#[test]
fn sweep_expires_releases_and_is_idempotent() {
    let store = RaffleStore::open_in_memory().expect("store");
    let raffle = make_raffle(&store, 100);
    let t0 = Utc::now();

    let receipt = reserve_sync(&store, &raffle.id, &[claim(5, 1), claim(17, 1)], &buyer(), None, t0)
        .expect("reserve");
    assert_eq!(store.taken_numbers(&raffle.id, 1).expect("taken"), vec![5, 17]);

    // Before the deadline: nothing to do.
    let outcome = run_sweep_once(&store, t0 + Duration::minutes(29));
    assert_eq!(outcome.matched, 0);

    let after_deadline = t0 + Duration::minutes(31);
    let outcome = run_sweep_once(&store, after_deadline);
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.expired, 1);
    assert_eq!(outcome.failed, 0);

    let expired = store.get_receipt(&receipt.receipt_id).expect("receipt");
    assert_eq!(expired.status, ReceiptStatus::Expired);
    assert_eq!(expired.status_history.len(), 2);
    let last = expired.status_history.last().expect("history entry");
    assert_eq!(last.changed_by.as_deref(), Some("system"));
    assert_eq!(last.note.as_deref(), Some("automatic timeout"));
    assert!(store.taken_numbers(&raffle.id, 1).expect("taken").is_empty());

    // Second pass over the same state finds nothing and changes nothing.
    let outcome = run_sweep_once(&store, after_deadline);
    assert_eq!(outcome.matched, 0);
    let unchanged = store.get_receipt(&receipt.receipt_id).expect("receipt");
    assert_eq!(unchanged.status_history.len(), 2);
}

#[test]
fn sweep_processes_each_receipt_independently() {
    let store = RaffleStore::open_in_memory().expect("store");
    let raffle = make_raffle(&store, 100);
    let t0 = Utc::now();

    for (id_suffix, number) in [(1_u32, 1_u32), (2, 2), (3, 3)] {
        let id = ReceiptId::parse(&format!("RCPT{id_suffix}")).expect("id");
        reserve_sync(&store, &raffle.id, &[claim(number, 1)], &buyer(), Some(id), t0)
            .expect("reserve");
    }

    let outcome = run_sweep_once(&store, t0 + Duration::hours(1));
    assert_eq!(outcome.matched, 3);
    assert_eq!(outcome.expired, 3);
    assert!(store.taken_numbers(&raffle.id, 1).expect("taken").is_empty());
}

#[test]
fn released_numbers_become_reservable_again() {
    let store = RaffleStore::open_in_memory().expect("store");
    let raffle = make_raffle(&store, 100);
    let t0 = Utc::now();

    reserve_sync(&store, &raffle.id, &[claim(5, 1)], &buyer(), None, t0).expect("reserve");
    run_sweep_once(&store, t0 + Duration::hours(1));

    // Same pair, fresh buyer, succeeds after release.
    let receipt =
        reserve_sync(&store, &raffle.id, &[claim(5, 1)], &buyer(), None, t0 + Duration::hours(1))
            .expect("re-reserve released number");
    assert_eq!(receipt.numbers, vec![claim(5, 1)]);
}

#[tokio::test]
async fn reserve_emits_one_event_per_claimed_number() {
    let store = RaffleStore::open_in_memory().expect("store");
    let raffle = make_raffle(&store, 100);
    let events = EventBus::new(16);
    let mut rx = events.subscribe();

    let receipt = reserve(
        store.clone(),
        events.clone(),
        raffle.id.clone(),
        vec![claim(5, 1), claim(17, 1)],
        buyer(),
        None,
    )
    .await
    .expect("reserve");

    for expected in &receipt.numbers {
        let event = rx.recv().await.expect("event");
        assert_eq!(
            event,
            DomainEvent::SelectionCreated {
                raffle_id: raffle.id.clone(),
                number: expected.number,
                page_number: expected.page_number,
            }
        );
    }
}
