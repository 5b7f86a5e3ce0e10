#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use std::time::Duration;

use chrono::Utc;
use common::setup_db;
use responder::ledger::{Reservation, ReservationLedger, ReservationToken, SqliteLedger};

async fn token_count(pool: &sqlx::SqlitePool, event_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM event_reservations WHERE event_id = ?")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .expect("count tokens")
}

#[tokio::test]
async fn exactly_one_concurrent_caller_acquires() {
    let db = setup_db(8).await;
    let ledger = SqliteLedger::with_ttl(db.pool.clone(), Duration::from_secs(120));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move { ledger.try_reserve("evt-race").await }));
    }

    let mut acquired = 0;
    for handle in handles {
        match handle.await.expect("join reserve task") {
            Reservation::Acquired(_) => acquired += 1,
            Reservation::Held => {}
            Reservation::Unavailable => panic!("ledger reported unavailable"),
        }
    }

    assert_eq!(acquired, 1);
    assert_eq!(token_count(&db.pool, "evt-race").await, 1);
}

#[tokio::test]
async fn expired_token_can_be_taken_over() {
    let db = setup_db(1).await;
    let ledger = SqliteLedger::with_ttl(db.pool.clone(), Duration::from_secs(120));
    let now = Utc::now();

    let first = ledger.reserve_at("evt-1", now).await.expect("first reserve");
    assert!(first.is_some());
    assert!(ledger
        .reserve_at("evt-1", now + ledger.ttl() - chrono::Duration::milliseconds(1))
        .await
        .expect("reserve before expiry")
        .is_none());

    let second = ledger
        .reserve_at("evt-1", now + ledger.ttl())
        .await
        .expect("reserve at expiry");
    assert!(second.is_some());
    assert_ne!(first, second);
}

#[tokio::test]
async fn release_allows_reacquire_and_is_idempotent() {
    let db = setup_db(1).await;
    let ledger = SqliteLedger::with_ttl(db.pool.clone(), Duration::from_secs(120));

    let Reservation::Acquired(token) = ledger.try_reserve("evt-2").await else {
        panic!("first reserve should acquire");
    };
    assert_eq!(ledger.try_reserve("evt-2").await, Reservation::Held);

    ledger.release("evt-2", &token).await;
    ledger.release("evt-2", &token).await;
    ledger.release("never-reserved", &ReservationToken::new()).await;

    assert!(ledger.try_reserve("evt-2").await.is_acquired());
}

#[tokio::test]
async fn stale_owner_cannot_release_a_taken_over_token() {
    let db = setup_db(1).await;
    let ledger = SqliteLedger::with_ttl(db.pool.clone(), Duration::from_secs(1));
    let now = Utc::now();

    let stale = ledger
        .reserve_at("evt-5", now - chrono::Duration::seconds(5))
        .await
        .expect("stale reserve")
        .expect("stale owner acquires");
    let live = ledger
        .reserve_at("evt-5", now)
        .await
        .expect("takeover")
        .expect("takeover acquires");

    assert!(!ledger.delete("evt-5", &stale).await.expect("stale delete"));
    ledger.release("evt-5", &stale).await;

    assert!(ledger
        .reserve_at("evt-5", now)
        .await
        .expect("third reserve")
        .is_none());
    assert_eq!(token_count(&db.pool, "evt-5").await, 1);

    assert!(ledger.delete("evt-5", &live).await.expect("owner delete"));
    assert_eq!(token_count(&db.pool, "evt-5").await, 0);
}

#[tokio::test]
async fn closed_store_fails_closed() {
    let db = setup_db(1).await;
    let ledger = SqliteLedger::with_ttl(db.pool.clone(), Duration::from_secs(120));
    db.pool.close().await;

    let reservation = ledger.try_reserve("evt-3").await;

    assert_eq!(reservation, Reservation::Unavailable);
    assert!(!reservation.is_acquired());
    // Releasing against a dead store only logs.
    ledger.release("evt-3", &ReservationToken::new()).await;
}

#[tokio::test]
async fn purge_removes_only_expired_tokens() {
    let db = setup_db(1).await;
    let ledger = SqliteLedger::with_ttl(db.pool.clone(), Duration::from_secs(60));
    let now = Utc::now();

    ledger
        .reserve_at("old", now - chrono::Duration::minutes(5))
        .await
        .expect("reserve old");
    ledger.reserve_at("fresh", now).await.expect("reserve fresh");

    let purged = ledger.purge_expired(now).await.expect("purge");

    assert_eq!(purged, 1);
    assert_eq!(token_count(&db.pool, "old").await, 0);
    assert_eq!(token_count(&db.pool, "fresh").await, 1);
}
