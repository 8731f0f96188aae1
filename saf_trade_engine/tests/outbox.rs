mod helpers;

use chrono::{Duration, Utc};
use helpers::*;
use saf_trade_engine::traits::{MarketplaceDatabase, OutboxManagement};

#[tokio::test]
async fn queued_rows_are_due_immediately_and_in_order() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    db.insert_lot(new_lot(org.id)).await.unwrap();
    db.insert_lot(new_lot(org.id)).await.unwrap();
    let due = db.fetch_due_notifications(10, Utc::now()).await.unwrap();
    assert_eq!(due.len(), 2);
    assert!(due[0].id < due[1].id);
    assert_eq!(due[0].event, "lot.created");
    assert_eq!(due[0].attempts, 0);
    assert!(!due[0].dead);
    // The payload carries the event envelope
    assert_eq!(due[0].payload.0["event"], "lot.created");
    assert!(due[0].payload.0["lot"]["id"].is_string());
}

#[tokio::test]
async fn delivered_rows_leave_the_queue() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    db.insert_lot(new_lot(org.id)).await.unwrap();
    let due = db.fetch_due_notifications(10, Utc::now()).await.unwrap();
    assert_eq!(due.len(), 1);
    db.mark_delivered(due[0].id, Utc::now()).await.unwrap();
    assert!(db.fetch_due_notifications(10, Utc::now()).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_rows_wait_for_their_retry_time() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    db.insert_lot(new_lot(org.id)).await.unwrap();
    let due = db.fetch_due_notifications(10, Utc::now()).await.unwrap();
    let row = &due[0];
    let retry_at = Utc::now() + Duration::seconds(30);
    db.mark_failed(row.id, retry_at, false).await.unwrap();
    // Not due yet
    assert!(db.fetch_due_notifications(10, Utc::now()).await.unwrap().is_empty());
    // Due once the retry time has passed
    let later = retry_at + Duration::seconds(1);
    let retried = db.fetch_due_notifications(10, later).await.unwrap();
    assert_eq!(retried.len(), 1);
    assert_eq!(retried[0].attempts, 1);
}

#[tokio::test]
async fn dead_rows_are_never_retried() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    db.insert_lot(new_lot(org.id)).await.unwrap();
    let due = db.fetch_due_notifications(10, Utc::now()).await.unwrap();
    db.mark_failed(due[0].id, Utc::now(), true).await.unwrap();
    let far_future = Utc::now() + Duration::days(365);
    assert!(db.fetch_due_notifications(10, far_future).await.unwrap().is_empty());
}
