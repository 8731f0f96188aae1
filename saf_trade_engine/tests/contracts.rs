mod helpers;

use helpers::*;
use saf_trade_engine::{
    api::{BidFlowApi, ContractApi, ContractOverrides},
    db_types::{BidStatus, ContractStatus},
    events::EventHooks,
    traits::{ContractQueryFilter, InsertBidResult, MarketDbError},
};

#[tokio::test]
async fn drafting_a_contract_from_a_bid_copies_its_terms() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    let lot = published_lot(&db, org.id).await;
    let bids = BidFlowApi::new(db.clone(), EventHooks::default());
    let InsertBidResult::Inserted(bid) = bids.submit_bid(new_bid(lot.id)).await.unwrap() else {
        panic!("Expected a fresh bid");
    };
    let api = ContractApi::new(db.clone());
    let overrides = ContractOverrides { terms: Some("Net 30".to_string()), ..ContractOverrides::default() };
    let contract = api.create_from_bid(org.id, bid.id, overrides).await.unwrap();
    assert_eq!(contract.status, ContractStatus::Draft);
    assert_eq!(contract.lot_id, lot.id);
    assert_eq!(contract.bid_id, bid.id);
    assert_eq!(contract.buyer_name.as_deref(), Some("Skandia Air"));
    assert_eq!(contract.terms.as_deref(), Some("Net 30"));
    assert!((contract.price_per_unit - 2400.0).abs() < 1e-9);
    assert!(contract.contract_number.starts_with("CNT-"));
}

#[tokio::test]
async fn only_the_lot_owner_may_draft_a_contract() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    let lot = published_lot(&db, org.id).await;
    let bids = BidFlowApi::new(db.clone(), EventHooks::default());
    let InsertBidResult::Inserted(bid) = bids.submit_bid(new_bid(lot.id)).await.unwrap() else {
        panic!("Expected a fresh bid");
    };
    let api = ContractApi::new(db.clone());
    let err = api.create_from_bid(org.id + 1, bid.id, ContractOverrides::default()).await.unwrap_err();
    assert!(matches!(err, MarketDbError::Forbidden(_)));
}

#[tokio::test]
async fn the_signature_lifecycle_runs_in_order() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    let lot = published_lot(&db, org.id).await;
    let bids = BidFlowApi::new(db.clone(), EventHooks::default());
    let InsertBidResult::Inserted(bid) = bids.submit_bid(new_bid(lot.id)).await.unwrap() else {
        panic!("Expected a fresh bid");
    };
    let (_, contract) = bids.respond_to_bid(bid.id, org.id, BidStatus::Accepted).await.unwrap();
    let contract = contract.unwrap();
    let api = ContractApi::new(db.clone());

    let c = api.update_status(contract.id, org.id, ContractStatus::PendingSignature, None).await.unwrap();
    assert_eq!(c.status, ContractStatus::PendingSignature);
    assert!(c.signed_at.is_none());

    let c = api.update_status(contract.id, org.id, ContractStatus::Signed, Some("l.hansen")).await.unwrap();
    assert_eq!(c.status, ContractStatus::Signed);
    assert_eq!(c.signed_by.as_deref(), Some("l.hansen"));
    assert!(c.signed_at.is_some());

    let c = api.update_status(contract.id, org.id, ContractStatus::Active, None).await.unwrap();
    assert_eq!(c.status, ContractStatus::Active);

    let c = api.update_status(contract.id, org.id, ContractStatus::Completed, None).await.unwrap();
    assert_eq!(c.status, ContractStatus::Completed);
    assert!(c.completed_at.is_some());
}

#[tokio::test]
async fn skipping_lifecycle_steps_is_rejected() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    let lot = published_lot(&db, org.id).await;
    let bids = BidFlowApi::new(db.clone(), EventHooks::default());
    let InsertBidResult::Inserted(bid) = bids.submit_bid(new_bid(lot.id)).await.unwrap() else {
        panic!("Expected a fresh bid");
    };
    let (_, contract) = bids.respond_to_bid(bid.id, org.id, BidStatus::Accepted).await.unwrap();
    let contract = contract.unwrap();
    let api = ContractApi::new(db.clone());
    // draft -> signed skips pending_signature
    let err = api.update_status(contract.id, org.id, ContractStatus::Signed, None).await.unwrap_err();
    assert!(matches!(
        err,
        MarketDbError::InvalidContractTransition { from: ContractStatus::Draft, to: ContractStatus::Signed, .. }
    ));
    // cancelled is reachable from any non-terminal state
    let c = api.update_status(contract.id, org.id, ContractStatus::Cancelled, None).await.unwrap();
    assert_eq!(c.status, ContractStatus::Cancelled);
    // but terminal states are final
    let err = api.update_status(contract.id, org.id, ContractStatus::Active, None).await.unwrap_err();
    assert!(matches!(err, MarketDbError::InvalidContractTransition { .. }));
}

#[tokio::test]
async fn contract_queries_match_seller_or_buyer() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    let lot = published_lot(&db, org.id).await;
    let bids = BidFlowApi::new(db.clone(), EventHooks::default());
    let InsertBidResult::Inserted(bid) = bids.submit_bid(new_bid(lot.id)).await.unwrap() else {
        panic!("Expected a fresh bid");
    };
    bids.respond_to_bid(bid.id, org.id, BidStatus::Accepted).await.unwrap();
    let api = ContractApi::new(db.clone());
    let filter = ContractQueryFilter { organization_id: Some(org.id), status: None };
    assert_eq!(api.fetch_contracts(filter).await.unwrap().len(), 1);
    let filter = ContractQueryFilter { organization_id: Some(org.id + 1), status: None };
    assert!(api.fetch_contracts(filter).await.unwrap().is_empty());
    let filter = ContractQueryFilter { organization_id: None, status: Some(ContractStatus::Draft) };
    assert_eq!(api.fetch_contracts(filter).await.unwrap().len(), 1);
}
