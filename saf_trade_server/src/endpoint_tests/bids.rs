use actix_web::{http::StatusCode, test::TestRequest};
use saf_trade_engine::SqliteDatabase;
use serde_json::{json, Value};

use crate::endpoint_tests::helpers::{api_key, auth, new_db, published_lot, seller_org, send};

/// Submits a bid over the machine-to-machine path and returns its id.
async fn external_bid(db: &SqliteDatabase, lot_id: i64, external_id: &str) -> i64 {
    let body = json!({
        "lotId": lot_id,
        "bidderId": "buyer-system|4411",
        "bidderName": "Skandia Air",
        "volume": {"amount": 200.0, "unit": "tonnes"},
        "pricePerUnit": 2400.0,
        "externalBidId": external_id,
    });
    let req = TestRequest::post().uri("/bids").insert_header(api_key()).set_json(body).to_request();
    let (status, bid) = send(db, req).await;
    assert_eq!(status, StatusCode::CREATED);
    bid["id"].as_str().and_then(|s| s.parse::<i64>().ok()).expect("bid id missing")
}

#[actix_web::test]
async fn the_remote_system_submits_a_bid() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let bid_id = external_bid(&db, lot_id, "SKA-77").await;
    // The same external id again does not create a second bid
    let body = json!({
        "lotId": lot_id,
        "bidderId": "buyer-system|4411",
        "volume": {"amount": 200.0, "unit": "tonnes"},
        "pricePerUnit": 2400.0,
        "externalBidId": "SKA-77",
    });
    let req = TestRequest::post().uri("/bids").insert_header(api_key()).set_json(body).to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["bid"]["id"], bid_id.to_string());
}

#[actix_web::test]
async fn bids_without_any_credentials_are_rejected() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let body = json!({
        "lotId": lot_id,
        "bidderId": "buyer-system|4411",
        "volume": {"amount": 200.0, "unit": "tonnes"},
        "pricePerUnit": 2400.0,
    });
    let req = TestRequest::post().uri("/bids").set_json(body).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn the_seller_accepts_a_bid() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let bid_id = external_bid(&db, lot_id, "SKA-77").await;
    let req = TestRequest::put()
        .uri(&format!("/bids/{bid_id}"))
        .insert_header(auth(&token))
        .set_json(json!({"status": "accepted"}))
        .to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bid"]["status"], "accepted");
    let number = body["contract"]["contractNumber"].as_str().expect("no contract in response");
    assert!(number.starts_with("CNT-"));
    // Accepting takes the lot off the market
    let req = TestRequest::get().uri(&format!("/lots/{lot_id}")).to_request();
    let (_, lot) = send(&db, req).await;
    assert_eq!(lot["status"], "reserved");
    // And the bid cannot be resolved a second time
    let req = TestRequest::put()
        .uri(&format!("/bids/{bid_id}"))
        .insert_header(auth(&token))
        .set_json(json!({"status": "rejected"}))
        .to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn other_organizations_may_not_respond() {
    let db = new_db().await;
    let (_, seller) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let (_, rival) = seller_org(&db, "Baltia Biofuels", "ops@baltia.example").await;
    let lot_id = published_lot(&db, &seller).await;
    let bid_id = external_bid(&db, lot_id, "SKA-77").await;
    let req = TestRequest::put()
        .uri(&format!("/bids/{bid_id}"))
        .insert_header(auth(&rival))
        .set_json(json!({"status": "accepted"}))
        .to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn a_body_with_both_status_and_counter_offer_is_rejected() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let bid_id = external_bid(&db, lot_id, "SKA-77").await;
    let body = json!({"status": "rejected", "counterOffer": {"pricePerUnit": 2600.0}});
    let req =
        TestRequest::put().uri(&format!("/bids/{bid_id}")).insert_header(auth(&token)).set_json(body).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn non_terminal_statuses_are_a_bad_request() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let bid_id = external_bid(&db, lot_id, "SKA-77").await;
    for status in ["pending", "expired"] {
        let req = TestRequest::put()
            .uri(&format!("/bids/{bid_id}"))
            .insert_header(auth(&token))
            .set_json(json!({"status": status}))
            .to_request();
        let (code, body) = send(&db, req).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("not a valid response"));
    }
}

#[actix_web::test]
async fn counter_offer_round_trip() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let bid_id = external_bid(&db, lot_id, "SKA-77").await;
    let body = json!({"counterOffer": {"pricePerUnit": 2600.0, "message": "Can do 2600 for that volume"}});
    let req =
        TestRequest::put().uri(&format!("/bids/{bid_id}")).insert_header(auth(&token)).set_json(body).to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bid"]["status"], "pending");
    assert_eq!(body["bid"]["counterOffer"]["pricing"]["pricePerUnit"], json!(2600.0));
    // The remote system takes the counter
    let req =
        TestRequest::post().uri(&format!("/bids/{bid_id}/accept-counter")).insert_header(api_key()).to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["bid"]["status"], "accepted");
    assert_eq!(body["contract"]["pricing"]["pricePerUnit"], json!(2600.0));
}

#[actix_web::test]
async fn accepting_a_counter_requires_the_api_key() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let bid_id = external_bid(&db, lot_id, "SKA-77").await;
    let req = TestRequest::post().uri(&format!("/bids/{bid_id}/accept-counter")).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn the_remote_system_withdraws_its_bid() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let bid_id = external_bid(&db, lot_id, "SKA-77").await;
    let req = TestRequest::put()
        .uri(&format!("/bids/{bid_id}"))
        .insert_header(api_key())
        .set_json(json!({"status": "withdrawn"}))
        .to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bid"]["status"], "withdrawn");
    // The shared secret cannot reject or accept on the seller's behalf
    let bid_id = external_bid(&db, lot_id, "SKA-78").await;
    let req = TestRequest::put()
        .uri(&format!("/bids/{bid_id}"))
        .insert_header(api_key())
        .set_json(json!({"status": "rejected"}))
        .to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn contracts_are_visible_to_their_parties_only() {
    let db = new_db().await;
    let (_, seller) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let (_, rival) = seller_org(&db, "Baltia Biofuels", "ops@baltia.example").await;
    let lot_id = published_lot(&db, &seller).await;
    let bid_id = external_bid(&db, lot_id, "SKA-77").await;
    let req = TestRequest::put()
        .uri(&format!("/bids/{bid_id}"))
        .insert_header(auth(&seller))
        .set_json(json!({"status": "accepted"}))
        .to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    let contract_id = body["contract"]["id"].as_str().expect("no contract id");
    let req = TestRequest::get().uri(&format!("/contracts/{contract_id}")).insert_header(auth(&seller)).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    let req = TestRequest::get().uri(&format!("/contracts/{contract_id}")).insert_header(auth(&rival)).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // The remote system reads it through the external path
    let req =
        TestRequest::get().uri(&format!("/contracts/external/{contract_id}")).insert_header(api_key()).to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], Value::String(contract_id.to_string()));
}
