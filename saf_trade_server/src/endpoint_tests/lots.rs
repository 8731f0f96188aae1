use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use crate::endpoint_tests::helpers::{api_key, auth, new_db, published_lot, seller_org, send, token_for};

#[actix_web::test]
async fn anyone_can_browse_lots() {
    let db = new_db().await;
    let (org_id, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    // No credentials at all
    let req = TestRequest::get().uri("/lots").to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["organizationId"], org_id.to_string());
    let req = TestRequest::get().uri(&format!("/lots/{lot_id}")).to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "HEFA-SPK batch Q3");
    assert_eq!(body["status"], "published");
    assert!(body["publishedAt"].is_string());
}

#[actix_web::test]
async fn creating_a_lot_requires_a_membership() {
    let db = new_db().await;
    let token = token_for("drifter@nowhere.example", None);
    let body = json!({
        "title": "Orphan lot",
        "volume": {"amount": 10.0, "unit": "tonnes"},
        "pricePerUnit": 2000.0,
    });
    let req = TestRequest::post().uri("/lots").insert_header(auth(&token)).set_json(body).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn a_lot_without_a_positive_volume_is_rejected() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let body = json!({
        "title": "Empty lot",
        "volume": {"amount": 0.0, "unit": "tonnes"},
        "pricePerUnit": 2000.0,
    });
    let req = TestRequest::post().uri("/lots").insert_header(auth(&token)).set_json(body).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn only_the_owner_may_update_a_lot() {
    let db = new_db().await;
    let (_, seller) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let (_, rival) = seller_org(&db, "Baltia Biofuels", "ops@baltia.example").await;
    let lot_id = published_lot(&db, &seller).await;
    let req = TestRequest::put()
        .uri(&format!("/lots/{lot_id}"))
        .insert_header(auth(&rival))
        .set_json(json!({"title": "Hijacked"}))
        .to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let req = TestRequest::delete().uri(&format!("/lots/{lot_id}")).insert_header(auth(&rival)).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn published_lots_cannot_regress() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let req = TestRequest::put()
        .uri(&format!("/lots/{lot_id}"))
        .insert_header(auth(&token))
        .set_json(json!({"status": "draft"}))
        .to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn deleting_a_lot_removes_it() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let req = TestRequest::delete().uri(&format!("/lots/{lot_id}")).insert_header(auth(&token)).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    let req = TestRequest::get().uri(&format!("/lots/{lot_id}")).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn the_external_feed_needs_the_api_key() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let _lot_id = published_lot(&db, &token).await;
    let req = TestRequest::get().uri("/lots/external").to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let req = TestRequest::get().uri("/lots/external").insert_header(api_key()).to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}
