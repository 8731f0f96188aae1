use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use crate::endpoint_tests::helpers::{auth, new_db, published_lot, seller_org, send, token_for};

#[actix_web::test]
async fn founding_an_organization_makes_you_its_admin() {
    let db = new_db().await;
    let token = token_for("founder@nordfuel.example", None);
    let body = json!({"name": "NordFuel AS", "kind": "producer", "country": "NO"});
    let req = TestRequest::post().uri("/organizations").insert_header(auth(&token)).set_json(&body).to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["membership"]["role"], "admin");
    let fresh = body["token"].as_str().expect("no refreshed token");
    // The refreshed session already carries the membership
    let req = TestRequest::get().uri("/memberships/me").insert_header(auth(fresh)).to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["membership"]["userId"], "founder@nordfuel.example");
    // One organization per user
    let req = TestRequest::post()
        .uri("/organizations")
        .insert_header(auth(fresh))
        .set_json(json!({"name": "Second Org", "kind": "trader"}))
        .to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn only_admins_manage_members() {
    let db = new_db().await;
    let (org_id, admin) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let body = json!({"userId": "viewer@nordfuel.example", "role": "viewer"});
    let req = TestRequest::post()
        .uri(&format!("/organizations/{org_id}/members"))
        .insert_header(auth(&admin))
        .set_json(&body)
        .to_request();
    let (status, membership) = send(&db, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(membership["role"], "viewer");
    // A viewer cannot add members
    let viewer = token_for("viewer@nordfuel.example", None);
    let req = TestRequest::post()
        .uri(&format!("/organizations/{org_id}/members"))
        .insert_header(auth(&viewer))
        .set_json(json!({"userId": "more@nordfuel.example", "role": "viewer"}))
        .to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // Removal works and is reported when the member is unknown
    let req = TestRequest::delete()
        .uri(&format!("/organizations/{org_id}/members/viewer@nordfuel.example"))
        .insert_header(auth(&admin))
        .to_request();
    let (status, body) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);
    let req = TestRequest::delete()
        .uri(&format!("/organizations/{org_id}/members/viewer@nordfuel.example"))
        .insert_header(auth(&admin))
        .to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn member_lists_stay_inside_the_organization() {
    let db = new_db().await;
    let (org_id, _admin) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let (_, rival) = seller_org(&db, "Baltia Biofuels", "ops@baltia.example").await;
    let req =
        TestRequest::get().uri(&format!("/organizations/{org_id}/members")).insert_header(auth(&rival)).to_request();
    let (status, _) = send(&db, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn bulk_certificate_upload_reports_per_entry_results() {
    let db = new_db().await;
    let (_, token) = seller_org(&db, "NordFuel AS", "ops@nordfuel.example").await;
    let lot_id = published_lot(&db, &token).await;
    let body = json!([
        {"standard": "ISCC", "lotId": lot_id, "issuer": "ISCC System GmbH"},
        {"standard": "CORSIA", "lotId": 9999, "fileName": "corsia.pdf"},
    ]);
    let req = TestRequest::post().uri("/certificates/bulk").insert_header(auth(&token)).set_json(&body).to_request();
    let (status, results) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    let results = results.as_array().expect("expected an array of results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["success"], true);
    assert!(results[0]["certificate"]["id"].is_i64());
    assert_eq!(results[0]["certificate"]["standard"], "ISCC");
    assert_eq!(results[1]["success"], false);
    assert!(results[1]["error"].as_str().unwrap_or_default().contains("9999"));
    assert_eq!(results[1]["filename"], "corsia.pdf");
    // The stored certificate is attached to the lot
    let req = TestRequest::get().uri(&format!("/certificates?lotId={lot_id}")).insert_header(auth(&token)).to_request();
    let (status, certs) = send(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(certs.as_array().map(Vec::len), Some(1));
}
