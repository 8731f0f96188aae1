use std::time::Duration;

use actix_http::Request;
use actix_web::{http::StatusCode, test, web, App};
use dashboard_tools::DashboardConfig;
use saf_trade_engine::{
    api::{BidFlowApi, ContractApi, LotApi, MembershipApi, OtpApi},
    db_types::{Membership, NewOrganization, OrganizationKind},
    events::EventHooks,
    SqliteDatabase,
};
use serde_json::{json, Value};
use stp_common::Secret;

use crate::{
    auth::{SessionClaims, TokenIssuer},
    config::{AuthConfig, ServerConfig},
    routes,
};

pub const TEST_API_KEY: &str = "test-api-key";

// A fixed test signing key. DO NOT re-use it anywhere.
fn test_auth_config() -> AuthConfig {
    AuthConfig { session_secret: Secret::new("0d5fvKgxyByMgmKt7nV0kkmJgjCqlmWMSdZbrQa5tuE".to_string()) }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        auth: test_auth_config(),
        api_key: Some(Secret::new(TEST_API_KEY.to_string())),
        outbox_interval: Duration::from_secs(30),
        dashboard_config: DashboardConfig::default(),
    }
}

pub async fn new_db() -> SqliteDatabase {
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Could not create in-memory database")
}

pub fn token_for(email: &str, membership: Option<&Membership>) -> String {
    let issuer = TokenIssuer::new(&test_auth_config());
    issuer.issue(&SessionClaims::new(email, membership)).expect("Could not sign a test session token")
}

/// Creates an organization with `email` as its founding admin and returns
/// `(org_id, session_token)`.
pub async fn seller_org(db: &SqliteDatabase, name: &str, email: &str) -> (i64, String) {
    let api = MembershipApi::new(db.clone());
    let org = api
        .create_organization(NewOrganization {
            name: name.to_string(),
            kind: OrganizationKind::Producer,
            country: Some("NO".to_string()),
        })
        .await
        .expect("Could not create organization");
    let membership = api.bootstrap_admin(org.id, email).await.expect("Could not add founding admin");
    (org.id, token_for(email, Some(&membership)))
}

/// Creates a lot through the HTTP API and publishes it. Returns the lot id.
pub async fn published_lot(db: &SqliteDatabase, token: &str) -> i64 {
    let body = json!({
        "title": "HEFA-SPK batch Q3",
        "volume": {"amount": 500.0, "unit": "tonnes"},
        "pricePerUnit": 2500.0,
        "currency": "USD",
        "standards": ["ISCC", "CORSIA"],
    });
    let req = test::TestRequest::post().uri("/lots").insert_header(auth(token)).set_json(&body).to_request();
    let (status, lot) = send(db, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = lot["id"].as_str().and_then(|s| s.parse::<i64>().ok()).expect("lot id missing");
    let req = test::TestRequest::put()
        .uri(&format!("/lots/{id}"))
        .insert_header(auth(token))
        .set_json(json!({"status": "published"}))
        .to_request();
    let (status, _) = send(db, req).await;
    assert_eq!(status, StatusCode::OK);
    id
}

pub fn auth(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub fn api_key() -> (&'static str, &'static str) {
    ("X-API-Key", TEST_API_KEY)
}

/// Builds a full application around the shared database and dispatches one request.
/// Returns the status and the JSON body (`Null` when the body is not JSON).
pub async fn send(db: &SqliteDatabase, req: Request) -> (StatusCode, Value) {
    let config = test_config();
    let hooks = EventHooks::default();
    let app = App::new()
        .app_data(web::Data::new(config.clone()))
        .app_data(web::Data::new(LotApi::new(db.clone(), hooks.clone())))
        .app_data(web::Data::new(BidFlowApi::new(db.clone(), hooks)))
        .app_data(web::Data::new(ContractApi::new(db.clone())))
        .app_data(web::Data::new(MembershipApi::new(db.clone())))
        .app_data(web::Data::new(OtpApi::new(db.clone())))
        .app_data(web::Data::new(TokenIssuer::new(&config.auth)))
        .configure(routes::configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = test::read_body(res).await;
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, body)
}
