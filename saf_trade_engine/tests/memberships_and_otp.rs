mod helpers;

use helpers::*;
use saf_trade_engine::{
    api::{MembershipApi, OtpApi},
    db_types::{NewCertificate, Role},
    traits::{MarketDbError, MembershipManagement, OtpVerification},
};

#[tokio::test]
async fn a_user_holds_at_most_one_membership_per_org() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    let api = MembershipApi::new(db.clone());
    let admin = db.insert_membership(org.id, "auth0|admin", Role::Admin).await.unwrap();
    api.add_member(&admin, org.id, "auth0|trader-1", Role::Buyer).await.unwrap();
    let err = api.add_member(&admin, org.id, "auth0|trader-1", Role::Viewer).await.unwrap_err();
    assert!(matches!(err, MarketDbError::DuplicateMembership { .. }));
    assert_eq!(api.members_of(org.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn member_management_is_admin_only() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    let api = MembershipApi::new(db.clone());
    let viewer = db.insert_membership(org.id, "auth0|viewer", Role::Viewer).await.unwrap();
    let err = api.add_member(&viewer, org.id, "auth0|new-user", Role::Buyer).await.unwrap_err();
    assert!(matches!(err, MarketDbError::Forbidden(_)));
    let err = api.remove_member(&viewer, org.id, "auth0|viewer").await.unwrap_err();
    assert!(matches!(err, MarketDbError::Forbidden(_)));
}

#[tokio::test]
async fn no_organization_is_a_distinct_signal() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    let api = MembershipApi::new(db.clone());
    assert!(api.org_for_user("auth0|stranger").await.unwrap().is_none());
    db.insert_membership(org.id, "auth0|member", Role::Finance).await.unwrap();
    let membership = api.org_for_user("auth0|member").await.unwrap().expect("Membership must resolve");
    assert_eq!(membership.organization_id, org.id);
    assert_eq!(membership.role, Role::Finance);
}

#[tokio::test]
async fn memberships_against_unknown_orgs_fail() {
    let db = new_db().await;
    let err = db.insert_membership(404, "auth0|member", Role::Buyer).await.unwrap_err();
    assert!(matches!(err, MarketDbError::OrganizationNotFound(404)));
}

#[tokio::test]
async fn certificates_attach_to_orgs_and_optionally_lots() {
    let db = new_db().await;
    let org = seed_org(&db).await;
    let lot = published_lot(&db, org.id).await;
    let api = MembershipApi::new(db.clone());
    let cert = api
        .add_certificate(NewCertificate {
            organization_id: org.id,
            lot_id: Some(lot.id),
            standard: "ISCC".to_string(),
            issuer: Some("ISCC System GmbH".to_string()),
            file_name: Some("iscc-2026.pdf".to_string()),
            valid_until: None,
        })
        .await
        .unwrap();
    assert_eq!(cert.organization_id, org.id);
    let by_lot = api.fetch_certificates(None, Some(lot.id)).await.unwrap();
    assert_eq!(by_lot.len(), 1);
    let by_org = api.fetch_certificates(Some(org.id), None).await.unwrap();
    assert_eq!(by_org.len(), 1);
    assert!(api.fetch_certificates(Some(org.id + 1), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn login_codes_verify_once_and_burn_attempts() {
    let db = new_db().await;
    let api = OtpApi::new(db.clone());
    let code = api.issue("pilot@skandia.example").await.unwrap();
    assert_eq!(code.len(), 6);
    // A wrong guess burns an attempt but keeps the code alive
    assert_eq!(api.verify("pilot@skandia.example", "000000").await.unwrap(), OtpVerification::WrongCode);
    assert_eq!(api.verify("pilot@skandia.example", &code).await.unwrap(), OtpVerification::Verified);
    // Verification consumed the code
    assert_eq!(api.verify("pilot@skandia.example", &code).await.unwrap(), OtpVerification::NoActiveCode);
}

#[tokio::test]
async fn login_codes_die_after_too_many_wrong_guesses() {
    let db = new_db().await;
    let api = OtpApi::new(db.clone());
    let code = api.issue("pilot@skandia.example").await.unwrap();
    for _ in 0..5 {
        assert_eq!(api.verify("pilot@skandia.example", "000000").await.unwrap(), OtpVerification::WrongCode);
    }
    // The budget is spent; even the right code no longer verifies
    assert_eq!(api.verify("pilot@skandia.example", &code).await.unwrap(), OtpVerification::TooManyAttempts);
    // Re-issuing resets the counter
    let code = api.issue("pilot@skandia.example").await.unwrap();
    assert_eq!(api.verify("pilot@skandia.example", &code).await.unwrap(), OtpVerification::Verified);
}

#[tokio::test]
async fn unknown_emails_have_no_active_code() {
    let db = new_db().await;
    let api = OtpApi::new(db);
    assert_eq!(api.verify("nobody@example.com", "123456").await.unwrap(), OtpVerification::NoActiveCode);
}
