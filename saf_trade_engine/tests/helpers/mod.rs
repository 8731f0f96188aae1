use saf_trade_engine::{
    db_types::{Lot, LotStatus, LotUpdate, NewBid, NewLot, NewOrganization, Organization, OrganizationKind},
    traits::{MarketplaceDatabase, MembershipManagement},
    SqliteDatabase,
};
use stp_common::{Pricing, Volume};

/// A fresh in-memory database. One connection, so every caller sees the same data.
pub async fn new_db() -> SqliteDatabase {
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating in-memory database")
}

pub async fn seed_org(db: &SqliteDatabase) -> Organization {
    db.insert_organization(NewOrganization {
        name: "NordFuel AS".to_string(),
        kind: OrganizationKind::Producer,
        country: Some("NO".to_string()),
    })
    .await
    .expect("Error creating organization")
}

pub fn new_lot(org_id: i64) -> NewLot {
    NewLot {
        organization_id: org_id,
        title: "HEFA-SPK Q3 batch".to_string(),
        description: Some("ISCC-certified HEFA from used cooking oil".to_string()),
        volume: Volume::new(500.0, "tonnes".to_string()),
        pricing: Pricing { price: 1_250_000.0, price_per_unit: 2500.0, currency: "USD".to_string() },
        standards: vec!["ISCC".to_string(), "CORSIA".to_string()],
        expires_at: None,
    }
}

/// Creates a lot for the org and publishes it so it can take bids.
pub async fn published_lot(db: &SqliteDatabase, org_id: i64) -> Lot {
    let lot = db.insert_lot(new_lot(org_id)).await.expect("Error creating lot");
    let update = LotUpdate { status: Some(LotStatus::Published), ..LotUpdate::default() };
    db.update_lot(lot.id, update, "lot.published").await.expect("Error publishing lot")
}

pub fn new_bid(lot_id: i64) -> NewBid {
    NewBid {
        lot_id,
        bidder_id: "auth0|airline-77".to_string(),
        bidder_name: Some("Skandia Air".to_string()),
        bidder_email: Some("fuel-desk@skandia.example".to_string()),
        volume: Volume::new(200.0, "tonnes".to_string()),
        pricing: Pricing { price: 480_000.0, price_per_unit: 2400.0, currency: "USD".to_string() },
        message: Some("Delivery to OSL".to_string()),
        delivery_date: None,
        delivery_location: Some("Oslo Gardermoen".to_string()),
        external_bid_id: None,
        expires_at: None,
    }
}
