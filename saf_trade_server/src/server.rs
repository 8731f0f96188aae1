use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use dashboard_tools::DashboardApi;
use log::*;
use saf_trade_engine::{
    api::{BidFlowApi, ContractApi, LotApi, MembershipApi, OtpApi},
    events::EventHooks,
    SqliteDatabase,
};
use tokio::sync::Notify;

use crate::{auth::TokenIssuer, config::ServerConfig, errors::ServerError, outbox_worker::start_outbox_worker, routes};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let nudge = Arc::new(Notify::new());
    let hooks = notification_hooks(nudge.clone());
    let dashboard = DashboardApi::new(config.dashboard_config.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    start_outbox_worker(db.clone(), dashboard, config.outbox_interval, nudge);
    let srv = create_server_instance(config, db, hooks)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires the post-commit notification hook: flows that queue an outbox row nudge the
/// drain worker so delivery does not wait for the next timer tick.
pub fn notification_hooks(nudge: Arc<Notify>) -> EventHooks {
    EventHooks::default().on_notification_queued(move |ev| {
        let nudge = nudge.clone();
        Box::pin(async move {
            trace!("📬️ {} queued a notification, waking the drain worker", ev.event);
            nudge.notify_one();
        })
    })
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    hooks: EventHooks,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let lots_api = LotApi::new(db.clone(), hooks.clone());
        let bids_api = BidFlowApi::new(db.clone(), hooks.clone());
        let contracts_api = ContractApi::new(db.clone());
        let members_api = MembershipApi::new(db.clone());
        let otp_api = OtpApi::new(db.clone());
        let issuer = TokenIssuer::new(&config.auth);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sts::access_log"))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(lots_api))
            .app_data(web::Data::new(bids_api))
            .app_data(web::Data::new(contracts_api))
            .app_data(web::Data::new(members_api))
            .app_data(web::Data::new(otp_api))
            .app_data(web::Data::new(issuer))
            .configure(routes::configure)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
