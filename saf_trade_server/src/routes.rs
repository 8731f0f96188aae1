//! Request handlers for every endpoint the server exposes.
//!
//! Handlers are deliberately thin: they authenticate, convert wire shapes, call the
//! engine APIs, and translate the result. Business rules live in the engine.

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::*;
use saf_trade_engine::{
    api::{
        market_objects::{BidSnapshot, ContractSnapshot, LotSnapshot},
        BidFlowApi,
        ContractApi,
        ContractOverrides,
        LotApi,
        MembershipApi,
        OtpApi,
    },
    db_types::{BidStatus, NewOrganization},
    traits::{BidQueryFilter, ContractQueryFilter, InsertBidResult, LotQueryFilter, OtpVerification},
    SqliteDatabase,
};
use serde_json::json;

use crate::{
    auth::{maybe_auth_context, shared_secret_ok, AuthContext, SessionClaims, TokenIssuer},
    config::ServerConfig,
    data_objects::{
        BidQueryParams,
        BidUpdateRequest,
        BulkCertificateResult,
        CertificateQueryParams,
        ContractQueryParams,
        LoginResponse,
        LotQueryParams,
        NewBidRequest,
        NewCertificateRequest,
        NewContractRequest,
        NewLotRequest,
        NewMemberRequest,
        OtpRequest,
        OtpVerifyRequest,
        UpdateContractRequest,
        UpdateLotRequest,
    },
    errors::{AuthError, ServerError},
};

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------    Auth    ----------------------------------------

/// Issues a one-time login code for the email. Code delivery is handled out of band;
/// the code is logged so local setups work without a mail provider.
#[post("/auth/otp")]
pub async fn issue_otp(
    body: web::Json<OtpRequest>,
    api: web::Data<OtpApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServerError::InvalidRequestBody("a valid email address is required".to_string()));
    }
    let code = api.issue(&email).await.map_err(ServerError::from)?;
    info!("🔑️ Login code for {email}: {code}");
    Ok(HttpResponse::Ok().json(json!({"sent": true})))
}

/// Verifies a login code and issues a session token carrying the user's membership.
#[post("/auth/verify")]
pub async fn verify_otp(
    body: web::Json<OtpVerifyRequest>,
    otp: web::Data<OtpApi<SqliteDatabase>>,
    members: web::Data<MembershipApi<SqliteDatabase>>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let email = body.email.trim().to_lowercase();
    let outcome = otp.verify(&email, body.code.trim()).await.map_err(ServerError::from)?;
    if outcome != OtpVerification::Verified {
        return Err(ServerError::AuthenticationError(AuthError::ValidationError(format!("{outcome:?}"))));
    }
    let membership = members.org_for_user(&email).await.map_err(ServerError::from)?;
    let claims = SessionClaims::new(&email, membership.as_ref());
    let expires_at = claims.exp;
    let token = issuer.issue(&claims)?;
    Ok(HttpResponse::Ok().json(LoginResponse { token, expires_at }))
}

//----------------------------------------    Lots    ----------------------------------------

#[get("/lots")]
pub async fn get_lots(
    params: web::Query<LotQueryParams>,
    api: web::Data<LotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let mut filter = LotQueryFilter::default();
    if let Some(org) = params.organization_id {
        filter = filter.with_organization(org);
    }
    if let Some(status) = params.status {
        filter = filter.with_status(status);
    }
    let lots = api.fetch_lots(filter).await.map_err(ServerError::from)?;
    let lots = lots.iter().map(LotSnapshot::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(lots))
}

#[get("/lots/{id}")]
pub async fn get_lot(
    path: web::Path<i64>,
    api: web::Data<LotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let lot = api
        .fetch_lot(id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Lot {id} does not exist")))?;
    Ok(HttpResponse::Ok().json(LotSnapshot::from(&lot)))
}

#[post("/lots")]
pub async fn create_lot(
    ctx: AuthContext,
    body: web::Json<NewLotRequest>,
    api: web::Data<LotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let org = ctx.org_id()?;
    let new_lot = body.to_new_lot(org)?;
    let lot = api.create_lot(new_lot).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Created().json(LotSnapshot::from(&lot)))
}

#[put("/lots/{id}")]
pub async fn update_lot(
    ctx: AuthContext,
    path: web::Path<i64>,
    body: web::Json<UpdateLotRequest>,
    api: web::Data<LotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let org = ctx.org_id()?;
    let current = api
        .fetch_lot(id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Lot {id} does not exist")))?;
    let update = body.to_lot_update(&current)?;
    let lot = api.update_lot(id, org, update).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Ok().json(LotSnapshot::from(&lot)))
}

#[delete("/lots/{id}")]
pub async fn delete_lot(
    ctx: AuthContext,
    path: web::Path<i64>,
    api: web::Data<LotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let org = ctx.org_id()?;
    let lot = api.delete_lot(id, org).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Ok().json(LotSnapshot::from(&lot)))
}

/// Published lots for the remote buyer-side system.
#[get("/lots/external")]
pub async fn get_external_lots(
    req: HttpRequest,
    config: web::Data<ServerConfig>,
    api: web::Data<LotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    require_shared_secret(&req, &config)?;
    let filter = LotQueryFilter::default().with_status(saf_trade_engine::db_types::LotStatus::Published);
    let lots = api.fetch_lots(filter).await.map_err(ServerError::from)?;
    let lots = lots.iter().map(LotSnapshot::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(lots))
}

//----------------------------------------    Bids    ----------------------------------------

/// Accepts bids from logged-in members and from the remote system. A session
/// identifies the bidder; the shared-secret path supplies bidder fields in the body.
#[post("/bids")]
pub async fn create_bid(
    req: HttpRequest,
    config: web::Data<ServerConfig>,
    body: web::Json<NewBidRequest>,
    api: web::Data<BidFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let bidder_id = match maybe_auth_context(&req) {
        Some(ctx) => ctx.user_id().to_string(),
        None => {
            require_shared_secret(&req, &config)?;
            body.bidder_id
                .clone()
                .ok_or_else(|| ServerError::InvalidRequestBody("bidderId is required".to_string()))?
        },
    };
    let new_bid = body.to_new_bid(bidder_id)?;
    match api.submit_bid(new_bid).await.map_err(ServerError::from)? {
        InsertBidResult::Inserted(bid) => Ok(HttpResponse::Created().json(BidSnapshot::from(bid.as_ref()))),
        InsertBidResult::AlreadyExists(bid) => Ok(HttpResponse::Conflict().json(json!({
            "error": format!("A bid with external id {} already exists for this lot", bid.external_bid_id.as_deref().unwrap_or_default()),
            "bid": BidSnapshot::from(bid.as_ref()),
        }))),
    }
}

#[get("/bids")]
pub async fn get_bids(
    ctx: AuthContext,
    params: web::Query<BidQueryParams>,
    bids: web::Data<BidFlowApi<SqliteDatabase>>,
    lots: web::Data<LotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let mut filter = BidQueryFilter::default();
    if let Some(status) = params.status {
        filter = filter.with_status(status);
    }
    let filter = match params.lot_id {
        Some(lot_id) => {
            // Bids on a specific lot are only visible to the lot's owner
            let lot = lots
                .fetch_lot(lot_id)
                .await
                .map_err(ServerError::from)?
                .ok_or_else(|| ServerError::NoRecordFound(format!("Lot {lot_id} does not exist")))?;
            if lot.organization_id != ctx.org_id()? {
                return Err(ServerError::InsufficientPermissions(
                    "your organization does not own this lot".to_string(),
                ));
            }
            filter.with_lot(lot_id)
        },
        // Without a lot filter, users see their own bids
        None => filter.with_bidder(ctx.user_id()),
    };
    let found = bids.fetch_bids(filter).await.map_err(ServerError::from)?;
    let found = found.iter().map(BidSnapshot::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(found))
}

#[get("/bids/{id}")]
pub async fn get_bid(
    ctx: AuthContext,
    path: web::Path<i64>,
    bids: web::Data<BidFlowApi<SqliteDatabase>>,
    lots: web::Data<LotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let bid = bids
        .fetch_bid(id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Bid {id} does not exist")))?;
    let lot = lots
        .fetch_lot(bid.lot_id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Lot {} does not exist", bid.lot_id)))?;
    let is_bidder = bid.bidder_id == ctx.user_id();
    let is_owner = ctx.claims.organization_id == Some(lot.organization_id);
    if !is_bidder && !is_owner {
        return Err(ServerError::InsufficientPermissions("you are not a party to this bid".to_string()));
    }
    Ok(HttpResponse::Ok().json(BidSnapshot::from(&bid)))
}

/// Respond to a bid. A session acts for the lot-owner organization and may accept,
/// reject, withdraw, or counter; the shared-secret path may only withdraw on the
/// bidder's behalf.
#[put("/bids/{id}")]
pub async fn update_bid(
    req: HttpRequest,
    config: web::Data<ServerConfig>,
    path: web::Path<i64>,
    body: web::Json<BidUpdateRequest>,
    api: web::Data<BidFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    if body.status.is_some() == body.counter_offer.is_some() {
        return Err(ServerError::InvalidRequestBody(
            "provide exactly one of status or counterOffer".to_string(),
        ));
    }
    let ctx = maybe_auth_context(&req);
    let Some(ctx) = ctx else {
        require_shared_secret(&req, &config)?;
        if body.status != Some(BidStatus::Withdrawn) {
            return Err(ServerError::InsufficientPermissions(
                "the external system may only withdraw bids".to_string(),
            ));
        }
        let bid = api.withdraw_bid(id).await.map_err(ServerError::from)?;
        return Ok(HttpResponse::Ok().json(json!({"bid": BidSnapshot::from(&bid)})));
    };
    let org = ctx.org_id()?;
    if let Some(offer) = &body.counter_offer {
        let current = api
            .fetch_bid(id)
            .await
            .map_err(ServerError::from)?
            .ok_or_else(|| ServerError::NoRecordFound(format!("Bid {id} does not exist")))?;
        let offer = offer.to_counter_offer(&current)?;
        let bid = api.propose_counter_offer(id, org, offer).await.map_err(ServerError::from)?;
        return Ok(HttpResponse::Ok().json(json!({"bid": BidSnapshot::from(&bid)})));
    }
    let status = body.status.unwrap_or(BidStatus::Rejected);
    let (bid, contract) = api.respond_to_bid(id, org, status).await.map_err(ServerError::from)?;
    let mut response = json!({"bid": BidSnapshot::from(&bid)});
    if let Some(contract) = &contract {
        response["contract"] = json!(ContractSnapshot::from(contract));
    }
    Ok(HttpResponse::Ok().json(response))
}

/// The remote buyer-side system accepts the seller's counter-offer.
#[post("/bids/{id}/accept-counter")]
pub async fn accept_counter_offer(
    req: HttpRequest,
    config: web::Data<ServerConfig>,
    path: web::Path<i64>,
    api: web::Data<BidFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    require_shared_secret(&req, &config)?;
    let id = path.into_inner();
    let accepted = api.accept_counter_offer(id).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Created().json(json!({
        "bid": BidSnapshot::from(&accepted.bid),
        "contract": ContractSnapshot::from(&accepted.contract),
    })))
}

//----------------------------------------  Contracts  ----------------------------------------

#[post("/contracts")]
pub async fn create_contract(
    ctx: AuthContext,
    body: web::Json<NewContractRequest>,
    api: web::Data<ContractApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let org = ctx.org_id()?;
    let overrides = ContractOverrides {
        title: body.title.clone(),
        description: body.description.clone(),
        terms: body.terms.clone(),
        delivery_date: body.delivery_date,
        delivery_location: body.delivery_location.clone(),
    };
    let contract = api.create_from_bid(org, body.bid_id, overrides).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Created().json(ContractSnapshot::from(&contract)))
}

#[get("/contracts")]
pub async fn get_contracts(
    ctx: AuthContext,
    params: web::Query<ContractQueryParams>,
    api: web::Data<ContractApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let filter = ContractQueryFilter { organization_id: Some(ctx.org_id()?), status: params.status };
    let contracts = api.fetch_contracts(filter).await.map_err(ServerError::from)?;
    let contracts = contracts.iter().map(ContractSnapshot::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(contracts))
}

#[get("/contracts/{id}")]
pub async fn get_contract(
    ctx: AuthContext,
    path: web::Path<i64>,
    api: web::Data<ContractApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let contract = api
        .fetch_contract(id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Contract {id} does not exist")))?;
    let org = ctx.org_id()?;
    if contract.seller_org_id != org && contract.buyer_org_id != Some(org) {
        return Err(ServerError::InsufficientPermissions("you are not a party to this contract".to_string()));
    }
    Ok(HttpResponse::Ok().json(ContractSnapshot::from(&contract)))
}

#[put("/contracts/{id}")]
pub async fn update_contract(
    ctx: AuthContext,
    path: web::Path<i64>,
    body: web::Json<UpdateContractRequest>,
    api: web::Data<ContractApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let org = ctx.org_id()?;
    let contract =
        api.update_status(id, org, body.status, body.signer.as_deref()).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Ok().json(ContractSnapshot::from(&contract)))
}

#[get("/contracts/external/{id}")]
pub async fn get_external_contract(
    req: HttpRequest,
    config: web::Data<ServerConfig>,
    path: web::Path<i64>,
    api: web::Data<ContractApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    require_shared_secret(&req, &config)?;
    let id = path.into_inner();
    let contract = api
        .fetch_contract(id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Contract {id} does not exist")))?;
    Ok(HttpResponse::Ok().json(ContractSnapshot::from(&contract)))
}

//--------------------------------------  Organizations  --------------------------------------

/// Creates an organization. The creator becomes its first admin, otherwise nobody
/// could ever manage members.
#[post("/organizations")]
pub async fn create_organization(
    ctx: AuthContext,
    body: web::Json<NewOrganization>,
    api: web::Data<MembershipApi<SqliteDatabase>>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    if ctx.claims.organization_id.is_some() {
        return Err(ServerError::Conflict("you already belong to an organization".to_string()));
    }
    let org = api.create_organization(body.into_inner()).await.map_err(ServerError::from)?;
    let membership = api.bootstrap_admin(org.id, ctx.user_id()).await.map_err(ServerError::from)?;
    // Re-issue the session so the new membership takes effect immediately
    let claims = SessionClaims::new(ctx.user_id(), Some(&membership));
    let token = issuer.issue(&claims)?;
    Ok(HttpResponse::Created().json(json!({"organization": org, "membership": membership, "token": token})))
}

#[get("/organizations/{id}")]
pub async fn get_organization(
    _ctx: AuthContext,
    path: web::Path<i64>,
    api: web::Data<MembershipApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let org = api
        .fetch_organization(id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Organization {id} does not exist")))?;
    Ok(HttpResponse::Ok().json(org))
}

#[post("/organizations/{id}/members")]
pub async fn add_member(
    ctx: AuthContext,
    path: web::Path<i64>,
    body: web::Json<NewMemberRequest>,
    api: web::Data<MembershipApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let org_id = path.into_inner();
    let acting = acting_membership(&ctx, &api).await?;
    let membership = api.add_member(&acting, org_id, &body.user_id, body.role).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Created().json(membership))
}

#[delete("/organizations/{id}/members/{user_id}")]
pub async fn remove_member(
    ctx: AuthContext,
    path: web::Path<(i64, String)>,
    api: web::Data<MembershipApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let (org_id, user_id) = path.into_inner();
    let acting = acting_membership(&ctx, &api).await?;
    let removed = api.remove_member(&acting, org_id, &user_id).await.map_err(ServerError::from)?;
    if !removed {
        return Err(ServerError::NoRecordFound(format!("{user_id} is not a member of organization {org_id}")));
    }
    Ok(HttpResponse::Ok().json(json!({"removed": true})))
}

#[get("/organizations/{id}/members")]
pub async fn get_members(
    ctx: AuthContext,
    path: web::Path<i64>,
    api: web::Data<MembershipApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let org_id = path.into_inner();
    if ctx.org_id()? != org_id {
        return Err(ServerError::InsufficientPermissions("you are not a member of this organization".to_string()));
    }
    let members = api.members_of(org_id).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Ok().json(members))
}

/// The caller's own membership. `membership: null` is the documented "no
/// organization yet" answer, not an error.
#[get("/memberships/me")]
pub async fn my_membership(
    ctx: AuthContext,
    api: web::Data<MembershipApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let membership = api.org_for_user(ctx.user_id()).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Ok().json(json!({"membership": membership})))
}

//--------------------------------------  Certificates  --------------------------------------

#[post("/certificates")]
pub async fn create_certificate(
    ctx: AuthContext,
    body: web::Json<NewCertificateRequest>,
    api: web::Data<MembershipApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let org = ctx.org_id()?;
    let cert = api.add_certificate(body.to_new_certificate(org)).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Created().json(cert))
}

#[get("/certificates")]
pub async fn get_certificates(
    ctx: AuthContext,
    params: web::Query<CertificateQueryParams>,
    api: web::Data<MembershipApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let org = match (params.organization_id, params.lot_id) {
        // Without any filter, users see their own org's certificates
        (None, None) => Some(ctx.org_id()?),
        (org, _) => org,
    };
    let certs = api.fetch_certificates(org, params.lot_id).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Ok().json(certs))
}

/// Bulk upload. Files are processed independently; the response carries one result
/// per entry in input order.
#[post("/certificates/bulk")]
pub async fn create_certificates_bulk(
    ctx: AuthContext,
    body: web::Json<Vec<NewCertificateRequest>>,
    api: web::Data<MembershipApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let org = ctx.org_id()?;
    let mut results = Vec::with_capacity(body.len());
    for request in body.iter() {
        let outcome = api.add_certificate(request.to_new_certificate(org)).await;
        let result = match outcome {
            Ok(cert) => BulkCertificateResult::stored(cert),
            Err(e) => {
                warn!("📜️ Bulk certificate entry failed: {e}");
                BulkCertificateResult::failed(e.to_string(), request.file_name.clone())
            },
        };
        results.push(result);
    }
    Ok(HttpResponse::Ok().json(results))
}

//----------------------------------------  Helpers  ----------------------------------------

fn require_shared_secret(req: &HttpRequest, config: &ServerConfig) -> Result<(), ServerError> {
    if shared_secret_ok(req, &config.api_key) {
        Ok(())
    } else {
        Err(ServerError::AuthenticationError(AuthError::ForbiddenPeer))
    }
}

async fn acting_membership(
    ctx: &AuthContext,
    api: &web::Data<MembershipApi<SqliteDatabase>>,
) -> Result<saf_trade_engine::db_types::Membership, ServerError> {
    api.org_for_user(ctx.user_id())
        .await
        .map_err(ServerError::from)?
        .ok_or(ServerError::AuthenticationError(AuthError::NoOrganization))
}

// Keeps route registration in one place; mirrors the order of the handlers above.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(issue_otp)
        .service(verify_otp)
        // /lots/external must register before /lots/{id}
        .service(get_external_lots)
        .service(get_lots)
        .service(get_lot)
        .service(create_lot)
        .service(update_lot)
        .service(delete_lot)
        .service(create_bid)
        .service(get_bids)
        .service(get_bid)
        .service(update_bid)
        .service(accept_counter_offer)
        .service(get_external_contract)
        .service(create_contract)
        .service(get_contracts)
        .service(get_contract)
        .service(update_contract)
        .service(create_organization)
        .service(get_organization)
        .service(add_member)
        .service(remove_member)
        .service(get_members)
        .service(my_membership)
        .service(create_certificate)
        .service(get_certificates)
        .service(create_certificates_bulk);
}
