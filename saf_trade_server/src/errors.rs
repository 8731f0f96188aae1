use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use saf_trade_engine::traits::MarketDbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Conflict. {0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
                AuthError::ForbiddenPeer => StatusCode::UNAUTHORIZED,
                AuthError::NoOrganization => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No session token was provided.")]
    MissingToken,
    #[error("Session token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Session token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Session token has expired.")]
    ExpiredToken,
    #[error("This endpoint requires the shared API key.")]
    ForbiddenPeer,
    #[error("You do not belong to any organization.")]
    NoOrganization,
}

impl From<MarketDbError> for ServerError {
    fn from(e: MarketDbError) -> Self {
        match &e {
            MarketDbError::LotNotFound(_) |
            MarketDbError::BidNotFound(_) |
            MarketDbError::ContractNotFound(_) |
            MarketDbError::OrganizationNotFound(_) => Self::NoRecordFound(e.to_string()),
            MarketDbError::LotNotOpen { .. } |
            MarketDbError::NoCounterOffer(_) |
            MarketDbError::InvalidBidResponse(_) |
            MarketDbError::Pricing(_) => Self::InvalidRequestBody(e.to_string()),
            MarketDbError::BidAlreadyResolved { .. } |
            MarketDbError::InvalidLotTransition { .. } |
            MarketDbError::InvalidContractTransition { .. } |
            MarketDbError::DuplicateMembership { .. } => Self::Conflict(e.to_string()),
            MarketDbError::Forbidden(_) => Self::InsufficientPermissions(e.to_string()),
            MarketDbError::Database(_) |
            MarketDbError::ContractNumberExhausted(_) |
            MarketDbError::Serialization(_) => Self::BackendError(e.to_string()),
        }
    }
}
