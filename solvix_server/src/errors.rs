use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use solvix_engine::{OrderFlowError, UserApiError};
use thiserror::Error;

use crate::integrations::stripe::ProviderError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    NoRecordFound(String),
    #[error("{0}")]
    TransitionNotAllowed(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    ConcurrentModification(String),
    #[error("{0}")]
    ProviderError(#[from] ProviderError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::CouldNotIssueToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::TransitionNotAllowed(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::ProviderError(e) => match e {
                ProviderError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
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
    #[error("Not authenticated")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    InvalidToken(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Could not issue access token. {0}")]
    CouldNotIssueToken(String),
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound("Order not found".into()),
            OrderFlowError::PaymentNotFound(_) => Self::NoRecordFound("Payment not found".into()),
            OrderFlowError::NotificationNotFound(_) => Self::NoRecordFound("Notification not found".into()),
            OrderFlowError::ServiceNotFound(_) => Self::NoRecordFound("Service not found".into()),
            OrderFlowError::NotAuthorized(s) => Self::InsufficientPermissions(s),
            e @ OrderFlowError::TransitionNotAllowed { .. } => Self::TransitionNotAllowed(e.to_string()),
            OrderFlowError::ValidationError(s) => Self::ValidationError(s),
            e @ OrderFlowError::ConcurrentModification(_) => Self::ConcurrentModification(e.to_string()),
        }
    }
}

impl From<UserApiError> for ServerError {
    fn from(e: UserApiError) -> Self {
        match e {
            UserApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            UserApiError::EmailAlreadyExists => Self::ValidationError("User already exists".into()),
            UserApiError::InvalidCredentials => Self::AuthenticationError(AuthError::InvalidCredentials),
            UserApiError::UserNotFound(_) => Self::NoRecordFound("User not found".into()),
            UserApiError::ValidationError(s) => Self::ValidationError(s),
            e @ UserApiError::PasswordHashError(_) => Self::BackendError(e.to_string()),
        }
    }
}
