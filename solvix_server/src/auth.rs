//! Bearer-token authentication.
//!
//! Clients log in with an email and password and receive an HS256-signed JWT. Every authenticated request carries it
//! in an `Authorization: Bearer <token>` header. Handlers take [`JwtClaims`] as an argument to require a logged-in
//! caller; admin-only routes are additionally wrapped in the ACL middleware.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpMessage, HttpRequest};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};
use solvix_engine::db_types::{Actor, User};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id
    pub sub: i64,
    pub email: String,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn actor(&self) -> Actor {
        if self.is_admin {
            Actor::admin(self.sub)
        } else {
            Actor::user(self.sub)
        }
    }
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            expiry: config.token_expiry,
        }
    }

    /// Issue a new access token for the given user.
    /// This method DOES NOT check the user's credentials. That must be done prior to calling `issue_token`.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::CouldNotIssueToken(e.to_string()))
    }

    /// Checks the signature and expiry of `token` and returns its claims.
    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims)
    }
}

/// Reads and validates the bearer token on `req`. Claims that were validated earlier in the request (by the ACL
/// middleware) are reused.
pub fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, AuthError> {
    if let Some(claims) = req.extensions().get::<JwtClaims>() {
        return Ok(claims.clone());
    }
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    let issuer = req.app_data::<web::Data<TokenIssuer>>().ok_or_else(|| {
        error!("🔐️ No token issuer is configured for this app. Every request will be rejected.");
        AuthError::InvalidToken("Token validation is not available".into())
    })?;
    let claims = issuer.validate(token).map_err(|e| {
        debug!("🔐️ Rejected access token. {e}");
        e
    })?;
    trace!("🔐️ Access token for user #{} is valid", claims.sub);
    req.extensions_mut().insert(claims.clone());
    Ok(claims)
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req).map_err(ServerError::from))
    }
}
