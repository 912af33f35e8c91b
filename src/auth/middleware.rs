use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};

use super::jwt::{validate_token, ACCESS_TOKEN_TYPE};
use super::model::{Claims, OperatorIdentity};
use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::AppState;

const LEGACY_TOKEN_HEADER: &str = "x-auth-token";

/// Extract token from the Authorization header, falling back to `x-auth-token`.
fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(auth) = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        return auth
            .strip_prefix("Bearer ")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
    }

    req.headers()
        .get(LEGACY_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Validate token from HttpRequest and return claims
pub fn validate_request_token(req: &HttpRequest, config: &JwtConfig) -> Result<Claims, ApiError> {
    let token = extract_token(req)
        .ok_or(ApiError::Unauthenticated("Missing authorization token"))?;

    let claims = validate_token(config, &token).map_err(|e| {
        log::warn!("Token validation failed: {:?}", e.kind());
        ApiError::Unauthenticated("Invalid or expired token")
    })?;

    if claims.token_type != ACCESS_TOKEN_TYPE {
        log::warn!("Rejected {} token on a protected route", claims.token_type);
        return Err(ApiError::Unauthenticated("Invalid token type"));
    }

    Ok(claims)
}

/// Admits a request only when it carries a valid access token.
///
/// Taking `AdminOperator` as the first handler argument runs the guard before
/// any other extractor touches the payload, so a rejected request never
/// reaches the upload pipeline or the store.
#[derive(Debug, Clone)]
pub struct AdminOperator(pub OperatorIdentity);

impl FromRequest for AdminOperator {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(guard(req))
    }
}

fn guard(req: &HttpRequest) -> Result<AdminOperator, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::StorageFailure("application state not configured".to_string()))?;

    let claims = validate_request_token(req, &state.config.jwt)?;
    Ok(AdminOperator(OperatorIdentity::from(&claims)))
}

