use actix_web::{web, HttpResponse};
use bcrypt::verify;

use super::jwt::{
    generate_access_token, generate_refresh_token, validate_token, REFRESH_TOKEN_TYPE,
};
use super::middleware::AdminOperator;
use super::model::{LoginRequest, OperatorIdentity, RefreshRequest, TokenResponse};
use crate::error::ApiError;
use crate::{AppState, ErrorResponse};

/// Stable subject for the single configured operator.
const OPERATOR_SUBJECT: &str = "operator";

fn token_error(e: jsonwebtoken::errors::Error) -> ApiError {
    log::error!("Failed to generate token: {:?}", e);
    ApiError::StorageFailure("Failed to generate token".to_string())
}

/// Login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let operator = &state.config.operator;

    let Some(password_hash) = operator.password_hash.as_deref() else {
        log::warn!("Login attempted while no operator password is configured");
        return Err(ApiError::Unauthenticated("Invalid username or password"));
    };

    let password_valid = body.username == operator.username
        && verify(&body.password, password_hash).unwrap_or(false);
    if !password_valid {
        log::warn!("Failed login attempt for username {:?}", body.username);
        return Err(ApiError::Unauthenticated("Invalid username or password"));
    }

    let jwt = &state.config.jwt;
    let access_token =
        generate_access_token(jwt, OPERATOR_SUBJECT, &operator.username).map_err(token_error)?;
    let refresh_token =
        generate_refresh_token(jwt, OPERATOR_SUBJECT, &operator.username).map_err(token_error)?;

    log::info!("Operator {} logged in", operator.username);
    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt.access_ttl_seconds,
    }))
}

/// Refresh access token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed", body = TokenResponse),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh_token(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    let jwt = &state.config.jwt;
    let claims = validate_token(jwt, &body.refresh_token).map_err(|e| {
        log::warn!("Invalid refresh token: {:?}", e.kind());
        ApiError::Unauthenticated("Invalid or expired refresh token")
    })?;

    if claims.token_type != REFRESH_TOKEN_TYPE {
        return Err(ApiError::Unauthenticated("Invalid token type"));
    }

    let access_token =
        generate_access_token(jwt, &claims.sub, &claims.username).map_err(token_error)?;

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token,
        refresh_token: body.refresh_token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: jwt.access_ttl_seconds,
    }))
}

/// Identity of the signed-in operator
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current operator", body = OperatorIdentity),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn me(operator: AdminOperator) -> HttpResponse {
    HttpResponse::Ok().json(operator.0)
}

/// Configure auth routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh_token))
            .route("/me", web::get().to(me)),
    );
}
