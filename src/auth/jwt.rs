use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use super::model::Claims;
use crate::config::JwtConfig;

pub const ACCESS_TOKEN_TYPE: &str = "access";
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

fn issue_token(
    config: &JwtConfig,
    operator_id: &str,
    username: &str,
    ttl_seconds: i64,
    token_type: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: operator_id.to_string(),
        username: username.to_string(),
        exp: now + ttl_seconds.max(0) as usize,
        iat: now,
        token_type: token_type.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Generate access token (short-lived)
pub fn generate_access_token(
    config: &JwtConfig,
    operator_id: &str,
    username: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token(
        config,
        operator_id,
        username,
        config.access_ttl_seconds,
        ACCESS_TOKEN_TYPE,
    )
}

/// Generate refresh token (long-lived)
pub fn generate_refresh_token(
    config: &JwtConfig,
    operator_id: &str,
    username: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token(
        config,
        operator_id,
        username,
        config.refresh_ttl_seconds,
        REFRESH_TOKEN_TYPE,
    )
}

/// Validate signature and expiry, and decode the claims.
pub fn validate_token(config: &JwtConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}
