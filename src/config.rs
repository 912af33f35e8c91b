//! Runtime configuration loaded from the environment (and `.env`).

use std::env;
use std::path::PathBuf;

use bcrypt::DEFAULT_COST;

const DEFAULT_JWT_SECRET: &str = "studio-site-jwt-secret-change-in-production";
const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 10 * 60 * 60; // 10 hours
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60; // 7 days
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5_000_000;

/// URL prefix under which the upload root is served.
pub const PUBLIC_UPLOAD_PREFIX: &str = "uploads";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Failed to hash operator password: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
}

impl JwtConfig {
    pub fn with_secret(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            access_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
        }
    }
}

/// The single operator allowed to sign in.
#[derive(Debug, Clone)]
pub struct OperatorCredentials {
    pub username: String,
    /// bcrypt hash; `None` disables login entirely.
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub jwt: JwtConfig,
    pub operator: OperatorCredentials,
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub article_author: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_SECRET not set, using default secret. SET THIS IN PRODUCTION!");
            DEFAULT_JWT_SECRET.to_string()
        });

        let password_hash = match (env::var("ADMIN_PASSWORD_HASH"), env::var("ADMIN_PASSWORD")) {
            (Ok(hash), _) => Some(hash),
            (Err(_), Ok(plain)) => Some(bcrypt::hash(plain, DEFAULT_COST)?),
            _ => {
                log::warn!("Neither ADMIN_PASSWORD_HASH nor ADMIN_PASSWORD is set; login is disabled");
                None
            }
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 5000)?,
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| PUBLIC_UPLOAD_PREFIX.to_string()),
            ),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            jwt: JwtConfig {
                secret,
                access_ttl_seconds: parse_var(
                    "ACCESS_TOKEN_TTL_SECONDS",
                    DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
                )?,
                refresh_ttl_seconds: parse_var(
                    "REFRESH_TOKEN_TTL_SECONDS",
                    DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
                )?,
            },
            operator: OperatorCredentials {
                username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
                password_hash,
            },
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|value| split_origins(&value))
                .unwrap_or_else(|_| vec!["http://localhost:3000".to_string()]),
            article_author: env::var("ARTICLE_AUTHOR").unwrap_or_else(|_| "Editor".to_string()),
        })
    }

    /// Configuration for tests: in-memory store, given upload root and secret.
    pub fn for_tests(upload_dir: impl Into<PathBuf>, secret: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            upload_dir: upload_dir.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            jwt: JwtConfig::with_secret(secret),
            operator: OperatorCredentials {
                username: "admin".to_string(),
                password_hash: None,
            },
            database_url: None,
            cors_origins: Vec::new(),
            article_author: "Editor".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
