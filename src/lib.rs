use actix_cors::Cors;
use actix_files::Files;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod article;
pub mod auth;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod error;
pub mod gallery;
pub mod resolver;
pub mod storage;
pub mod upload;

pub use crate::db::AppState;

use crate::config::{ServerConfig, PUBLIC_UPLOAD_PREFIX};
use crate::error::ApiError;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Plain confirmation body, e.g. `{ "message": "Image deleted" }`.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::me,
        crate::gallery::handlers::list_public,
        crate::gallery::handlers::list_all,
        crate::gallery::handlers::get_image,
        crate::gallery::handlers::create_image,
        crate::gallery::handlers::update_image,
        crate::gallery::handlers::delete_image,
        crate::gallery::handlers::reorder_images,
        crate::article::handlers::list_published,
        crate::article::handlers::list_all,
        crate::article::handlers::get_published,
        crate::article::handlers::get_any,
        crate::article::handlers::create_article,
        crate::article::handlers::update_article,
        crate::article::handlers::delete_article
    ),
    components(
        schemas(
            gallery::models::GalleryImage,
            gallery::models::GalleryUploadForm,
            gallery::models::ReorderItem,
            gallery::models::ReorderRequest,
            gallery::models::ReorderFailure,
            gallery::models::ReorderResponse,
            article::models::Article,
            article::models::ArticleSummary,
            article::models::ArticleUploadForm,
            auth::LoginRequest,
            auth::RefreshRequest,
            auth::TokenResponse,
            auth::OperatorIdentity,
            ErrorResponse,
            MessageResponse,
        )
    ),
    tags(
        (name = "Authentication", description = "Operator login and token refresh."),
        (name = "Gallery", description = "Gallery image upload, listing and ordering."),
        (name = "Articles", description = "Article CRUD endpoints.")
    )
)]
pub struct ApiDoc;

/// Registers every `/api` route. Also used by the integration tests.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::Validation(format!("Invalid JSON body: {}", err)).into()
    }))
    .configure(auth::handlers::config)
    .configure(gallery::config)
    .configure(article::config);
}

fn build_cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-auth-token"),
        ])
        .supports_credentials()
        .max_age(3600)
}

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env()?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let app_state = match AppState::new(config.clone()).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!(
                "Failed to initialize the record store. Check DATABASE_URL and ensure the database is running. Error: {}",
                e
            );
            return Err(e.into());
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("studio_site_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create Prometheus metrics middleware: {:?}", e))?;

    let upload_dir = config.upload_dir.clone();
    let cors_origins = config.cors_origins.clone();

    log::info!(
        "Starting server at http://{}:{} (uploads served from {:?})",
        config.host,
        config.port,
        upload_dir
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(build_cors(&cors_origins))
            .app_data(app_state.clone())
            .service(web::scope("/api").configure(configure_api))
            .service(Files::new(
                &format!("/{}", PUBLIC_UPLOAD_PREFIX),
                upload_dir.clone(),
            ))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
