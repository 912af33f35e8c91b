use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error, info};
use serde_json::Value;

use super::models::{
    GalleryImage, GalleryImageChanges, GalleryUploadForm, NewGalleryImage, ReorderRequest,
    ReorderResponse, DEFAULT_CATEGORY,
};
use super::ordering::apply_reorder;
use crate::auth::AdminOperator;
use crate::cleanup::remove_orphan;
use crate::error::{parse_identity, ApiError, ResourceKind};
use crate::storage::StorageCategory;
use crate::upload::{parse_upload_form, request_base_url, store_image};
use crate::{AppState, ErrorResponse, MessageResponse};

const KIND: ResourceKind = ResourceKind::Image;

#[utoipa::path(
    context_path = "/api",
    tag = "Gallery",
    get,
    path = "/gallery/public",
    responses(
        (status = 200, description = "Published images in display order", body = [GalleryImage]),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_public(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    info!("Executing list_public gallery handler");
    let images = state
        .published_gallery_images()
        .await
        .map_err(|e| ApiError::from_store(KIND, e))?;
    debug!("Returning {} published images", images.len());
    Ok(HttpResponse::Ok().json(images))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Gallery",
    get,
    path = "/gallery",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All images in display order", body = [GalleryImage]),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_all(
    operator: AdminOperator,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    info!("Executing list_all gallery handler for {}", operator.0.username);
    let images = state
        .gallery
        .list_all()
        .await
        .map_err(|e| ApiError::from_store(KIND, e))?;
    Ok(HttpResponse::Ok().json(images))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Gallery",
    get,
    path = "/gallery/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image found", body = GalleryImage),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
pub async fn get_image(
    _operator: AdminOperator,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_identity(KIND, &path)?;
    info!("Executing get_image handler for id: {}", id);
    let image = state
        .gallery
        .get(id)
        .await
        .map_err(|e| ApiError::from_store(KIND, e))?;
    Ok(HttpResponse::Ok().json(image))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Gallery",
    post,
    path = "/gallery",
    security(("bearer_auth" = [])),
    request_body(content = inline(GalleryUploadForm), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image created", body = GalleryImage),
        (status = 400, description = "Missing or invalid image, or invalid fields", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn create_image(
    operator: AdminOperator,
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    info!("Executing create_image handler for {}", operator.0.username);
    let form = parse_upload_form(payload, state.storage.max_upload_bytes()).await?;

    let title = form.required_text("title")?;
    let description = form.text("description").unwrap_or_default().to_string();
    let category = form.text("category").unwrap_or(DEFAULT_CATEGORY).to_string();
    let published = form.flag("published")?.unwrap_or(true);
    let display_order = form.integer("order")?.unwrap_or(0);
    let image = form.image.as_ref().ok_or(ApiError::MissingFile)?;

    let stored = store_image(
        &state.storage,
        StorageCategory::Gallery,
        image,
        &request_base_url(&req),
    )
    .await?;

    // The file stays on disk if this fails; there is no rollback.
    let record = state
        .gallery
        .create(NewGalleryImage {
            title,
            description,
            category,
            display_order,
            published,
            image_url: stored.url,
        })
        .await
        .map_err(|e| {
            error!("Image {} written but record not created", stored.relative_path);
            ApiError::from_store(KIND, e)
        })?;

    state.invalidate_gallery_cache().await;
    info!("Created gallery image {}", record.id);
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Gallery",
    put,
    path = "/gallery/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Image id")),
    request_body(content = inline(GalleryUploadForm), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image updated", body = GalleryImage),
        (status = 400, description = "Invalid image or fields", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse)
    )
)]
pub async fn update_image(
    operator: AdminOperator,
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let id = parse_identity(KIND, &path)?;
    info!("Executing update_image handler for id: {} by {}", id, operator.0.username);

    let existing = state
        .gallery
        .get(id)
        .await
        .map_err(|e| ApiError::from_store(KIND, e))?;

    let form = parse_upload_form(payload, state.storage.max_upload_bytes()).await?;
    let mut changes = GalleryImageChanges {
        title: form.text("title").map(str::to_string),
        description: form.raw("description").map(str::to_string),
        category: form.text("category").map(str::to_string),
        published: form.flag("published")?,
        display_order: form.integer("order")?,
        image_url: None,
    };

    if let Some(image) = form.image.as_ref() {
        let base_url = request_base_url(&req);
        let stored = store_image(&state.storage, StorageCategory::Gallery, image, &base_url).await?;
        let outcome = remove_orphan(&state.storage, &existing.image_url, &base_url).await;
        debug!("Previous file of image {}: {:?}", id, outcome);
        changes.image_url = Some(stored.url);
    }

    let record = state
        .gallery
        .update(id, changes)
        .await
        .map_err(|e| ApiError::from_store(KIND, e))?;

    state.invalidate_gallery_cache().await;
    info!("Updated gallery image {}", id);
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Gallery",
    delete,
    path = "/gallery/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
pub async fn delete_image(
    operator: AdminOperator,
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_identity(KIND, &path)?;
    info!("Executing delete_image handler for id: {} by {}", id, operator.0.username);

    let existing = state
        .gallery
        .get(id)
        .await
        .map_err(|e| ApiError::from_store(KIND, e))?;

    state
        .gallery
        .delete(id)
        .await
        .map_err(|e| ApiError::from_store(KIND, e))?;
    state.invalidate_gallery_cache().await;

    let outcome = remove_orphan(&state.storage, &existing.image_url, &request_base_url(&req)).await;
    info!("Deleted gallery image {} (file: {:?})", id, outcome);
    Ok(HttpResponse::Ok().json(MessageResponse::new(KIND.deleted_message())))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Gallery",
    post,
    path = "/gallery/reorder",
    security(("bearer_auth" = [])),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Order applied; failed entries are listed", body = ReorderResponse),
        (status = 400, description = "`images` is not an array", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn reorder_images(
    operator: AdminOperator,
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    info!("Executing reorder_images handler for {}", operator.0.username);
    let outcome = apply_reorder(state.gallery.as_ref(), &body).await?;
    state.invalidate_gallery_cache().await;

    info!(
        "Reorder applied: {} updated, {} failed",
        outcome.updated,
        outcome.failed.len()
    );
    Ok(HttpResponse::Ok().json(ReorderResponse {
        message: "Order updated".to_string(),
        updated: outcome.updated,
        failed: outcome.failed,
    }))
}

/// Configure gallery routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gallery")
            .route("/public", web::get().to(list_public))
            .route("/reorder", web::post().to(reorder_images))
            .route("", web::get().to(list_all))
            .route("", web::post().to(create_image))
            .route("/{id}", web::get().to(get_image))
            .route("/{id}", web::put().to(update_image))
            .route("/{id}", web::delete().to(delete_image)),
    );
}
