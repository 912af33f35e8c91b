use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error, info};

use super::models::{Article, ArticleChanges, ArticleSummary, ArticleUploadForm, NewArticle};
use crate::auth::AdminOperator;
use crate::cleanup::remove_orphan;
use crate::db::StoreError;
use crate::error::{parse_identity, ApiError, ResourceKind};
use crate::storage::StorageCategory;
use crate::upload::{parse_upload_form, request_base_url, store_image};
use crate::{AppState, ErrorResponse, MessageResponse};

const KIND: ResourceKind = ResourceKind::Article;

fn store_error(e: StoreError) -> ApiError {
    ApiError::from_store(KIND, e)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Articles",
    get,
    path = "/articles",
    responses(
        (status = 200, description = "Published articles, newest first", body = [ArticleSummary]),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_published(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    info!("Executing list_published articles handler");
    let summaries = state.published_article_summaries().await.map_err(store_error)?;
    debug!("Returning {} published articles", summaries.len());
    Ok(HttpResponse::Ok().json(summaries))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Articles",
    get,
    path = "/articles/all",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All articles, newest first", body = [Article]),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_all(
    operator: AdminOperator,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    info!("Executing list_all articles handler for {}", operator.0.username);
    let articles = state.articles.list_all().await.map_err(store_error)?;
    Ok(HttpResponse::Ok().json(articles))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Articles",
    get,
    path = "/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Published article", body = Article),
        (status = 404, description = "Article not found or unpublished", body = ErrorResponse)
    )
)]
pub async fn get_published(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_identity(KIND, &path)?;
    info!("Executing get_published article handler for id: {}", id);

    let article = state.articles.get(id).await.map_err(store_error)?;
    if !article.published {
        debug!("Article {} is not published", id);
        return Err(ApiError::NotFound(KIND, id));
    }
    Ok(HttpResponse::Ok().json(article))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Articles",
    get,
    path = "/articles/admin/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article found", body = Article),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Article not found", body = ErrorResponse)
    )
)]
pub async fn get_any(
    _operator: AdminOperator,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_identity(KIND, &path)?;
    info!("Executing get_any article handler for id: {}", id);
    let article = state.articles.get(id).await.map_err(store_error)?;
    Ok(HttpResponse::Ok().json(article))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Articles",
    post,
    path = "/articles",
    security(("bearer_auth" = [])),
    request_body(content = inline(ArticleUploadForm), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Article created", body = Article),
        (status = 400, description = "Missing or invalid image, or invalid fields", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse)
    )
)]
pub async fn create_article(
    operator: AdminOperator,
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    info!("Executing create_article handler for {}", operator.0.username);
    let form = parse_upload_form(payload, state.storage.max_upload_bytes()).await?;

    let title = form.required_text("title")?;
    let summary = form.required_text("summary")?;
    let content = form.required_text("content")?;
    let published = form.flag("published")?.unwrap_or(true);
    let image = form.image.as_ref().ok_or(ApiError::MissingFile)?;

    let stored = store_image(
        &state.storage,
        StorageCategory::Articles,
        image,
        &request_base_url(&req),
    )
    .await?;

    let record = state
        .articles
        .create(NewArticle {
            title,
            summary,
            content,
            author: state.config.article_author.clone(),
            published,
            image_url: stored.url,
        })
        .await
        .map_err(|e| {
            error!("Image {} written but article not created", stored.relative_path);
            store_error(e)
        })?;

    state.invalidate_article_cache().await;
    info!("Created article {}", record.id);
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Articles",
    put,
    path = "/articles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Article id")),
    request_body(content = inline(ArticleUploadForm), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Article updated", body = Article),
        (status = 400, description = "Invalid image or fields", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Article not found", body = ErrorResponse)
    )
)]
pub async fn update_article(
    operator: AdminOperator,
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let id = parse_identity(KIND, &path)?;
    info!("Executing update_article handler for id: {} by {}", id, operator.0.username);

    let existing = state.articles.get(id).await.map_err(store_error)?;

    let form = parse_upload_form(payload, state.storage.max_upload_bytes()).await?;
    let mut changes = ArticleChanges {
        title: form.text("title").map(str::to_string),
        summary: form.text("summary").map(str::to_string),
        content: form.text("content").map(str::to_string),
        published: form.flag("published")?,
        image_url: None,
    };

    if let Some(image) = form.image.as_ref() {
        let base_url = request_base_url(&req);
        let stored = store_image(&state.storage, StorageCategory::Articles, image, &base_url).await?;
        let outcome = remove_orphan(&state.storage, &existing.image_url, &base_url).await;
        debug!("Previous file of article {}: {:?}", id, outcome);
        changes.image_url = Some(stored.url);
    }

    let record = state.articles.update(id, changes).await.map_err(store_error)?;

    state.invalidate_article_cache().await;
    info!("Updated article {}", id);
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Articles",
    delete,
    path = "/articles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Article not found", body = ErrorResponse)
    )
)]
pub async fn delete_article(
    operator: AdminOperator,
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_identity(KIND, &path)?;
    info!("Executing delete_article handler for id: {} by {}", id, operator.0.username);

    let existing = state.articles.get(id).await.map_err(store_error)?;
    state.articles.delete(id).await.map_err(store_error)?;
    state.invalidate_article_cache().await;

    let outcome = remove_orphan(&state.storage, &existing.image_url, &request_base_url(&req)).await;
    info!("Deleted article {} (file: {:?})", id, outcome);
    Ok(HttpResponse::Ok().json(MessageResponse::new(KIND.deleted_message())))
}

/// Configure article routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/articles")
            .route("", web::get().to(list_published))
            .route("", web::post().to(create_article))
            .route("/all", web::get().to(list_all))
            .route("/admin/{id}", web::get().to(get_any))
            .route("/{id}", web::get().to(get_published))
            .route("/{id}", web::put().to(update_article))
            .route("/{id}", web::delete().to(delete_article)),
    );
}
