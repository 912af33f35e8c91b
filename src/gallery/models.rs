use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "general";

/// A gallery image and its metadata.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema, sqlx::FromRow)]
pub struct GalleryImage {
    #[schema(example = "a1b2c3d4-e5f6-7890-1234-567890abcdef")]
    pub id: Uuid,
    #[schema(example = "Spring")]
    pub title: String,
    #[schema(example = "Cherry blossoms in the studio garden")]
    pub description: String,
    #[schema(example = "general")]
    pub category: String,
    #[serde(rename = "order")]
    #[schema(example = 0)]
    pub display_order: i64,
    pub published: bool,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "image")]
    #[schema(example = "http://localhost:5000/uploads/gallery/1700000000000-a.jpg")]
    pub image_url: String,
}

impl GalleryImage {
    pub fn new(fields: NewGalleryImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            category: fields.category,
            display_order: fields.display_order,
            published: fields.published,
            // Postgres TIMESTAMPTZ keeps microseconds.
            created_at: Utc::now().trunc_subsecs(6),
            image_url: fields.image_url,
        }
    }

    /// Applies a partial update; absent fields keep their stored value.
    pub fn apply(&mut self, changes: GalleryImageChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(published) = changes.published {
            self.published = published;
        }
        if let Some(display_order) = changes.display_order {
            self.display_order = display_order;
        }
        if let Some(image_url) = changes.image_url {
            self.image_url = image_url;
        }
    }
}

/// Validated fields for a new gallery record.
#[derive(Debug, Clone)]
pub struct NewGalleryImage {
    pub title: String,
    pub description: String,
    pub category: String,
    pub display_order: i64,
    pub published: bool,
    pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryImageChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub published: Option<bool>,
    pub display_order: Option<i64>,
    pub image_url: Option<String>,
}

/// Multipart body accepted by gallery create/update (documentation only).
#[derive(Debug, ToSchema)]
pub struct GalleryUploadForm {
    #[allow(unused)]
    pub title: String,
    #[allow(unused)]
    pub description: Option<String>,
    #[allow(unused)]
    pub category: Option<String>,
    #[allow(unused)]
    #[schema(example = "true")]
    pub published: Option<String>,
    #[allow(unused)]
    #[schema(example = "0")]
    pub order: Option<String>,
    #[allow(unused)]
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReorderItem {
    pub id: String,
    pub order: i64,
}

/// Request body for `POST /reorder` (documentation only; parsed leniently).
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub images: Vec<ReorderItem>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ReorderFailure {
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReorderResponse {
    pub message: String,
    pub updated: usize,
    pub failed: Vec<ReorderFailure>,
}
