use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A blog-style article illustrated by an uploaded image.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema, sqlx::FromRow)]
pub struct Article {
    pub id: Uuid,
    #[schema(example = "Caring for your skin in winter")]
    pub title: String,
    pub summary: String,
    pub content: String,
    pub author: String,
    pub published: bool,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "image")]
    pub image_url: String,
}

impl Article {
    pub fn new(fields: NewArticle) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            summary: fields.summary,
            content: fields.content,
            author: fields.author,
            published: fields.published,
            // Postgres TIMESTAMPTZ keeps microseconds.
            created_at: Utc::now().trunc_subsecs(6),
            image_url: fields.image_url,
        }
    }

    pub fn apply(&mut self, changes: ArticleChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(summary) = changes.summary {
            self.summary = summary;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(published) = changes.published {
            self.published = published;
        }
        if let Some(image_url) = changes.image_url {
            self.image_url = image_url;
        }
    }
}

/// Public listing entry: an article without its body.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct ArticleSummary {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub author: String,
    pub published: bool,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "image")]
    pub image_url: String,
}

impl From<Article> for ArticleSummary {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            summary: article.summary,
            author: article.author,
            published: article.published,
            created_at: article.created_at,
            image_url: article.image_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub author: String,
    pub published: bool,
    pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub image_url: Option<String>,
}

/// Multipart body accepted by article create/update (documentation only).
#[derive(Debug, ToSchema)]
pub struct ArticleUploadForm {
    #[allow(unused)]
    pub title: String,
    #[allow(unused)]
    pub summary: String,
    #[allow(unused)]
    pub content: String,
    #[allow(unused)]
    pub published: Option<String>,
    #[allow(unused)]
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_timestamp_has_microsecond_precision() {
        let record = Article::new(NewArticle {
            title: "Winter care".to_string(),
            summary: String::new(),
            content: "Moisturize.".to_string(),
            author: "Studio".to_string(),
            published: true,
            image_url: "http://localhost:5000/uploads/articles/1-a.jpg".to_string(),
        });

        assert_eq!(record.created_at.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(record.created_at, record.created_at.trunc_subsecs(6));
    }
}
