//! PostgreSQL-backed record stores.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ArticleStore, GalleryStore, StoreError};
use crate::article::models::{Article, ArticleChanges, NewArticle};
use crate::gallery::models::{GalleryImage, GalleryImageChanges, NewGalleryImage};

const GALLERY_COLUMNS: &str =
    "id, title, description, category, display_order, published, created_at, image_url";
const ARTICLE_COLUMNS: &str =
    "id, title, summary, content, author, published, created_at, image_url";

/// Creates the tables on first start.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gallery_images (
            id UUID PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT 'general',
            display_order BIGINT NOT NULL DEFAULT 0,
            published BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            image_url TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id UUID PRIMARY KEY,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            content TEXT NOT NULL,
            author TEXT NOT NULL,
            published BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            image_url TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub struct PgGalleryStore {
    pool: PgPool,
}

impl PgGalleryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list(&self, published_only: bool) -> Result<Vec<GalleryImage>, StoreError> {
        let filter = if published_only { "WHERE published" } else { "" };
        let sql = format!(
            "SELECT {} FROM gallery_images {} ORDER BY display_order ASC, created_at DESC, id ASC",
            GALLERY_COLUMNS, filter
        );
        Ok(sqlx::query_as::<_, GalleryImage>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl GalleryStore for PgGalleryStore {
    async fn create(&self, fields: NewGalleryImage) -> Result<GalleryImage, StoreError> {
        let image = GalleryImage::new(fields);
        sqlx::query(
            r#"
            INSERT INTO gallery_images
                (id, title, description, category, display_order, published, created_at, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(image.id)
        .bind(&image.title)
        .bind(&image.description)
        .bind(&image.category)
        .bind(image.display_order)
        .bind(image.published)
        .bind(image.created_at)
        .bind(&image.image_url)
        .execute(&self.pool)
        .await?;

        Ok(image)
    }

    async fn get(&self, id: Uuid) -> Result<GalleryImage, StoreError> {
        let sql = format!("SELECT {} FROM gallery_images WHERE id = $1", GALLERY_COLUMNS);
        sqlx::query_as::<_, GalleryImage>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_published(&self) -> Result<Vec<GalleryImage>, StoreError> {
        self.list(true).await
    }

    async fn list_all(&self) -> Result<Vec<GalleryImage>, StoreError> {
        self.list(false).await
    }

    async fn update(
        &self,
        id: Uuid,
        changes: GalleryImageChanges,
    ) -> Result<GalleryImage, StoreError> {
        let sql = format!(
            r#"
            UPDATE gallery_images SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                published = COALESCE($5, published),
                display_order = COALESCE($6, display_order),
                image_url = COALESCE($7, image_url)
            WHERE id = $1
            RETURNING {}
            "#,
            GALLERY_COLUMNS
        );
        sqlx::query_as::<_, GalleryImage>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.category)
            .bind(changes.published)
            .bind(changes.display_order)
            .bind(changes.image_url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM gallery_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn set_order(&self, id: Uuid, display_order: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE gallery_images SET display_order = $2 WHERE id = $1")
            .bind(id)
            .bind(display_order)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list(&self, published_only: bool) -> Result<Vec<Article>, StoreError> {
        let filter = if published_only { "WHERE published" } else { "" };
        let sql = format!(
            "SELECT {} FROM articles {} ORDER BY created_at DESC, id ASC",
            ARTICLE_COLUMNS, filter
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn create(&self, fields: NewArticle) -> Result<Article, StoreError> {
        let article = Article::new(fields);
        sqlx::query(
            r#"
            INSERT INTO articles
                (id, title, summary, content, author, published, created_at, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&article.author)
        .bind(article.published)
        .bind(article.created_at)
        .bind(&article.image_url)
        .execute(&self.pool)
        .await?;

        Ok(article)
    }

    async fn get(&self, id: Uuid) -> Result<Article, StoreError> {
        let sql = format!("SELECT {} FROM articles WHERE id = $1", ARTICLE_COLUMNS);
        sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_published(&self) -> Result<Vec<Article>, StoreError> {
        self.list(true).await
    }

    async fn list_all(&self) -> Result<Vec<Article>, StoreError> {
        self.list(false).await
    }

    async fn update(&self, id: Uuid, changes: ArticleChanges) -> Result<Article, StoreError> {
        let sql = format!(
            r#"
            UPDATE articles SET
                title = COALESCE($2, title),
                summary = COALESCE($3, summary),
                content = COALESCE($4, content),
                published = COALESCE($5, published),
                image_url = COALESCE($6, image_url)
            WHERE id = $1
            RETURNING {}
            "#,
            ARTICLE_COLUMNS
        );
        sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.summary)
            .bind(changes.content)
            .bind(changes.published)
            .bind(changes.image_url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
