//! Record stores and shared application state.
//!
//! The document store is reached only through the `GalleryStore` and
//! `ArticleStore` traits:
//! - `memory` - in-process maps, used by tests and single-process deployments
//! - `postgres` - PostgreSQL through sqlx
//!
//! Every operation touches a single record; there are no cross-record
//! transactions.

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use uuid::Uuid;

use crate::article::models::{Article, ArticleChanges, ArticleSummary, NewArticle};
use crate::config::ServerConfig;
use crate::gallery::models::{GalleryImage, GalleryImageChanges, NewGalleryImage};
use crate::storage::DiskStorage;

const PUBLIC_LISTING_KEY: &str = "public";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(Uuid),
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
pub trait GalleryStore: Send + Sync {
    async fn create(&self, fields: NewGalleryImage) -> Result<GalleryImage, StoreError>;
    async fn get(&self, id: Uuid) -> Result<GalleryImage, StoreError>;
    /// Published images ordered by display order asc, then newest first.
    async fn list_published(&self) -> Result<Vec<GalleryImage>, StoreError>;
    /// All images, same ordering as `list_published`.
    async fn list_all(&self) -> Result<Vec<GalleryImage>, StoreError>;
    async fn update(&self, id: Uuid, changes: GalleryImageChanges)
        -> Result<GalleryImage, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    /// Single-field update of the display order.
    async fn set_order(&self, id: Uuid, display_order: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn create(&self, fields: NewArticle) -> Result<Article, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Article, StoreError>;
    /// Published articles, newest first.
    async fn list_published(&self) -> Result<Vec<Article>, StoreError>;
    /// All articles, newest first.
    async fn list_all(&self) -> Result<Vec<Article>, StoreError>;
    async fn update(&self, id: Uuid, changes: ArticleChanges) -> Result<Article, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Cache of one public listing.
///
/// Every invalidation bumps a generation counter. A fill that read the store
/// while the generation moved drops its own entry again, so a listing loaded
/// before a mutation never outlives that mutation's invalidation.
#[derive(Clone)]
pub struct ListingCache<T: Clone + Send + Sync + 'static> {
    cache: Cache<String, T>,
    generation: Arc<AtomicU64>,
}

impl<T: Clone + Send + Sync + 'static> ListingCache<T> {
    fn new() -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(5 * 60))
                .max_capacity(10)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        if let Some(listing) = self.cache.get(PUBLIC_LISTING_KEY).await {
            log::debug!("Public listing served from cache");
            return Ok(listing);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let listing = load().await?;
        self.cache
            .insert(PUBLIC_LISTING_KEY.to_string(), listing.clone())
            .await;
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("Listing changed while loading, dropping cached copy");
            self.cache.invalidate(PUBLIC_LISTING_KEY).await;
        }
        Ok(listing)
    }

    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(PUBLIC_LISTING_KEY).await;
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub gallery: Arc<dyn GalleryStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub storage: DiskStorage,
    pub gallery_cache: ListingCache<Vec<GalleryImage>>,
    pub article_cache: ListingCache<Vec<ArticleSummary>>,
}

impl AppState {
    /// Connects to PostgreSQL when `DATABASE_URL` is configured, otherwise
    /// keeps records in memory.
    pub async fn new(config: ServerConfig) -> Result<Self, StoreError> {
        match config.database_url.as_deref() {
            Some(database_url) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(20)
                    .min_connections(1)
                    .acquire_timeout(Duration::from_secs(30))
                    .idle_timeout(Duration::from_secs(900))
                    .connect(database_url)
                    .await?;
                postgres::ensure_schema(&pool).await?;
                log::info!("Using PostgreSQL record store");

                let gallery = Arc::new(postgres::PgGalleryStore::new(pool.clone()));
                let articles = Arc::new(postgres::PgArticleStore::new(pool));
                Ok(Self::with_stores(config, gallery, articles))
            }
            None => {
                log::warn!("DATABASE_URL not set, records are kept in memory only");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn in_memory(config: ServerConfig) -> Self {
        Self::with_stores(
            config,
            Arc::new(memory::MemoryGalleryStore::default()),
            Arc::new(memory::MemoryArticleStore::default()),
        )
    }

    pub fn with_stores(
        config: ServerConfig,
        gallery: Arc<dyn GalleryStore>,
        articles: Arc<dyn ArticleStore>,
    ) -> Self {
        let storage = DiskStorage::new(config.upload_dir.clone(), config.max_upload_bytes);

        Self {
            config,
            gallery,
            articles,
            storage,
            gallery_cache: ListingCache::new(),
            article_cache: ListingCache::new(),
        }
    }

    pub async fn published_gallery_images(&self) -> Result<Vec<GalleryImage>, StoreError> {
        self.gallery_cache
            .get_or_load(|| self.gallery.list_published())
            .await
    }

    pub async fn published_article_summaries(&self) -> Result<Vec<ArticleSummary>, StoreError> {
        self.article_cache
            .get_or_load(|| async {
                Ok(self
                    .articles
                    .list_published()
                    .await?
                    .into_iter()
                    .map(ArticleSummary::from)
                    .collect())
            })
            .await
    }

    pub async fn invalidate_gallery_cache(&self) {
        self.gallery_cache.invalidate().await;
    }

    pub async fn invalidate_article_cache(&self) {
        self.article_cache.invalidate().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_cache_serves_cached_copy_until_invalidated() {
        let cache: ListingCache<Vec<u32>> = ListingCache::new();

        let first = cache.get_or_load(|| async { Ok(vec![1]) }).await.unwrap();
        let second = cache.get_or_load(|| async { Ok(vec![2]) }).await.unwrap();
        assert_eq!(first, vec![1]);
        assert_eq!(second, vec![1]);

        cache.invalidate().await;
        let third = cache.get_or_load(|| async { Ok(vec![3]) }).await.unwrap();
        assert_eq!(third, vec![3]);
    }

    #[tokio::test]
    async fn test_listing_loaded_across_an_invalidation_is_not_kept() {
        let cache: ListingCache<Vec<u32>> = ListingCache::new();

        // A mutation lands while the stale listing is being read.
        let stale = cache
            .get_or_load(|| async {
                cache.invalidate().await;
                Ok(vec![1])
            })
            .await
            .unwrap();
        assert_eq!(stale, vec![1]);

        let fresh = cache.get_or_load(|| async { Ok(vec![2]) }).await.unwrap();
        assert_eq!(fresh, vec![2]);
    }

    #[tokio::test]
    async fn test_failed_load_caches_nothing() {
        let cache: ListingCache<Vec<u32>> = ListingCache::new();

        let failed = cache
            .get_or_load(|| async { Err(StoreError::Backend("down".to_string())) })
            .await;
        assert!(failed.is_err());

        let loaded = cache.get_or_load(|| async { Ok(vec![4]) }).await.unwrap();
        assert_eq!(loaded, vec![4]);
    }
}
