use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{ArticleStore, GalleryStore, StoreError};
use crate::article::models::{Article, ArticleChanges, NewArticle};
use crate::gallery::models::{GalleryImage, GalleryImageChanges, NewGalleryImage};

/// Display order ascending, then newest first.
fn gallery_ordering(a: &GalleryImage, b: &GalleryImage) -> Ordering {
    a.display_order
        .cmp(&b.display_order)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn article_ordering(a: &Article, b: &Article) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[derive(Default)]
pub struct MemoryGalleryStore {
    records: RwLock<HashMap<Uuid, GalleryImage>>,
}

impl MemoryGalleryStore {
    fn sorted(&self, published_only: bool) -> Vec<GalleryImage> {
        let records = self.records.read();
        let mut images: Vec<GalleryImage> = records
            .values()
            .filter(|image| !published_only || image.published)
            .cloned()
            .collect();
        images.sort_by(gallery_ordering);
        images
    }
}

#[async_trait]
impl GalleryStore for MemoryGalleryStore {
    async fn create(&self, fields: NewGalleryImage) -> Result<GalleryImage, StoreError> {
        let image = GalleryImage::new(fields);
        self.records.write().insert(image.id, image.clone());
        Ok(image)
    }

    async fn get(&self, id: Uuid) -> Result<GalleryImage, StoreError> {
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_published(&self) -> Result<Vec<GalleryImage>, StoreError> {
        Ok(self.sorted(true))
    }

    async fn list_all(&self) -> Result<Vec<GalleryImage>, StoreError> {
        Ok(self.sorted(false))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: GalleryImageChanges,
    ) -> Result<GalleryImage, StoreError> {
        let mut records = self.records.write();
        let image = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        image.apply(changes);
        Ok(image.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.records
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn set_order(&self, id: Uuid, display_order: i64) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let image = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        image.display_order = display_order;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryArticleStore {
    records: RwLock<HashMap<Uuid, Article>>,
}

impl MemoryArticleStore {
    fn sorted(&self, published_only: bool) -> Vec<Article> {
        let records = self.records.read();
        let mut articles: Vec<Article> = records
            .values()
            .filter(|article| !published_only || article.published)
            .cloned()
            .collect();
        articles.sort_by(article_ordering);
        articles
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn create(&self, fields: NewArticle) -> Result<Article, StoreError> {
        let article = Article::new(fields);
        self.records.write().insert(article.id, article.clone());
        Ok(article)
    }

    async fn get(&self, id: Uuid) -> Result<Article, StoreError> {
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_published(&self) -> Result<Vec<Article>, StoreError> {
        Ok(self.sorted(true))
    }

    async fn list_all(&self) -> Result<Vec<Article>, StoreError> {
        Ok(self.sorted(false))
    }

    async fn update(&self, id: Uuid, changes: ArticleChanges) -> Result<Article, StoreError> {
        let mut records = self.records.write();
        let article = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        article.apply(changes);
        Ok(article.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.records
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn new_image(title: &str, display_order: i64, published: bool) -> NewGalleryImage {
        NewGalleryImage {
            title: title.to_string(),
            description: String::new(),
            category: "general".to_string(),
            display_order,
            published,
            image_url: format!("http://localhost/uploads/gallery/{}.jpg", title),
        }
    }

    #[tokio::test]
    async fn test_listing_orders_by_display_order_then_newest() {
        let store = MemoryGalleryStore::default();
        let first = store.create(new_image("first", 1, true)).await.unwrap();
        store.create(new_image("second", 0, true)).await.unwrap();
        store.create(new_image("third", 1, true)).await.unwrap();

        // Make `first` strictly older than `third`.
        store.records.write().get_mut(&first.id).unwrap().created_at =
            Utc::now() - Duration::hours(1);

        let titles: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|image| image.title)
            .collect();
        assert_eq!(titles, vec!["second", "third", "first"]);
    }

    #[tokio::test]
    async fn test_list_published_skips_drafts() {
        let store = MemoryGalleryStore::default();
        store.create(new_image("visible", 0, true)).await.unwrap();
        store.create(new_image("draft", 0, false)).await.unwrap();

        let published = store.list_published().await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].title, "visible");
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = MemoryGalleryStore::default();
        let id = Uuid::new_v4();

        assert!(matches!(store.get(id).await, Err(StoreError::NotFound(x)) if x == id));
        assert!(matches!(store.delete(id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.set_order(id, 3).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.update(id, GalleryImageChanges::default()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_absent_fields() {
        let store = MemoryGalleryStore::default();
        let image = store.create(new_image("old", 4, true)).await.unwrap();

        let updated = store
            .update(
                image.id,
                GalleryImageChanges {
                    title: Some("new".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "new");
        assert_eq!(updated.display_order, 4);
        assert_eq!(updated.image_url, image.image_url);
        assert_eq!(updated.created_at, image.created_at);
    }

    #[tokio::test]
    async fn test_articles_newest_first() {
        let store = MemoryArticleStore::default();
        let older = store
            .create(NewArticle {
                title: "older".to_string(),
                summary: "s".to_string(),
                content: "c".to_string(),
                author: "Editor".to_string(),
                published: true,
                image_url: "http://localhost/uploads/articles/1-a.jpg".to_string(),
            })
            .await
            .unwrap();
        store.records.write().get_mut(&older.id).unwrap().created_at =
            Utc::now() - Duration::days(1);
        store
            .create(NewArticle {
                title: "newer".to_string(),
                summary: "s".to_string(),
                content: "c".to_string(),
                author: "Editor".to_string(),
                published: true,
                image_url: "http://localhost/uploads/articles/2-b.jpg".to_string(),
            })
            .await
            .unwrap();

        let titles: Vec<String> = store
            .list_published()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }
}
