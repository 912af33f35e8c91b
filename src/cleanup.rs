//! Best-effort removal of files whose record was replaced or deleted.

use std::io;

use crate::resolver::resolve_storage_path;
use crate::storage::DiskStorage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    /// The file was already gone.
    Missing,
    /// The resolved path is outside the upload root; nothing was touched.
    Skipped,
    Failed(String),
}

/// Deletes the file behind `image_url`. Failures are logged, never returned.
pub async fn remove_orphan(storage: &DiskStorage, image_url: &str, base_url: &str) -> CleanupOutcome {
    let relative = resolve_storage_path(image_url, base_url);

    let Some(disk_path) = storage.disk_path(&relative) else {
        log::warn!(
            "Refusing to delete {:?} (resolved from {:?}): outside the upload root",
            relative,
            image_url
        );
        return CleanupOutcome::Skipped;
    };

    match storage.remove(&disk_path).await {
        Ok(()) => {
            log::info!("Deleted image file {:?}", disk_path);
            CleanupOutcome::Removed
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Image file {:?} was already missing", disk_path);
            CleanupOutcome::Missing
        }
        Err(e) => {
            log::error!("Error deleting image file {:?}: {}", disk_path, e);
            CleanupOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::public_url;
    use crate::storage::StorageCategory;

    const BASE: &str = "http://localhost:5000";

    #[tokio::test]
    async fn test_removes_file_behind_url() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(tmp.path().to_path_buf(), 5_000_000);
        let relative = storage
            .write_new(StorageCategory::Gallery, "a.jpg", b"x")
            .await
            .unwrap();
        let url = public_url(BASE, &relative);

        assert_eq!(remove_orphan(&storage, &url, BASE).await, CleanupOutcome::Removed);
        assert!(!storage.disk_path(&relative).unwrap().exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_swallowed() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(tmp.path().to_path_buf(), 5_000_000);
        let url = format!("{}/uploads/gallery/1-gone.jpg", BASE);

        assert_eq!(remove_orphan(&storage, &url, BASE).await, CleanupOutcome::Missing);
    }

    #[tokio::test]
    async fn test_file_written_under_other_host_is_still_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(tmp.path().to_path_buf(), 5_000_000);
        let relative = storage
            .write_new(StorageCategory::Articles, "b c.png", b"x")
            .await
            .unwrap();
        let url = public_url("https://old.example.org", &relative);

        assert_eq!(remove_orphan(&storage, &url, BASE).await, CleanupOutcome::Removed);
    }

    #[tokio::test]
    async fn test_path_outside_upload_root_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(tmp.path().join("uploads"), 5_000_000);
        let outside = tmp.path().join("secret.txt");
        std::fs::write(&outside, b"keep").unwrap();

        let url = format!("{}/uploads/%2E%2E/secret.txt", BASE);
        assert_eq!(remove_orphan(&storage, &url, BASE).await, CleanupOutcome::Skipped);
        assert!(outside.exists());
    }
}
