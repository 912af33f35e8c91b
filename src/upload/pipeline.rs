use std::path::Path;

use actix_web::HttpRequest;
use sanitize_filename::sanitize;

use super::multipart::UploadedImage;
use crate::error::ApiError;
use crate::resolver::{base_url, public_url};
use crate::storage::{DiskStorage, StorageCategory};

pub const ALLOWED_IMAGE_TYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// `uploads/<category>/<millis>-<name>`
    pub relative_path: String,
    pub url: String,
}

/// `scheme://host` the current request was addressed to.
pub fn request_base_url(req: &HttpRequest) -> String {
    let info = req.connection_info();
    base_url(info.scheme(), info.host())
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Checks a file name and declared content type against the image
/// allow-list. Only part headers are needed, so this runs before any bytes
/// of the file are read.
///
/// When the client declared no content type, it is guessed from the name.
pub fn validate_media_type(original_name: &str, declared_type: Option<&str>) -> Result<(), ApiError> {
    let extension_ok = extension_of(original_name)
        .map(|ext| ALLOWED_IMAGE_TYPES.contains(&ext.as_str()))
        .unwrap_or(false);

    let content_type = declared_type.map(str::to_string).or_else(|| {
        mime_guess::from_path(original_name)
            .first()
            .map(|m| m.essence_str().to_string())
    });
    let content_type_ok = content_type
        .as_deref()
        .and_then(|ct| ct.strip_prefix("image/"))
        .map(|subtype| ALLOWED_IMAGE_TYPES.contains(&subtype.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    if extension_ok && content_type_ok {
        Ok(())
    } else {
        log::warn!(
            "Rejected upload {:?} with content type {:?}",
            original_name,
            content_type
        );
        Err(ApiError::InvalidMediaType(original_name.to_string()))
    }
}

pub fn validate_image(image: &UploadedImage) -> Result<(), ApiError> {
    validate_media_type(&image.original_name, image.content_type.as_deref())
}

fn stored_file_name(original_name: &str) -> String {
    let sanitized = sanitize(original_name);
    if sanitized.trim().is_empty() {
        let ext = extension_of(original_name).unwrap_or_else(|| "jpg".to_string());
        format!("image.{}", ext)
    } else {
        sanitized
    }
}

/// Validates the image, writes it under the category directory and returns
/// its storage path and public URL.
///
/// The file is on disk when this returns; callers commit the record
/// afterwards and do not roll the file back if that fails.
pub async fn store_image(
    storage: &DiskStorage,
    category: StorageCategory,
    image: &UploadedImage,
    base_url: &str,
) -> Result<StoredImage, ApiError> {
    validate_image(image)?;
    if image.data.len() > storage.max_upload_bytes() {
        return Err(ApiError::PayloadTooLarge {
            limit: storage.max_upload_bytes(),
        });
    }

    let file_name = stored_file_name(&image.original_name);
    let relative_path = storage
        .write_new(category, &file_name, &image.data)
        .await
        .map_err(|e| ApiError::StorageFailure(format!("writing {}: {}", file_name, e)))?;

    let url = public_url(base_url, &relative_path);
    log::info!("Stored image {} at {}", image.original_name, relative_path);
    Ok(StoredImage { relative_path, url })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str, content_type: Option<&str>) -> UploadedImage {
        UploadedImage {
            original_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            data: vec![0u8; 16],
        }
    }

    #[test]
    fn test_allowed_images_pass() {
        for (name, ct) in [
            ("a.jpg", "image/jpeg"),
            ("a.JPEG", "image/jpeg"),
            ("b.png", "image/png"),
            ("c.gif", "image/gif"),
            ("d.webp", "image/webp"),
        ] {
            assert!(validate_image(&image(name, Some(ct))).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_disallowed_extension_or_type_is_rejected() {
        for (name, ct) in [
            ("a.pdf", Some("application/pdf")),
            ("a.jpg", Some("application/pdf")),
            ("a.svg", Some("image/svg+xml")),
            ("a.exe", Some("image/png")),
            ("noext", Some("image/png")),
            ("a.bmp", None),
        ] {
            assert!(
                matches!(validate_image(&image(name, ct)), Err(ApiError::InvalidMediaType(_))),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_media_type_is_decided_from_headers_alone() {
        assert!(validate_media_type("photo.webp", Some("image/webp")).is_ok());
        assert!(matches!(
            validate_media_type("report.pdf", Some("application/pdf")),
            Err(ApiError::InvalidMediaType(name)) if name == "report.pdf"
        ));
    }

    #[test]
    fn test_missing_content_type_is_guessed_from_name() {
        assert!(validate_image(&image("photo.png", None)).is_ok());
    }

    #[test]
    fn test_stored_file_name_is_sanitized() {
        let name = stored_file_name("../../etc/a.jpg");
        assert!(!name.contains('/'));
        assert!(name.ends_with("a.jpg"));
        assert_eq!(stored_file_name("a.jpg"), "a.jpg");
    }

    #[tokio::test]
    async fn test_rejected_image_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(tmp.path().to_path_buf(), 5_000_000);

        let result = store_image(
            &storage,
            StorageCategory::Gallery,
            &image("a.pdf", Some("application/pdf")),
            "http://localhost:5000",
        )
        .await;

        assert!(matches!(result, Err(ApiError::InvalidMediaType(_))));
        assert!(!tmp.path().join("gallery").exists());
    }

    #[tokio::test]
    async fn test_oversized_image_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(tmp.path().to_path_buf(), 8);

        let result = store_image(
            &storage,
            StorageCategory::Gallery,
            &image("a.jpg", Some("image/jpeg")),
            "http://localhost:5000",
        )
        .await;

        assert!(matches!(result, Err(ApiError::PayloadTooLarge { limit: 8 })));
        assert!(!tmp.path().join("gallery").exists());
    }

    #[tokio::test]
    async fn test_stored_image_url_points_at_relative_path() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(tmp.path().to_path_buf(), 5_000_000);

        let stored = store_image(
            &storage,
            StorageCategory::Gallery,
            &image("a.jpg", Some("image/jpeg")),
            "http://localhost:5000",
        )
        .await
        .unwrap();

        assert!(stored.relative_path.starts_with("uploads/gallery/"));
        assert!(stored.url.starts_with("http://localhost:5000/uploads/gallery/"));
        assert!(stored.url.ends_with("-a.jpg"));
        assert!(storage.disk_path(&stored.relative_path).unwrap().exists());
    }
}
