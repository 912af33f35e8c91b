//! Local-disk media storage under the upload root.
//!
//! Files live at `<upload_dir>/<category>/<file>` and are addressed by the
//! storage-relative path `uploads/<category>/<file>`, which is also the path
//! component of their public URL.

use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::PUBLIC_UPLOAD_PREFIX;

const MAX_NAME_ATTEMPTS: i64 = 16;

/// Category directory an upload is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageCategory {
    Gallery,
    Articles,
}

impl StorageCategory {
    pub fn dir_name(self) -> &'static str {
        match self {
            StorageCategory::Gallery => "gallery",
            StorageCategory::Articles => "articles",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiskStorage {
    upload_dir: PathBuf,
    max_upload_bytes: usize,
}

impl DiskStorage {
    pub fn new(upload_dir: PathBuf, max_upload_bytes: usize) -> Self {
        Self {
            upload_dir,
            max_upload_bytes,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Writes `data` as `<millis>-<file_name>` inside the category directory
    /// and returns its storage-relative path.
    ///
    /// `file_name` must already be sanitized. The directory is created if
    /// missing. A partially written file is removed before the error is
    /// returned.
    pub async fn write_new(
        &self,
        category: StorageCategory,
        file_name: &str,
        data: &[u8],
    ) -> io::Result<String> {
        let dir = self.upload_dir.join(category.dir_name());
        fs::create_dir_all(&dir).await?;

        let mut stamp = Utc::now().timestamp_millis();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let stored_name = format!("{}-{}", stamp, file_name);
            let path = dir.join(&stored_name);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    log::debug!("Upload name {} taken, retrying", stored_name);
                    stamp += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let written = async {
                file.write_all(data).await?;
                file.sync_all().await
            }
            .await;

            if let Err(e) = written {
                drop(file);
                if let Err(remove_err) = fs::remove_file(&path).await {
                    log::error!("Failed to remove partial upload {:?}: {}", path, remove_err);
                }
                return Err(e);
            }

            return Ok(format!(
                "{}/{}/{}",
                PUBLIC_UPLOAD_PREFIX,
                category.dir_name(),
                stored_name
            ));
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free upload name for {}", file_name),
        ))
    }

    /// Maps a storage-relative path back onto the upload root.
    ///
    /// Returns `None` for anything outside the `uploads/` prefix or containing
    /// components other than plain names.
    pub fn disk_path(&self, relative: &str) -> Option<PathBuf> {
        let rest = relative
            .strip_prefix(PUBLIC_UPLOAD_PREFIX)?
            .strip_prefix('/')?;
        let rest = Path::new(rest);

        let mut components = rest.components().peekable();
        components.peek()?;
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }

        Some(self.upload_dir.join(rest))
    }

    pub async fn remove(&self, disk_path: &Path) -> io::Result<()> {
        fs::remove_file(disk_path).await
    }
}
