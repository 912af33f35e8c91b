#![allow(dead_code)]

use std::path::PathBuf;

use actix_web::web;
use studio_site_server::auth::generate_access_token;
use studio_site_server::config::ServerConfig;
use studio_site_server::resolver::resolve_storage_path;
use studio_site_server::AppState;
use tempfile::TempDir;

pub const TEST_SECRET: &str = "integration-test-secret";
/// Base URL `actix_web::test::TestRequest` requests are addressed to.
pub const TEST_BASE_URL: &str = "http://localhost:8080";

/// App state backed by the in-memory store and a temporary upload root.
pub struct TestContext {
    pub state: web::Data<AppState>,
    upload_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let upload_dir = tempfile::tempdir().expect("Failed to create temp upload dir");
        let mut config = ServerConfig::for_tests(upload_dir.path(), TEST_SECRET);
        tweak(&mut config);
        Self {
            state: web::Data::new(AppState::in_memory(config)),
            upload_dir,
        }
    }

    pub fn access_token(&self) -> String {
        generate_access_token(&self.state.config.jwt, "operator", "admin")
            .expect("Failed to generate access token")
    }

    pub fn auth_header(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.access_token()))
    }

    /// On-disk location of the file behind a stored image URL.
    pub fn file_for_url(&self, url: &str) -> PathBuf {
        let relative = resolve_storage_path(url, TEST_BASE_URL);
        self.state
            .storage
            .disk_path(&relative)
            .expect("URL does not resolve inside the upload root")
    }

    /// Files currently stored in a category directory.
    pub fn files_in(&self, category: &str) -> Vec<PathBuf> {
        match std::fs::read_dir(self.upload_dir.path().join(category)) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Builds a `multipart/form-data` request body.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----studio-site-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

/// A small but well-formed JPEG-looking payload.
pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len.max(4)];
    data[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
    data
}
