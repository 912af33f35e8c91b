use std::collections::HashMap;

use actix_multipart::{Field, Multipart};
use futures::StreamExt;

use super::pipeline::validate_media_type;
use crate::error::ApiError;

pub const IMAGE_FIELD: &str = "image";
const MAX_TEXT_FIELD_BYTES: usize = 1_000_000;

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub original_name: String,
    /// Content type declared by the client, if any.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A parsed multipart body: text fields plus at most one image.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub image: Option<UploadedImage>,
}

impl UploadForm {
    pub fn from_parts(fields: HashMap<String, String>, image: Option<UploadedImage>) -> Self {
        Self { fields, image }
    }

    /// Trimmed value; blank values count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Trimmed value as sent; an empty value is kept, so it can clear a field.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|value| value.trim())
    }

    pub fn required_text(&self, name: &str) -> Result<String, ApiError> {
        self.text(name)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Validation(format!("Field '{}' is required", name)))
    }

    /// Form booleans arrive as strings.
    pub fn flag(&self, name: &str) -> Result<Option<bool>, ApiError> {
        match self.text(name).map(str::to_ascii_lowercase).as_deref() {
            None => Ok(None),
            Some("true" | "1" | "on" | "yes") => Ok(Some(true)),
            Some("false" | "0" | "off" | "no") => Ok(Some(false)),
            Some(other) => Err(ApiError::Validation(format!(
                "Field '{}' must be a boolean, got {:?}",
                name, other
            ))),
        }
    }

    pub fn integer(&self, name: &str) -> Result<Option<i64>, ApiError> {
        match self.text(name) {
            None => Ok(None),
            Some(value) => value.parse::<i64>().map(Some).map_err(|_| {
                ApiError::Validation(format!("Field '{}' must be an integer, got {:?}", name, value))
            }),
        }
    }
}

/// Reads the whole multipart body.
///
/// The image's name and declared type are checked from the part headers
/// first. It is then buffered in memory and rejected with `PayloadTooLarge`
/// as soon as it grows past `max_file_bytes`; nothing is written to disk here.
pub async fn parse_upload_form(
    mut multipart: Multipart,
    max_file_bytes: usize,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(item) = multipart.next().await {
        let mut field = item.map_err(|e| ApiError::Multipart(e.to_string()))?;
        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| ApiError::Multipart("Content disposition not found".to_string()))?;
        let name = content_disposition
            .get_name()
            .ok_or_else(|| ApiError::Multipart("Field name not found".to_string()))?
            .to_string();
        let filename = content_disposition.get_filename().map(str::to_string);

        match filename {
            Some(filename) => {
                if name != IMAGE_FIELD {
                    return Err(ApiError::Validation(format!(
                        "Unexpected file field '{}'",
                        name
                    )));
                }
                // Browsers send an empty part when no file was chosen.
                if filename.is_empty() {
                    drain(&mut field).await?;
                    continue;
                }
                if form.image.is_some() {
                    return Err(ApiError::Validation(
                        "Only one image may be uploaded".to_string(),
                    ));
                }

                let content_type = field.content_type().map(|m| m.essence_str().to_string());
                validate_media_type(&filename, content_type.as_deref())?;
                let data = read_limited(&mut field, max_file_bytes)
                    .await?
                    .ok_or(ApiError::PayloadTooLarge {
                        limit: max_file_bytes,
                    })?;

                log::debug!("Received image {:?} ({} bytes)", filename, data.len());
                form.image = Some(UploadedImage {
                    original_name: filename,
                    content_type,
                    data,
                });
            }
            None => {
                let bytes = read_limited(&mut field, MAX_TEXT_FIELD_BYTES)
                    .await?
                    .ok_or_else(|| {
                        ApiError::Validation(format!(
                            "Field '{}' exceeds {} bytes",
                            name, MAX_TEXT_FIELD_BYTES
                        ))
                    })?;
                let value = String::from_utf8(bytes).map_err(|_| {
                    ApiError::Validation(format!("Field '{}' is not valid UTF-8", name))
                })?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Reads a field; `None` once it grows past `limit` bytes.
async fn read_limited(field: &mut Field, limit: usize) -> Result<Option<Vec<u8>>, ApiError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
        if buffer.len() + chunk.len() > limit {
            return Ok(None);
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(Some(buffer))
}

async fn drain(field: &mut Field) -> Result<(), ApiError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
    }
    Ok(())
}
