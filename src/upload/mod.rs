pub mod multipart;
pub mod pipeline;

pub use multipart::{parse_upload_form, UploadForm, UploadedImage};
pub use pipeline::{request_base_url, store_image, validate_image, validate_media_type, StoredImage};
