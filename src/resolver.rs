//! Turns a stored image URL back into its storage-relative path.
//!
//! Records keep absolute URLs built from the scheme and host the upload
//! arrived on. By the time the record is replaced or deleted the server may be
//! reached under a different host (another proxy name, http vs https), so a
//! plain prefix strip is not enough. Resolution tries, in order:
//!
//! 1. no scheme: the value is already relative;
//! 2. the current base URL is a literal prefix: strip it;
//! 3. otherwise parse the URL and keep only its path.
//!
//! One leading `/` is then removed and the result percent-decoded.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref SCHEME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap();
}

/// Base URL (`scheme://host[:port]`) of the current request.
pub fn base_url(scheme: &str, host: &str) -> String {
    format!("{}://{}", scheme, host)
}

/// Resolves `image_url` against the current `base_url`.
///
/// Never fails: if the URL cannot be interpreted the input is returned
/// unchanged so the caller can log it and carry on.
pub fn resolve_storage_path(image_url: &str, base_url: &str) -> String {
    match try_resolve(image_url, base_url) {
        Some(path) => path,
        None => {
            log::warn!("Could not resolve storage path for {:?}", image_url);
            image_url.to_string()
        }
    }
}

fn try_resolve(image_url: &str, base_url: &str) -> Option<String> {
    let raw_path = if !SCHEME_RE.is_match(image_url) {
        image_url.to_string()
    } else if let Some(rest) = strip_base(image_url, base_url) {
        rest.to_string()
    } else {
        let parsed = Url::parse(image_url).ok()?;
        log::debug!(
            "Image URL host {:?} differs from current base {}, using URL path",
            parsed.host_str(),
            base_url
        );
        parsed.path().to_string()
    };

    let trimmed = raw_path.strip_prefix('/').unwrap_or(&raw_path);
    let decoded = urlencoding::decode(trimmed).ok()?;
    Some(decoded.into_owned())
}

/// Strips `base_url` when it is a prefix ending on a path boundary, so that
/// `http://host` does not match `http://hostname/...`.
fn strip_base<'a>(image_url: &'a str, base_url: &str) -> Option<&'a str> {
    let base = base_url.trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    let rest = image_url.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Builds the public URL of a storage-relative path, percent-encoding each
/// segment so that `resolve_storage_path` recovers the path exactly.
pub fn public_url(base_url: &str, relative_path: &str) -> String {
    let normalized = relative_path.replace('\\', "/");
    let encoded: Vec<String> = normalized
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base_url.trim_end_matches('/'), encoded.join("/"))
}
