//! Manual display ordering of gallery images.
//!
//! A batch is applied as independent single-record updates. There is no
//! transaction: an entry that fails does not undo the ones before it, and a
//! concurrent reader may observe a partially applied batch. Re-sending the
//! same batch converges to the same order.

use serde_json::Value;
use uuid::Uuid;

use super::models::{ReorderFailure, ReorderItem};
use crate::db::{GalleryStore, StoreError};
use crate::error::ApiError;

#[derive(Debug, Default, PartialEq)]
pub struct ReorderOutcome {
    pub updated: usize,
    pub failed: Vec<ReorderFailure>,
}

/// Splits `{ images: [...] }` into entries, rejecting the whole body when
/// `images` is not an array. Malformed entries become per-entry failures.
pub fn parse_batch(body: &Value) -> Result<Vec<Result<ReorderItem, ReorderFailure>>, ApiError> {
    let items = body
        .get("images")
        .and_then(Value::as_array)
        .ok_or(ApiError::MalformedBatch)?;

    Ok(items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<ReorderItem>(item.clone()).map_err(|e| ReorderFailure {
                index,
                id: item.get("id").and_then(Value::as_str).map(str::to_string),
                reason: format!("malformed entry: {}", e),
            })
        })
        .collect())
}

pub async fn apply_reorder(store: &dyn GalleryStore, body: &Value) -> Result<ReorderOutcome, ApiError> {
    let entries = parse_batch(body)?;
    let mut outcome = ReorderOutcome::default();

    for (index, entry) in entries.into_iter().enumerate() {
        let item = match entry {
            Ok(item) => item,
            Err(failure) => {
                log::warn!("Reorder entry {} skipped: {}", index, failure.reason);
                outcome.failed.push(failure);
                continue;
            }
        };

        let Ok(id) = Uuid::parse_str(&item.id) else {
            log::warn!("Reorder entry {} has malformed id {:?}", index, item.id);
            outcome.failed.push(ReorderFailure {
                index,
                id: Some(item.id),
                reason: "invalid identity".to_string(),
            });
            continue;
        };

        match store.set_order(id, item.order).await {
            Ok(()) => outcome.updated += 1,
            Err(StoreError::NotFound(_)) => {
                log::warn!("Reorder entry {} targets unknown image {}", index, id);
                outcome.failed.push(ReorderFailure {
                    index,
                    id: Some(item.id),
                    reason: "not found".to_string(),
                });
            }
            Err(StoreError::Backend(e)) => {
                log::error!("Failed to set order of image {}: {}", id, e);
                outcome.failed.push(ReorderFailure {
                    index,
                    id: Some(item.id),
                    reason: "storage failure".to_string(),
                });
            }
        }
    }

    Ok(outcome)
}
