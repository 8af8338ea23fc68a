//! Concurrent image normalization with a fan-in join.

use futures_util::future::try_join_all;

use crate::config::LimitsConfig;
use crate::error::NormalizeError;
use crate::types::{InputItem, InputKind};

use super::decode;

/// Downscales tall screenshots and orders items for submission.
pub struct Normalizer {
    max_image_height: u32,
}

impl Normalizer {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_image_height: limits.max_image_height,
        }
    }

    /// Normalize every item, then sort by name ascending.
    ///
    /// Non-image items pass through unchanged. Each image is decoded on the
    /// blocking pool concurrently with the others; the call resolves only once
    /// all of them have, and fails if any one of them fails.
    pub async fn normalize(&self, items: Vec<InputItem>) -> Result<Vec<InputItem>, NormalizeError> {
        let max_height = self.max_image_height;
        let tasks = items
            .into_iter()
            .map(|item| normalize_item(item, max_height));

        let mut normalized = try_join_all(tasks).await?;
        normalized.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(normalized)
    }
}

async fn normalize_item(item: InputItem, max_height: u32) -> Result<InputItem, NormalizeError> {
    if item.kind() != Some(InputKind::Image) {
        return Ok(item);
    }

    let name = item.name.clone();
    tokio::task::spawn_blocking(move || {
        let decoded = decode::decode_bytes(&item.content, &item.name)?;
        match decode::downscale(&decoded, max_height, &item.name)? {
            Some(content) => {
                tracing::debug!(
                    "Downscaled {} from {}x{} (height limit {max_height})",
                    item.name,
                    decoded.width,
                    decoded.height
                );
                Ok(InputItem { content, ..item })
            }
            None => Ok(item),
        }
    })
    .await
    .map_err(|e| NormalizeError::Join {
        name,
        message: e.to_string(),
    })?
}
