//! Writes transformed artifacts to the destination store.

use std::sync::Arc;

use crate::descriptor::{Descriptor, ORIGINAL_MARKER};
use crate::error::ServiceError;
use crate::image_optimizer::TransformedArtifact;
use crate::s3::{ObjectRef, ObjectStore, PutObject};

use super::route::DestinationStore;

/// `<original-key>/<descriptor without routing keys>`
///
/// Deterministic: the same key and descriptor always yield the same object.
pub fn destination_key(original_key: &str, descriptor: &Descriptor) -> String {
    let operations = descriptor.without_routing().encode();
    if operations.is_empty() {
        format!("{}/{}", original_key, ORIGINAL_MARKER)
    } else {
        format!("{}/{}", original_key, operations)
    }
}

/// One unconditional write per persisted request; never reads first, never retries.
pub struct ResultPublisher {
    store: Arc<dyn ObjectStore>,
    cache_control: String,
    public_read: bool,
}

impl ResultPublisher {
    pub fn new(store: Arc<dyn ObjectStore>, cache_control: String, public_read: bool) -> Self {
        Self {
            store,
            cache_control,
            public_read,
        }
    }

    pub async fn publish(
        &self,
        destination: &DestinationStore,
        key: String,
        artifact: &TransformedArtifact,
    ) -> Result<ObjectRef, ServiceError> {
        let target = destination.object(key);
        let object = PutObject {
            data: artifact.data.clone(),
            content_type: artifact.content_type.clone(),
            cache_control: self.cache_control.clone(),
            public_read: self.public_read,
        };

        self.store
            .put_object(&target, object)
            .await
            .map_err(|e| ServiceError::PersistFailed {
                bucket: target.bucket.clone(),
                key: target.key.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(
            bucket = %target.bucket,
            key = %target.key,
            region = ?target.region,
            bytes = artifact.len(),
            "Stored transformed image"
        );

        Ok(target)
    }
}
