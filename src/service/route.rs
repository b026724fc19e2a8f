//! Request path decoding and origin/destination resolution.

use crate::config::DeploymentMode;
use crate::descriptor::{Descriptor, FROM_BUCKET, TO_BUCKET, TO_BUCKET_REGION};
use crate::error::ServiceError;
use crate::s3::ObjectRef;

/// `/<original-key-segments>/<descriptor>` split into its two halves
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPath {
    pub key: String,
    pub descriptor: Descriptor,
}

impl RequestPath {
    /// The last segment is the descriptor; everything before it (minus the
    /// leading slash) is the original object key.
    pub fn parse(path: &str) -> Self {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let (key, descriptor) = match trimmed.rsplit_once('/') {
            Some((key, descriptor)) => (key, descriptor),
            None => ("", trimmed),
        };
        Self {
            key: key.to_string(),
            descriptor: Descriptor::decode(descriptor),
        }
    }
}

/// Bucket (and optional region) that receives the transformed artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationStore {
    pub bucket: String,
    pub region: Option<String>,
}

impl DestinationStore {
    pub fn object(&self, key: impl Into<String>) -> ObjectRef {
        ObjectRef::new(self.bucket.clone(), key).with_region(self.region.clone())
    }
}

/// Resolved origin/destination for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Configured buckets; persisting is skipped without a destination
    Fixed {
        origin: ObjectRef,
        destination: Option<DestinationStore>,
    },
    /// Buckets taken from the descriptor's routing keys
    Routed {
        origin: ObjectRef,
        destination: DestinationStore,
    },
}

impl Route {
    /// Where the original lives. Fails before any I/O when it cannot be known.
    pub fn resolve_origin(
        mode: &DeploymentMode,
        key: &str,
        descriptor: &Descriptor,
    ) -> Result<ObjectRef, ServiceError> {
        if key.is_empty() {
            return Err(ServiceError::OriginFetchFailed(
                "request path has no original image key".to_string(),
            ));
        }

        let bucket = match mode {
            DeploymentMode::Fixed {
                original_bucket, ..
            } => original_bucket.clone(),
            DeploymentMode::Routed {
                default_original_bucket,
            } => descriptor
                .get(FROM_BUCKET)
                .filter(|b| !b.is_empty())
                .map(str::to_string)
                .or_else(|| default_original_bucket.clone())
                .ok_or_else(|| {
                    ServiceError::OriginFetchFailed(
                        "no origin bucket given for this request".to_string(),
                    )
                })?,
        };

        Ok(ObjectRef::new(bucket, key))
    }

    pub fn resolve(
        mode: &DeploymentMode,
        origin: ObjectRef,
        descriptor: &Descriptor,
    ) -> Result<Self, ServiceError> {
        let region = descriptor
            .get(TO_BUCKET_REGION)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        match mode {
            DeploymentMode::Fixed {
                transformed_bucket, ..
            } => Ok(Route::Fixed {
                origin,
                destination: transformed_bucket.as_ref().map(|bucket| DestinationStore {
                    bucket: bucket.clone(),
                    region,
                }),
            }),
            DeploymentMode::Routed { .. } => {
                let bucket = descriptor
                    .get(TO_BUCKET)
                    .filter(|b| !b.is_empty())
                    .ok_or(ServiceError::MissingDestinationStore)?;
                Ok(Route::Routed {
                    origin,
                    destination: DestinationStore {
                        bucket: bucket.to_string(),
                        region,
                    },
                })
            }
        }
    }

    pub fn origin(&self) -> &ObjectRef {
        match self {
            Route::Fixed { origin, .. } | Route::Routed { origin, .. } => origin,
        }
    }

    pub fn destination(&self) -> Option<&DestinationStore> {
        match self {
            Route::Fixed { destination, .. } => destination.as_ref(),
            Route::Routed { destination, .. } => Some(destination),
        }
    }
}
