//! Object storage access
//!
//! The orchestrator only sees [`ObjectStore`]: one read of the original and
//! at most one write of the transformed artifact per request.
//!
//! [`S3Store`] implements it on the AWS SDK. It keeps one pooled default
//! client, plus a client per destination region created the first time that
//! region is seen. Creating a regional client twice under a race is
//! harmless; the second insert simply loses.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

use crate::config::StoreConfig;

/// Location of an object: bucket, key and an optional region override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
    pub region: Option<String>,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Bytes and content type read from the store
#[derive(Debug, Clone)]
pub struct FetchedObject {
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// Everything written alongside a stored artifact
#[derive(Debug, Clone, PartialEq)]
pub struct PutObject {
    pub data: Bytes,
    pub content_type: String,
    /// Written as the object's Cache-Control metadata
    pub cache_control: String,
    pub public_read: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object {bucket}/{key} does not exist")]
    NotFound { bucket: String, key: String },

    #[error("{0}")]
    Request(String),

    #[error("failed to read object body: {0}")]
    Body(String),
}

/// Read/write access to the backing object store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, source: &ObjectRef) -> Result<FetchedObject, StoreError>;

    /// Single unconditional write; an existing object is overwritten.
    async fn put_object(&self, target: &ObjectRef, object: PutObject) -> Result<(), StoreError>;
}

/// [`ObjectStore`] backed by `aws-sdk-s3`
pub struct S3Store {
    sdk_config: aws_config::SdkConfig,
    force_path_style: bool,
    default_client: Client,
    regional_clients: RwLock<HashMap<String, Client>>,
}

impl S3Store {
    pub fn new(sdk_config: aws_config::SdkConfig, force_path_style: bool) -> Self {
        let default_client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(force_path_style)
                .build(),
        );
        Self {
            sdk_config,
            force_path_style,
            default_client,
            regional_clients: RwLock::new(HashMap::new()),
        }
    }

    /// Load credentials/region from the environment chain, then apply overrides.
    pub async fn from_config(config: &StoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "static",
            ));
        }
        let sdk_config = loader.load().await;

        tracing::info!(
            region = ?sdk_config.region(),
            endpoint = ?config.endpoint,
            force_path_style = config.force_path_style,
            "Initialized S3 client"
        );

        Self::new(sdk_config, config.force_path_style)
    }

    /// Client for `region`, or the default client when `None`.
    pub fn client_for(&self, region: Option<&str>) -> Client {
        let Some(region) = region else {
            return self.default_client.clone();
        };

        if let Some(client) = self.regional_clients.read().get(region) {
            return client.clone();
        }

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&self.sdk_config)
                .region(Region::new(region.to_string()))
                .force_path_style(self.force_path_style)
                .build(),
        );
        tracing::debug!(region = %region, "Created regional S3 client");

        self.regional_clients
            .write()
            .entry(region.to_string())
            .or_insert(client)
            .clone()
    }

    pub fn regional_client_count(&self) -> usize {
        self.regional_clients.read().len()
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_object(&self, source: &ObjectRef) -> Result<FetchedObject, StoreError> {
        let response = self
            .client_for(source.region.as_deref())
            .get_object()
            .bucket(&source.bucket)
            .key(&source.key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(service_error) if service_error.is_no_such_key() => StoreError::NotFound {
                    bucket: source.bucket.clone(),
                    key: source.key.clone(),
                },
                _ => StoreError::Request(DisplayErrorContext(&e).to_string()),
            })?;

        let content_type = response.content_type().map(str::to_string);
        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Body(e.to_string()))?
            .into_bytes();

        Ok(FetchedObject { data, content_type })
    }

    async fn put_object(&self, target: &ObjectRef, object: PutObject) -> Result<(), StoreError> {
        let mut request = self
            .client_for(target.region.as_deref())
            .put_object()
            .bucket(&target.bucket)
            .key(&target.key)
            .body(ByteStream::from(object.data))
            .content_type(object.content_type)
            .cache_control(object.cache_control);

        if object.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request
            .send()
            .await
            .map_err(|e| StoreError::Request(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}
