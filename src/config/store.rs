//! Object store connection settings.

use serde::{Deserialize, Serialize};

/// Connection settings for the S3-compatible store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Default region; falls back to the AWS environment chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom endpoint (MinIO, LocalStack, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Use path-style addressing (required by most custom endpoints)
    #[serde(default)]
    pub force_path_style: bool,

    /// Static credentials; both must be set to take effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub secret_key: Option<String>,
}
