// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.

// =============================================================================
// Server defaults
// =============================================================================

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

// =============================================================================
// Transform defaults
// =============================================================================

/// Default ceiling for transformed output (bytes)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 4_700_000;

/// Default Cache-Control written on transformed objects (~1 year)
pub const DEFAULT_CACHE_CONTROL: &str = "max-age=31622400";

/// Header carrying the shared secret set by the delivery edge
pub const SECRET_HEADER: &str = "x-origin-secret-header";

// =============================================================================
// Environment variables
// =============================================================================

pub const ENV_ORIGINAL_BUCKET: &str = "ORIGINAL_IMAGE_BUCKET_NAME";
pub const ENV_TRANSFORMED_BUCKET: &str = "TRANSFORMED_IMAGE_BUCKET_NAME";
pub const ENV_CACHE_TTL: &str = "TRANSFORMED_IMAGE_CACHE_TTL";
pub const ENV_SECRET_KEY: &str = "SECRET_KEY";
pub const ENV_MAX_IMAGE_SIZE: &str = "MAX_IMAGE_SIZE";
pub const ENV_S3_ENDPOINT: &str = "S3_ENDPOINT";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
