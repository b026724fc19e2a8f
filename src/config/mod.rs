// Configuration module
//
// Loaded once at startup, either from YAML (with ${VAR} substitution) or
// straight from environment variables, then shared read-only.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

mod server;
mod store;

pub use server::{EdgeConfig, ServerConfig};
pub use store::StoreConfig;

use crate::constants::{
    DEFAULT_CACHE_CONTROL, DEFAULT_MAX_OUTPUT_BYTES, ENV_AWS_REGION, ENV_CACHE_TTL,
    ENV_MAX_IMAGE_SIZE, ENV_ORIGINAL_BUCKET, ENV_S3_ENDPOINT, ENV_SECRET_KEY,
    ENV_TRANSFORMED_BUCKET,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub transform: TransformConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub edge: EdgeConfig,
}

/// Where originals are read from and results written to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeploymentMode {
    /// One configured origin bucket; destination optional
    Fixed {
        original_bucket: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transformed_bucket: Option<String>,
    },
    /// Buckets come from the descriptor's routing keys
    Routed {
        /// Origin used when the descriptor has no `fromBucket`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_original_bucket: Option<String>,
    },
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

fn default_cache_control() -> String {
    DEFAULT_CACHE_CONTROL.to_string()
}

fn default_public_read() -> bool {
    true
}

/// Orchestrator settings
#[derive(Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Expected value of the shared secret header
    #[serde(skip_serializing)]
    pub secret_key: String,

    /// Largest transformed output that will be stored/served (bytes)
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Cache-Control metadata written on transformed objects
    #[serde(default = "default_cache_control")]
    pub cache_control: String,

    /// Write transformed objects with a public-read ACL (default: true)
    #[serde(default = "default_public_read")]
    pub public_read: bool,

    pub mode: DeploymentMode,
}

impl fmt::Debug for TransformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformConfig")
            .field("secret_key", &"<redacted>")
            .field("max_output_bytes", &self.max_output_bytes)
            .field("cache_control", &self.cache_control)
            .field("public_read", &self.public_read)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Build from process environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_env_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// `ORIGINAL_IMAGE_BUCKET_NAME` selects fixed-bucket mode; without it the
    /// buckets come from each request's descriptor.
    pub fn from_env_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let secret_key =
            non_empty(ENV_SECRET_KEY).ok_or_else(|| format!("{} is not set", ENV_SECRET_KEY))?;

        let max_output_bytes = match non_empty(ENV_MAX_IMAGE_SIZE) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                format!("{} must be a byte count, got '{}'", ENV_MAX_IMAGE_SIZE, raw)
            })?,
            None => DEFAULT_MAX_OUTPUT_BYTES,
        };

        let mode = match non_empty(ENV_ORIGINAL_BUCKET) {
            Some(original_bucket) => DeploymentMode::Fixed {
                original_bucket,
                transformed_bucket: non_empty(ENV_TRANSFORMED_BUCKET),
            },
            None => DeploymentMode::Routed {
                default_original_bucket: None,
            },
        };

        let endpoint = non_empty(ENV_S3_ENDPOINT);

        Ok(Config {
            server: ServerConfig::default(),
            transform: TransformConfig {
                secret_key,
                max_output_bytes,
                cache_control: non_empty(ENV_CACHE_TTL).unwrap_or_else(default_cache_control),
                public_read: true,
                mode,
            },
            store: StoreConfig {
                region: non_empty(ENV_AWS_REGION),
                force_path_style: endpoint.is_some(),
                endpoint,
                access_key: None,
                secret_key: None,
            },
            edge: EdgeConfig::default(),
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.transform.secret_key.trim().is_empty() {
            return Err("transform.secret_key cannot be empty".to_string());
        }

        if self.transform.max_output_bytes == 0 {
            return Err("transform.max_output_bytes must be greater than 0".to_string());
        }

        if self.transform.cache_control.trim().is_empty() {
            return Err("transform.cache_control cannot be empty".to_string());
        }

        match &self.transform.mode {
            DeploymentMode::Fixed {
                original_bucket,
                transformed_bucket,
            } => {
                if original_bucket.trim().is_empty() {
                    return Err("Original bucket name cannot be empty".to_string());
                }
                if matches!(transformed_bucket, Some(b) if b.trim().is_empty()) {
                    return Err("Transformed bucket name cannot be empty".to_string());
                }
            }
            DeploymentMode::Routed {
                default_original_bucket,
            } => {
                if matches!(default_original_bucket, Some(b) if b.trim().is_empty()) {
                    return Err("Default original bucket name cannot be empty".to_string());
                }
            }
        }

        if self.server.threads == 0 {
            return Err("server.threads must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
transform:
  secret_key: "s3cret"
  mode:
    type: fixed
    original_bucket: originals
"#;
        let config = Config::from_yaml_with_env(yaml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.transform.max_output_bytes, 4_700_000);
        assert_eq!(config.transform.cache_control, "max-age=31622400");
        assert!(config.transform.public_read);
        assert!(!config.edge.enabled);
        assert_eq!(
            config.transform.mode,
            DeploymentMode::Fixed {
                original_bucket: "originals".to_string(),
                transformed_bucket: None,
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_routed_mode_yaml() {
        let yaml = r#"
transform:
  secret_key: "s3cret"
  mode:
    type: routed
store:
  endpoint: "http://localhost:9000"
  force_path_style: true
edge:
  enabled: true
"#;
        let config = Config::from_yaml_with_env(yaml).unwrap();
        assert_eq!(
            config.transform.mode,
            DeploymentMode::Routed {
                default_original_bucket: None
            }
        );
        assert!(config.store.force_path_style);
        assert!(config.edge.enabled);
    }

    #[test]
    fn test_yaml_env_substitution() {
        std::env::set_var("EDGE_IMAGE_TEST_SECRET", "from-env");
        let yaml = r#"
transform:
  secret_key: "${EDGE_IMAGE_TEST_SECRET}"
  mode:
    type: routed
"#;
        let config = Config::from_yaml_with_env(yaml).unwrap();
        assert_eq!(config.transform.secret_key, "from-env");
    }

    #[test]
    fn test_yaml_missing_env_var_is_error() {
        let yaml = r#"
transform:
  secret_key: "${EDGE_IMAGE_TEST_UNSET_VARIABLE}"
  mode:
    type: routed
"#;
        let err = Config::from_yaml_with_env(yaml).unwrap_err();
        assert!(err.contains("EDGE_IMAGE_TEST_UNSET_VARIABLE"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "transform:\n  secret_key: abc\n  max_output_bytes: 1024\n  mode:\n    type: routed"
        )
        .unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.transform.max_output_bytes, 1024);
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/nonexistent/config.yaml").unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_from_env_fixed_mode() {
        let config = Config::from_env_lookup(lookup(&[
            ("SECRET_KEY", "abc"),
            ("ORIGINAL_IMAGE_BUCKET_NAME", "originals"),
            ("TRANSFORMED_IMAGE_BUCKET_NAME", "transformed"),
            ("TRANSFORMED_IMAGE_CACHE_TTL", "max-age=60"),
            ("MAX_IMAGE_SIZE", "1000"),
        ]))
        .unwrap();
        assert_eq!(
            config.transform.mode,
            DeploymentMode::Fixed {
                original_bucket: "originals".to_string(),
                transformed_bucket: Some("transformed".to_string()),
            }
        );
        assert_eq!(config.transform.cache_control, "max-age=60");
        assert_eq!(config.transform.max_output_bytes, 1000);
    }

    #[test]
    fn test_from_env_without_original_bucket_is_routed() {
        let config = Config::from_env_lookup(lookup(&[("SECRET_KEY", "abc")])).unwrap();
        assert!(matches!(config.transform.mode, DeploymentMode::Routed { .. }));
        assert_eq!(config.transform.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
    }

    #[test]
    fn test_from_env_requires_secret() {
        let err = Config::from_env_lookup(lookup(&[])).unwrap_err();
        assert!(err.contains("SECRET_KEY"));
    }

    #[test]
    fn test_from_env_rejects_bad_size() {
        let err = Config::from_env_lookup(lookup(&[
            ("SECRET_KEY", "abc"),
            ("MAX_IMAGE_SIZE", "big"),
        ]))
        .unwrap_err();
        assert!(err.contains("MAX_IMAGE_SIZE"));
    }

    #[test]
    fn test_from_env_custom_endpoint_uses_path_style() {
        let config = Config::from_env_lookup(lookup(&[
            ("SECRET_KEY", "abc"),
            ("S3_ENDPOINT", "http://localhost:4566"),
        ]))
        .unwrap();
        assert!(config.store.force_path_style);
    }

    #[test]
    fn test_validate_rejects_empty_bucket() {
        let mut config = Config::from_env_lookup(lookup(&[("SECRET_KEY", "abc")])).unwrap();
        config.transform.mode = DeploymentMode::Fixed {
            original_bucket: " ".to_string(),
            transformed_bucket: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_size() {
        let mut config = Config::from_env_lookup(lookup(&[("SECRET_KEY", "abc")])).unwrap();
        config.transform.max_output_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::from_env_lookup(lookup(&[("SECRET_KEY", "top-secret")])).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
