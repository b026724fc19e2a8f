// Configuration tests

use edge_image_optimizer::config::*;

#[test]
fn test_full_yaml_config() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 9090
  threads: 2
transform:
  secret_key: "abc"
  max_output_bytes: 2000000
  cache_control: "max-age=3600"
  public_read: false
  mode:
    type: fixed
    original_bucket: originals
    transformed_bucket: transformed
store:
  region: us-west-2
edge:
  enabled: true
"#;
    let config = Config::from_yaml_with_env(yaml).expect("Failed to parse config");
    assert_eq!(config.server.listen_address(), "127.0.0.1:9090");
    assert_eq!(config.server.threads, 2);
    assert_eq!(config.transform.max_output_bytes, 2_000_000);
    assert_eq!(config.transform.cache_control, "max-age=3600");
    assert!(!config.transform.public_read);
    assert_eq!(config.store.region.as_deref(), Some("us-west-2"));
    assert!(config.edge.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_unknown_mode_is_rejected() {
    let yaml = r#"
transform:
  secret_key: "abc"
  mode:
    type: sharded
"#;
    assert!(Config::from_yaml_with_env(yaml).is_err());
}

#[test]
fn test_missing_transform_section_is_rejected() {
    let yaml = r#"
server:
  port: 8080
"#;
    assert!(Config::from_yaml_with_env(yaml).is_err());
}

#[test]
fn test_empty_secret_fails_validation() {
    let yaml = r#"
transform:
  secret_key: ""
  mode:
    type: routed
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_serialized_config_omits_secret() {
    let yaml = r#"
transform:
  secret_key: "do-not-print"
  mode:
    type: routed
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    let out = serde_yaml::to_string(&config).unwrap();
    assert!(!out.contains("do-not-print"));
}
