// Transformation orchestrator tests against an in-memory store

use edge_image_optimizer::config::{DeploymentMode, TransformConfig};
use edge_image_optimizer::constants::SECRET_HEADER;
use edge_image_optimizer::image_optimizer::ImageEngine;
use edge_image_optimizer::service::{ImageService, TransformEvent};
use image::{ImageOutputFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

use super::memory_store::MemoryStore;

const SECRET: &str = "edge-secret";

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageOutputFormat::Jpeg(85))
        .unwrap();
    out.into_inner()
}

fn transform_config(mode: DeploymentMode, max_output_bytes: usize) -> Arc<TransformConfig> {
    Arc::new(TransformConfig {
        secret_key: SECRET.to_string(),
        max_output_bytes,
        cache_control: "max-age=31622400".to_string(),
        public_read: true,
        mode,
    })
}

fn fixed_mode() -> DeploymentMode {
    DeploymentMode::Fixed {
        original_bucket: "originals".to_string(),
        transformed_bucket: Some("transformed".to_string()),
    }
}

fn service_with(store: Arc<MemoryStore>, mode: DeploymentMode, max: usize) -> ImageService {
    ImageService::new(
        transform_config(mode, max),
        store,
        Arc::new(ImageEngine::default()),
    )
}

fn get(path: &str) -> TransformEvent {
    TransformEvent::new("GET", path).with_header(SECRET_HEADER, SECRET)
}

#[tokio::test]
async fn test_end_to_end_resize() {
    let store = Arc::new(MemoryStore::new());
    store.insert("originals", "images/a.jpg", jpeg(1000, 1000), "image/jpeg");
    let service = service_with(store.clone(), fixed_mode(), 4_700_000);

    let response = service.handle(&get("/images/a.jpg/width=100")).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body.bucket.as_deref(), Some("transformed"));
    assert_eq!(response.body.key.as_deref(), Some("images/a.jpg/width=100"));
    assert_eq!(response.body.transformed, Some(true));
    assert_eq!(response.body.error, None);

    let stored = store
        .object("transformed", "images/a.jpg/width=100")
        .unwrap();
    assert_eq!(stored.content_type, "image/jpeg");
    assert_eq!(stored.cache_control, "max-age=31622400");
    assert!(stored.public_read);

    let img = image::load_from_memory(&stored.data).unwrap();
    assert_eq!(img.width(), 100);
    assert_eq!(img.height(), 100);

    let timing = response.server_timing.unwrap();
    assert!(timing.starts_with("img-download;dur="));
    assert!(timing.contains("img-transform;dur="));
    assert!(timing.contains("img-upload;dur="));
}

#[tokio::test]
async fn test_envelope_json() {
    let store = Arc::new(MemoryStore::new());
    store.insert("originals", "images/a.jpg", jpeg(40, 40), "image/jpeg");
    let service = service_with(store, fixed_mode(), 4_700_000);

    let envelope = service
        .handle(&get("/images/a.jpg/width=10"))
        .await
        .into_envelope();
    assert_eq!(envelope.status_code, 200);
    assert_eq!(envelope.headers["Content-Type"], "application/json");
    assert!(envelope.headers.contains_key("Server-Timing"));

    let body: serde_json::Value = serde_json::from_str(&envelope.body).unwrap();
    assert_eq!(body["bucket"], "transformed");
    assert_eq!(body["key"], "images/a.jpg/width=10");
    assert_eq!(body["transformed"], true);
}

#[tokio::test]
async fn test_repeated_requests_share_destination_key() {
    let store = Arc::new(MemoryStore::new());
    store.insert("originals", "images/a.jpg", jpeg(200, 100), "image/jpeg");
    let service = service_with(store.clone(), fixed_mode(), 4_700_000);

    let first = service
        .handle(&get("/images/a.jpg/format=webp,width=50"))
        .await;
    let second = service
        .handle(&get("/images/a.jpg/format=webp,width=50"))
        .await;

    assert_eq!(first.status_code, 200);
    assert_eq!(second.status_code, 200);
    assert_eq!(first.body, second.body);
    assert_eq!(store.put_count(), 2);
    assert_eq!(
        store
            .object("transformed", "images/a.jpg/format=webp,width=50")
            .unwrap()
            .content_type,
        "image/webp"
    );
}

#[tokio::test]
async fn test_forbidden_request_touches_nothing() {
    let store = Arc::new(MemoryStore::new());
    store.insert("originals", "images/a.jpg", jpeg(10, 10), "image/jpeg");
    let service = service_with(store.clone(), fixed_mode(), 4_700_000);

    let event = TransformEvent::new("GET", "/images/a.jpg/width=5")
        .with_header(SECRET_HEADER, "wrong");
    let response = service.handle(&event).await;

    assert_eq!(response.status_code, 403);
    assert_eq!(response.server_timing, None);
    assert_eq!(store.get_count(), 0);
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_oversized_output_falls_back_to_original() {
    let store = Arc::new(MemoryStore::new());
    store.insert("originals", "images/a.jpg", jpeg(300, 300), "image/jpeg");
    let service = service_with(store.clone(), fixed_mode(), 100);

    let response = service.handle(&get("/images/a.jpg/format=png")).await;

    assert_eq!(response.status_code, 413);
    assert_eq!(response.body.bucket.as_deref(), Some("originals"));
    assert_eq!(response.body.key.as_deref(), Some("images/a.jpg"));
    assert!(response.body.error.unwrap().contains("100"));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_unbounded_resize_is_server_error() {
    let store = Arc::new(MemoryStore::new());
    store.insert("originals", "images/a.jpg", jpeg(100, 100), "image/jpeg");
    let service = service_with(store.clone(), fixed_mode(), 4_700_000);

    let response = service.handle(&get("/images/a.jpg/width=60000")).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body.key.as_deref(), Some("images/a.jpg"));
    let error = response.body.error.unwrap();
    assert!(error.contains("pixel budget"), "{}", error);
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_missing_original_is_server_error() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone(), fixed_mode(), 4_700_000);

    let response = service.handle(&get("/images/none.jpg/width=5")).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body.bucket.as_deref(), Some("originals"));
    assert!(response.body.error.unwrap().contains("images/none.jpg"));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_routed_mode_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    store.insert("tenant-a", "photos/cat.jpg", jpeg(80, 40), "image/jpeg");
    let mode = DeploymentMode::Routed {
        default_original_bucket: None,
    };
    let service = service_with(store.clone(), mode, 4_700_000);

    let response = service
        .handle(&get(
            "/photos/cat.jpg/fromBucket=tenant-a,toBucket=cache-a,toBucketRegion=eu-west-1,height=20",
        ))
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body.bucket.as_deref(), Some("cache-a"));
    assert_eq!(response.body.key.as_deref(), Some("photos/cat.jpg/height=20"));

    let puts = store.puts.lock();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].region.as_deref(), Some("eu-west-1"));
}

#[tokio::test]
async fn test_routed_mode_without_destination() {
    let store = Arc::new(MemoryStore::new());
    store.insert("tenant-a", "photos/cat.jpg", jpeg(8, 8), "image/jpeg");
    let mode = DeploymentMode::Routed {
        default_original_bucket: None,
    };
    let service = service_with(store.clone(), mode, 4_700_000);

    let response = service
        .handle(&get("/photos/cat.jpg/fromBucket=tenant-a,width=4"))
        .await;

    assert_eq!(response.status_code, 500);
    assert_eq!(store.get_count(), 0);
}

#[test]
fn test_non_get_is_rejected_before_io() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone(), fixed_mode(), 4_700_000);

    let event = TransformEvent::new("PUT", "/images/a.jpg/width=5").with_header(SECRET_HEADER, SECRET);
    let response = tokio_test::block_on(service.handle(&event));

    assert_eq!(response.status_code, 400);
    assert!(response.body.error.unwrap().contains("PUT"));
    assert_eq!(store.get_count(), 0);
}
