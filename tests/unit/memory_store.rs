// In-memory ObjectStore used by the service tests

use async_trait::async_trait;
use bytes::Bytes;
use edge_image_optimizer::s3::{FetchedObject, ObjectRef, ObjectStore, PutObject, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), PutObject>>,
    pub puts: Mutex<Vec<ObjectRef>>,
    pub gets: Mutex<Vec<ObjectRef>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: &str) {
        self.objects.lock().insert(
            (bucket.to_string(), key.to_string()),
            PutObject {
                data: Bytes::from(data),
                content_type: content_type.to_string(),
                cache_control: String::new(),
                public_read: false,
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<PutObject> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().len()
    }

    pub fn get_count(&self) -> usize {
        self.gets.lock().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, source: &ObjectRef) -> Result<FetchedObject, StoreError> {
        self.gets.lock().push(source.clone());
        self.objects
            .lock()
            .get(&(source.bucket.clone(), source.key.clone()))
            .map(|object| FetchedObject {
                data: object.data.clone(),
                content_type: Some(object.content_type.clone()),
            })
            .ok_or_else(|| StoreError::NotFound {
                bucket: source.bucket.clone(),
                key: source.key.clone(),
            })
    }

    async fn put_object(&self, target: &ObjectRef, object: PutObject) -> Result<(), StoreError> {
        self.puts.lock().push(target.clone());
        self.objects
            .lock()
            .insert((target.bucket.clone(), target.key.clone()), object);
        Ok(())
    }
}
