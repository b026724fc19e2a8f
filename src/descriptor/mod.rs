//! Operation descriptor codec
//!
//! A descriptor is the comma-separated `key=value` list embedded as the last
//! segment of a resource path, e.g.:
//!
//! ```text
//! /images/a.jpg/format=webp,quality=80,width=400
//! ```
//!
//! Encoding is deterministic: keys are always written in [`CANONICAL_ORDER`],
//! so two requests asking for the same transform produce byte-identical
//! descriptors. The edge cache and the derived destination keys both rely on
//! this.

/// Source bucket override (multi-bucket mode)
pub const FROM_BUCKET: &str = "fromBucket";
/// Destination bucket override (multi-bucket mode)
pub const TO_BUCKET: &str = "toBucket";
/// Destination bucket region override
pub const TO_BUCKET_REGION: &str = "toBucketRegion";
/// Destination path hint
pub const TO_BUCKET_PATH: &str = "toBucketPath";
pub const RATIO: &str = "ratio";
pub const FORMAT: &str = "format";
pub const QUALITY: &str = "quality";
pub const WIDTH: &str = "width";
pub const HEIGHT: &str = "height";

/// Marker segment meaning "no transform requested"
pub const ORIGINAL_MARKER: &str = "original";

/// Fixed key order used by [`Descriptor::encode`].
///
/// Re-ordering this list invalidates every cached transform at the edge.
pub const CANONICAL_ORDER: [&str; 9] = [
    FROM_BUCKET,
    TO_BUCKET,
    TO_BUCKET_REGION,
    RATIO,
    FORMAT,
    QUALITY,
    WIDTH,
    HEIGHT,
    TO_BUCKET_PATH,
];

/// Keys that only steer where objects are read from / written to.
pub const ROUTING_KEYS: [&str; 3] = [FROM_BUCKET, TO_BUCKET, TO_BUCKET_REGION];

/// Ordered mapping from operation name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    entries: Vec<(String, String)>,
}

impl Descriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a serialized descriptor.
    ///
    /// Fragments without a `=` (including the `original` marker) carry no
    /// value and are dropped. A repeated key keeps its last value.
    pub fn decode(serialized: &str) -> Self {
        let mut descriptor = Self::new();
        for fragment in serialized.split(',') {
            let mut parts = fragment.split('=');
            let key = parts.next().unwrap_or_default();
            if let Some(value) = parts.next() {
                descriptor.insert(key, value);
            }
        }
        descriptor
    }

    /// Encode using [`CANONICAL_ORDER`].
    pub fn encode(&self) -> String {
        self.encode_with_order(&CANONICAL_ORDER)
    }

    /// Encode the keys listed in `order`, in that order.
    ///
    /// Keys missing from the descriptor, keys with an empty value and keys not
    /// named in `order` are omitted.
    pub fn encode_with_order(&self, order: &[&str]) -> String {
        order
            .iter()
            .filter_map(|key| {
                self.get(key)
                    .filter(|value| !value.is_empty())
                    .map(|value| format!("{key}={value}"))
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Insert or replace a value, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copy of this descriptor with the routing keys removed.
    pub fn without_routing(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !ROUTING_KEYS.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }
}
