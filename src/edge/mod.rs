//! Edge request normalizer
//!
//! Runs once per inbound request before any cache lookup. Free-form query
//! parameters are validated, normalized and folded into a canonical
//! descriptor appended to the path; the query string is cleared so the
//! rewritten path becomes the whole cache key.
//!
//! ```text
//! /images/a.jpg?width=100&format=auto   (Accept: image/webp)
//!   -> /images/a.jpg/format=webp,width=100
//! /images/a.jpg
//!   -> /images/a.jpg/original
//! /images/a.jpg?to_bucket=cache
//!   -> /images/a.jpg/original,toBucket=cache
//! ```
//!
//! This stage never fails: invalid parameters are dropped.

pub mod negotiation;

use crate::descriptor::{
    Descriptor, FORMAT, FROM_BUCKET, HEIGHT, ORIGINAL_MARKER, QUALITY, RATIO, TO_BUCKET,
    TO_BUCKET_PATH, TO_BUCKET_REGION, WIDTH,
};

pub use negotiation::resolve_auto_format;

/// Formats accepted for the `format` parameter
pub const SUPPORTED_FORMATS: [&str; 7] = ["auto", "jpeg", "webp", "avif", "png", "svg", "gif"];

/// Highest accepted quality; larger values are clamped
pub const MAX_QUALITY: i64 = 100;

/// Query parameters passed through untouched, with their descriptor key
const ROUTING_PARAMS: [(&str, &str); 4] = [
    ("from_bucket", FROM_BUCKET),
    ("to_bucket", TO_BUCKET),
    ("to_bucket_region", TO_BUCKET_REGION),
    ("to_bucket_path", TO_BUCKET_PATH),
];

/// Inbound viewer request as seen at the edge
#[derive(Debug, Clone, Default)]
pub struct EdgeRequest {
    /// Request path; also the original object key
    pub uri: String,
    /// Query parameters in arrival order
    pub querystring: Vec<(String, String)>,
    /// `Accept` header, if any
    pub accept: Option<String>,
}

impl EdgeRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.querystring.push((key.into(), value.into()));
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Build from a path and a raw (still percent-encoded) query string.
    pub fn from_raw_query(uri: &str, raw_query: Option<&str>, accept: Option<&str>) -> Self {
        let mut querystring = Vec::new();
        if let Some(query) = raw_query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                querystring.push((
                    urlencoding::decode(key).unwrap_or_default().to_string(),
                    urlencoding::decode(value).unwrap_or_default().to_string(),
                ));
            }
        }
        Self {
            uri: uri.to_string(),
            querystring,
            accept: accept.map(str::to_string),
        }
    }

    /// First value for `name`, matched case-insensitively.
    fn param(&self, name: &str) -> Option<&str> {
        self.querystring
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Result of normalization: the cache key path and an always-empty query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub uri: String,
    pub querystring: String,
}

/// Rewrite a viewer request into its canonical, cacheable form.
pub fn normalize(request: &EdgeRequest) -> NormalizedRequest {
    let mut operations = Descriptor::new();

    for (param, key) in ROUTING_PARAMS {
        if let Some(value) = request.param(param) {
            operations.insert(key, value);
        }
    }
    let has_routing = !operations.is_empty();

    let mut has_transform = false;

    if let Some(ratio) = request.param(RATIO) {
        operations.insert(RATIO, ratio);
        has_transform = true;
    }

    if let Some(format) = request.param(FORMAT).and_then(normalize_format) {
        let format = if format == "auto" {
            resolve_auto_format(&request.uri, request.accept.as_deref())
        } else {
            format
        };
        operations.insert(FORMAT, format);
        has_transform = true;
    }

    if let Some(quality) = request.param(QUALITY).and_then(normalize_quality) {
        operations.insert(QUALITY, quality.to_string());
        has_transform = true;
    }

    for dimension in [WIDTH, HEIGHT] {
        if let Some(value) = request.param(dimension).and_then(normalize_dimension) {
            operations.insert(dimension, value.to_string());
            has_transform = true;
        }
    }

    let uri = if has_transform {
        format!("{}/{}", request.uri, operations.encode())
    } else if has_routing {
        format!("{}/{},{}", request.uri, ORIGINAL_MARKER, operations.encode())
    } else {
        format!("{}/{}", request.uri, ORIGINAL_MARKER)
    };

    tracing::debug!(original = %request.uri, rewritten = %uri, "Normalized edge request");

    NormalizedRequest {
        uri,
        querystring: String::new(),
    }
}

/// Accept a format from [`SUPPORTED_FORMATS`], case-insensitively.
fn normalize_format(value: &str) -> Option<&'static str> {
    SUPPORTED_FORMATS
        .iter()
        .copied()
        .find(|f| f.eq_ignore_ascii_case(value.trim()))
}

/// Width/height: positive integers only.
fn normalize_dimension(value: &str) -> Option<i64> {
    parse_leading_int(value).filter(|v| *v > 0)
}

/// Quality: positive integers, clamped to [`MAX_QUALITY`].
fn normalize_quality(value: &str) -> Option<i64> {
    parse_leading_int(value)
        .filter(|v| *v > 0)
        .map(|v| v.min(MAX_QUALITY))
}

/// Parse the leading integer of `value` (`"100px"` reads as 100).
fn parse_leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let parsed = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -parsed } else { parsed })
}
