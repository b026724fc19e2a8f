//! HTTP-shaped request event and JSON response envelope.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::ServiceError;
use crate::s3::ObjectRef;

/// Inbound transformation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformEvent {
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub request_context: RequestContext,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub http: HttpContext,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpContext {
    pub method: String,
    pub path: String,
}

impl TransformEvent {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            headers: HashMap::new(),
            request_context: RequestContext {
                http: HttpContext {
                    method: method.into(),
                    path: path.into(),
                },
            },
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn method(&self) -> &str {
        &self.request_context.http.method
    }

    pub fn path(&self) -> &str {
        &self.request_context.http.path
    }
}

/// `{ bucket, key, transformed?, error? }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseBody {
    pub fn reference(object: &ObjectRef) -> Self {
        Self {
            bucket: Some(object.bucket.clone()),
            key: Some(object.key.clone()),
            ..Default::default()
        }
    }

    pub fn key_only(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn with_error(mut self, error: &ServiceError) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Result of one orchestrated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResponse {
    pub status_code: u16,
    pub body: ResponseBody,
    /// `Server-Timing` value; `None` when no phase ran
    pub server_timing: Option<String>,
}

impl TransformResponse {
    pub fn success(body: ResponseBody, server_timing: Option<String>) -> Self {
        Self {
            status_code: 200,
            body,
            server_timing,
        }
    }

    pub fn failure(
        error: &ServiceError,
        reference: ResponseBody,
        server_timing: Option<String>,
    ) -> Self {
        Self {
            status_code: error.status_code(),
            body: reference.with_error(error),
            server_timing,
        }
    }

    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Content-Type", "application/json".to_string())];
        if let Some(timing) = &self.server_timing {
            headers.push(("Server-Timing", timing.clone()));
        }
        headers
    }

    pub fn body_json(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn into_envelope(self) -> ResponseEnvelope {
        let headers = self
            .headers()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        ResponseEnvelope {
            status_code: self.status_code,
            headers,
            body: self.body_json(),
        }
    }
}

/// Serialized response: `{ statusCode, headers, body }` with `body` a JSON string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}
