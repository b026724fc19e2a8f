//! Proxy utility functions.
//!
//! This module contains helper functions for request processing:
//! - Header extraction from Pingora requests
//! - Client IP detection (X-Forwarded-For aware)
//! - Translating a Pingora request into a [`TransformEvent`]

use std::collections::HashMap;

use pingora_http::RequestHeader;
use pingora_proxy::Session;

use crate::edge::{self, EdgeRequest};
use crate::service::TransformEvent;

/// Extract headers from Pingora RequestHeader into HashMap.
///
/// Converts all headers to string key-value pairs. Headers with non-UTF8
/// values are skipped.
pub fn extract_headers(req: &RequestHeader) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (name, value) in req.headers.iter() {
        if let Ok(value_str) = value.to_str() {
            headers.insert(name.to_string(), value_str.to_string());
        }
    }
    headers
}

/// Extract client IP address from session (X-Forwarded-For aware).
///
/// The header can contain multiple IPs: `"client, proxy1, proxy2"`.
/// The first IP is the original client, which is what we return.
pub fn get_client_ip(session: &Session) -> String {
    if let Some(forwarded_for) = session
        .req_header()
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(client_ip) = forwarded_for.split(',').next() {
            return client_ip.trim().to_string();
        }
    }

    session
        .client_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Build the orchestrator event for a request.
///
/// With `normalize_edge` set, a request still carrying a query string is
/// first rewritten by the edge normalizer (`/a.jpg?width=100` becomes
/// `/a.jpg/width=100`). The resulting path is percent-decoded.
pub fn build_event(req: &RequestHeader, normalize_edge: bool) -> TransformEvent {
    let raw_path = req.uri.path();
    let query = req.uri.query().filter(|q| !q.is_empty());

    let path = match query {
        Some(query) if normalize_edge => {
            let accept = req.headers.get("accept").and_then(|v| v.to_str().ok());
            edge::normalize(&EdgeRequest::from_raw_query(raw_path, Some(query), accept)).uri
        }
        _ => raw_path.to_string(),
    };

    let path = urlencoding::decode(&path)
        .map(|p| p.into_owned())
        .unwrap_or(path);

    TransformEvent {
        headers: extract_headers(req),
        ..TransformEvent::new(req.method.as_str(), path)
    }
}
