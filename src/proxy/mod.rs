// Proxy module - Pingora ProxyHttp implementation
// Answers every request locally: built-in endpoints or the image transformation service

use async_trait::async_trait;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Instant;

pub mod helpers;
pub mod special_endpoints;

use crate::config::EdgeConfig;
use crate::service::ImageService;
use special_endpoints::{EndpointResponse, HEALTH_PATH, METRICS_PATH};

/// Per-request context
pub struct RequestContext {
    request_id: String,
    started: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            started: Instant::now(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// ImageProxy implements the Pingora ProxyHttp trait
///
/// Requests never reach an upstream peer: `request_filter` always writes
/// the full response.
pub struct ImageProxy {
    service: Arc<ImageService>,
    edge: EdgeConfig,
    /// Proxy start time (for uptime calculation in /health endpoint)
    start_time: Instant,
}

impl ImageProxy {
    pub fn new(service: Arc<ImageService>, edge: EdgeConfig) -> Self {
        Self {
            service,
            edge,
            start_time: Instant::now(),
        }
    }

    async fn write_response(session: &mut Session, response: EndpointResponse) -> Result<()> {
        let mut header = ResponseHeader::build(response.status, None)?;
        for (name, value) in response.headers {
            header.insert_header(name, value)?;
        }
        header.insert_header("Content-Length", response.body.len().to_string())?;

        session
            .write_response_header(Box::new(header), false)
            .await?;
        session
            .write_response_body(Some(response.body.into()), true)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProxyHttp for ImageProxy {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new()
    }

    /// Never reached; every request is answered in `request_filter`
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "image proxy has no upstream",
        ))
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        let path = req.uri.path();

        let response = if path == HEALTH_PATH {
            special_endpoints::handle_health(self.start_time)
        } else if path == METRICS_PATH {
            special_endpoints::handle_metrics()
        } else {
            let event = helpers::build_event(req, self.edge.enabled);
            tracing::debug!(
                request_id = %ctx.request_id(),
                method = %event.method(),
                path = %event.path(),
                "Dispatching transformation request"
            );
            self.service.handle(&event).await.into()
        };

        Self::write_response(session, response).await?;
        Ok(true)
    }

    async fn logging(
        &self,
        session: &mut Session,
        _e: Option<&pingora_core::Error>,
        ctx: &mut Self::CTX,
    ) {
        let status_code = session
            .response_written()
            .map(|resp| resp.status.as_u16())
            .unwrap_or(500);

        tracing::info!(
            request_id = %ctx.request_id(),
            client_ip = %helpers::get_client_ip(session),
            method = %session.req_header().method,
            path = %session.req_header().uri.path(),
            status_code = status_code,
            duration_ms = ctx.started.elapsed().as_millis() as u64,
            "Request completed"
        );
    }
}
