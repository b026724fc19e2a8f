//! Transformation orchestrator
//!
//! One call to [`ImageService::handle`] runs one request through
//! authorize → decode path → resolve route → download → transform →
//! size check → persist → respond. Phases run strictly in sequence and
//! each one is timed separately into the request's [`TimingLog`].

pub mod event;
pub mod publisher;
pub mod route;
pub mod timing;

pub use event::{ResponseBody, ResponseEnvelope, TransformEvent, TransformResponse};
pub use publisher::{destination_key, ResultPublisher};
pub use route::{DestinationStore, RequestPath, Route};
pub use timing::{Phase, TimingLog};

use std::sync::Arc;
use std::time::Instant;
use subtle::ConstantTimeEq;

use crate::config::TransformConfig;
use crate::constants::SECRET_HEADER;
use crate::error::ServiceError;
use crate::image_optimizer::{TransformEngine, TransformParams};
use crate::metrics::ServiceMetrics;
use crate::s3::ObjectStore;

pub struct ImageService {
    config: Arc<TransformConfig>,
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn TransformEngine>,
    publisher: ResultPublisher,
}

impl ImageService {
    pub fn new(
        config: Arc<TransformConfig>,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn TransformEngine>,
    ) -> Self {
        let publisher = ResultPublisher::new(
            store.clone(),
            config.cache_control.clone(),
            config.public_read,
        );
        Self {
            config,
            store,
            engine,
            publisher,
        }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Run one request to completion. Every outcome, including failures,
    /// is returned as a response.
    pub async fn handle(&self, event: &TransformEvent) -> TransformResponse {
        let response = self.run(event).await;
        ServiceMetrics::global().record_response(response.status_code);
        response
    }

    async fn run(&self, event: &TransformEvent) -> TransformResponse {
        // Entry checks, before any I/O and without a timing log
        if let Err(e) = self.check_entry(event) {
            return fail(&e, ResponseBody::default(), None);
        }

        let path = RequestPath::parse(event.path());
        let mode = &self.config.mode;

        let origin = match Route::resolve_origin(mode, &path.key, &path.descriptor) {
            Ok(origin) => origin,
            Err(e) => return fail(&e, ResponseBody::key_only(&path.key), None),
        };
        let route = match Route::resolve(mode, origin.clone(), &path.descriptor) {
            Ok(route) => route,
            Err(e) => return fail(&e, ResponseBody::reference(&origin), None),
        };
        let params = TransformParams::from_descriptor(&path.descriptor);

        let mut timing = TimingLog::new();

        // 1. Download
        let started = Instant::now();
        let downloaded = self.store.get_object(route.origin()).await;
        timing.finish(Phase::Download, started);
        let original = match downloaded {
            Ok(original) => original,
            Err(e) => {
                let err = ServiceError::OriginFetchFailed(e.to_string());
                return fail(
                    &err,
                    ResponseBody::reference(route.origin()),
                    timing.server_timing_header(),
                );
            }
        };

        // 2. Transform (CPU-bound, off the async workers)
        let started = Instant::now();
        let engine = self.engine.clone();
        let input = original.data.clone();
        let transformed = tokio::task::spawn_blocking(move || engine.transform(&input, &params))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Transform task did not complete");
                "transform task did not complete".to_string()
            })
            .and_then(|result| result.map_err(|e| e.to_string()));
        timing.finish(Phase::Transform, started);
        let artifact = match transformed {
            Ok(artifact) => artifact,
            Err(message) => {
                return fail(
                    &ServiceError::TransformFailed(message),
                    ResponseBody::reference(route.origin()),
                    timing.server_timing_header(),
                );
            }
        };
        ServiceMetrics::global().record_output_size(artifact.len());

        // 3. Size check
        if artifact.len() > self.config.max_output_bytes {
            let err = ServiceError::OutputTooLarge {
                max: self.config.max_output_bytes,
                actual: artifact.len(),
            };
            return fail(
                &err,
                ResponseBody::reference(route.origin()),
                timing.server_timing_header(),
            );
        }

        // 4. Persist
        let Some(destination) = route.destination() else {
            tracing::info!(
                bucket = %route.origin().bucket,
                key = %route.origin().key,
                bytes = artifact.len(),
                "Transformed image not persisted: no destination store configured"
            );
            return TransformResponse::success(
                ResponseBody::reference(route.origin()),
                timing.server_timing_header(),
            );
        };

        let key = destination_key(&path.key, &path.descriptor);
        let started = Instant::now();
        let published = self.publisher.publish(destination, key, &artifact).await;
        timing.finish(Phase::Upload, started);

        match published {
            Ok(stored) => {
                tracing::info!(
                    origin = %route.origin(),
                    destination = %stored,
                    width = artifact.size.0,
                    height = artifact.size.1,
                    bytes = artifact.len(),
                    content_type = %artifact.content_type,
                    "Image transformed"
                );
                TransformResponse::success(
                    ResponseBody {
                        transformed: Some(true),
                        ..ResponseBody::reference(&stored)
                    },
                    timing.server_timing_header(),
                )
            }
            Err(e) => fail(
                &e,
                ResponseBody::reference(route.origin()),
                timing.server_timing_header(),
            ),
        }
    }

    fn check_entry(&self, event: &TransformEvent) -> Result<(), ServiceError> {
        let authorized = event.header(SECRET_HEADER).is_some_and(|secret| {
            secret
                .as_bytes()
                .ct_eq(self.config.secret_key.as_bytes())
                .into()
        });
        if !authorized {
            return Err(ServiceError::Unauthorized);
        }
        if event.method() != "GET" {
            return Err(ServiceError::BadMethod(event.method().to_string()));
        }
        Ok(())
    }
}

fn fail(
    error: &ServiceError,
    reference: ResponseBody,
    server_timing: Option<String>,
) -> TransformResponse {
    match error.status_code() {
        500 => tracing::error!(kind = error.kind(), error = %error, "Transformation request failed"),
        _ => tracing::warn!(kind = error.kind(), error = %error, "Transformation request rejected"),
    }
    ServiceMetrics::global().record_error(error.kind());
    TransformResponse::failure(error, reference, server_timing)
}
