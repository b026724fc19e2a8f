// Prometheus metrics for the transformation service
//
// - Responses by status code and error kind
// - Per-phase duration histograms (download, transform, upload)
// - Transformed output size histogram

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

pub struct ServiceMetrics {
    /// Responses by HTTP status
    pub responses: IntCounterVec,

    /// Terminal failures by error kind
    pub errors: IntCounterVec,

    /// Phase duration histogram (in seconds), labelled by Server-Timing phase name
    pub phase_duration: HistogramVec,

    /// Size of transformed artifacts (bytes)
    pub output_bytes: Histogram,
}

static METRICS: OnceLock<ServiceMetrics> = OnceLock::new();

impl ServiceMetrics {
    /// Global instance, registered with the default registry on first use.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let responses = register_int_counter_vec!(
                "edge_image_responses_total",
                "Transformation responses by HTTP status",
                &["status"]
            )
            .expect("Failed to register edge_image_responses_total metric");

            let errors = register_int_counter_vec!(
                "edge_image_errors_total",
                "Failed transformation requests by error kind",
                &["kind"]
            )
            .expect("Failed to register edge_image_errors_total metric");

            let phase_duration = register_histogram_vec!(
                "edge_image_phase_duration_seconds",
                "Duration of each request phase in seconds",
                &["phase"], // img-download, img-transform, img-upload
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            )
            .expect("Failed to register edge_image_phase_duration_seconds metric");

            let output_bytes = register_histogram!(
                "edge_image_output_bytes",
                "Size of transformed images in bytes",
                vec![
                    1_000.0,
                    10_000.0,
                    50_000.0,
                    100_000.0,
                    500_000.0,
                    1_000_000.0,
                    4_700_000.0,
                    10_000_000.0
                ]
            )
            .expect("Failed to register edge_image_output_bytes metric");

            ServiceMetrics {
                responses,
                errors,
                phase_duration,
                output_bytes,
            }
        })
    }

    pub fn record_response(&self, status: u16) {
        self.responses
            .with_label_values(&[status.to_string().as_str()])
            .inc();
    }

    pub fn record_error(&self, kind: &str) {
        self.errors.with_label_values(&[kind]).inc();
    }

    pub fn record_phase(&self, phase: &str, seconds: f64) {
        self.phase_duration
            .with_label_values(&[phase])
            .observe(seconds);
    }

    pub fn record_output_size(&self, bytes: usize) {
        self.output_bytes.observe(bytes as f64);
    }

    pub fn response_count(&self, status: u16) -> u64 {
        self.responses
            .with_label_values(&[status.to_string().as_str()])
            .get()
    }
}

/// Render every registered metric in the Prometheus text format
pub fn export() -> String {
    // Touch the global so the service metrics are always present
    let _ = ServiceMetrics::global();

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
