// Logging module for structured logging using the tracing crate

use std::error::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable selecting the output format (`json` or `text`)
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Initialize the tracing subscriber for structured logging
///
/// Level filtering follows `RUST_LOG` (default `info`). Output goes to stdout,
/// as JSON when `LOG_FORMAT=json`, otherwise human-readable text.
///
/// # Errors
///
/// Returns an error if a global subscriber was already installed.
///
/// # Examples
///
/// ```
/// use edge_image_optimizer::logging::init_subscriber;
///
/// init_subscriber().expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber() -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| wants_json(&v))
        .unwrap_or(false);

    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    }
}

fn wants_json(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("json")
}
