// Edge Image Optimizer Library
// On-demand image transformation: canonical descriptors, S3 fetch/store, Pingora front end

pub mod config;
pub mod constants;
pub mod descriptor;
pub mod edge;
pub mod error;
pub mod image_optimizer;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod s3;
pub mod service;
