//! Image transformation engine
//!
//! Wraps the codec libraries behind [`TransformEngine`]:
//! - decode (JPEG, PNG, WebP, GIF including animation)
//! - auto-rotate from EXIF orientation
//! - resize/crop, aspect preserving
//! - re-encode to JPEG, PNG, WebP, AVIF or GIF with optional quality
//!
//! Parameters come from the operation descriptor:
//! ```text
//! /images/a.jpg/format=webp,quality=80,width=400
//! ```

pub mod encoder;
pub mod error;
pub mod orientation;
pub mod params;
pub mod processor;

pub use encoder::{EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder};
pub use error::ImageError;
pub use orientation::Orientation;
pub use params::{AspectRatio, OutputFormat, TransformParams};
pub use processor::{plan_geometry, Geometry, ImageEngine, TransformEngine, TransformedArtifact};
