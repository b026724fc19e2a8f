//! Transformation parameters
//!
//! Read from a decoded [`Descriptor`]. Only the recognized keys are looked
//! at; anything else in the descriptor is ignored. Values that do not parse
//! are treated as absent.

use std::str::FromStr;

use crate::descriptor::{Descriptor, FORMAT, HEIGHT, QUALITY, RATIO, WIDTH};

use super::error::ImageError;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
    Svg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
            Self::Svg => "svg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
            Self::Gif => "image/gif",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Whether a quality setting affects this format
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP | Self::Avif)
    }

    /// Whether multi-frame sources keep their frames in this format
    pub fn supports_animation(&self) -> bool {
        matches!(self, Self::Gif | Self::WebP)
    }

    /// Map a decoded source format, if we can write it back out
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Avif => Some(Self::Avif),
            image::ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            "gif" => Ok(OutputFormat::Gif),
            "svg" => Ok(OutputFormat::Svg),
            _ => Err(ImageError::unsupported_format(s)),
        }
    }
}

/// Aspect ratio written as `W:H`, e.g. `16:9`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl FromStr for AspectRatio {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ImageError::resize_failed(format!("invalid ratio: {}", s));
        let (w, h) = s.split_once(':').ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// Image transformation parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformParams {
    /// Target width in pixels
    pub width: Option<u32>,
    /// Target height in pixels
    pub height: Option<u32>,
    /// Output format (None = keep the source format)
    pub format: Option<OutputFormat>,
    /// Output quality (1-100), lossy formats only
    pub quality: Option<u8>,
    /// Aspect ratio used to infer a missing dimension or crop
    pub ratio: Option<AspectRatio>,
}

impl TransformParams {
    pub fn from_descriptor(descriptor: &Descriptor) -> Self {
        Self {
            width: descriptor.get(WIDTH).and_then(parse_dimension),
            height: descriptor.get(HEIGHT).and_then(parse_dimension),
            format: descriptor.get(FORMAT).and_then(|f| f.parse().ok()),
            quality: descriptor.get(QUALITY).and_then(parse_quality),
            ratio: descriptor.get(RATIO).and_then(|r| r.parse().ok()),
        }
    }

    /// Whether any geometry change was requested
    pub fn changes_geometry(&self) -> bool {
        self.width.is_some() || self.height.is_some() || self.ratio.is_some()
    }
}

fn parse_dimension(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

fn parse_quality(value: &str) -> Option<u8> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0)
        .map(|v| v.min(100) as u8)
}
