//! Image processing implementation
//!
//! One staged pipeline over an in-memory buffer:
//! decode → auto-orient → resize/crop → encode
//!
//! Animated GIF and WebP sources keep every frame when the output format can
//! animate (GIF, WebP); any other output format gets the first frame.
//!
//! Planned output geometry is checked against a pixel budget before any
//! buffer is allocated for it.

use bytes::Bytes;
use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::codecs::gif::GifDecoder;
use image::io::Reader as ImageReader;
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat};
use std::io::Cursor;
use std::num::NonZeroU32;

use super::encoder::{
    EncoderFactory, EncoderQuality, GifEncoder, WebPEncoder, DEFAULT_QUALITY, WEBP_MAX_DIMENSION,
};
use super::error::ImageError;
use super::orientation::{apply_orientation, read_orientation, Orientation};
use super::params::{AspectRatio, OutputFormat, TransformParams};

/// Most pixels one transform may produce, summed over every output frame
pub const MAX_OUTPUT_PIXELS: u64 = 64 * 1024 * 1024;

/// Output of a transform, ready to be stored or discarded.
#[derive(Debug, Clone)]
pub struct TransformedArtifact {
    pub data: Bytes,
    pub content_type: String,
    /// Output dimensions (width, height)
    pub size: (u32, u32),
    /// Number of frames written (1 for still images)
    pub frames: usize,
}

impl TransformedArtifact {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decode/orient/resize/encode capability used by the orchestrator.
pub trait TransformEngine: Send + Sync {
    fn transform(
        &self,
        input: &[u8],
        params: &TransformParams,
    ) -> Result<TransformedArtifact, ImageError>;
}

/// [`TransformEngine`] backed by the `image` and `fast_image_resize` crates
#[derive(Debug, Clone)]
pub struct ImageEngine {
    /// Quality for lossy output when the request has none
    pub default_quality: u8,
}

impl Default for ImageEngine {
    fn default() -> Self {
        Self {
            default_quality: DEFAULT_QUALITY,
        }
    }
}

impl TransformEngine for ImageEngine {
    fn transform(
        &self,
        input: &[u8],
        params: &TransformParams,
    ) -> Result<TransformedArtifact, ImageError> {
        let source_format = image::guess_format(input).ok();

        // 1. Decode (every frame of an animation)
        let mut frames = match source_format {
            Some(ImageFormat::Gif) => decode_gif_frames(input)?,
            Some(ImageFormat::WebP) if is_animated_webp(input) => decode_webp_frames(input)?,
            _ => vec![decode_image(input)?],
        };

        // 2. Output format: requested, else same as the source
        let output_format = match params.format {
            Some(format) => format,
            None => source_format
                .and_then(OutputFormat::from_image_format)
                .ok_or_else(|| {
                    ImageError::unsupported_format(
                        source_format
                            .map(|f| format!("{:?}", f))
                            .unwrap_or_else(|| "unknown".to_string()),
                    )
                })?,
        };

        let animated = frames.len() > 1 && output_format.supports_animation();
        if !animated {
            frames.truncate(1);
        }

        // 3. Orientation from EXIF, only when present and not already upright
        let orientation = read_orientation(input).filter(|o| *o != Orientation::Normal);

        // 4. Geometry
        let frame_count = frames.len();
        let mut processed = Vec::with_capacity(frame_count);
        for (img, delay) in frames {
            let img = match orientation {
                Some(o) => apply_orientation(img, o),
                None => img,
            };
            let geometry = plan_geometry(img.width(), img.height(), params);
            check_geometry((img.width(), img.height()), &geometry, frame_count, output_format)?;
            processed.push((apply_geometry(img, &geometry)?, delay));
        }

        let (out_width, out_height) = processed
            .first()
            .map(|(img, _)| (img.width(), img.height()))
            .ok_or_else(|| ImageError::decode_failed("image has no frames"))?;

        // 5. Encode; quality only matters for lossy formats
        let quality = if output_format.is_lossy() {
            EncoderQuality::with_quality(params.quality.unwrap_or(self.default_quality))
        } else {
            EncoderQuality::default()
        };

        let encoded = if animated {
            let frames: Vec<Frame> = processed
                .into_iter()
                .map(|(img, delay)| Frame::from_parts(img.to_rgba8(), 0, 0, delay))
                .collect();
            match output_format {
                OutputFormat::WebP => WebPEncoder.encode_frames(&frames, quality)?,
                _ => GifEncoder.encode_frames(frames)?,
            }
        } else {
            let encoder = EncoderFactory::create(output_format)?;
            let (img, _) = &processed[0];
            let rgba = img.to_rgba8().into_raw();
            encoder.encode(&rgba, out_width, out_height, quality)?
        };

        Ok(TransformedArtifact {
            data: Bytes::from(encoded.data),
            content_type: encoded.content_type.to_string(),
            size: (out_width, out_height),
            frames: frame_count,
        })
    }
}

/// Decode a still image, without the decoder's default size limits
fn decode_image(data: &[u8]) -> Result<(DynamicImage, image::Delay), ImageError> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    reader.no_limits();
    let img = reader
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    Ok((img, image::Delay::from_numer_denom_ms(0, 1)))
}

/// Decode every GIF frame.
///
/// A corrupt frame ends the animation early instead of failing the request,
/// as long as at least one frame decoded.
fn decode_gif_frames(data: &[u8]) -> Result<Vec<(DynamicImage, image::Delay)>, ImageError> {
    let decoder =
        GifDecoder::new(Cursor::new(data)).map_err(|e| ImageError::decode_failed(e.to_string()))?;

    let mut frames = Vec::new();
    for frame in decoder.into_frames() {
        match frame {
            Ok(frame) => {
                let delay = frame.delay();
                frames.push((DynamicImage::ImageRgba8(frame.into_buffer()), delay));
            }
            Err(e) if !frames.is_empty() => {
                tracing::warn!(error = %e, decoded = frames.len(), "Truncating damaged GIF animation");
                break;
            }
            Err(e) => return Err(ImageError::decode_failed(e.to_string())),
        }
    }

    if frames.is_empty() {
        return Err(ImageError::decode_failed("GIF contains no frames"));
    }
    Ok(frames)
}

fn is_animated_webp(data: &[u8]) -> bool {
    webp::BitstreamFeatures::new(data).map_or(false, |features| features.has_animation())
}

/// Decode every frame of an animated WebP, composited onto the full canvas.
fn decode_webp_frames(data: &[u8]) -> Result<Vec<(DynamicImage, image::Delay)>, ImageError> {
    let animation = webp::AnimDecoder::new(data)
        .decode()
        .map_err(ImageError::decode_failed)?;

    let mut frames = Vec::with_capacity(animation.len());
    // Timestamps mark where each frame ends
    let mut previous_end = 0;
    for frame in &animation {
        let (width, height) = (frame.width(), frame.height());
        let pixels = frame.get_image().to_vec();
        let img = match frame.get_layout() {
            webp::PixelLayout::Rgba => {
                image::RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
            }
            webp::PixelLayout::Rgb => {
                image::RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
            }
        }
        .ok_or_else(|| ImageError::decode_failed("WebP frame does not fill its canvas"))?;

        let end = frame.get_time_ms();
        let delay = image::Delay::from_numer_denom_ms((end - previous_end).max(0) as u32, 1);
        previous_end = end;
        frames.push((img, delay));
    }

    if frames.is_empty() {
        return Err(ImageError::decode_failed("WebP animation contains no frames"));
    }
    Ok(frames)
}

/// Resize target and optional centered crop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub resize: Option<(u32, u32)>,
    /// (x, y, width, height), applied after the resize
    pub crop: Option<(u32, u32, u32, u32)>,
}

/// Work out resize and crop for the requested parameters.
///
/// - one dimension: the other is inferred from the ratio if given, else from
///   the source aspect ratio
/// - both dimensions: scale to cover the box, then center-crop
/// - ratio alone: center-crop the source to that ratio
pub fn plan_geometry(src_w: u32, src_h: u32, params: &TransformParams) -> Geometry {
    let (width, height) = match (params.width, params.height, params.ratio) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some(r)) => (w, scale(w, r.height, r.width)),
        (None, Some(h), Some(r)) => (scale(h, r.width, r.height), h),
        (Some(w), None, None) => {
            return Geometry {
                resize: Some((w, scale(src_h, w, src_w))),
                crop: None,
            }
        }
        (None, Some(h), None) => {
            return Geometry {
                resize: Some((scale(src_w, h, src_h), h)),
                crop: None,
            }
        }
        (None, None, Some(r)) => {
            return Geometry {
                resize: None,
                crop: crop_to_ratio(src_w, src_h, r),
            }
        }
        (None, None, None) => return Geometry::default(),
    };

    cover(src_w, src_h, width, height)
}

/// `value * numer / denom`, rounded, at least 1
fn scale(value: u32, numer: u32, denom: u32) -> u32 {
    let scaled = (value as f64 * numer as f64 / denom.max(1) as f64).round();
    (scaled as u32).max(1)
}

fn cover(src_w: u32, src_h: u32, width: u32, height: u32) -> Geometry {
    let factor = f64::max(
        width as f64 / src_w.max(1) as f64,
        height as f64 / src_h.max(1) as f64,
    );
    let resized_w = ((src_w as f64 * factor).round() as u32).max(width);
    let resized_h = ((src_h as f64 * factor).round() as u32).max(height);

    let crop = if resized_w != width || resized_h != height {
        Some((
            (resized_w - width) / 2,
            (resized_h - height) / 2,
            width,
            height,
        ))
    } else {
        None
    };

    Geometry {
        resize: Some((resized_w, resized_h)),
        crop,
    }
}

fn crop_to_ratio(src_w: u32, src_h: u32, ratio: AspectRatio) -> Option<(u32, u32, u32, u32)> {
    let (crop_w, crop_h) = if src_w as u64 * ratio.height as u64 > src_h as u64 * ratio.width as u64
    {
        (scale(src_h, ratio.width, ratio.height).min(src_w), src_h)
    } else {
        (src_w, scale(src_w, ratio.height, ratio.width).min(src_h))
    };

    if crop_w == src_w && crop_h == src_h {
        None
    } else {
        Some(((src_w - crop_w) / 2, (src_h - crop_h) / 2, crop_w, crop_h))
    }
}

/// Reject geometry that would blow the pixel budget or the output format's
/// size limits.
fn check_geometry(
    source: (u32, u32),
    geometry: &Geometry,
    frames: usize,
    format: OutputFormat,
) -> Result<(), ImageError> {
    if let Some((w, h)) = geometry.resize {
        let pixels = w as u64 * h as u64 * frames.max(1) as u64;
        if pixels > MAX_OUTPUT_PIXELS {
            return Err(ImageError::resize_failed(format!(
                "{}x{} ({} frame(s)) exceeds the {} pixel budget",
                w, h, frames, MAX_OUTPUT_PIXELS
            )));
        }
    }

    let (out_w, out_h) = geometry
        .crop
        .map(|(_, _, w, h)| (w, h))
        .or(geometry.resize)
        .unwrap_or(source);
    if format == OutputFormat::WebP && (out_w > WEBP_MAX_DIMENSION || out_h > WEBP_MAX_DIMENSION) {
        return Err(ImageError::resize_failed(format!(
            "{}x{} is larger than WebP allows ({} per side)",
            out_w, out_h, WEBP_MAX_DIMENSION
        )));
    }
    Ok(())
}

fn apply_geometry(img: DynamicImage, geometry: &Geometry) -> Result<DynamicImage, ImageError> {
    let img = match geometry.resize {
        Some((w, h)) if (w, h) != (img.width(), img.height()) => resize_image(&img, w, h)?,
        _ => img,
    };
    Ok(match geometry.crop {
        Some((x, y, w, h)) => img.crop_imm(x, y, w, h),
        None => img,
    })
}

/// Resize image using fast-image-resize with Lanczos3 filter
fn resize_image(img: &DynamicImage, target_w: u32, target_h: u32) -> Result<DynamicImage, ImageError> {
    let src_width =
        NonZeroU32::new(img.width()).ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
