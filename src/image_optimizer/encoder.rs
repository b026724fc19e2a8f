//! Image encoder abstraction
//!
//! One encoder per output format behind the [`ImageEncoder`] trait:
//! - JPEG, PNG and GIF via the `image` crate
//! - lossy WebP via libwebp (`webp` crate), animated or still
//! - AVIF via `ravif`
//!
//! SVG is accepted as a requested format but cannot be produced from raster
//! data; asking for it is an encode error.

use image::codecs::gif::{GifEncoder as ImageGifEncoder, Repeat};
use image::{Delay, Frame};

use super::error::ImageError;
use super::params::OutputFormat;

/// Quality used for lossy formats when none was requested
pub const DEFAULT_QUALITY: u8 = 80;

/// Largest width or height libwebp can write
pub const WEBP_MAX_DIMENSION: u32 = 16383;

/// Frame duration used for GIF frames that carry no delay
const DEFAULT_FRAME_DELAY_MS: i32 = 100;

/// Quality for lossy encoders (1-100); ignored by lossless ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderQuality {
    pub quality: u8,
}

impl Default for EncoderQuality {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }
}

impl EncoderQuality {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub content_type: &'static str,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            data,
            content_type: format.content_type(),
        }
    }
}

/// Encodes raw RGBA pixels into one output format.
pub trait ImageEncoder: Send + Sync {
    /// Encode `data` (RGBA, 4 bytes per pixel) of the given size.
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError>;
}

/// JPEG encoder using the image crate
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;

        // JPEG has no alpha channel
        let rgb_data = rgba_to_rgb(data);

        let mut output = Vec::new();
        ImageJpegEncoder::new_with_quality(&mut output, quality.quality)
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8)
            .map_err(|e| ImageError::encode_failed("jpeg", e.to_string()))?;

        Ok(EncodedImage::new(output, OutputFormat::Jpeg))
    }
}

/// PNG encoder using the image crate
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        _quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;

        let mut output = Vec::new();
        ImagePngEncoder::new(&mut output)
            .write_image(data, width, height, image::ColorType::Rgba8)
            .map_err(|e| ImageError::encode_failed("png", e.to_string()))?;

        Ok(EncodedImage::new(output, OutputFormat::Png))
    }
}

/// Lossy WebP encoder backed by libwebp
pub struct WebPEncoder;

impl WebPEncoder {
    /// Encode an animation. Every frame must have the first frame's size.
    pub fn encode_frames(
        &self,
        frames: &[Frame],
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        let first = frames
            .first()
            .ok_or_else(|| ImageError::encode_failed("webp", "no frames to encode"))?;
        let (width, height) = first.buffer().dimensions();
        check_webp_dimensions(width, height)?;

        let mut config = webp::WebPConfig::new()
            .map_err(|_| ImageError::encode_failed("webp", "could not initialize encoder config"))?;
        config.lossless = 0;
        config.quality = quality.quality as f32;

        let mut encoder = webp::AnimEncoder::new(width, height, &config);
        let mut timestamp = 0i32;
        for frame in frames {
            let buffer = frame.buffer();
            if buffer.dimensions() != (width, height) {
                return Err(ImageError::encode_failed(
                    "webp",
                    "animation frames differ in size",
                ));
            }
            encoder.add_frame(webp::AnimFrame::from_rgba(
                buffer.as_raw(),
                width,
                height,
                timestamp,
            ));
            timestamp = timestamp.saturating_add(frame_duration_ms(frame.delay()));
        }

        let encoded = encoder
            .try_encode()
            .map_err(|e| ImageError::encode_failed("webp", format!("{:?}", e)))?;

        Ok(EncodedImage::new(encoded.to_vec(), OutputFormat::WebP))
    }
}

impl ImageEncoder for WebPEncoder {
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ImageError::encode_failed(
                "webp",
                format!("expected {} bytes of RGBA, got {}", expected, data.len()),
            ));
        }
        check_webp_dimensions(width, height)?;

        let encoded = webp::Encoder::from_rgba(data, width, height)
            .encode_simple(false, quality.quality as f32)
            .map_err(|e| ImageError::encode_failed("webp", format!("{:?}", e)))?;

        Ok(EncodedImage::new(encoded.to_vec(), OutputFormat::WebP))
    }
}

fn check_webp_dimensions(width: u32, height: u32) -> Result<(), ImageError> {
    if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
        return Err(ImageError::encode_failed(
            "webp",
            format!(
                "{}x{} exceeds the {} pixel side limit",
                width, height, WEBP_MAX_DIMENSION
            ),
        ));
    }
    Ok(())
}

/// Milliseconds a frame stays on screen; zero delays get the browser default
fn frame_duration_ms(delay: Delay) -> i32 {
    let (numer, denom) = delay.numer_denom_ms();
    match numer / denom.max(1) {
        0 => DEFAULT_FRAME_DELAY_MS,
        ms => i32::try_from(ms).unwrap_or(i32::MAX),
    }
}

/// AVIF encoder backed by ravif
pub struct AvifEncoder {
    /// Speed preset (1-10, where 1 is slowest/best quality)
    pub speed: u8,
}

impl Default for AvifEncoder {
    fn default() -> Self {
        Self { speed: 6 }
    }
}

impl ImageEncoder for AvifEncoder {
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use rgb::FromSlice;

        let pixels = data.as_rgba();
        if pixels.len() != width as usize * height as usize {
            return Err(ImageError::encode_failed(
                "avif",
                "pixel buffer does not match dimensions",
            ));
        }

        let img = imgref::Img::new(pixels, width as usize, height as usize);
        let encoded = ravif::Encoder::new()
            .with_quality(quality.quality as f32)
            .with_alpha_quality(quality.quality as f32)
            .with_speed(self.speed.clamp(1, 10))
            .encode_rgba(img)
            .map_err(|e| ImageError::encode_failed("avif", e.to_string()))?;

        Ok(EncodedImage::new(encoded.avif_file, OutputFormat::Avif))
    }
}

/// GIF encoder using the image crate
pub struct GifEncoder;

impl GifEncoder {
    /// Encode every frame, looping forever.
    pub fn encode_frames(&self, frames: Vec<Frame>) -> Result<EncodedImage, ImageError> {
        let mut output = Vec::new();
        {
            let mut encoder = ImageGifEncoder::new(&mut output);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|e| ImageError::encode_failed("gif", e.to_string()))?;
            encoder
                .encode_frames(frames)
                .map_err(|e| ImageError::encode_failed("gif", e.to_string()))?;
        }
        Ok(EncodedImage::new(output, OutputFormat::Gif))
    }
}

impl ImageEncoder for GifEncoder {
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        _quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        let mut output = Vec::new();
        {
            let mut encoder = ImageGifEncoder::new(&mut output);
            encoder
                .encode(data, width, height, image::ColorType::Rgba8)
                .map_err(|e| ImageError::encode_failed("gif", e.to_string()))?;
        }
        Ok(EncodedImage::new(output, OutputFormat::Gif))
    }
}

/// Factory for creating encoders based on output format
pub struct EncoderFactory;

impl EncoderFactory {
    pub fn create(format: OutputFormat) -> Result<Box<dyn ImageEncoder>, ImageError> {
        match format {
            OutputFormat::Jpeg => Ok(Box::new(JpegEncoder)),
            OutputFormat::Png => Ok(Box::new(PngEncoder)),
            OutputFormat::WebP => Ok(Box::new(WebPEncoder)),
            OutputFormat::Avif => Ok(Box::new(AvifEncoder::default())),
            OutputFormat::Gif => Ok(Box::new(GifEncoder)),
            OutputFormat::Svg => Err(ImageError::unsupported_format("svg")),
        }
    }
}

/// Convert RGBA to RGB by discarding alpha channel
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }
    rgb
}
