// Transform engine tests through the public API

use edge_image_optimizer::descriptor::Descriptor;
use edge_image_optimizer::image_optimizer::{ImageEngine, TransformEngine, TransformParams};
use image::{ImageOutputFormat, RgbImage};
use std::io::Cursor;

fn encode(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

fn params(descriptor: &str) -> TransformParams {
    TransformParams::from_descriptor(&Descriptor::decode(descriptor))
}

fn dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).unwrap();
    (img.width(), img.height())
}

#[test]
fn test_width_only_preserves_aspect_ratio() {
    let input = encode(400, 200, ImageOutputFormat::Jpeg(90));
    let out = ImageEngine::default()
        .transform(&input, &params("width=100"))
        .unwrap();
    assert_eq!(out.content_type, "image/jpeg");
    assert_eq!(out.size, (100, 50));
    assert_eq!(dimensions(&out.data), (100, 50));
}

#[test]
fn test_both_dimensions_fill_the_box() {
    let input = encode(400, 200, ImageOutputFormat::Png);
    let out = ImageEngine::default()
        .transform(&input, &params("width=50,height=50"))
        .unwrap();
    assert_eq!(out.content_type, "image/png");
    assert_eq!(dimensions(&out.data), (50, 50));
}

#[test]
fn test_ratio_with_width_derives_height() {
    let input = encode(320, 320, ImageOutputFormat::Png);
    let out = ImageEngine::default()
        .transform(&input, &params("ratio=16:9,width=160"))
        .unwrap();
    assert_eq!(dimensions(&out.data), (160, 90));
}

#[test]
fn test_png_to_webp() {
    let input = encode(64, 64, ImageOutputFormat::Png);
    let out = ImageEngine::default()
        .transform(&input, &params("format=webp,quality=60"))
        .unwrap();
    assert_eq!(out.content_type, "image/webp");
    assert_eq!(&out.data[0..4], b"RIFF");
    assert_eq!(&out.data[8..12], b"WEBP");
}

#[test]
fn test_no_operations_keeps_format_and_size() {
    let input = encode(30, 20, ImageOutputFormat::Png);
    let out = ImageEngine::default()
        .transform(&input, &TransformParams::default())
        .unwrap();
    assert_eq!(out.content_type, "image/png");
    assert_eq!(out.size, (30, 20));
}

#[test]
fn test_garbage_input_is_an_error() {
    let result = ImageEngine::default().transform(b"definitely not an image", &params("width=10"));
    assert!(result.is_err());
}

fn animated_gif(frames: u8) -> Vec<u8> {
    let mut output = Vec::new();
    {
        let mut encoder = image::codecs::gif::GifEncoder::new(&mut output);
        let frames = (0..frames).map(|i| {
            image::Frame::new(image::RgbaImage::from_pixel(
                40,
                20,
                image::Rgba([0, i * 50, 255, 255]),
            ))
        });
        encoder.encode_frames(frames).unwrap();
    }
    output
}

#[test]
fn test_animated_gif_to_webp_stays_animated() {
    let out = ImageEngine::default()
        .transform(&animated_gif(4), &params("format=webp,width=20"))
        .unwrap();
    assert_eq!(out.content_type, "image/webp");
    assert_eq!(out.frames, 4);
    assert_eq!(out.size, (20, 10));
    assert!(webp::BitstreamFeatures::new(&out.data)
        .unwrap()
        .has_animation());
}

#[test]
fn test_huge_width_fails_instead_of_allocating() {
    let input = encode(100, 100, ImageOutputFormat::Png);
    let result = ImageEngine::default().transform(&input, &params("width=60000"));
    assert!(result.is_err());
}

#[test]
fn test_webp_wider_than_libwebp_limit_fails() {
    let input = encode(100, 1, ImageOutputFormat::Png);
    let result = ImageEngine::default().transform(&input, &params("format=webp,width=17000"));
    assert!(result.is_err());
}
