//! Image decoding and grayscale conversion.
//!
//! Decoding turns raw bytes (PNG, JPEG, BMP, WebP) into the pristine
//! source image a session runs its pipeline against. Grayscale
//! conversion is the `grayscale` operation itself.

use image::{DynamicImage, GrayImage};

use crate::types::PipelineError;

/// Decode raw image bytes without altering the pixel layout.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    Ok(image::load_from_memory(bytes)?)
}

/// Convert to a single 8-bit luminance channel.
///
/// Uses the `image` crate's Rec. 709 luma weights rather than the
/// Rec. 601 weights of OpenCV's `COLOR_RGB2GRAY`. Alpha is dropped.
#[must_use = "returns the grayscale image"]
pub fn to_luma(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode an RGBA image as PNG bytes.
    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn decode_keeps_color_layout() {
        let img = image::RgbaImage::from_fn(17, 31, |_, _| image::Rgba([128, 64, 32, 255]));
        let decoded = decode(&encode_png(&img)).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageRgba8(_)));
        assert_eq!(decoded.width(), 17);
        assert_eq!(decoded.height(), 31);
    }

    #[test]
    fn luminance_weights_green_over_red_over_blue() {
        let img = image::RgbImage::from_fn(3, 1, |x, _| match x {
            0 => image::Rgb([255, 0, 0]),
            1 => image::Rgb([0, 255, 0]),
            _ => image::Rgb([0, 0, 255]),
        });
        let gray = to_luma(&DynamicImage::ImageRgb8(img));
        let r = gray.get_pixel(0, 0).0[0];
        let g = gray.get_pixel(1, 0).0[0];
        let b = gray.get_pixel(2, 0).0[0];
        assert!(
            g > r && r > b,
            "expected green > red > blue luminance, got R={r} G={g} B={b}",
        );
    }

    #[test]
    fn white_stays_white() {
        let img = image::RgbaImage::from_fn(2, 2, |_, _| image::Rgba([255, 255, 255, 255]));
        let gray = to_luma(&DynamicImage::ImageRgba8(img));
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }
}
