//! Raster encoding of rendered results.
//!
//! The presentation layer displays the rendered image and the CLI
//! writes it to disk; both go through PNG bytes produced here.

use image::{DynamicImage, ExtendedColorType, ImageEncoder};

/// Errors that can occur while encoding a rendered image.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),
}

impl From<image::ImageError> for RasterError {
    fn from(err: image::ImageError) -> Self {
        Self::PngEncode(err.to_string())
    }
}

/// Encode `image` as PNG bytes.
///
/// 8-bit gray, RGB, and RGBA images are written as-is; other layouts
/// are converted to RGBA first.
///
/// # Errors
///
/// Returns [`RasterError::PngEncode`] if PNG encoding fails.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, RasterError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    match image {
        DynamicImage::ImageLuma8(gray) => {
            encoder.write_image(gray.as_raw(), gray.width(), gray.height(), ExtendedColorType::L8)?;
        }
        DynamicImage::ImageRgb8(rgb) => {
            encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
        }
        other => {
            let rgba = other.to_rgba8();
            encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)?;
        }
    }
    Ok(png_bytes)
}
