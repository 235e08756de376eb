//! Contour extraction and rendering.
//!
//! Borders are traced with `imageproc::contours::find_contours`
//! (Suzuki-Abe border following) and every contour is outlined on a
//! black RGB canvas. Colours come from a keyed SipHash of the contour
//! index, so the same input always renders the same picture.

use std::hash::Hasher;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::contours::Contour;
use siphasher::sip::SipHasher13;

use crate::params::ParamBindings;
use crate::types::OperationError;

const COLOR_KEYS: (u64, u64) = (0x6761_7a65_6c65_6e73, 0x636f_6e74_6f75_7273);

/// Deterministic, never-black colour for contour number `index`.
#[must_use]
pub fn contour_color(index: usize) -> Rgb<u8> {
    let mut hasher = SipHasher13::new_with_keys(COLOR_KEYS.0, COLOR_KEYS.1);
    hasher.write_usize(index);
    let bytes = hasher.finish().to_le_bytes();
    Rgb([
        64 + bytes[0] % 192,
        64 + bytes[1] % 192,
        64 + bytes[2] % 192,
    ])
}

/// Trace every border in a binary image.
///
/// Any non-zero pixel counts as foreground.
#[must_use]
pub fn find(binary: &image::GrayImage) -> Vec<Contour<u32>> {
    imageproc::contours::find_contours(binary)
}

/// Outline `contours` on a black canvas of the given size.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn draw(contours: &[Contour<u32>], width: u32, height: u32) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    for (index, contour) in contours.iter().enumerate() {
        let color = contour_color(index);
        match contour.points.as_slice() {
            [] => {}
            [only] => canvas.put_pixel(only.x, only.y, color),
            points => {
                let closing = points.last().zip(points.first());
                for (a, b) in points.windows(2).map(|w| (&w[0], &w[1])).chain(closing) {
                    imageproc::drawing::draw_line_segment_mut(
                        &mut canvas,
                        (a.x as f32, a.y as f32),
                        (b.x as f32, b.y as f32),
                        color,
                    );
                }
            }
        }
    }
    canvas
}

/// Find contours in a single-channel 8-bit image and draw them.
///
/// # Errors
///
/// Returns [`OperationError::UnsupportedImage`] unless `source` is
/// single-channel 8-bit, which in practice means a grayscale step ran
/// before this one.
pub fn find_and_draw(source: &DynamicImage, _params: &ParamBindings) -> Result<DynamicImage, OperationError> {
    let DynamicImage::ImageLuma8(binary) = source else {
        return Err(OperationError::UnsupportedImage(format!(
            "contour search needs a single-channel 8-bit image, got {:?}",
            source.color()
        )));
    };

    let contours = find(binary);
    log::debug!("found {} contours", contours.len());
    Ok(DynamicImage::ImageRgb8(draw(&contours, binary.width(), binary.height())))
}
