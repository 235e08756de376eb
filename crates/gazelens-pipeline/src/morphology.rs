//! Grayscale dilation and erosion with a square structuring element.
//!
//! Both wrap `imageproc::morphology`'s grayscale operators. The mask is
//! a full `ksize` square anchored at `ksize / 2` on each axis, the same
//! anchor OpenCV picks by default, so even sizes extend one pixel
//! further before the anchor than after it. Pixels outside the image
//! never win the maximum or minimum.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

use crate::library::{bounded_kernel_size, map_color_planes};
use crate::params::ParamBindings;
use crate::types::OperationError;

/// A `ksize` square anchored at its centre, rounding down.
#[allow(clippy::cast_possible_truncation)]
fn square_mask(ksize: u32) -> Mask {
    let anchor = (ksize / 2) as u8;
    Mask::from_image(&GrayImage::from_pixel(ksize, ksize, Luma([u8::MAX])), anchor, anchor)
}

fn morph(
    source: &DynamicImage,
    params: &ParamBindings,
    op: fn(&GrayImage, &Mask) -> GrayImage,
) -> Result<DynamicImage, OperationError> {
    let ksize = bounded_kernel_size(params)?;
    let iterations = params.unsigned("iterations")?;
    let mask = square_mask(ksize);

    Ok(map_color_planes(source, |plane| {
        let mut out = plane.clone();
        for _ in 0..iterations {
            out = op(&out, &mask);
        }
        out
    }))
}

/// Replace every pixel with the maximum of its `ksize` square
/// neighbourhood, `iterations` times.
///
/// # Errors
///
/// Returns [`OperationError`] if `ksize` is zero or above
/// [`MAX_KERNEL_SIZE`](crate::library::MAX_KERNEL_SIZE), or either
/// parameter is missing or malformed.
pub fn dilate(source: &DynamicImage, params: &ParamBindings) -> Result<DynamicImage, OperationError> {
    morph(source, params, grayscale_dilate)
}

/// Replace every pixel with the minimum of its `ksize` square
/// neighbourhood, `iterations` times.
///
/// # Errors
///
/// As [`dilate`].
pub fn erode(source: &DynamicImage, params: &ParamBindings) -> Result<DynamicImage, OperationError> {
    morph(source, params, grayscale_erode)
}
