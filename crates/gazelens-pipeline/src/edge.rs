//! Canny edge detection and the Laplacian operator.

use image::{DynamicImage, GrayImage};

use crate::blur::sigma_for_kernel;
use crate::grayscale::to_luma;
use crate::library::{map_color_planes, odd_kernel_size};
use crate::params::ParamBindings;
use crate::threshold::saturate_u8;
use crate::types::OperationError;

/// Largest aperture OpenCV's `Laplacian` accepts.
pub const MAX_LAPLACIAN_KSIZE: u32 = 31;

/// Detect edges with the Canny algorithm.
///
/// Returns a binary single-channel image: 255 for edge pixels, 0 for
/// background. Colour input is converted to luminance first. The two
/// thresholds may be given in either order; negative values count as 0.
///
/// `apertureSize` must be 3, 5 or 7 and `L2gradient` must be a boolean
/// choice. `imageproc` always uses a 3x3 Sobel aperture and the L2
/// gradient norm, so neither changes the result here.
///
/// # Errors
///
/// Returns [`OperationError`] if a parameter is missing or malformed, or
/// `apertureSize` is not 3, 5 or 7.
#[allow(clippy::cast_possible_truncation)]
pub fn canny(source: &DynamicImage, params: &ParamBindings) -> Result<DynamicImage, OperationError> {
    let t1 = params.number("threshold1")?.max(0.0);
    let t2 = params.number("threshold2")?.max(0.0);
    let aperture = params.unsigned("apertureSize")?;
    if !matches!(aperture, 3 | 5 | 7) {
        return Err(OperationError::InvalidParameter {
            name: "apertureSize".to_string(),
            reason: format!("aperture size must be 3, 5 or 7, got {aperture}"),
        });
    }
    let _l2 = params.flag("L2gradient")?;

    let (low, high) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
    let gray = to_luma(source);
    let edges = imageproc::edges::canny(&gray, low as f32, high as f32);
    Ok(DynamicImage::ImageLuma8(edges))
}

/// `saturate(laplacian * scale + delta)` on one plane.
fn laplacian_plane(plane: &GrayImage, ksize: u32, scale: f64, delta: f64) -> GrayImage {
    #[allow(clippy::cast_possible_truncation)]
    let smoothed = if ksize > 1 {
        imageproc::filter::gaussian_blur_f32(plane, sigma_for_kernel(ksize) as f32)
    } else {
        plane.clone()
    };
    let lap = imageproc::filter::laplacian_filter(&smoothed);
    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        let v = f64::from(lap.get_pixel(x, y).0[0]);
        image::Luma([saturate_u8(v.mul_add(scale, delta))])
    })
}

/// Apply the Laplacian to every colour plane, scaled and offset into
/// 8 bits.
///
/// `ksize` 1 uses the 4-neighbour 3x3 aperture directly. Larger odd
/// apertures smooth with a Gaussian of matching size first, which
/// approximates OpenCV's larger second-derivative kernels.
///
/// # Errors
///
/// Returns [`OperationError::InvalidParameter`] if `ksize` is even, zero,
/// or above [`MAX_LAPLACIAN_KSIZE`], and [`OperationError`] if `scale` or
/// `delta` is missing or malformed.
pub fn laplacian(source: &DynamicImage, params: &ParamBindings) -> Result<DynamicImage, OperationError> {
    let ksize = odd_kernel_size(params)?;
    if ksize > MAX_LAPLACIAN_KSIZE {
        return Err(OperationError::InvalidParameter {
            name: "ksize".to_string(),
            reason: format!("kernel size must be at most {MAX_LAPLACIAN_KSIZE}, got {ksize}"),
        });
    }
    let scale = params.number("scale")?;
    let delta = params.number("delta")?;

    Ok(map_color_planes(source, |plane| laplacian_plane(plane, ksize, scale, delta)))
}
