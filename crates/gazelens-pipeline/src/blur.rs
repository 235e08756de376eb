//! Box and Gaussian smoothing.
//!
//! Both filters run on each colour plane independently, since the
//! `imageproc` kernels only accept single-channel images. Box filtering
//! and Gaussian blur are linear per channel, so splitting and
//! reassembling gives the same result as filtering in colour space.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

use crate::library::{bounded_kernel_size, check_border_type, map_color_planes, odd_kernel_size};
use crate::params::ParamBindings;
use crate::types::OperationError;

/// Smallest standard deviation handed to the Gaussian kernel.
///
/// At this width the kernel is the identity at 8-bit precision.
pub const MIN_SIGMA: f64 = 0.01;

/// Largest standard deviation the Gaussian blur accepts.
pub const MAX_SIGMA: f64 = 256.0;

/// Sigma OpenCV derives from the kernel size when none is given.
///
/// `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`
#[must_use]
pub fn sigma_for_kernel(ksize: u32) -> f64 {
    0.3f64.mul_add((f64::from(ksize) - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Mean over a `ksize` square anchored at `ksize / 2`.
///
/// Sums are taken in `f32`, exact for every kernel up to
/// [`MAX_KERNEL_SIZE`](crate::library::MAX_KERNEL_SIZE), and rounded
/// once at the end.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn box_mean(plane: &GrayImage, ksize: u32) -> GrayImage {
    let wide: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(plane.width(), plane.height(), |x, y| {
            Luma([f32::from(plane.get_pixel(x, y).0[0])])
        });
    let ones = vec![1.0f32; ksize as usize];
    let sums = imageproc::filter::separable_filter_equal(&wide, &ones);
    let area = (ksize * ksize) as f32;
    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        Luma([(sums.get_pixel(x, y).0[0] / area).round().clamp(0.0, 255.0) as u8])
    })
}

/// Normalized box filter of size `ksize`.
///
/// The window spans `ksize` pixels on each axis, anchored at
/// `ksize / 2`; an even size reaches one pixel further before the
/// anchor than after it. Edges replicate the border pixel.
///
/// # Errors
///
/// Returns [`OperationError::InvalidParameter`] for a zero or oversized
/// `ksize` or an unsupported `borderType`.
pub fn box_blur(source: &DynamicImage, params: &ParamBindings) -> Result<DynamicImage, OperationError> {
    let ksize = bounded_kernel_size(params)?;
    check_border_type(params)?;
    if ksize == 1 {
        return Ok(source.clone());
    }

    Ok(map_color_planes(source, |plane| box_mean(plane, ksize)))
}

/// Gaussian blur with an odd kernel size.
///
/// `sigmaX` sets the standard deviation; zero or negative derives it
/// from `ksize` the way OpenCV does. Positive values below
/// [`MIN_SIGMA`] blur as [`MIN_SIGMA`]. The blur is isotropic, so
/// `sigmaY` is accepted but does not change the result.
///
/// # Errors
///
/// Returns [`OperationError::InvalidParameter`] for an even or zero
/// `ksize`, an unsupported `borderType`, or a standard deviation (given
/// or derived) above [`MAX_SIGMA`].
#[allow(clippy::cast_possible_truncation)]
pub fn gaussian(source: &DynamicImage, params: &ParamBindings) -> Result<DynamicImage, OperationError> {
    let ksize = odd_kernel_size(params)?;
    check_border_type(params)?;
    let sigma_x = params.number("sigmaX")?;
    let (sigma, name) = if sigma_x > 0.0 {
        (sigma_x.max(MIN_SIGMA), "sigmaX")
    } else {
        (sigma_for_kernel(ksize), "ksize")
    };
    if sigma > MAX_SIGMA {
        return Err(OperationError::InvalidParameter {
            name: name.to_string(),
            reason: format!("standard deviation {sigma} exceeds {MAX_SIGMA}"),
        });
    }

    let sigma = sigma as f32;
    Ok(map_color_planes(source, |plane| {
        imageproc::filter::gaussian_blur_f32(plane, sigma)
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// A sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 { Luma([0]) } else { Luma([255]) }
        }))
    }

    fn blur_params(ksize: i32) -> ParamBindings {
        let mut p = ParamBindings::new();
        p.set("ksize", ksize);
        p.set("borderType", "BORDER_DEFAULT");
        p
    }

    fn gaussian_params(ksize: i32, sigma_x: f64) -> ParamBindings {
        let mut p = blur_params(ksize);
        p.set("sigmaX", sigma_x);
        p.set("sigmaY", 0);
        p
    }

    #[test]
    fn derived_sigma_matches_opencv() {
        assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-9);
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-9);
        assert!((sigma_for_kernel(1) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn box_blur_smooths_sharp_edge() {
        let out = box_blur(&sharp_edge_image(), &blur_params(5)).unwrap().to_luma8();
        let left = out.get_pixel(4, 5).0[0];
        let right = out.get_pixel(5, 5).0[0];
        assert!(left > 0, "expected left-of-edge above 0, got {left}");
        assert!(right < 255, "expected right-of-edge below 255, got {right}");
    }

    #[test]
    fn box_blur_of_one_is_identity() {
        let img = sharp_edge_image();
        assert_eq!(box_blur(&img, &blur_params(1)).unwrap(), img);
    }

    #[test]
    fn box_blur_rejects_zero_kernel() {
        assert!(box_blur(&sharp_edge_image(), &blur_params(0)).is_err());
    }

    #[test]
    fn transparent_border_is_rejected() {
        let mut p = blur_params(3);
        p.set("borderType", "BORDER_TRANSPARENT");
        assert!(matches!(
            box_blur(&sharp_edge_image(), &p),
            Err(OperationError::InvalidParameter { ref name, .. }) if name == "borderType"
        ));
    }

    #[test]
    fn box_blur_window_is_ksize_wide() {
        let mut img = GrayImage::new(9, 1);
        img.put_pixel(4, 0, Luma([200]));
        let out = box_blur(&DynamicImage::ImageLuma8(img), &blur_params(2)).unwrap().to_luma8();
        let row: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(row, [0, 0, 0, 0, 100, 100, 0, 0, 0]);
    }

    #[test]
    fn box_blur_even_and_odd_sizes_differ() {
        let img = sharp_edge_image();
        assert_ne!(box_blur(&img, &blur_params(4)).unwrap(), box_blur(&img, &blur_params(5)).unwrap());
    }

    #[test]
    fn box_blur_keeps_uniform_image() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([255])));
        assert_eq!(box_blur(&img, &blur_params(3)).unwrap(), img);
    }

    #[test]
    fn box_blur_rejects_oversized_kernel() {
        assert!(matches!(
            box_blur(&sharp_edge_image(), &blur_params(1_000_000)),
            Err(OperationError::InvalidParameter { ref name, .. }) if name == "ksize"
        ));
    }

    #[test]
    fn gaussian_tiny_sigma_is_identity() {
        let img = sharp_edge_image();
        assert_eq!(gaussian(&img, &gaussian_params(3, 1e-50)).unwrap(), img);
    }

    #[test]
    fn gaussian_rejects_huge_sigma() {
        assert!(matches!(
            gaussian(&sharp_edge_image(), &gaussian_params(3, 1e10)),
            Err(OperationError::InvalidParameter { ref name, .. }) if name == "sigmaX"
        ));
        assert!(gaussian(&sharp_edge_image(), &gaussian_params(3, f64::INFINITY)).is_err());
    }

    #[test]
    fn gaussian_rejects_huge_derived_sigma() {
        assert!(matches!(
            gaussian(&sharp_edge_image(), &gaussian_params(100_001, 0.0)),
            Err(OperationError::InvalidParameter { ref name, .. }) if name == "ksize"
        ));
    }

    #[test]
    fn gaussian_rejects_even_kernel() {
        let err = gaussian(&sharp_edge_image(), &gaussian_params(4, 0.0)).unwrap_err();
        assert!(matches!(err, OperationError::InvalidParameter { ref name, .. } if name == "ksize"));
    }

    #[test]
    fn gaussian_uniform_image_unchanged() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([128])));
        let out = gaussian(&img, &gaussian_params(5, 0.0)).unwrap().to_luma8();
        for pixel in out.pixels() {
            let diff = i16::from(pixel.0[0]) - 128;
            assert!(diff.abs() <= 1, "expected ~128, got {}", pixel.0[0]);
        }
    }

    #[test]
    fn gaussian_keeps_color_layout_and_dimensions() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(17, 31, |x, _| {
            image::Rgb([u8::try_from(x * 10).unwrap(), 0, 255])
        }));
        let out = gaussian(&img, &gaussian_params(3, 1.5)).unwrap();
        assert!(matches!(out, DynamicImage::ImageRgb8(_)));
        assert_eq!((out.width(), out.height()), (17, 31));
    }
}
