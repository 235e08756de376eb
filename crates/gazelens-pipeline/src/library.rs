//! The image-processing capability seam.
//!
//! The pipeline treats pixel work as an injected dependency: an
//! [`ImageLibrary`] exposes the closed set of [`OperationKind`]s over
//! `DynamicImage`. [`ImageprocLibrary`] is the bundled implementation on
//! top of `image` and `imageproc`; tests substitute counting or failing
//! libraries.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage, Rgba, RgbaImage};

use crate::params::ParamBindings;
use crate::types::OperationError;
use crate::{blur, contour, edge, grayscale, morphology, threshold};

/// The closed set of transformations a library must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Luminance conversion to one 8-bit channel.
    Grayscale,
    /// Fixed-level thresholding (`thresh`, `maxval`, `type`).
    Threshold,
    /// Normalized box filter (`ksize`, `borderType`).
    Blur,
    /// Gaussian smoothing (`ksize`, `sigmaX`, `sigmaY`, `borderType`).
    GaussianBlur,
    /// Maximum filter (`ksize`, `iterations`).
    Dilate,
    /// Minimum filter (`ksize`, `iterations`).
    Erode,
    /// Canny edge detection (`threshold1`, `threshold2`, `apertureSize`,
    /// `L2gradient`).
    Canny,
    /// Laplacian operator (`ksize`, `scale`, `delta`).
    Laplacian,
    /// Border following with every contour drawn on a black canvas.
    FindContours,
}

/// An image-processing backend.
pub trait ImageLibrary {
    /// Whether the library can accept work yet.
    fn is_ready(&self) -> bool {
        true
    }

    /// Apply `kind` to `source` with fully resolved parameters.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] when a parameter is missing or
    /// rejected, or when `source` has a layout the operation cannot
    /// process.
    fn apply(
        &self,
        kind: OperationKind,
        source: &DynamicImage,
        params: &ParamBindings,
    ) -> Result<DynamicImage, OperationError>;
}

/// The bundled backend built on `imageproc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocLibrary;

impl ImageLibrary for ImageprocLibrary {
    fn apply(
        &self,
        kind: OperationKind,
        source: &DynamicImage,
        params: &ParamBindings,
    ) -> Result<DynamicImage, OperationError> {
        match kind {
            OperationKind::Grayscale => Ok(DynamicImage::ImageLuma8(grayscale::to_luma(source))),
            OperationKind::Threshold => threshold::apply(source, params),
            OperationKind::Blur => blur::box_blur(source, params),
            OperationKind::GaussianBlur => blur::gaussian(source, params),
            OperationKind::Dilate => morphology::dilate(source, params),
            OperationKind::Erode => morphology::erode(source, params),
            OperationKind::Canny => edge::canny(source, params),
            OperationKind::Laplacian => edge::laplacian(source, params),
            OperationKind::FindContours => contour::find_and_draw(source, params),
        }
    }
}

/// Border modes accepted by the filtering operations.
///
/// Execution always replicates the edge pixel; the value only matters
/// for generated code. `BORDER_TRANSPARENT` is rejected, as it is by
/// OpenCV's filters.
const BORDER_TYPES: [&str; 8] = [
    "BORDER_DEFAULT",
    "BORDER_CONSTANT",
    "BORDER_REPLICATE",
    "BORDER_REFLECT",
    "BORDER_WRAP",
    "BORDER_REFLECT_101",
    "BORDER_REFLECT101",
    "BORDER_ISOLATED",
];

/// Validate an optional `borderType` binding.
pub(crate) fn check_border_type(params: &ParamBindings) -> Result<(), OperationError> {
    if params.get("borderType").is_none() {
        return Ok(());
    }
    let border = params.text("borderType")?;
    if BORDER_TYPES.contains(&border) {
        Ok(())
    } else {
        Err(OperationError::InvalidParameter {
            name: "borderType".to_string(),
            reason: format!("unsupported border mode {border}"),
        })
    }
}

/// Read `ksize` as a positive kernel size.
pub(crate) fn kernel_size(params: &ParamBindings) -> Result<u32, OperationError> {
    let ksize = params.unsigned("ksize")?;
    if ksize == 0 {
        return Err(OperationError::InvalidParameter {
            name: "ksize".to_string(),
            reason: "kernel size must be positive".to_string(),
        });
    }
    Ok(ksize)
}

/// Largest `ksize` the square-kernel filters accept.
pub const MAX_KERNEL_SIZE: u32 = 255;

/// Read `ksize` as a positive kernel size of at most
/// [`MAX_KERNEL_SIZE`].
pub(crate) fn bounded_kernel_size(params: &ParamBindings) -> Result<u32, OperationError> {
    let ksize = kernel_size(params)?;
    if ksize > MAX_KERNEL_SIZE {
        return Err(OperationError::InvalidParameter {
            name: "ksize".to_string(),
            reason: format!("kernel size must be at most {MAX_KERNEL_SIZE}, got {ksize}"),
        });
    }
    Ok(ksize)
}

/// Read `ksize` as a positive odd kernel size.
pub(crate) fn odd_kernel_size(params: &ParamBindings) -> Result<u32, OperationError> {
    let ksize = kernel_size(params)?;
    if ksize % 2 == 0 {
        return Err(OperationError::InvalidParameter {
            name: "ksize".to_string(),
            reason: format!("kernel size must be odd, got {ksize}"),
        });
    }
    Ok(ksize)
}

/// Extract channel `c` of an 8-bit image as its own plane.
fn plane<P: Pixel<Subpixel = u8>>(image: &ImageBuffer<P, Vec<u8>>, c: usize) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).channels()[c]])
    })
}

/// Apply `f` to every colour plane of `image` independently.
///
/// Gray stays gray and RGB stays RGB. Every other layout is widened to
/// RGBA8 first; alpha is carried through untouched.
pub(crate) fn map_color_planes<F>(image: &DynamicImage, mut f: F) -> DynamicImage
where
    F: FnMut(&GrayImage) -> GrayImage,
{
    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(f(gray)),
        DynamicImage::ImageRgb8(rgb) => {
            let planes: [GrayImage; 3] = std::array::from_fn(|c| f(&plane(rgb, c)));
            DynamicImage::ImageRgb8(RgbImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                Rgb(std::array::from_fn(|c| planes[c].get_pixel(x, y).0[0]))
            }))
        }
        other => {
            let rgba = other.to_rgba8();
            let planes: [GrayImage; 3] = std::array::from_fn(|c| f(&plane(&rgba, c)));
            DynamicImage::ImageRgba8(RgbaImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                let alpha = rgba.get_pixel(x, y).0[3];
                Rgba([
                    planes[0].get_pixel(x, y).0[0],
                    planes[1].get_pixel(x, y).0[0],
                    planes[2].get_pixel(x, y).0[0],
                    alpha,
                ])
            }))
        }
    }
}

/// Fallible variant of [`map_color_planes`].
pub(crate) fn try_map_color_planes<F>(image: &DynamicImage, f: F) -> Result<DynamicImage, OperationError>
where
    F: Fn(&GrayImage) -> Result<GrayImage, OperationError>,
{
    let mut failure = None;
    let mapped = map_color_planes(image, |plane| match f(plane) {
        Ok(out) => out,
        Err(err) => {
            failure.get_or_insert(err);
            plane.clone()
        }
    });
    failure.map_or(Ok(mapped), Err)
}
