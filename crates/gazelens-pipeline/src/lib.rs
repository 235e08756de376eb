//! gazelens-pipeline: Pure image filter pipeline (sans-IO).
//!
//! Holds the pieces a pipeline builder needs, leaves first:
//!
//! - [`params`]: parameter schemas, bound values, derived widget controls.
//! - [`template`]: `%name%` code templates, parsed once, rendered by
//!   substitution.
//! - [`catalog`]: immutable operation descriptors and their registry;
//!   [`builtin`] supplies the standard nine operations.
//! - [`library`]: the [`ImageLibrary`] capability seam and the bundled
//!   `imageproc` backend.
//! - [`handle`]: owned image handles with deterministic release.
//! - [`pipeline`]: the ordered list of configured steps.
//! - [`engine`]: runs a pipeline with dependency checking and a
//!   run-in-progress guard.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and images. Script generation lives in `gazelens-export`,
//! session state in `gazelens-studio`.

pub mod blur;
pub mod builtin;
pub mod catalog;
pub mod contour;
pub mod diagnostics;
pub mod edge;
pub mod engine;
pub mod grayscale;
pub mod handle;
pub mod histogram;
pub mod library;
pub mod morphology;
pub mod params;
pub mod pipeline;
pub mod template;
pub mod threshold;
pub mod types;

pub use catalog::{Catalog, DescriptorBuilder, OperationDescriptor};
pub use diagnostics::{RunReport, StepReport};
pub use engine::{Engine, RunGate, RunOutcome, RunPermit};
pub use handle::{HandlePool, ImageHandle};
pub use histogram::Histogram;
pub use library::{ImageLibrary, ImageprocLibrary, OperationKind};
pub use params::{Control, ParamBindings, ParamSpec, ParamValue, ParameterSchema};
pub use pipeline::{Pipeline, PipelineStep, SequenceKey};
pub use template::{Template, Token};
pub use types::{
    CatalogError, Dimensions, Direction, DynamicImage, GrayImage, OPENCV_PYTHON_WHEEL,
    OPENCV_VERSION, OperationError, PipelineError, Resource, Syntax,
};

/// Decode `bytes` and run `pipeline` against the result.
///
/// Convenience for one-shot callers that have no session. The decoded
/// source is released when this returns; only the final image remains.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] or [`PipelineError::ImageDecode`]
/// if decoding fails, and any error of [`Engine::run`].
pub fn process<L: ImageLibrary + ?Sized>(
    bytes: &[u8],
    catalog: &Catalog,
    library: &L,
    pipeline: &Pipeline,
) -> Result<RunOutcome, PipelineError> {
    let pool = HandlePool::new();
    let source = pool.wrap(grayscale::decode(bytes)?);
    Engine::new().run(catalog, library, pipeline, &source)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// PNG with a bright square on a dark background.
    fn square_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            let inside = x > width / 4 && x < 3 * width / 4 && y > height / 4 && y < 3 * height / 4;
            if inside {
                image::Rgba([230, 230, 230, 255])
            } else {
                image::Rgba([20, 20, 20, 255])
            }
        });
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

    fn with_defaults(catalog: &Catalog, ids: &[&str]) -> Pipeline {
        let mut pipeline = Pipeline::new();
        for id in ids {
            pipeline.append(*id, catalog.lookup(id).unwrap().schema().defaults());
        }
        pipeline
    }

    #[test]
    fn process_empty_input() {
        let catalog = Catalog::builtin();
        let result = process(&[], &catalog, &ImageprocLibrary, &Pipeline::new());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let catalog = Catalog::builtin();
        let result = process(&[0xFF, 0x00], &catalog, &ImageprocLibrary, &Pipeline::new());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_every_builtin_in_a_valid_order() {
        let catalog = Catalog::builtin();
        let pipeline = with_defaults(
            &catalog,
            &[
                "blur",
                "gaussianBlur",
                "dilate",
                "erode",
                "laplacian",
                "grayscale",
                "canny",
                "threshold",
                "findContours",
            ],
        );
        let outcome = process(&square_png(40, 40), &catalog, &ImageprocLibrary, &pipeline).unwrap();
        assert_eq!(outcome.report.steps.len(), 9);
        assert_eq!(
            outcome.image.dimensions(),
            Dimensions {
                width: 40,
                height: 40
            }
        );
    }

    #[test]
    fn contours_of_thresholded_square_are_drawn() {
        let catalog = Catalog::builtin();
        let pipeline = with_defaults(&catalog, &["grayscale", "threshold", "findContours"]);
        let outcome = process(&square_png(40, 40), &catalog, &ImageprocLibrary, &pipeline).unwrap();
        let rgb = outcome.image.image().to_rgb8();
        let lit = rgb.pixels().filter(|p| p.0 != [0, 0, 0]).count();
        assert!(lit > 0, "expected a drawn outline");
        assert!(lit < 40 * 40 / 2, "expected an outline, not a fill");
    }
}
