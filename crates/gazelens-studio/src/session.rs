//! Owned session state and the user actions that mutate it.
//!
//! A [`Session`] owns everything one pipeline-builder session needs:
//! the catalog, the image library, the engine and its run gate, the
//! handle pool, the pipeline, and the loaded source image. Every
//! action updates the pipeline and then [refreshes](Session::refresh):
//! the pipeline is re-run against the source and the script is
//! regenerated, so the result and the code never drift apart.
//!
//! Actions return `Err` when the request itself is invalid (unknown
//! step, unknown operation, unknown parameter, undecodable image); the
//! session is unchanged in that case. A run that fails after a valid
//! action is reported in [`Refresh::error`] instead, and the render is
//! dropped so it never describes a pipeline other than the current one.

use gazelens_export::{CodeOptions, generate};
use gazelens_pipeline::{
    Catalog, Control, DynamicImage, Engine, HandlePool, Histogram, ImageHandle, ImageLibrary,
    ImageprocLibrary, ParamValue, Pipeline, PipelineError, Resource, RunReport, SequenceKey,
    Syntax, grayscale,
};

use crate::notice::Notice;

/// Readiness of the resources a run needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionFlags {
    /// The image library reports itself ready.
    pub library_ready: bool,
    /// A source image is loaded.
    pub image_ready: bool,
}

/// A successful run of the current pipeline.
#[derive(Debug)]
pub struct Rendered {
    /// The final image.
    pub image: ImageHandle,
    /// First-channel histogram of [`Self::image`].
    pub histogram: Histogram,
    /// Per-step diagnostics.
    pub report: RunReport,
}

/// What an action produced.
#[derive(Debug)]
pub struct Refresh {
    /// The script in the session's current syntax.
    pub code: String,
    /// Diagnostics of the run, if it succeeded.
    pub report: Option<RunReport>,
    /// Why the run did not succeed, if it did not.
    pub error: Option<PipelineError>,
}

impl Refresh {
    /// The notice to show for this refresh, if any.
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        self.error.as_ref().map(Notice::from_error)
    }

    /// Whether the run succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// One pipeline-builder session.
#[derive(Debug)]
pub struct Session<L: ImageLibrary = ImageprocLibrary> {
    catalog: Catalog,
    library: L,
    engine: Engine,
    pool: HandlePool,
    pipeline: Pipeline,
    source: Option<ImageHandle>,
    syntax: Syntax,
    options: CodeOptions,
    rendered: Option<Rendered>,
}

impl Default for Session<ImageprocLibrary> {
    fn default() -> Self {
        Self::new(Catalog::builtin(), ImageprocLibrary)
    }
}

impl<L: ImageLibrary> Session<L> {
    /// A session with an empty pipeline and no source image.
    #[must_use]
    pub fn new(catalog: Catalog, library: L) -> Self {
        Self {
            catalog,
            library,
            engine: Engine::new(),
            pool: HandlePool::new(),
            pipeline: Pipeline::new(),
            source: None,
            syntax: Syntax::default(),
            options: CodeOptions::default(),
            rendered: None,
        }
    }

    /// The operation catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The image library.
    #[must_use]
    pub const fn library(&self) -> &L {
        &self.library
    }

    /// The engine, for hosts that share its run gate.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The current pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The loaded source image.
    #[must_use]
    pub const fn source(&self) -> Option<&ImageHandle> {
        self.source.as_ref()
    }

    /// The syntax used by [`Refresh::code`].
    #[must_use]
    pub const fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Boilerplate toggles for generated code.
    #[must_use]
    pub const fn code_options(&self) -> &CodeOptions {
        &self.options
    }

    /// Number of image handles currently alive in this session.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.pool.live()
    }

    /// Current readiness.
    #[must_use]
    pub fn flags(&self) -> SessionFlags {
        SessionFlags {
            library_ready: self.library.is_ready(),
            image_ready: self.source.is_some(),
        }
    }

    /// The render of the current pipeline, if its last run succeeded.
    #[must_use]
    pub const fn rendered(&self) -> Option<&Rendered> {
        self.rendered.as_ref()
    }

    /// The script for the current pipeline in `syntax`.
    #[must_use]
    pub fn code(&self, syntax: Syntax) -> String {
        generate(&self.catalog, &self.pipeline, syntax, &self.options)
    }

    /// Widget controls for step `key`, showing its current values.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key and
    /// [`PipelineError::CatalogLookup`] if the step's operation is gone.
    pub fn controls(&self, key: SequenceKey) -> Result<Vec<(String, Control)>, PipelineError> {
        let step = self
            .pipeline
            .step(key)
            .ok_or(PipelineError::StepNotFound(key))?;
        let descriptor = self.catalog.require(step.operation_id())?;
        Ok(descriptor
            .schema()
            .controls()
            .into_iter()
            .map(|(name, control)| {
                let current = step.bindings().get(name);
                (name.to_string(), with_value(control, current))
            })
            .collect())
    }

    // --- Actions ---

    /// Decode `bytes` and make the result the new source image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] or
    /// [`PipelineError::ImageDecode`]; the previous source is kept.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<Refresh, PipelineError> {
        let image = grayscale::decode(bytes)?;
        Ok(self.set_source(image))
    }

    /// Make `image` the new source image.
    pub fn set_source(&mut self, image: DynamicImage) -> Refresh {
        log::debug!("new source image {}x{}", image.width(), image.height());
        self.rendered = None;
        self.source = Some(self.pool.wrap(image));
        self.refresh()
    }

    /// Append a step for `operation_id` with its default parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CatalogLookup`] for an unknown id.
    pub fn add(&mut self, operation_id: &str) -> Result<(SequenceKey, Refresh), PipelineError> {
        let defaults = self.catalog.require(operation_id)?.schema().defaults();
        let key = self.pipeline.append(operation_id, defaults);
        log::debug!("added {operation_id} as step {key}");
        Ok((key, self.refresh()))
    }

    /// Remove step `key`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key.
    pub fn remove(&mut self, key: SequenceKey) -> Result<Refresh, PipelineError> {
        self.pipeline.remove(key)?;
        Ok(self.refresh())
    }

    /// Move step `key` one place earlier in storage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key.
    pub fn move_up(&mut self, key: SequenceKey) -> Result<Refresh, PipelineError> {
        self.pipeline.move_up(key)?;
        Ok(self.refresh())
    }

    /// Move step `key` one place later in storage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key.
    pub fn move_down(&mut self, key: SequenceKey) -> Result<Refresh, PipelineError> {
        self.pipeline.move_down(key)?;
        Ok(self.refresh())
    }

    /// Drop step `key` at storage position `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key.
    pub fn move_to(&mut self, key: SequenceKey, index: usize) -> Result<Refresh, PipelineError> {
        self.pipeline.move_to(key, index)?;
        Ok(self.refresh())
    }

    /// Flip the execution direction.
    pub fn reverse(&mut self) -> Refresh {
        self.pipeline.reverse_direction();
        log::debug!("direction is now {:?}", self.pipeline.direction());
        self.refresh()
    }

    /// Bind parameter `name` of step `key`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key,
    /// [`PipelineError::CatalogLookup`] if the step's operation is gone,
    /// and [`PipelineError::UnknownParameter`] if the operation declares
    /// no parameter `name`.
    pub fn set_param(
        &mut self,
        key: SequenceKey,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<Refresh, PipelineError> {
        let step = self
            .pipeline
            .step(key)
            .ok_or(PipelineError::StepNotFound(key))?;
        let descriptor = self.catalog.require(step.operation_id())?;
        if !descriptor.schema().contains(name) {
            return Err(PipelineError::UnknownParameter {
                operation_id: descriptor.id().to_string(),
                name: name.to_string(),
            });
        }
        self.pipeline.set_param(key, name, value)?;
        Ok(self.refresh())
    }

    /// Switch the syntax of [`Refresh::code`].
    pub fn set_syntax(&mut self, syntax: Syntax) -> Refresh {
        self.syntax = syntax;
        self.refresh()
    }

    /// Replace the boilerplate toggles.
    pub fn set_code_options(&mut self, options: CodeOptions) -> Refresh {
        self.options = options;
        self.refresh()
    }

    /// Remove every step. The source image stays loaded.
    pub fn start_over(&mut self) -> Refresh {
        self.pipeline.clear();
        self.refresh()
    }

    /// Re-run the pipeline and regenerate the script.
    ///
    /// The script is regenerated even when the run cannot happen. A
    /// failed run clears [`rendered`](Self::rendered).
    pub fn refresh(&mut self) -> Refresh {
        let code = self.code(self.syntax);
        match self.run() {
            Ok(rendered) => {
                let report = rendered.report.clone();
                self.rendered = Some(rendered);
                Refresh {
                    code,
                    report: Some(report),
                    error: None,
                }
            }
            Err(err) => {
                log::debug!("refresh failed, render cleared: {err}");
                self.rendered = None;
                Refresh {
                    code,
                    report: None,
                    error: Some(err),
                }
            }
        }
    }

    fn run(&self) -> Result<Rendered, PipelineError> {
        let source = self
            .source
            .as_ref()
            .ok_or(PipelineError::ResourceNotReady(Resource::Image))?;
        let outcome = self
            .engine
            .run(&self.catalog, &self.library, &self.pipeline, source)?;
        Ok(Rendered {
            histogram: Histogram::of(outcome.image.image()),
            image: outcome.image,
            report: outcome.report,
        })
    }
}

fn with_value(control: Control, current: Option<&ParamValue>) -> Control {
    match (control, current) {
        (
            Control::Slider {
                min, max, step, value,
            },
            Some(current),
        ) => Control::Slider {
            min,
            max,
            step,
            value: current.as_number().unwrap_or(value),
        },
        (Control::Dropdown { options, value }, Some(ParamValue::Text(current))) => {
            Control::Dropdown {
                options,
                value: current.clone(),
            }
        }
        (control, _) => control,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::*;
    use crate::notice::NoticeLevel;
    use gazelens_pipeline::{OperationError, OperationKind, ParamBindings};

    fn disc() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(24, 24, |x, y| {
            let (dx, dy) = (x.abs_diff(12), y.abs_diff(12));
            if dx * dx + dy * dy < 49 {
                Rgb([250, 250, 250])
            } else {
                Rgb([5, 5, 5])
            }
        }))
    }

    fn loaded() -> Session {
        let mut session = Session::default();
        session.set_source(disc());
        session
    }

    #[test]
    fn actions_without_image_still_generate_code() {
        let mut session = Session::default();
        let (_, refresh) = session.add("blur").unwrap();
        assert!(refresh.code.contains("cv.blur(src=src"));
        assert!(matches!(
            refresh.error,
            Some(PipelineError::ResourceNotReady(Resource::Image))
        ));
        assert_eq!(refresh.notice().unwrap().message, "Please load an image first.");
        assert!(session.rendered().is_none());
        assert!(!session.flags().image_ready);
        assert!(session.flags().library_ready);
    }

    #[test]
    fn loading_renders_the_source() {
        let session = loaded();
        let rendered = session.rendered().unwrap();
        assert_eq!(rendered.image.image(), &disc());
        assert_eq!(rendered.histogram.total(), 24 * 24);
        assert!(rendered.report.steps.is_empty());
        assert!(session.flags().image_ready);
    }

    #[test]
    fn load_image_rejects_garbage_and_keeps_source() {
        let mut session = loaded();
        assert!(matches!(session.load_image(&[]), Err(PipelineError::EmptyInput)));
        assert!(matches!(
            session.load_image(b"not an image"),
            Err(PipelineError::ImageDecode(_))
        ));
        assert!(session.source().is_some());
    }

    #[test]
    fn every_action_refreshes_result_and_code() {
        let mut session = loaded();
        let (gray, r) = session.add("grayscale").unwrap();
        assert!(r.is_ok());
        let (blur, r) = session.add("blur").unwrap();
        assert_eq!(r.report.unwrap().steps.len(), 2);

        let r = session.set_param(blur, "ksize", 3).unwrap();
        assert!(r.code.contains("ksize=(3, 3)"));

        let r = session.move_up(blur).unwrap();
        assert!(r.code.find("# Blur").unwrap() < r.code.find("# Grayscale").unwrap());

        let r = session.move_down(blur).unwrap();
        assert!(r.code.find("# Grayscale").unwrap() < r.code.find("# Blur").unwrap());

        let r = session.reverse();
        assert!(r.code.find("# Blur").unwrap() < r.code.find("# Grayscale").unwrap());
        assert!(r.is_ok());

        let r = session.remove(gray).unwrap();
        assert!(!r.code.contains("# Grayscale"));

        let r = session.set_syntax(Syntax::Javascript);
        assert!(r.code.contains("new cv.Size(3, 3)"));
        assert_eq!(
            session.rendered().unwrap().report.steps[0].operation_id,
            "blur"
        );
    }

    #[test]
    fn dependency_failure_clears_render() {
        let mut session = loaded();
        assert!(session.rendered().is_some());
        let (canny, r) = session.add("canny").unwrap();
        assert!(matches!(r.error, Some(PipelineError::DependencyUnsatisfied { .. })));
        let notice = r.notice().unwrap();
        assert_eq!(notice.message, "You must first apply the following filters: Grayscale");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(session.rendered().is_none());

        let r = session.remove(canny).unwrap();
        assert!(r.is_ok());
        assert!(session.rendered().unwrap().report.steps.is_empty());
    }

    #[test]
    fn failed_parameter_edit_clears_render() {
        let mut session = loaded();
        let (blur, r) = session.add("gaussianBlur").unwrap();
        assert!(r.is_ok());
        assert_eq!(session.rendered().unwrap().report.steps.len(), 1);

        let r = session.set_param(blur, "ksize", 4).unwrap();
        assert!(matches!(r.error, Some(PipelineError::OperationExecution { .. })));
        assert!(session.rendered().is_none());
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let mut session = loaded();
        let err = session.add("sharpen").unwrap_err();
        assert_eq!(err.to_string(), "function configuration not found for: sharpen");
        assert!(session.pipeline().is_empty());
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let mut session = loaded();
        let (key, _) = session.add("grayscale").unwrap();
        let err = session.set_param(key, "ksize", 3).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownParameter { ref name, .. } if name == "ksize"));
        assert!(session.pipeline().step(key).unwrap().bindings().is_empty());
    }

    #[test]
    fn stale_key_is_rejected() {
        let mut session = loaded();
        let (key, _) = session.add("grayscale").unwrap();
        session.remove(key).unwrap();
        assert!(matches!(session.remove(key), Err(PipelineError::StepNotFound(k)) if k == key));
        assert!(matches!(session.move_up(key), Err(PipelineError::StepNotFound(_))));
        assert!(matches!(session.set_param(key, "x", 1), Err(PipelineError::StepNotFound(_))));
    }

    #[test]
    fn start_over_clears_steps_but_not_keys() {
        let mut session = loaded();
        let (first, _) = session.add("grayscale").unwrap();
        let r = session.start_over();
        assert!(session.pipeline().is_empty());
        assert!(r.is_ok());
        let (second, _) = session.add("grayscale").unwrap();
        assert!(second > first);
    }

    #[test]
    fn handles_are_released_between_runs() {
        let mut session = loaded();
        for id in ["grayscale", "threshold", "findContours"] {
            session.add(id).unwrap();
        }
        session.reverse();
        session.reverse();
        // The source plus the last render.
        assert_eq!(session.live_handles(), 2);
        session.start_over();
        assert_eq!(session.live_handles(), 2);
    }

    #[test]
    fn controls_show_current_values() {
        let mut session = loaded();
        let (key, _) = session.add("threshold").unwrap();
        session.set_param(key, "thresh", 90).unwrap();
        session.set_param(key, "type", "THRESH_TOZERO").unwrap();
        let controls = session.controls(key).unwrap();
        assert_eq!(controls[0].0, "thresh");
        assert!(matches!(controls[0].1, Control::Slider { value, max, .. } if value == 90.0 && max == 255.0));
        assert!(matches!(&controls[2].1, Control::Dropdown { value, .. } if value == "THRESH_TOZERO"));
    }

    #[test]
    fn code_options_flow_into_script() {
        let mut session = loaded();
        let r = session.set_code_options(CodeOptions {
            install_library: true,
            ..CodeOptions::default()
        });
        assert!(r.code.starts_with("# pip install -U opencv-python=="));
        assert!(session.code(Syntax::Javascript).starts_with("// <script async"));
    }

    /// A library still loading.
    struct Loading;

    impl ImageLibrary for Loading {
        fn is_ready(&self) -> bool {
            false
        }

        fn apply(
            &self,
            _kind: OperationKind,
            source: &DynamicImage,
            _params: &ParamBindings,
        ) -> Result<DynamicImage, OperationError> {
            Ok(source.clone())
        }
    }

    #[test]
    fn library_not_ready_is_a_warning() {
        let mut session = Session::new(Catalog::builtin(), Loading);
        let r = session.set_source(DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([1]))));
        assert!(!session.flags().library_ready);
        let notice = r.notice().unwrap();
        assert_eq!(notice.message, "Wait until the image library is loaded!");
        assert_eq!(notice.level, NoticeLevel::Warning);
    }
}
