//! Operation descriptors and the catalog that holds them.
//!
//! A descriptor is immutable once built. It knows how to execute itself
//! against an [`ImageLibrary`] and how to render itself as code in
//! either [`Syntax`]. The [`Catalog`] validates descriptors as they are
//! registered so that lookups during a run never see a broken entry.

use crate::handle::ImageHandle;
use crate::library::{ImageLibrary, OperationKind};
use crate::params::{ParamBindings, ParamSpec, ParameterSchema};
use crate::template::Template;
use crate::types::{CatalogError, PipelineError, Resource, Syntax};

const fn slot(syntax: Syntax) -> usize {
    match syntax {
        Syntax::Javascript => 0,
        Syntax::Python => 1,
    }
}

/// One registered operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    id: String,
    display_name: String,
    help_url: String,
    preview_image: String,
    schema: ParameterSchema,
    kind: OperationKind,
    templates: [Template; 2],
    comment: Option<String>,
    dependencies: Vec<String>,
}

impl OperationDescriptor {
    /// Start building a descriptor.
    #[must_use]
    pub fn builder(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: OperationKind,
    ) -> DescriptorBuilder {
        DescriptorBuilder {
            descriptor: Self {
                id: id.into(),
                display_name: display_name.into(),
                help_url: String::new(),
                preview_image: String::new(),
                schema: ParameterSchema::new(),
                kind,
                templates: [Template::default(), Template::default()],
                comment: None,
                dependencies: Vec::new(),
            },
        }
    }

    /// Catalog key.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Link to the operation's reference documentation.
    #[must_use]
    pub fn help_url(&self) -> &str {
        &self.help_url
    }

    /// Path of the thumbnail shown in the operation picker.
    #[must_use]
    pub fn preview_image(&self) -> &str {
        &self.preview_image
    }

    /// Declared parameters.
    #[must_use]
    pub const fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// Which library transformation executes this operation.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Caveat shown to the user and embedded in generated code.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Operations that must run earlier in the pipeline.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// The code template for `syntax`.
    #[must_use]
    pub const fn template(&self, syntax: Syntax) -> &Template {
        &self.templates[slot(syntax)]
    }

    /// Execute against `handle`, consuming it.
    ///
    /// Bindings missing from `bindings` fall back to schema defaults.
    /// The input handle is released before this returns, whether or not
    /// the operation succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceNotReady`] if the library is not
    /// ready and [`PipelineError::OperationExecution`] (without a
    /// position) if the library rejects the operation.
    pub fn execute<L: ImageLibrary + ?Sized>(
        &self,
        library: &L,
        handle: ImageHandle,
        bindings: &ParamBindings,
    ) -> Result<ImageHandle, PipelineError> {
        if !library.is_ready() {
            return Err(PipelineError::ResourceNotReady(Resource::Library));
        }
        let resolved = self.schema.resolve(bindings);
        match library.apply(self.kind, handle.image(), &resolved) {
            Ok(image) => Ok(handle.derive(image)),
            Err(cause) => Err(PipelineError::OperationExecution {
                operation_id: self.id.clone(),
                display_name: self.display_name.clone(),
                position: None,
                cause,
            }),
        }
    }

    /// Render the code fragment for `syntax`.
    ///
    /// Pure substitution of the resolved bindings into the template.
    #[must_use]
    pub fn render_code(&self, syntax: Syntax, bindings: &ParamBindings) -> String {
        self.template(syntax).render(&self.schema.resolve(bindings))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for (name, spec) in self.schema.iter() {
            if matches!(spec, ParamSpec::Choice(options) if options.is_empty()) {
                return Err(CatalogError::EmptyChoices {
                    operation_id: self.id.clone(),
                    parameter: name.to_string(),
                });
            }
        }
        for syntax in Syntax::ALL {
            if let Some(unknown) = self
                .template(syntax)
                .placeholders()
                .into_iter()
                .find(|name| !self.schema.contains(name))
            {
                return Err(CatalogError::UnknownPlaceholder {
                    operation_id: self.id.clone(),
                    syntax,
                    placeholder: unknown.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`OperationDescriptor`].
#[derive(Debug, Clone)]
#[must_use]
pub struct DescriptorBuilder {
    descriptor: OperationDescriptor,
}

impl DescriptorBuilder {
    /// Set the documentation link.
    pub fn help_url(mut self, url: impl Into<String>) -> Self {
        self.descriptor.help_url = url.into();
        self
    }

    /// Set the thumbnail path.
    pub fn preview_image(mut self, path: impl Into<String>) -> Self {
        self.descriptor.preview_image = path.into();
        self
    }

    /// Declare a parameter.
    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.descriptor.schema.insert(name, spec);
        self
    }

    /// Set the code template for `syntax`.
    pub fn template(mut self, syntax: Syntax, source: &str) -> Self {
        self.descriptor.templates[slot(syntax)] = Template::parse(source);
        self
    }

    /// Attach a caveat. Empty text means no caveat.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.descriptor.comment = (!comment.is_empty()).then_some(comment);
        self
    }

    /// Require `id` to run earlier in the pipeline.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.descriptor.dependencies.contains(&id) {
            self.descriptor.dependencies.push(id);
        }
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> OperationDescriptor {
        self.descriptor
    }
}

/// The registry of available operations, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<OperationDescriptor>,
}

impl Catalog {
    /// An empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add `descriptor`.
    ///
    /// Dependencies must already be registered, which also rules out
    /// cycles.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateId`] if the id is taken,
    /// [`CatalogError::UnknownDependency`] for a dependency that is not
    /// registered, [`CatalogError::EmptyChoices`] for an enum parameter
    /// without options, and [`CatalogError::UnknownPlaceholder`] when a
    /// template references an undeclared parameter.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<(), CatalogError> {
        if self.lookup(&descriptor.id).is_some() {
            return Err(CatalogError::DuplicateId(descriptor.id));
        }
        if let Some(dependency) = descriptor
            .dependencies
            .iter()
            .find(|dep| self.lookup(dep).is_none())
        {
            return Err(CatalogError::UnknownDependency {
                operation_id: descriptor.id.clone(),
                dependency: dependency.clone(),
            });
        }
        descriptor.validate()?;
        log::debug!("registered operation '{}'", descriptor.id);
        self.entries.push(descriptor);
        Ok(())
    }

    /// The descriptor registered under `id`.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&OperationDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    /// Like [`lookup`](Self::lookup), but as a [`PipelineError`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CatalogLookup`] if `id` is not registered.
    pub fn require(&self, id: &str) -> Result<&OperationDescriptor, PipelineError> {
        self.lookup(id).ok_or_else(|| PipelineError::CatalogLookup {
            operation_id: id.to_string(),
        })
    }

    /// Remove and return the descriptor registered under `id`.
    ///
    /// Steps already referencing it stay in their pipelines; runs then
    /// fail with [`PipelineError::CatalogLookup`] and code generation
    /// skips them.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownId`] if nothing is registered
    /// under `id`, and [`CatalogError::HasDependents`] while another
    /// descriptor still lists `id` as a dependency. Remove dependents
    /// first.
    pub fn unregister(&mut self, id: &str) -> Result<OperationDescriptor, CatalogError> {
        let index = self
            .entries
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| CatalogError::UnknownId(id.to_string()))?;
        if let Some(dependent) = self
            .entries
            .iter()
            .find(|d| d.dependencies.iter().any(|dep| dep == id))
        {
            log::warn!("refusing to unregister '{id}': required by '{}'", dependent.id);
            return Err(CatalogError::HasDependents {
                operation_id: id.to_string(),
                dependent: dependent.id.clone(),
            });
        }
        log::debug!("unregistered operation '{id}'");
        Ok(self.entries.remove(index))
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.entries.iter()
    }

    /// Number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::handle::HandlePool;
    use crate::library::ImageprocLibrary;
    use crate::params::ParamValue;
    use crate::types::OperationError;
    use image::{DynamicImage, GrayImage, Luma};

    fn blur() -> OperationDescriptor {
        OperationDescriptor::builder("blur", "Blur", OperationKind::Blur)
            .param(
                "ksize",
                ParamSpec::Range {
                    min: 1.0,
                    max: 21.0,
                    step: 1.0,
                    default: 5.0,
                },
            )
            .template(Syntax::Javascript, "cv.blur(src, dst, new cv.Size(%ksize%, %ksize%));\n")
            .template(Syntax::Python, "dst = cv.blur(src=src, ksize=(%ksize%, %ksize%))\nsrc = dst\n")
            .build()
    }

    fn simple(id: &str, kind: OperationKind) -> OperationDescriptor {
        OperationDescriptor::builder(id, id, kind).build()
    }

    #[test]
    fn register_and_lookup() {
        let mut catalog = Catalog::new();
        catalog.register(blur()).unwrap();
        assert_eq!(catalog.lookup("blur").unwrap().display_name(), "Blur");
        assert!(catalog.lookup("erode").is_none());
        assert!(matches!(
            catalog.require("erode"),
            Err(PipelineError::CatalogLookup { ref operation_id }) if operation_id == "erode"
        ));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut catalog = Catalog::new();
        catalog.register(blur()).unwrap();
        assert_eq!(
            catalog.register(blur()),
            Err(CatalogError::DuplicateId("blur".to_string())),
        );
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn dependency_must_be_registered_first() {
        let mut catalog = Catalog::new();
        let contours = OperationDescriptor::builder("findContours", "Find Contours", OperationKind::FindContours)
            .depends_on("grayscale")
            .build();
        assert!(matches!(
            catalog.register(contours.clone()),
            Err(CatalogError::UnknownDependency { ref dependency, .. }) if dependency == "grayscale"
        ));
        catalog.register(simple("grayscale", OperationKind::Grayscale)).unwrap();
        catalog.register(contours).unwrap();
    }

    #[test]
    fn self_dependency_is_rejected() {
        let mut catalog = Catalog::new();
        let looped = OperationDescriptor::builder("erode", "Erode", OperationKind::Erode)
            .depends_on("erode")
            .build();
        assert!(catalog.register(looped).is_err());
    }

    #[test]
    fn empty_choice_list_is_rejected() {
        let mut catalog = Catalog::new();
        let bad = OperationDescriptor::builder("threshold", "Threshold", OperationKind::Threshold)
            .param("type", ParamSpec::Choice(vec![]))
            .build();
        assert!(matches!(catalog.register(bad), Err(CatalogError::EmptyChoices { .. })));
    }

    #[test]
    fn undeclared_placeholder_is_rejected() {
        let mut catalog = Catalog::new();
        let bad = OperationDescriptor::builder("blur", "Blur", OperationKind::Blur)
            .param("ksize", ParamSpec::Number(3.0))
            .template(Syntax::Python, "dst = cv.blur(src, (%size%, %size%))")
            .build();
        assert_eq!(
            catalog.register(bad),
            Err(CatalogError::UnknownPlaceholder {
                operation_id: "blur".to_string(),
                syntax: Syntax::Python,
                placeholder: "size".to_string(),
            }),
        );
    }

    #[test]
    fn empty_comment_means_none() {
        let d = OperationDescriptor::builder("blur", "Blur", OperationKind::Blur)
            .comment("")
            .build();
        assert_eq!(d.comment(), None);
        let d = OperationDescriptor::builder("blur", "Blur", OperationKind::Blur)
            .comment("kernel must be odd")
            .build();
        assert_eq!(d.comment(), Some("kernel must be odd"));
    }

    #[test]
    fn render_code_substitutes_bound_values() {
        let mut bindings = ParamBindings::new();
        bindings.set("ksize", 7);
        assert_eq!(
            blur().render_code(Syntax::Python, &bindings),
            "dst = cv.blur(src=src, ksize=(7, 7))\nsrc = dst\n",
        );
        assert_eq!(
            blur().render_code(Syntax::Javascript, &bindings),
            "cv.blur(src, dst, new cv.Size(7, 7));\n",
        );
    }

    #[test]
    fn render_code_falls_back_to_defaults() {
        assert_eq!(
            blur().render_code(Syntax::Python, &ParamBindings::new()),
            "dst = cv.blur(src=src, ksize=(5, 5))\nsrc = dst\n",
        );
    }

    #[test]
    fn execute_consumes_input_handle() {
        let pool = HandlePool::new();
        let handle = pool.wrap(DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([9]))));
        let out = blur()
            .execute(&ImageprocLibrary, handle, &ParamBindings::new())
            .unwrap();
        assert_eq!(pool.live(), 1);
        assert_eq!(out.dimensions().width, 4);
    }

    #[test]
    fn execute_failure_releases_input_and_names_operation() {
        let pool = HandlePool::new();
        let handle = pool.wrap(DynamicImage::ImageLuma8(GrayImage::new(4, 4)));
        let mut bindings = ParamBindings::new();
        bindings.set("ksize", ParamValue::Number(0.0));
        let err = blur().execute(&ImageprocLibrary, handle, &bindings).unwrap_err();
        assert_eq!(pool.live(), 0);
        assert!(
            matches!(
                err,
                PipelineError::OperationExecution {
                    ref operation_id,
                    position: None,
                    cause: OperationError::InvalidParameter { .. },
                    ..
                } if operation_id == "blur"
            ),
            "expected OperationExecution, got {err:?}",
        );
    }

    #[test]
    fn unregister_removes_entry() {
        let mut catalog = Catalog::new();
        catalog.register(blur()).unwrap();
        assert_eq!(catalog.unregister("blur").unwrap().id(), "blur");
        assert!(catalog.is_empty());
        assert!(matches!(
            catalog.unregister("blur"),
            Err(CatalogError::UnknownId(ref id)) if id == "blur"
        ));
    }

    #[test]
    fn unregister_refuses_while_dependents_remain() {
        let mut catalog = Catalog::builtin();
        assert!(matches!(
            catalog.unregister("grayscale"),
            Err(CatalogError::HasDependents { ref operation_id, ref dependent })
                if operation_id == "grayscale" && dependent == "canny"
        ));
        assert!(matches!(
            catalog.unregister("threshold"),
            Err(CatalogError::HasDependents { ref dependent, .. }) if dependent == "findContours"
        ));
        assert_eq!(catalog.len(), 9);

        catalog.unregister("findContours").unwrap();
        catalog.unregister("threshold").unwrap();
        catalog.unregister("canny").unwrap();
        catalog.unregister("grayscale").unwrap();
        assert_eq!(catalog.len(), 5);
        assert!(catalog.iter().all(|d| d.dependencies().is_empty()));
    }
}
