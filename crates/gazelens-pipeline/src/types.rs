//! Shared types for the gazelens pipeline: output syntaxes, execution
//! direction, readiness, and the error taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::SequenceKey;

/// Re-export `DynamicImage` so downstream crates can hand images to the
/// pipeline without depending on `image` directly.
pub use image::DynamicImage;

/// Re-export `GrayImage` for single-channel intermediates.
pub use image::GrayImage;

/// Version of the OpenCV API the generated scripts and help links target.
pub const OPENCV_VERSION: &str = "4.10.0";

/// The `opencv-python` wheel pinned by generated install instructions.
pub const OPENCV_PYTHON_WHEEL: &str = "4.10.0.84";

/// One of the two textual program representations the code generator
/// can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    /// Syntax A: OpenCV.js statements operating on a canvas-sourced `src`.
    Javascript,
    /// Syntax B: `cv2` statements operating on an image loaded from disk.
    #[default]
    Python,
}

impl Syntax {
    /// Both syntaxes, in slot order.
    pub const ALL: [Self; 2] = [Self::Javascript, Self::Python];

    /// Line comment prefix used by this syntax.
    #[must_use]
    pub const fn comment_prefix(self) -> &'static str {
        match self {
            Self::Javascript => "//",
            Self::Python => "#",
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Javascript => f.write_str("javascript"),
            Self::Python => f.write_str("python"),
        }
    }
}

/// Whether the pipeline executes top-to-bottom or bottom-to-top.
///
/// The direction never reorders storage; it only changes the
/// effective order in which steps execute and render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Storage order.
    #[default]
    Forward,
    /// Reverse storage order.
    Reversed,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reversed,
            Self::Reversed => Self::Forward,
        }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A collaborator that has to be available before a run can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The image processing library.
    Library,
    /// The source image.
    Image,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library => f.write_str("image library"),
            Self::Image => f.write_str("source image"),
        }
    }
}

/// Errors raised by the image library while applying one operation.
///
/// This is the `cause` carried by [`PipelineError::OperationExecution`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    /// A parameter value was rejected by the operation.
    #[error("invalid value for '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A parameter the operation needs was neither bound nor declared
    /// with a default.
    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    /// The operation cannot process the current image layout.
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),
}

/// Errors raised while populating an operation catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// An operation with this id is already registered.
    #[error("operation '{0}' is already registered")]
    DuplicateId(String),

    /// A declared dependency is not registered.
    #[error("operation '{operation_id}' depends on unknown operation '{dependency}'")]
    UnknownDependency {
        /// The operation being registered.
        operation_id: String,
        /// The unknown dependency id.
        dependency: String,
    },

    /// An enum parameter was declared without any choices.
    #[error("parameter '{parameter}' of operation '{operation_id}' has no choices")]
    EmptyChoices {
        /// The operation being registered.
        operation_id: String,
        /// The offending parameter.
        parameter: String,
    },

    /// No operation is registered under this id.
    #[error("operation '{0}' is not registered")]
    UnknownId(String),

    /// Another registered operation depends on the one being removed.
    #[error("operation '{operation_id}' is required by '{dependent}'")]
    HasDependents {
        /// The operation being removed.
        operation_id: String,
        /// The first registered operation that depends on it.
        dependent: String,
    },

    /// A code template references a parameter the schema does not declare.
    #[error("{syntax} template of '{operation_id}' references undeclared parameter '%{placeholder}%'")]
    UnknownPlaceholder {
        /// The operation being registered.
        operation_id: String,
        /// Which template slot holds the placeholder.
        syntax: Syntax,
        /// The placeholder name.
        placeholder: String,
    },
}

/// Errors that can occur while building or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A pipeline step references an operation missing from the catalog.
    #[error("function configuration not found for: {operation_id}")]
    CatalogLookup {
        /// The missing operation id.
        operation_id: String,
    },

    /// A step ran before the operations it depends on.
    ///
    /// `missing` lists the display names of every unmet dependency of
    /// the first failing step.
    #[error("You must first apply the following filters: {}", missing.join(", "))]
    DependencyUnsatisfied {
        /// The operation whose dependencies are unmet.
        operation_id: String,
        /// Zero-based position of the step in effective order.
        position: usize,
        /// Display names of the unmet dependencies, in declaration order.
        missing: Vec<String>,
    },

    /// The image library rejected an operation.
    #[error("Error processing: {display_name}: {cause}")]
    OperationExecution {
        /// The failing operation id.
        operation_id: String,
        /// The failing operation's display name.
        display_name: String,
        /// Zero-based position in effective order, when raised by a run.
        position: Option<usize>,
        /// The library's error.
        #[source]
        cause: OperationError,
    },

    /// A run was requested while another run was in progress.
    #[error("A previous process is still running")]
    ConcurrentRunRejected,

    /// The image or the image library is not available yet.
    #[error("{0} is not ready")]
    ResourceNotReady(Resource),

    /// No step carries the given sequence key.
    #[error("no pipeline step with key {0}")]
    StepNotFound(SequenceKey),

    /// The operation's schema does not declare the parameter.
    #[error("operation '{operation_id}' has no parameter named '{name}'")]
    UnknownParameter {
        /// The step's operation id.
        operation_id: String,
        /// The undeclared parameter name.
        name: String,
    },
}
