//! Transient user-visible notifications.
//!
//! Every error that crosses from the core into the presentation layer
//! becomes one [`Notice`]. The presentation layer shows it and removes
//! it after [`Notice::dismiss_after`].

use std::fmt;
use std::time::Duration;

use gazelens_pipeline::{PipelineError, Resource};
use serde::Serialize;

/// How long a notice stays visible by default.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// Severity, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// The action could not run yet; retrying later may succeed.
    Warning,
    /// The action ran and failed.
    Error,
}

/// An auto-dismissing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Text shown to the user.
    pub message: String,
    /// Severity.
    pub level: NoticeLevel,
    /// Time until the notice disappears on its own.
    pub dismiss_after: Duration,
}

impl Notice {
    /// A notice with the default lifetime.
    #[must_use]
    pub fn new(message: impl Into<String>, level: NoticeLevel) -> Self {
        Self {
            message: message.into(),
            level,
            dismiss_after: DEFAULT_DISMISS_AFTER,
        }
    }

    /// The notice shown for `err`.
    #[must_use]
    pub fn from_error(err: &PipelineError) -> Self {
        match err {
            PipelineError::ResourceNotReady(Resource::Image) => {
                Self::new("Please load an image first.", NoticeLevel::Warning)
            }
            PipelineError::ResourceNotReady(Resource::Library) => {
                Self::new("Wait until the image library is loaded!", NoticeLevel::Warning)
            }
            PipelineError::ConcurrentRunRejected => Self::new(err.to_string(), NoticeLevel::Warning),
            other => Self::new(other.to_string(), NoticeLevel::Error),
        }
    }
}

impl From<&PipelineError> for Notice {
    fn from(err: &PipelineError) -> Self {
        Self::from_error(err)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
