//! gazelens-studio: the pipeline builder's session layer.
//!
//! Sits between a presentation layer (a web page, a desktop window, the
//! `gazelens` CLI) and the sans-IO core. A [`Session`] owns the state
//! of one editing session and exposes the user actions: add, remove,
//! reorder, reverse, edit a parameter, switch syntax, start over. Each
//! action re-runs the pipeline and regenerates the script before it
//! returns, and every failure surfaces as one auto-dismissing
//! [`Notice`].

pub mod notice;
pub mod raster;
pub mod session;

pub use notice::{DEFAULT_DISMISS_AFTER, Notice, NoticeLevel};
pub use raster::{RasterError, encode_png};
pub use session::{Refresh, Rendered, Session, SessionFlags};
