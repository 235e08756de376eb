//! gazelens-export: Pure script generators (sans-IO)
//!
//! Turns a pipeline into a standalone script that reproduces it with
//! OpenCV. Two syntaxes are supported: OpenCV.js
//! ([`javascript`]) and Python `cv2` ([`python`]). Both walk the
//! pipeline in effective order, emit one block per step, and wrap the
//! blocks in setup and closing boilerplate.
//!
//! Generation never executes anything and never fails. A step whose
//! operation is missing from the catalog is skipped with a warning.

pub mod javascript;
pub mod python;

use std::fmt::Write;

use gazelens_pipeline::{Catalog, OperationDescriptor, ParamBindings, Pipeline, Syntax};
use serde::{Deserialize, Serialize};

/// Boilerplate toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeOptions {
    /// Emit library install instructions (pip for Python, the script
    /// tag for JavaScript).
    pub install_library: bool,
    /// Python only: write the result to `image_path_destination`.
    pub save_image: bool,
    /// Python only: notebook-style `!pip` and inline image display.
    pub display_in_colab: bool,
}

/// Generate the full script for `pipeline` in `syntax`.
#[must_use]
pub fn generate(catalog: &Catalog, pipeline: &Pipeline, syntax: Syntax, options: &CodeOptions) -> String {
    match syntax {
        Syntax::Javascript => javascript::to_javascript(catalog, pipeline, options),
        Syntax::Python => python::to_python(catalog, pipeline, options),
    }
}

/// One step's block: a comment naming the operation, its caveat if
/// any, then the rendered fragment.
#[must_use]
pub fn step_block(descriptor: &OperationDescriptor, syntax: Syntax, bindings: &ParamBindings) -> String {
    let prefix = syntax.comment_prefix();
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "{prefix} {}", descriptor.display_name());
    if let Some(comment) = descriptor.comment() {
        let _ = writeln!(out, "{prefix} {comment}");
    }
    out.push_str(&descriptor.render_code(syntax, bindings));
    out
}

/// Every step's block in effective order.
///
/// Steps whose operation is not in `catalog` are skipped.
#[must_use]
pub fn step_blocks(catalog: &Catalog, pipeline: &Pipeline, syntax: Syntax) -> String {
    let mut out = String::new();
    for step in pipeline.effective_order() {
        match catalog.lookup(step.operation_id()) {
            Some(descriptor) => out.push_str(&step_block(descriptor, syntax, step.bindings())),
            None => log::warn!(
                "skipping step {} in {syntax} code: function configuration not found for: {}",
                step.key(),
                step.operation_id(),
            ),
        }
    }
    out
}

/// Closing banner framed in `prefix` comment characters.
pub(crate) fn closing_banner(prefix: &str) -> String {
    const LINES: [&str; 2] = [
        "Continue coding with the src or dst variables",
        "THANK YOU for using Gazelens!!!",
    ];
    let width = LINES.iter().map(|l| l.len()).max().unwrap_or(0);
    let fill = prefix.chars().next().unwrap_or('#');
    let rule: String = std::iter::repeat_n(fill, width + 2 * prefix.len() + 2).collect();

    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "{rule}");
    for line in LINES {
        let _ = writeln!(out, "{prefix} {line:<width$} {prefix}");
    }
    let _ = writeln!(out, "{rule}");
    out
}
