//! OpenCV.js script generator.
//!
//! The script reads its source from a canvas into `src`, runs one block
//! per step, and leaves the result in both `src` and `dst`. Each block
//! allocates a fresh `dst`, frees the previous `src`, and ends with
//! `src = dst;`.

use std::fmt::Write;

use gazelens_pipeline::{Catalog, OPENCV_VERSION, Pipeline, Syntax};

use crate::{CodeOptions, closing_banner, step_blocks};

/// Serialize `pipeline` as an OpenCV.js script.
///
/// Only [`CodeOptions::install_library`] applies: it adds the
/// `opencv.js` script tag as a comment.
#[must_use]
pub fn to_javascript(catalog: &Catalog, pipeline: &Pipeline, options: &CodeOptions) -> String {
    let mut out = String::new();

    if options.install_library {
        let _ = writeln!(
            out,
            "// <script async src=\"https://docs.opencv.org/{OPENCV_VERSION}/opencv.js\" type=\"text/javascript\"></script>",
        );
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "// Read image from canvas html");
    let _ = writeln!(out, "const canvasId = '';");
    let _ = writeln!(out, "let src = cv.imread(canvasId);");
    let _ = writeln!(out, "let dst = null;");

    out.push_str(&step_blocks(catalog, pipeline, Syntax::Javascript));
    out.push_str(&closing_banner("//"));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use gazelens_pipeline::ParamBindings;

    #[test]
    fn empty_pipeline_has_setup_and_banner() {
        let js = to_javascript(&Catalog::builtin(), &Pipeline::new(), &CodeOptions::default());
        assert!(js.starts_with("// Read image from canvas html\n"));
        assert!(js.contains("let src = cv.imread(canvasId);\nlet dst = null;\n"));
        assert!(js.contains("THANK YOU for using Gazelens!!!"));
        assert!(!js.contains("<script"));
    }

    #[test]
    fn install_adds_script_tag_comment() {
        let options = CodeOptions {
            install_library: true,
            ..CodeOptions::default()
        };
        let js = to_javascript(&Catalog::builtin(), &Pipeline::new(), &options);
        assert!(js.starts_with("// <script async src=\"https://docs.opencv.org/4.10.0/opencv.js\""));
    }

    #[test]
    fn python_only_options_are_ignored() {
        let options = CodeOptions {
            save_image: true,
            display_in_colab: true,
            ..CodeOptions::default()
        };
        let plain = to_javascript(&Catalog::builtin(), &Pipeline::new(), &CodeOptions::default());
        assert_eq!(to_javascript(&Catalog::builtin(), &Pipeline::new(), &options), plain);
    }

    #[test]
    fn repeated_morphology_scopes_its_kernel() {
        let catalog = Catalog::builtin();
        let mut pipeline = Pipeline::new();
        pipeline.append("dilate", ParamBindings::new());
        pipeline.append("dilate", ParamBindings::new());
        let js = to_javascript(&catalog, &pipeline, &CodeOptions::default());
        assert_eq!(js.matches("// Dilate\n").count(), 2);
        assert!(!js.contains("let kernel"));
        assert_eq!(js.matches("    const kernel = ").count(), 2);
    }
}
