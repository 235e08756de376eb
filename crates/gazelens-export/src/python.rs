//! Python (`cv2`) script generator.
//!
//! The script loads `image_path_origin` into `src`, runs one block per
//! step, and leaves the result in both `src` and `dst`. Install, save,
//! and notebook display boilerplate are controlled by [`CodeOptions`].

use std::fmt::Write;

use gazelens_pipeline::{Catalog, OPENCV_PYTHON_WHEEL, Pipeline, Syntax};

use crate::{CodeOptions, closing_banner, step_blocks};

/// Serialize `pipeline` as a Python script.
#[must_use]
pub fn to_python(catalog: &Catalog, pipeline: &Pipeline, options: &CodeOptions) -> String {
    let mut out = String::new();

    // --- Setup ---
    if options.install_library {
        if options.display_in_colab {
            let _ = writeln!(out, "!pip install -U opencv-python=={OPENCV_PYTHON_WHEEL}");
        } else {
            let _ = writeln!(out, "# pip install -U opencv-python=={OPENCV_PYTHON_WHEEL}");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "import cv2 as cv");
    let _ = writeln!(out, "import numpy as np");
    let _ = writeln!(out);
    let _ = writeln!(out, "image_path_origin = ''  # Provide the original image path here");
    if options.save_image {
        let _ = writeln!(out, "image_path_destination = ''  # Specify where to save the result");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "# Load the original image");
    let _ = writeln!(out, "ori = cv.imread(image_path_origin)");
    let _ = writeln!(out, "src = ori.copy()");
    let _ = writeln!(out, "dst = np.zeros_like(src)  # Destination image");

    // --- Steps ---
    out.push_str(&step_blocks(catalog, pipeline, Syntax::Python));

    // --- Teardown ---
    if options.save_image {
        let _ = writeln!(out);
        let _ = writeln!(out, "# Save the result");
        let _ = writeln!(out, "if len(image_path_destination) > 0:");
        let _ = writeln!(out, "    cv.imwrite(image_path_destination, dst)");
    }

    if options.display_in_colab {
        let _ = writeln!(out);
        let _ = writeln!(out, "# Display images in Google Colab");
        let _ = writeln!(out, "from IPython.display import display, Image");
        let _ = writeln!(out, "print('Original:')");
        let _ = writeln!(out, "display(Image(image_path_origin, height=480))");
        let _ = writeln!(out, "print('Result:')");
        if !options.save_image {
            let _ = writeln!(out, "image_path_destination = '/tmp/result.png'");
            let _ = writeln!(out, "cv.imwrite(image_path_destination, dst)");
        }
        let _ = writeln!(out, "display(Image(image_path_destination, height=480))");
    }

    out.push_str(&closing_banner("#"));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn empty(options: &CodeOptions) -> String {
        to_python(&Catalog::builtin(), &Pipeline::new(), options)
    }

    #[test]
    fn default_script_has_no_optional_sections() {
        let py = empty(&CodeOptions::default());
        assert!(py.starts_with("import cv2 as cv\nimport numpy as np\n"));
        assert!(py.contains("src = ori.copy()\n"));
        assert!(!py.contains("pip install"));
        assert!(!py.contains("image_path_destination"));
        assert!(!py.contains("IPython"));
        assert!(py.contains("# THANK YOU for using Gazelens!!!"));
    }

    #[test]
    fn install_outside_notebook_is_a_comment() {
        let py = empty(&CodeOptions {
            install_library: true,
            ..CodeOptions::default()
        });
        assert!(py.starts_with("# pip install -U opencv-python==4.10.0.84\n"));
    }

    #[test]
    fn install_in_notebook_uses_shell_escape() {
        let py = empty(&CodeOptions {
            install_library: true,
            display_in_colab: true,
            ..CodeOptions::default()
        });
        assert!(py.starts_with("!pip install -U opencv-python==4.10.0.84\n"));
    }

    #[test]
    fn save_writes_destination_inside_guard() {
        let py = empty(&CodeOptions {
            save_image: true,
            ..CodeOptions::default()
        });
        assert!(py.contains("image_path_destination = ''"));
        assert!(py.contains("if len(image_path_destination) > 0:\n    cv.imwrite(image_path_destination, dst)\n"));
    }

    #[test]
    fn colab_display_without_save_uses_temp_file() {
        let py = empty(&CodeOptions {
            display_in_colab: true,
            ..CodeOptions::default()
        });
        assert!(py.contains("image_path_destination = '/tmp/result.png'\ncv.imwrite(image_path_destination, dst)\n"));
        assert!(py.ends_with(&closing_banner("#")));
    }

    #[test]
    fn colab_display_with_save_reuses_destination() {
        let py = empty(&CodeOptions {
            save_image: true,
            display_in_colab: true,
            ..CodeOptions::default()
        });
        assert!(!py.contains("/tmp/result.png"));
        assert!(py.contains("print('Result:')\ndisplay(Image(image_path_destination, height=480))\n"));
    }
}
