//! The built-in operation catalog.
//!
//! Each JavaScript fragment targets OpenCV.js with `src`/`dst` as
//! `cv.Mat` variables: it allocates `dst`, frees the old `src` and hands
//! `dst` over as the new `src`. Temporaries live in a block so that the
//! same operation can appear twice in one script. Python fragments use
//! `cv2` imported as `cv` and end with the same `src = dst` hand-over.

use crate::catalog::{Catalog, OperationDescriptor};
use crate::library::OperationKind;
use crate::params::ParamSpec;
use crate::types::{OPENCV_VERSION, Syntax};

const BORDER_TYPES: [&str; 9] = [
    "BORDER_DEFAULT",
    "BORDER_CONSTANT",
    "BORDER_REPLICATE",
    "BORDER_REFLECT",
    "BORDER_WRAP",
    "BORDER_REFLECT_101",
    "BORDER_TRANSPARENT",
    "BORDER_REFLECT101",
    "BORDER_ISOLATED",
];

const THRESHOLD_TYPES: [&str; 5] = [
    "THRESH_BINARY",
    "THRESH_BINARY_INV",
    "THRESH_TRUNC",
    "THRESH_TOZERO",
    "THRESH_TOZERO_INV",
];

const ODD_KERNEL: &str = "Observations: kernel must be odd.";

fn help(page: &str, anchor: &str) -> String {
    format!("https://docs.opencv.org/{OPENCV_VERSION}/{page}.html#{anchor}")
}

fn preview(name: &str) -> String {
    format!("./img/filters/64/base_{name}.webp")
}

const fn range(min: f64, max: f64, step: f64, default: f64) -> ParamSpec {
    ParamSpec::Range {
        min,
        max,
        step,
        default,
    }
}

fn grayscale() -> OperationDescriptor {
    OperationDescriptor::builder("grayscale", "Grayscale", OperationKind::Grayscale)
        .help_url(help(
            "d8/d01/group__imgproc__color__conversions",
            "ga397ae87e1288a81d2363b61574eb8cab",
        ))
        .preview_image(preview("grayscale"))
        .template(
            Syntax::Javascript,
            "dst = new cv.Mat();
cv.cvtColor(src, dst, cv.COLOR_RGBA2GRAY);
src.delete();
src = dst;
",
        )
        .template(
            Syntax::Python,
            "dst = cv.cvtColor(src=src, code=cv.COLOR_BGR2GRAY)
src = dst
",
        )
        .build()
}

fn threshold() -> OperationDescriptor {
    OperationDescriptor::builder("threshold", "Threshold", OperationKind::Threshold)
        .help_url(help(
            "d7/d1b/group__imgproc__misc",
            "gae8a4a146d1ca78c626a53577199e9c57",
        ))
        .preview_image(preview("threshold"))
        .param("thresh", ParamSpec::Number(128.0))
        .param("maxval", ParamSpec::Number(255.0))
        .param("type", ParamSpec::choice(&THRESHOLD_TYPES))
        .template(
            Syntax::Javascript,
            "dst = new cv.Mat();
cv.threshold(src, dst, %thresh%, %maxval%, cv.%type%);
src.delete();
src = dst;
",
        )
        .template(
            Syntax::Python,
            "retval, dst = cv.threshold(src=src, thresh=%thresh%, maxval=%maxval%, type=cv.%type%)
src = dst
",
        )
        .build()
}

fn blur() -> OperationDescriptor {
    OperationDescriptor::builder("blur", "Blur", OperationKind::Blur)
        .help_url(help(
            "d4/d86/group__imgproc__filter",
            "ga8c45db9afe636703801b0b2e440fce37",
        ))
        .preview_image(preview("blur"))
        .param("ksize", range(1.0, 21.0, 1.0, 5.0))
        .param("borderType", ParamSpec::choice(&BORDER_TYPES))
        .template(
            Syntax::Javascript,
            "dst = new cv.Mat();
cv.blur(src, dst, new cv.Size(%ksize%, %ksize%), new cv.Point(-1, -1), cv.%borderType%);
src.delete();
src = dst;
",
        )
        .template(
            Syntax::Python,
            "dst = cv.blur(src=src, ksize=(%ksize%, %ksize%), borderType=cv.%borderType%)
src = dst
",
        )
        .build()
}

fn gaussian_blur() -> OperationDescriptor {
    OperationDescriptor::builder("gaussianBlur", "Gaussian Blur", OperationKind::GaussianBlur)
        .help_url(help(
            "d4/d86/group__imgproc__filter",
            "gaabe8c836e97159a9193fb0b11ac52cf1",
        ))
        .preview_image(preview("gaussian_blur"))
        .param("ksize", range(1.0, 21.0, 2.0, 5.0))
        .param("sigmaX", ParamSpec::Number(0.0))
        .param("sigmaY", ParamSpec::Number(0.0))
        .param("borderType", ParamSpec::choice(&BORDER_TYPES))
        .template(
            Syntax::Javascript,
            "dst = new cv.Mat();
cv.GaussianBlur(src, dst, new cv.Size(%ksize%, %ksize%), %sigmaX%, %sigmaY%, cv.%borderType%);
src.delete();
src = dst;
",
        )
        .template(
            Syntax::Python,
            "dst = cv.GaussianBlur(src=src, ksize=(%ksize%, %ksize%), sigmaX=%sigmaX%, sigmaY=%sigmaY%, borderType=cv.%borderType%)
src = dst
",
        )
        .comment(ODD_KERNEL)
        .build()
}

fn dilate() -> OperationDescriptor {
    OperationDescriptor::builder("dilate", "Dilate", OperationKind::Dilate)
        .help_url(help(
            "d4/d86/group__imgproc__filter",
            "ga4ff0f3318642c4f469d0e11f242f3b6c",
        ))
        .preview_image(preview("dilate"))
        .param("ksize", range(1.0, 20.0, 1.0, 5.0))
        .param("iterations", range(1.0, 100.0, 1.0, 1.0))
        .template(
            Syntax::Javascript,
            "dst = new cv.Mat();
{
    const kernel = cv.getStructuringElement(cv.MORPH_RECT, new cv.Size(%ksize%, %ksize%));
    cv.dilate(src, dst, kernel, new cv.Point(-1, -1), %iterations%);
    kernel.delete();
}
src.delete();
src = dst;
",
        )
        .template(
            Syntax::Python,
            "kernel = cv.getStructuringElement(shape=cv.MORPH_RECT, ksize=(%ksize%, %ksize%))
dst = cv.dilate(src=src, kernel=kernel, iterations=%iterations%)
src = dst
",
        )
        .build()
}

fn erode() -> OperationDescriptor {
    OperationDescriptor::builder("erode", "Erode", OperationKind::Erode)
        .help_url(help(
            "d4/d86/group__imgproc__filter",
            "gaeb1e0c1033e3f6b891a25d0511362aeb",
        ))
        .preview_image(preview("erode"))
        .param("ksize", range(1.0, 20.0, 1.0, 5.0))
        .param("iterations", range(1.0, 100.0, 1.0, 1.0))
        .template(
            Syntax::Javascript,
            "dst = new cv.Mat();
{
    const kernel = cv.getStructuringElement(cv.MORPH_RECT, new cv.Size(%ksize%, %ksize%));
    cv.erode(src, dst, kernel, new cv.Point(-1, -1), %iterations%);
    kernel.delete();
}
src.delete();
src = dst;
",
        )
        .template(
            Syntax::Python,
            "kernel = cv.getStructuringElement(shape=cv.MORPH_RECT, ksize=(%ksize%, %ksize%))
dst = cv.erode(src=src, kernel=kernel, iterations=%iterations%)
src = dst
",
        )
        .build()
}

fn canny() -> OperationDescriptor {
    OperationDescriptor::builder("canny", "Canny Edge Detection", OperationKind::Canny)
        .help_url(help(
            "dd/d1a/group__imgproc__feature",
            "ga2a671611e104c093843d7b7fc46d24af",
        ))
        .preview_image(preview("canny_edge_detection"))
        .param("threshold1", ParamSpec::Number(50.0))
        .param("threshold2", ParamSpec::Number(100.0))
        .param("apertureSize", ParamSpec::Number(3.0))
        .param("L2gradient", ParamSpec::choice(&["False", "True"]))
        .template(
            Syntax::Javascript,
            "dst = new cv.Mat();
cv.Canny(src, dst, %threshold1%, %threshold2%, %apertureSize%, '%L2gradient%' === 'True');
src.delete();
src = dst;
",
        )
        .template(
            Syntax::Python,
            "dst = cv.Canny(image=src, threshold1=%threshold1%, threshold2=%threshold2%, apertureSize=%apertureSize%, L2gradient=%L2gradient%)
src = dst
",
        )
        .depends_on("grayscale")
        .build()
}

fn laplacian() -> OperationDescriptor {
    OperationDescriptor::builder("laplacian", "Laplacian", OperationKind::Laplacian)
        .help_url(help(
            "d4/d86/group__imgproc__filter",
            "gad78703e4c8fe703d479c1860d76429e6",
        ))
        .preview_image(preview("laplacian"))
        .param("ksize", range(1.0, 21.0, 2.0, 9.0))
        .param("scale", ParamSpec::Number(127.0))
        .param("delta", ParamSpec::Number(127.0))
        .template(
            Syntax::Javascript,
            "dst = new cv.Mat();
cv.Laplacian(src, dst, cv.CV_8U, %ksize%, %scale%, %delta%, cv.BORDER_DEFAULT);
src.delete();
src = dst;
",
        )
        .template(
            Syntax::Python,
            "dst = cv.Laplacian(src=src, ddepth=cv.CV_8U, ksize=%ksize%, scale=%scale%, delta=%delta%)
src = dst
",
        )
        .comment(ODD_KERNEL)
        .build()
}

fn find_contours() -> OperationDescriptor {
    OperationDescriptor::builder("findContours", "Find Contours", OperationKind::FindContours)
        .help_url(help(
            "d3/dc0/group__imgproc__shape",
            "gae4156f04053c44f886e387cff0ef6e08",
        ))
        .preview_image(preview("find_countours"))
        .template(
            Syntax::Javascript,
            "dst = cv.Mat.zeros(src.rows, src.cols, cv.CV_8UC3);
{
    const contours = new cv.MatVector();
    const hierarchy = new cv.Mat();
    cv.findContours(src, contours, hierarchy, cv.RETR_CCOMP, cv.CHAIN_APPROX_SIMPLE);
    for (let i = 0; i < contours.size(); ++i) {
        const color = new cv.Scalar(
            Math.round(Math.random() * 255),
            Math.round(Math.random() * 255),
            Math.round(Math.random() * 255));
        cv.drawContours(dst, contours, i, color, 1, cv.LINE_8, hierarchy, 100);
    }
    contours.delete();
    hierarchy.delete();
}
src.delete();
src = dst;
",
        )
        .template(
            Syntax::Python,
            "contours, hierarchy = cv.findContours(image=src.astype(np.uint8), mode=cv.RETR_CCOMP, method=cv.CHAIN_APPROX_SIMPLE)
dst = np.zeros((src.shape[0], src.shape[1], 3), dtype=np.uint8)
rng = np.random.default_rng()
for idx in range(len(contours)):
    color = tuple(int(c) for c in rng.integers(0, 256, size=3))
    cv.drawContours(image=dst, contours=contours, contourIdx=idx, color=color,
                    thickness=1, lineType=cv.LINE_8, hierarchy=hierarchy)
src = dst
",
        )
        .comment(
            "Observations: This function requires a binary matrix, so check if you have applied a grayscale and threshold.",
        )
        .depends_on("grayscale")
        .depends_on("threshold")
        .build()
}

/// The built-in descriptors in picker order.
///
/// Dependencies always precede their dependents.
#[must_use]
pub fn descriptors() -> Vec<OperationDescriptor> {
    vec![
        grayscale(),
        threshold(),
        blur(),
        gaussian_blur(),
        dilate(),
        erode(),
        canny(),
        laplacian(),
        find_contours(),
    ]
}

impl Catalog {
    /// A catalog holding every built-in operation.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for descriptor in descriptors() {
            let id = descriptor.id().to_string();
            if let Err(err) = catalog.register(descriptor) {
                log::error!("built-in operation '{id}' rejected: {err}");
            }
        }
        catalog
    }
}
