//! Intensity histogram of a rendered image.

use image::DynamicImage;
use serde::Serialize;

/// 256-bin histogram of the first channel.
///
/// For grayscale images that is luminance; for colour images the red
/// channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    bins: Vec<u32>,
}

impl Histogram {
    /// Count first-channel intensities of `image`.
    #[must_use]
    pub fn of(image: &DynamicImage) -> Self {
        let counts = match image {
            DynamicImage::ImageLuma8(gray) => imageproc::stats::histogram(gray),
            other => imageproc::stats::histogram(&other.to_rgb8()),
        };
        let bins = counts
            .channels
            .first()
            .map_or_else(|| vec![0; 256], |c| c.to_vec());
        Self { bins }
    }

    /// Bin counts indexed by intensity.
    #[must_use]
    pub fn bins(&self) -> &[u32] {
        &self.bins
    }

    /// Total number of counted pixels.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|&b| u64::from(b)).sum()
    }

    /// The largest bin count, used to scale a plot.
    #[must_use]
    pub fn peak(&self) -> u32 {
        self.bins.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn gray_counts_luminance() {
        let img = GrayImage::from_fn(4, 2, |x, _| if x < 1 { Luma([0]) } else { Luma([200]) });
        let h = Histogram::of(&DynamicImage::ImageLuma8(img));
        assert_eq!(h.bins().len(), 256);
        assert_eq!(h.bins()[0], 2);
        assert_eq!(h.bins()[200], 6);
        assert_eq!(h.total(), 8);
        assert_eq!(h.peak(), 6);
    }

    #[test]
    fn color_counts_red_channel() {
        let img = RgbImage::from_pixel(3, 3, Rgb([17, 99, 250]));
        let h = Histogram::of(&DynamicImage::ImageRgb8(img));
        assert_eq!(h.bins()[17], 9);
        assert_eq!(h.bins()[99], 0);
    }
}
