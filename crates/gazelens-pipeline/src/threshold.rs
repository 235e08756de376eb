//! Fixed-level thresholding with OpenCV's five threshold types.

use std::str::FromStr;

use image::DynamicImage;

use crate::library::map_color_planes;
use crate::params::ParamBindings;
use crate::types::OperationError;

/// How a pixel compares against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdType {
    /// `v > t ? maxval : 0`
    Binary,
    /// `v > t ? 0 : maxval`
    BinaryInv,
    /// `v > t ? t : v`
    Trunc,
    /// `v > t ? v : 0`
    ToZero,
    /// `v > t ? 0 : v`
    ToZeroInv,
}

impl FromStr for ThresholdType {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "THRESH_BINARY" => Ok(Self::Binary),
            "THRESH_BINARY_INV" => Ok(Self::BinaryInv),
            "THRESH_TRUNC" => Ok(Self::Trunc),
            "THRESH_TOZERO" => Ok(Self::ToZero),
            "THRESH_TOZERO_INV" => Ok(Self::ToZeroInv),
            other => Err(OperationError::InvalidParameter {
                name: "type".to_string(),
                reason: format!("unknown threshold type {other}"),
            }),
        }
    }
}

/// Saturate a real value into `0..=255`, rounding to nearest.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn saturate_u8(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 255.0) as u8
    }
}

/// Threshold a single sample.
///
/// `thresh` is floored first, as OpenCV does for 8-bit input.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn threshold_value(v: u8, thresh: f64, maxval: u8, kind: ThresholdType) -> u8 {
    let t = thresh.floor();
    let above = f64::from(v) > t;
    match kind {
        ThresholdType::Binary => {
            if above {
                maxval
            } else {
                0
            }
        }
        ThresholdType::BinaryInv => {
            if above {
                0
            } else {
                maxval
            }
        }
        ThresholdType::Trunc => {
            if above {
                t.clamp(0.0, 255.0) as u8
            } else {
                v
            }
        }
        ThresholdType::ToZero => {
            if above {
                v
            } else {
                0
            }
        }
        ThresholdType::ToZeroInv => {
            if above {
                0
            } else {
                v
            }
        }
    }
}

/// Apply thresholding to every colour channel of `source`.
///
/// # Errors
///
/// Returns [`OperationError`] if `thresh`, `maxval` or `type` is missing
/// or malformed.
pub fn apply(source: &DynamicImage, params: &ParamBindings) -> Result<DynamicImage, OperationError> {
    let thresh = params.number("thresh")?;
    let maxval = saturate_u8(params.number("maxval")?);
    let kind: ThresholdType = params.text("type")?.parse()?;

    Ok(map_color_planes(source, |plane| {
        let mut out = plane.clone();
        for px in out.pixels_mut() {
            px.0[0] = threshold_value(px.0[0], thresh, maxval, kind);
        }
        out
    }))
}
