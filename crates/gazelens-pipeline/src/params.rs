//! Parameter schemas, bound values, and the widget controls derived
//! from them.
//!
//! A schema entry has one of three shapes: a bare numeric default, a
//! `{min, max, step, default}` range, or an ordered list of string
//! choices whose first element is the default. Steps carry a
//! [`ParamBindings`] map initialized from those defaults and mutated by
//! widget interaction.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::OperationError;

/// A concrete parameter value: a number from a slider or a string from
/// a dropdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric value.
    Number(f64),
    /// String value (enum choice).
    Text(String),
}

impl ParamValue {
    /// The numeric value, if this is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// The string value, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

/// Numbers format as literals (`7`, not `7.0`); strings verbatim.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The declared shape of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSpec {
    /// A bare numeric default; the widget range is inferred.
    Number(f64),
    /// A ranged numeric value.
    Range {
        /// Lower slider bound.
        min: f64,
        /// Upper slider bound.
        max: f64,
        /// Slider increment.
        step: f64,
        /// Initial value.
        default: f64,
    },
    /// An ordered list of string choices; the first is the default.
    Choice(Vec<String>),
}

impl ParamSpec {
    /// Build a [`ParamSpec::Choice`] from string slices.
    #[must_use]
    pub fn choice(options: &[&str]) -> Self {
        Self::Choice(options.iter().map(|s| (*s).to_string()).collect())
    }

    /// The value a fresh step starts with.
    ///
    /// Returns `None` only for an empty choice list, which catalog
    /// registration rejects.
    #[must_use]
    pub fn default_value(&self) -> Option<ParamValue> {
        match self {
            Self::Number(n) => Some(ParamValue::Number(*n)),
            Self::Range { default, .. } => Some(ParamValue::Number(*default)),
            Self::Choice(options) => options.first().cloned().map(ParamValue::Text),
        }
    }
}

/// The widget the presentation layer should build for a parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Control {
    /// A range slider.
    Slider {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
        /// Increment.
        step: f64,
        /// Initial value.
        value: f64,
    },
    /// A dropdown of string options.
    Dropdown {
        /// Options in display order.
        options: Vec<String>,
        /// Initially selected option.
        value: String,
    },
}

/// Upper bound of inferred slider ranges for kernel sizes.
const KSIZE_SLIDER_MAX: f64 = 21.0;
/// Upper bound of inferred slider ranges for everything else.
const DEFAULT_SLIDER_MAX: f64 = 255.0;

impl ParamSpec {
    /// Derive the control for parameter `name`.
    ///
    /// Bare numeric defaults get an implicit range: kernel sizes
    /// (`name` contains `ksize`) slide over `0..=21` in odd-preserving
    /// steps of 2, everything else over `0..=255` in steps of 1.
    #[must_use]
    pub fn control(&self, name: &str) -> Control {
        match self {
            Self::Number(default) => {
                let is_kernel = name.contains("ksize");
                Control::Slider {
                    min: 0.0,
                    max: if is_kernel {
                        KSIZE_SLIDER_MAX
                    } else {
                        DEFAULT_SLIDER_MAX
                    },
                    step: if is_kernel { 2.0 } else { 1.0 },
                    value: *default,
                }
            }
            Self::Range {
                min,
                max,
                step,
                default,
            } => Control::Slider {
                min: *min,
                max: *max,
                step: *step,
                value: *default,
            },
            Self::Choice(options) => Control::Dropdown {
                options: options.clone(),
                value: options.first().cloned().unwrap_or_default(),
            },
        }
    }
}

/// Ordered mapping from parameter name to its declared shape.
///
/// Declaration order is preserved so generated controls appear in the
/// order the catalog lists them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema(Vec<(String, ParamSpec)>);

impl ParameterSchema {
    /// An empty schema.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a parameter, replacing an earlier declaration of the same name.
    pub fn insert(&mut self, name: impl Into<String>, spec: ParamSpec) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = spec;
        } else {
            self.0.push((name, spec));
        }
    }

    /// Look up a parameter's shape.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, spec)| spec)
    }

    /// Whether `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate declarations in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.0.iter().map(|(n, spec)| (n.as_str(), spec))
    }

    /// Number of declared parameters.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the schema declares no parameters.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bindings holding every declared default.
    #[must_use]
    pub fn defaults(&self) -> ParamBindings {
        let mut bindings = ParamBindings::new();
        for (name, spec) in &self.0 {
            if let Some(value) = spec.default_value() {
                bindings.set(name.clone(), value);
            }
        }
        bindings
    }

    /// Overlay `bindings` on the schema defaults.
    ///
    /// Values for undeclared names are carried through unchanged.
    #[must_use]
    pub fn resolve(&self, bindings: &ParamBindings) -> ParamBindings {
        let mut resolved = self.defaults();
        for (name, value) in bindings.iter() {
            resolved.set(name.to_string(), value.clone());
        }
        resolved
    }

    /// One control per declared parameter, in declaration order.
    #[must_use]
    pub fn controls(&self) -> Vec<(&str, Control)> {
        self.0
            .iter()
            .map(|(name, spec)| (name.as_str(), spec.control(name)))
            .collect()
    }
}

/// Per-step parameter values keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBindings(BTreeMap<String, ParamValue>);

impl ParamBindings {
    /// Empty bindings.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Bind `name` to `value`, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(name.into(), value.into())
    }

    /// The value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Iterate bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The numeric value of `name`.
    ///
    /// Text that parses as a number is accepted, mirroring how slider
    /// widgets report their value as a string.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::MissingParameter`] when unbound and
    /// [`OperationError::InvalidParameter`] when the value is not numeric.
    pub fn number(&self, name: &str) -> Result<f64, OperationError> {
        match self.get(name) {
            None => Err(OperationError::MissingParameter(name.to_string())),
            Some(ParamValue::Number(n)) => Ok(*n),
            Some(ParamValue::Text(s)) => {
                s.trim()
                    .parse()
                    .map_err(|_| OperationError::InvalidParameter {
                        name: name.to_string(),
                        reason: format!("expected a number, got '{s}'"),
                    })
            }
        }
    }

    /// The value of `name` as a non-negative integer.
    ///
    /// Fractional values are truncated toward zero.
    ///
    /// # Errors
    ///
    /// As [`number`](Self::number), plus
    /// [`OperationError::InvalidParameter`] for negative or non-finite
    /// values.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn unsigned(&self, name: &str) -> Result<u32, OperationError> {
        let n = self.number(name)?;
        if !n.is_finite() || n < 0.0 || n > f64::from(u32::MAX) {
            return Err(OperationError::InvalidParameter {
                name: name.to_string(),
                reason: format!("expected a non-negative integer, got {n}"),
            });
        }
        Ok(n as u32)
    }

    /// The string value of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::MissingParameter`] when unbound and
    /// [`OperationError::InvalidParameter`] when the value is a number.
    pub fn text(&self, name: &str) -> Result<&str, OperationError> {
        match self.get(name) {
            None => Err(OperationError::MissingParameter(name.to_string())),
            Some(ParamValue::Text(s)) => Ok(s),
            Some(ParamValue::Number(n)) => Err(OperationError::InvalidParameter {
                name: name.to_string(),
                reason: format!("expected a choice, got {n}"),
            }),
        }
    }

    /// The boolean value of `name`: `true` iff the text is `True`,
    /// case-insensitively and ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// As [`text`](Self::text).
    pub fn flag(&self, name: &str) -> Result<bool, OperationError> {
        Ok(self.text(name)?.trim().eq_ignore_ascii_case("true"))
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamBindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
