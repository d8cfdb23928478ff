//! Tunable parameters and the store that keeps them valid.
//!
//! Every value that reaches a transform has been through
//! [`ParameterSpec::coerce`]: clamped to the range, snapped to the step
//! grid, and forced odd where the parameter requires it. Callers never see a
//! validation error for a numeric input.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mode::Variant;
use crate::types::{Dimensions, EngineError};

/// Identifies one tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamId {
    /// Structuring element width and height.
    KernelSize,
    /// Number of times the base morphological primitive is repeated.
    Iterations,
    /// Fixed binary threshold.
    Threshold,
    /// Adaptive thresholding neighborhood size.
    BlockSize,
    /// Offset subtracted from the adaptive local mean.
    Constant,
}

impl ParamId {
    /// All parameter ids.
    pub const ALL: [Self; 5] = [
        Self::KernelSize,
        Self::Iterations,
        Self::Threshold,
        Self::BlockSize,
        Self::Constant,
    ];

    /// Slider / command-line name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::KernelSize => "kernel-size",
            Self::Iterations => "iterations",
            Self::Threshold => "threshold",
            Self::BlockSize => "block-size",
            Self::Constant => "constant",
        }
    }

    /// Parse a slider name. Accepts `_` or spaces in place of `-`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().replace(['_', ' '], "-").to_ascii_lowercase();
        Self::ALL.into_iter().find(|id| id.label() == normalized)
    }

    /// Value used when nothing else has been chosen.
    #[must_use]
    pub const fn default_value(self) -> u32 {
        match self {
            Self::KernelSize => 5,
            Self::Iterations => 1,
            Self::Threshold => 127,
            Self::BlockSize => 11,
            Self::Constant => 2,
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parity constraint on a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// Any value on the step grid.
    None,
    /// Only odd values (kernel and block sizes need a center pixel).
    OddOnly,
}

/// Static description of one tunable value.
///
/// The starting value is not stored here; it comes from
/// [`ParamId::default_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Which parameter this describes.
    pub id: ParamId,
    /// Smallest accepted value, inclusive.
    pub min: u32,
    /// Largest accepted value, inclusive. For the block size this
    /// depends on the image dimensions.
    pub max: u32,
    /// Slider increment, counted from `min`.
    pub step: u32,
    /// Extra constraint applied after stepping.
    pub parity: Parity,
}

/// Smallest adaptive block size.
pub const MIN_BLOCK_SIZE: u32 = 3;

/// Largest meaningful adaptive block size for an image.
///
/// A quarter of the long axis, rounded down to odd, and never below
/// [`MIN_BLOCK_SIZE`] so the slider range stays non-empty on tiny
/// images.
#[must_use]
pub const fn max_block_size(dimensions: Dimensions) -> u32 {
    let quarter = dimensions.long_axis() / 4;
    let odd = if quarter % 2 == 0 {
        quarter.saturating_sub(1)
    } else {
        quarter
    };
    if odd < MIN_BLOCK_SIZE {
        MIN_BLOCK_SIZE
    } else {
        odd
    }
}

impl ParameterSpec {
    /// The spec for `id`, with geometry-dependent bounds derived from
    /// `dimensions`.
    #[must_use]
    pub const fn for_image(id: ParamId, dimensions: Dimensions) -> Self {
        match id {
            ParamId::KernelSize => Self {
                id,
                min: 3,
                max: 51,
                step: 2,
                parity: Parity::OddOnly,
            },
            ParamId::Iterations => Self {
                id,
                min: 1,
                max: 5,
                step: 1,
                parity: Parity::None,
            },
            ParamId::Threshold => Self {
                id,
                min: 0,
                max: 255,
                step: 1,
                parity: Parity::None,
            },
            ParamId::BlockSize => Self {
                id,
                min: MIN_BLOCK_SIZE,
                max: max_block_size(dimensions),
                step: 2,
                parity: Parity::OddOnly,
            },
            ParamId::Constant => Self {
                id,
                min: 0,
                max: 50,
                step: 1,
                parity: Parity::None,
            },
        }
    }

    /// Coerce an arbitrary slider value into a valid one.
    ///
    /// Clamps to `[min, max]`, rounds to the nearest multiple of `step`
    /// counted from `min`, then fixes parity by moving one unit up (or
    /// down, if up would leave the range). NaN maps to `min`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn coerce(&self, raw: f64) -> u32 {
        let min = f64::from(self.min);
        let max = f64::from(self.max);
        let clamped = if raw.is_nan() { min } else { raw.clamp(min, max) };

        let step = f64::from(self.step.max(1));
        let steps = ((clamped - min) / step).round();
        let mut value = steps.mul_add(step, min) as u32;
        if value > self.max {
            value = value.saturating_sub(self.step.max(1));
        }

        if self.parity == Parity::OddOnly && value % 2 == 0 {
            value = if value < self.max {
                value + 1
            } else {
                value.saturating_sub(1)
            };
        }
        value
    }

    /// Whether `value` already satisfies every constraint.
    #[must_use]
    pub fn accepts(&self, value: u32) -> bool {
        let in_range = (self.min..=self.max).contains(&value);
        let parity_ok = self.parity == Parity::None || value % 2 == 1;
        in_range && parity_ok
    }
}

/// Current values for one variant's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterStore {
    specs: Vec<ParameterSpec>,
    values: BTreeMap<ParamId, u32>,
}

impl ParameterStore {
    /// A store for `variant`, with bounds derived from the loaded
    /// image and every value at its default.
    #[must_use]
    pub fn new(variant: Variant, dimensions: Dimensions) -> Self {
        let specs: Vec<ParameterSpec> = variant
            .parameters()
            .iter()
            .map(|&id| ParameterSpec::for_image(id, dimensions))
            .collect();
        let values = specs
            .iter()
            .map(|spec| (spec.id, spec.coerce(f64::from(spec.id.default_value()))))
            .collect();
        Self { specs, values }
    }

    /// Specs in display order.
    #[must_use]
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// The spec for `id`, if this store holds it.
    #[must_use]
    pub fn spec(&self, id: ParamId) -> Option<&ParameterSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }

    /// Current value of `id`.
    #[must_use]
    pub fn get(&self, id: ParamId) -> Option<u32> {
        self.values.get(&id).copied()
    }

    /// Coerce `raw` and store it as the value of `id`.
    ///
    /// Returns the value actually stored.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownParameter`] if this store does not
    /// hold `id`. Numeric input never fails.
    #[allow(clippy::float_cmp)]
    pub fn set(&mut self, id: ParamId, raw: f64) -> Result<u32, EngineError> {
        let spec = *self.spec(id).ok_or(EngineError::UnknownParameter(id))?;
        let value = spec.coerce(raw);
        if f64::from(value) != raw {
            tracing::debug!(parameter = %id, raw, value, "coerced parameter value");
        }
        self.values.insert(id, value);
        Ok(value)
    }

    /// Snapshot of every value.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<ParamId, u32> {
        &self.values
    }
}
