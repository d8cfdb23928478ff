//! Modes, kernel shapes, and the variants that register them.
//!
//! A [`Variant`] fixes which [`Mode`]s the explorer offers and which
//! parameters it tunes. Modes are plain tagged values; dispatch on them
//! happens in [`crate::registry`] with exhaustive `match`es, so adding
//! a mode without wiring it up fails to compile.
//!
//! Labels are the user-facing names shown by the render sink. Parsing a
//! label is the only place an unknown name can appear, and it yields
//! `None` rather than a fallback mode.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::ParamId;

/// The two explorer variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Erode, dilate and the derived morphological operations.
    #[default]
    Morphology,
    /// Fixed, automatic, adaptive, and combined thresholding.
    Thresholding,
}

/// Morphological operation applied with the active structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MorphOp {
    Erode,
    Dilate,
    /// Erosion followed by dilation.
    Open,
    /// Dilation followed by erosion.
    Close,
    /// Dilation minus erosion.
    Gradient,
    /// Source minus its opening.
    TopHat,
    /// Closing minus the source.
    BlackHat,
}

/// Base thresholding method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdOp {
    /// Fixed global cutoff.
    Binary,
    /// Global cutoff chosen by Otsu's method.
    Otsu,
    /// Cutoff from the local box mean, offset by a constant.
    AdaptiveMean,
    /// Cutoff from the local gaussian-weighted mean, offset by a constant.
    AdaptiveGaussian,
}

/// Pixelwise boolean operator over two binarized images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    And,
    Or,
}

/// Two base thresholding methods combined pixelwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Composite {
    pub left: ThresholdOp,
    pub combinator: Combinator,
    pub right: ThresholdOp,
}

/// Selects one transform registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    /// Identity: the source image, unchanged.
    Original,
    Morphology(MorphOp),
    Threshold(ThresholdOp),
    Composite(Composite),
}

/// Structuring element shape for the morphology variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KernelShape {
    #[default]
    Rect,
    Ellipse,
    Cross,
}

const ADAPTIVE_GAUSSIAN_AND_OTSU: Composite = Composite {
    left: ThresholdOp::AdaptiveGaussian,
    combinator: Combinator::And,
    right: ThresholdOp::Otsu,
};

const ADAPTIVE_GAUSSIAN_OR_OTSU: Composite = Composite {
    left: ThresholdOp::AdaptiveGaussian,
    combinator: Combinator::Or,
    right: ThresholdOp::Otsu,
};

const MORPHOLOGY_MODES: [Mode; 8] = [
    Mode::Original,
    Mode::Morphology(MorphOp::Erode),
    Mode::Morphology(MorphOp::Dilate),
    Mode::Morphology(MorphOp::Open),
    Mode::Morphology(MorphOp::Close),
    Mode::Morphology(MorphOp::Gradient),
    Mode::Morphology(MorphOp::TopHat),
    Mode::Morphology(MorphOp::BlackHat),
];

const THRESHOLDING_MODES: [Mode; 7] = [
    Mode::Original,
    Mode::Threshold(ThresholdOp::Binary),
    Mode::Threshold(ThresholdOp::Otsu),
    Mode::Threshold(ThresholdOp::AdaptiveMean),
    Mode::Threshold(ThresholdOp::AdaptiveGaussian),
    Mode::Composite(ADAPTIVE_GAUSSIAN_AND_OTSU),
    Mode::Composite(ADAPTIVE_GAUSSIAN_OR_OTSU),
];

impl Variant {
    /// Both variants.
    pub const ALL: [Self; 2] = [Self::Morphology, Self::Thresholding];

    /// Registered modes, in the order the render sink lists them.
    #[must_use]
    pub const fn modes(self) -> &'static [Mode] {
        match self {
            Self::Morphology => &MORPHOLOGY_MODES,
            Self::Thresholding => &THRESHOLDING_MODES,
        }
    }

    /// Whether `mode` is registered for this variant.
    #[must_use]
    pub fn registers(self, mode: Mode) -> bool {
        self.modes().contains(&mode)
    }

    /// Parameters this variant tunes, in display order.
    #[must_use]
    pub const fn parameters(self) -> &'static [ParamId] {
        match self {
            Self::Morphology => &[ParamId::KernelSize, ParamId::Iterations],
            Self::Thresholding => &[ParamId::Threshold, ParamId::BlockSize, ParamId::Constant],
        }
    }

    /// Whether the variant has a kernel-shape axis.
    #[must_use]
    pub const fn has_shapes(self) -> bool {
        matches!(self, Self::Morphology)
    }

    /// Window title shown above the output image.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Morphology => "Morphological Transformations",
            Self::Thresholding => "Image Thresholding",
        }
    }

    /// The label this variant's radio group uses for `mode`.
    ///
    /// The morphology group spells its labels in upper case, including
    /// `ORIGINAL`.
    #[must_use]
    pub fn label_of(self, mode: Mode) -> String {
        match (self, mode) {
            (Self::Morphology, Mode::Original) => "ORIGINAL".to_owned(),
            _ => mode.label(),
        }
    }

    /// Parse a radio label into one of this variant's modes.
    ///
    /// Matching ignores ASCII case. Returns `None` for labels the
    /// variant does not register.
    #[must_use]
    pub fn mode_from_label(self, label: &str) -> Option<Mode> {
        let label = label.trim();
        self.modes()
            .iter()
            .copied()
            .find(|&mode| self.label_of(mode).eq_ignore_ascii_case(label))
    }
}

impl MorphOp {
    /// Canonical label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Erode => "ERODE",
            Self::Dilate => "DILATE",
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
            Self::Gradient => "GRADIENT",
            Self::TopHat => "TOPHAT",
            Self::BlackHat => "BLACKHAT",
        }
    }
}

impl ThresholdOp {
    /// Canonical label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Otsu => "otsu",
            Self::AdaptiveMean => "adaptive mean",
            Self::AdaptiveGaussian => "adaptive gaussian",
        }
    }
}

impl Combinator {
    /// Canonical label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl Mode {
    /// Canonical label, e.g. `ERODE` or `adaptive gaussian AND otsu`.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Original => "original".to_owned(),
            Self::Morphology(op) => op.label().to_owned(),
            Self::Threshold(op) => op.label().to_owned(),
            Self::Composite(c) => format!(
                "{} {} {}",
                c.left.label(),
                c.combinator.label(),
                c.right.label()
            ),
        }
    }

    /// Parse a label registered by any variant.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Variant::ALL
            .iter()
            .find_map(|variant| variant.mode_from_label(label))
    }

    /// Whether the kernel-shape selector affects this mode.
    #[must_use]
    pub const fn uses_shape(self) -> bool {
        matches!(self, Self::Morphology(_))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.label()
    }
}

impl TryFrom<String> for Mode {
    type Error = String;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        Self::from_label(&label).ok_or_else(|| format!("unknown mode label: {label:?}"))
    }
}

impl KernelShape {
    /// All shapes, in the order the render sink lists them.
    pub const ALL: [Self; 3] = [Self::Rect, Self::Ellipse, Self::Cross];

    /// Radio label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rect => "RECT",
            Self::Ellipse => "ELLIPSE",
            Self::Cross => "CROSS",
        }
    }

    /// Parse a radio label, ignoring ASCII case.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|shape| shape.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for KernelShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parameters relevant to `mode`, in display order.
///
/// Total over every mode. The render sink shows exactly these controls.
#[must_use]
pub const fn visible_parameters(mode: Mode) -> &'static [ParamId] {
    crate::registry::entry(mode).params
}
