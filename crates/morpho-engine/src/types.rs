//! Shared types for the morpho engine.

use serde::{Deserialize, Serialize};

use crate::mode::Mode;
use crate::params::ParamId;

/// Re-export `GrayImage` so downstream crates can pass images around
/// without depending on `image` directly.
pub use image::GrayImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an image.
    #[must_use]
    pub fn of(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// The longer of the two axes.
    #[must_use]
    pub const fn long_axis(self) -> u32 {
        if self.width >= self.height {
            self.width
        } else {
            self.height
        }
    }
}

/// Errors produced by the engine.
///
/// Out-of-range parameter values are not errors: the parameter store
/// coerces them. Only unknown identifiers and startup failures surface
/// here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A parameter id that the active variant does not define.
    #[error("unknown parameter: {0}")]
    UnknownParameter(ParamId),

    /// A mode that is not registered for the active variant.
    ///
    /// Render sinks only offer registered labels, so reaching this is
    /// a defect in the caller.
    #[error("mode {0} is not registered for this variant")]
    UnregisteredMode(Mode),

    /// The initial configuration names something the variant lacks.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::MorphOp;

    #[test]
    fn dimensions_pixel_count_does_not_overflow() {
        let d = Dimensions {
            width: 100_000,
            height: 100_000,
        };
        assert_eq!(d.pixel_count(), 10_000_000_000);
    }

    #[test]
    fn dimensions_long_axis() {
        let landscape = Dimensions {
            width: 800,
            height: 600,
        };
        let portrait = Dimensions {
            width: 600,
            height: 801,
        };
        assert_eq!(landscape.long_axis(), 800);
        assert_eq!(portrait.long_axis(), 801);
    }

    #[test]
    fn dimensions_of_image() {
        let img = GrayImage::new(17, 31);
        assert_eq!(
            Dimensions::of(&img),
            Dimensions {
                width: 17,
                height: 31
            }
        );
    }

    #[test]
    fn error_empty_input_display() {
        let err = EngineError::EmptyInput;
        assert_eq!(err.to_string(), "input image data is empty");
    }

    #[test]
    fn error_unknown_parameter_display() {
        let err = EngineError::UnknownParameter(ParamId::BlockSize);
        assert_eq!(err.to_string(), "unknown parameter: block-size");
    }

    #[test]
    fn error_unregistered_mode_display() {
        let err = EngineError::UnregisteredMode(Mode::Morphology(MorphOp::Erode));
        assert_eq!(
            err.to_string(),
            "mode ERODE is not registered for this variant"
        );
    }
}
