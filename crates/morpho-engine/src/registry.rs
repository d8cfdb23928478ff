//! Transform registry: maps each [`Mode`] to a pure image computation.
//!
//! This module defines the [`TransformRegistry`] trait, the seam between
//! the engine and the pixel-level primitives, and [`StandardRegistry`],
//! the implementation backed by `imageproc`.
//!
//! # Strategy pattern
//!
//! The engine only ever calls [`TransformRegistry::apply`]. Tests swap
//! in recording or constant registries to check dispatch and
//! recomputation without touching real pixels.

use std::collections::BTreeMap;

use image::GrayImage;

use crate::combine;
use crate::kernel::StructuringElement;
use crate::mode::{Composite, KernelShape, Mode, ThresholdOp};
use crate::morphology;
use crate::params::ParamId;
use crate::threshold::{self, AdaptiveMethod};

/// A registered mode together with the parameters its computation
/// consumes, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformEntry {
    pub mode: Mode,
    pub params: &'static [ParamId],
}

/// Registry entry for `mode`.
///
/// Total: every mode has exactly one entry.
#[must_use]
pub const fn entry(mode: Mode) -> TransformEntry {
    let params: &'static [ParamId] = match mode {
        Mode::Original => &[],
        Mode::Morphology(_) => &[ParamId::KernelSize, ParamId::Iterations],
        Mode::Threshold(op) => threshold_params(op),
        Mode::Composite(c) => composite_params(c),
    };
    TransformEntry { mode, params }
}

const fn threshold_params(op: ThresholdOp) -> &'static [ParamId] {
    match op {
        ThresholdOp::Binary => &[ParamId::Threshold],
        ThresholdOp::Otsu => &[],
        ThresholdOp::AdaptiveMean | ThresholdOp::AdaptiveGaussian => {
            &[ParamId::BlockSize, ParamId::Constant]
        }
    }
}

const fn uses_threshold(op: ThresholdOp) -> bool {
    matches!(op, ThresholdOp::Binary)
}

const fn uses_block(op: ThresholdOp) -> bool {
    matches!(op, ThresholdOp::AdaptiveMean | ThresholdOp::AdaptiveGaussian)
}

/// Union of both sides' parameters; the sub-transforms share one set.
const fn composite_params(c: Composite) -> &'static [ParamId] {
    let threshold = uses_threshold(c.left) || uses_threshold(c.right);
    let block = uses_block(c.left) || uses_block(c.right);
    match (threshold, block) {
        (false, false) => &[],
        (true, false) => &[ParamId::Threshold],
        (false, true) => &[ParamId::BlockSize, ParamId::Constant],
        (true, true) => &[ParamId::Threshold, ParamId::BlockSize, ParamId::Constant],
    }
}

/// The values a transform receives.
///
/// Built by the recompute pipeline from the mode's visible parameters;
/// a value the mode does not consume is simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parameters {
    pub shape: KernelShape,
    pub values: BTreeMap<ParamId, u32>,
}

impl Parameters {
    /// Value of `id`, or its default when absent.
    #[must_use]
    pub fn get(&self, id: ParamId) -> u32 {
        self.values
            .get(&id)
            .copied()
            .unwrap_or_else(|| id.default_value())
    }
}

/// Maps a mode to a pure, deterministic image computation.
pub trait TransformRegistry {
    /// Compute the output image for `mode`.
    ///
    /// Must not depend on anything but its arguments.
    fn apply(&self, mode: Mode, image: &GrayImage, params: &Parameters) -> GrayImage;
}

/// The registry backed by the real morphology and thresholding
/// primitives.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRegistry;

impl TransformRegistry for StandardRegistry {
    fn apply(&self, mode: Mode, image: &GrayImage, params: &Parameters) -> GrayImage {
        match mode {
            Mode::Original => image.clone(),
            Mode::Morphology(op) => {
                let element =
                    StructuringElement::new(params.shape, params.get(ParamId::KernelSize));
                morphology::apply(op, image, &element, params.get(ParamId::Iterations))
            }
            Mode::Threshold(op) => apply_threshold(op, image, params),
            Mode::Composite(c) => {
                let left = self.apply(Mode::Threshold(c.left), image, params);
                let right = self.apply(Mode::Threshold(c.right), image, params);
                combine::combine(&left, c.combinator, &right)
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn apply_threshold(op: ThresholdOp, image: &GrayImage, params: &Parameters) -> GrayImage {
    let block = params.get(ParamId::BlockSize);
    let constant = params.get(ParamId::Constant).min(i32::MAX as u32) as i32;
    match op {
        ThresholdOp::Binary => {
            let cutoff = params.get(ParamId::Threshold).min(u32::from(u8::MAX)) as u8;
            threshold::binary(image, cutoff)
        }
        ThresholdOp::Otsu => threshold::otsu(image),
        ThresholdOp::AdaptiveMean => {
            threshold::adaptive(image, AdaptiveMethod::Mean, block, constant)
        }
        ThresholdOp::AdaptiveGaussian => {
            threshold::adaptive(image, AdaptiveMethod::Gaussian, block, constant)
        }
    }
}
