//! Engine state, the event reducer, and the recompute pipeline.
//!
//! [`EngineState`] is the single aggregate the event loop mutates. It
//! is only ever changed through [`EngineState::update`], which takes an
//! [`Event`] and returns the next state, so every state that exists has
//! already been validated: parameter values are in range and parity,
//! and the mode is registered for the variant.
//!
//! [`recompute`] is a pure projection of a state through a
//! [`TransformRegistry`]. [`Session`] pairs the two for render sinks
//! that recompute synchronously after each event.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Clock, RecomputeDiagnostics, recompute_with_diagnostics};
use crate::mode::{KernelShape, Mode, Variant};
use crate::params::{ParamId, ParameterSpec, ParameterStore};
use crate::registry::{Parameters, TransformRegistry, entry};
use crate::types::{Dimensions, EngineError};

/// A discrete state change forwarded by the render sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// A slider moved. The value is coerced, never rejected.
    SetParameter { id: ParamId, value: f64 },
    /// A mode radio button was picked.
    SelectMode(Mode),
    /// A kernel-shape radio button was picked.
    SelectShape(KernelShape),
}

/// Initial engine state, as supplied on the command line.
///
/// Every field is optional in JSON; missing fields take the explorer
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub variant: Variant,
    pub mode: Mode,
    pub shape: KernelShape,
    /// Raw parameter values; coerced like slider input.
    pub values: BTreeMap<ParamId, f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            mode: Mode::Original,
            shape: KernelShape::default(),
            values: BTreeMap::new(),
        }
    }
}

/// The explorer's complete, always-consistent state.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    variant: Variant,
    mode: Mode,
    shape: KernelShape,
    parameters: ParameterStore,
    image: Arc<GrayImage>,
}

impl EngineState {
    /// Default state for `variant` over a loaded image.
    ///
    /// Geometry-dependent parameter bounds are derived here, once.
    #[must_use]
    pub fn new(variant: Variant, image: Arc<GrayImage>) -> Self {
        let parameters = ParameterStore::new(variant, Dimensions::of(&image));
        Self {
            variant,
            mode: Mode::Original,
            shape: KernelShape::default(),
            parameters,
            image,
        }
    }

    /// State described by `config` over a loaded image.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnregisteredMode`] if the configured mode
    /// is not offered by the configured variant, or
    /// [`EngineError::InvalidConfig`] for a value the variant does not
    /// tune.
    pub fn from_config(config: &EngineConfig, image: Arc<GrayImage>) -> Result<Self, EngineError> {
        let mut state = Self::new(config.variant, image)
            .update(Event::SelectMode(config.mode))?
            .update(Event::SelectShape(config.shape))?;
        for (&id, &value) in &config.values {
            if !config.variant.parameters().contains(&id) {
                return Err(EngineError::InvalidConfig(format!(
                    "{id} is not a parameter of {}",
                    config.variant.title()
                )));
            }
            state = state.update(Event::SetParameter { id, value })?;
        }
        Ok(state)
    }

    /// Apply one event, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnregisteredMode`] when asked to select a
    /// mode the variant does not register, and
    /// [`EngineError::UnknownParameter`] for a parameter it does not
    /// tune. Both indicate a render sink offering controls it should
    /// not; the binary treats them as fatal.
    pub fn update(&self, event: Event) -> Result<Self, EngineError> {
        let mut next = self.clone();
        match event {
            Event::SetParameter { id, value } => {
                let stored = next.parameters.set(id, value)?;
                tracing::debug!(parameter = %id, value = stored, "parameter set");
            }
            Event::SelectMode(mode) => {
                if !self.variant.registers(mode) {
                    return Err(EngineError::UnregisteredMode(mode));
                }
                next.mode = mode;
                tracing::debug!(%mode, "mode selected");
            }
            Event::SelectShape(shape) => {
                next.shape = shape;
                tracing::debug!(%shape, "shape selected");
            }
        }
        Ok(next)
    }

    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn shape(&self) -> KernelShape {
        self.shape
    }

    /// The source image.
    #[must_use]
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    #[must_use]
    pub const fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    /// Specs and current values of the controls relevant to the active
    /// mode, in display order.
    #[must_use]
    pub fn visible_controls(&self) -> Vec<(ParameterSpec, u32)> {
        entry(self.mode)
            .params
            .iter()
            .filter_map(|&id| Some((*self.parameters.spec(id)?, self.parameters.get(id)?)))
            .collect()
    }

    /// Whether the kernel-shape selector is relevant right now.
    #[must_use]
    pub const fn shape_visible(&self) -> bool {
        self.variant.has_shapes() && self.mode.uses_shape()
    }

    /// The values the active mode's transform consumes.
    #[must_use]
    pub fn transform_parameters(&self) -> Parameters {
        let values = entry(self.mode)
            .params
            .iter()
            .filter_map(|&id| Some((id, self.parameters.get(id)?)))
            .collect();
        Parameters {
            shape: self.shape,
            values,
        }
    }
}

/// Produce the output image for `state`.
///
/// Pure and idempotent: calling it twice with the same state yields
/// identical images.
#[must_use = "returns the recomputed image"]
pub fn recompute<R: TransformRegistry + ?Sized>(state: &EngineState, registry: &R) -> GrayImage {
    let params = state.transform_parameters();
    tracing::trace!(mode = %state.mode, ?params, "recompute");
    registry.apply(state.mode, &state.image, &params)
}

/// A state, its registry, and the output for that state.
///
/// Every accepted event recomputes before returning, so `output()`
/// always reflects `state()`.
pub struct Session<R> {
    registry: R,
    state: EngineState,
    output: GrayImage,
}

impl<R: TransformRegistry> Session<R> {
    /// Start a session and compute the initial output.
    pub fn new(state: EngineState, registry: R) -> Self {
        let output = recompute(&state, &registry);
        Self {
            registry,
            state,
            output,
        }
    }

    /// Apply `event` and recompute.
    ///
    /// On error the state and output are left untouched.
    ///
    /// # Errors
    ///
    /// Propagates [`EngineState::update`] errors.
    pub fn dispatch(&mut self, event: Event) -> Result<&GrayImage, EngineError> {
        self.state = self.state.update(event)?;
        self.output = recompute(&self.state, &self.registry);
        Ok(&self.output)
    }

    /// [`dispatch`](Self::dispatch), timing the recompute with `clock`.
    ///
    /// # Errors
    ///
    /// Propagates [`EngineState::update`] errors.
    pub fn dispatch_with_diagnostics<C: Clock>(
        &mut self,
        event: Event,
        clock: &C,
    ) -> Result<RecomputeDiagnostics, EngineError> {
        self.state = self.state.update(event)?;
        let (output, diagnostics) = recompute_with_diagnostics(&self.state, &self.registry, clock);
        self.output = output;
        Ok(diagnostics)
    }

    #[must_use]
    pub const fn state(&self) -> &EngineState {
        &self.state
    }

    #[must_use]
    pub const fn output(&self) -> &GrayImage {
        &self.output
    }

    #[must_use]
    pub const fn registry(&self) -> &R {
        &self.registry
    }
}
