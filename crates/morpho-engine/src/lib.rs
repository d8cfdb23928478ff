//! morpho-engine: mode/parameter-driven recompute engine (sans-IO).
//!
//! Holds the explorer's parameter and mode state, decides which
//! parameters matter for the active mode, dispatches to the matching
//! morphology or thresholding transform, and guarantees the output
//! reflects the state after every change.
//!
//! This crate has **no I/O dependencies**: it decodes from in-memory
//! byte slices and returns images. File access, the terminal, and
//! logging setup live in the `morpho` binary.

pub mod combine;
pub mod diagnostics;
pub mod engine;
pub mod kernel;
pub mod mode;
pub mod morphology;
pub mod params;
pub mod registry;
pub mod source;
pub mod threshold;
pub mod types;
pub mod worker;

pub use diagnostics::{Clock, RecomputeDiagnostics, recompute_with_diagnostics};
pub use engine::{EngineConfig, EngineState, Event, Session, recompute};
pub use mode::{
    Combinator, Composite, KernelShape, Mode, MorphOp, ThresholdOp, Variant, visible_parameters,
};
pub use params::{ParamId, Parity, ParameterSpec, ParameterStore};
pub use registry::{Parameters, StandardRegistry, TransformEntry, TransformRegistry};
pub use types::{Dimensions, EngineError, GrayImage};
pub use worker::{RecomputeWorker, WorkerOutput};
