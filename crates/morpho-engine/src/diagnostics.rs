//! Per-recompute diagnostics: timing, active state, and output
//! statistics.
//!
//! The engine is sans-IO and does not read the system clock itself.
//! Callers supply a [`Clock`]; the binary uses `std::time::Instant`
//! and tests use a fixed-step fake.
//!
//! Durations are serialized as fractional seconds (`f64`), since
//! `std::time::Duration` does not implement serde traits.

use std::collections::BTreeMap;
use std::time::Duration;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineState, recompute};
use crate::params::ParamId;
use crate::registry::TransformRegistry;
use crate::types::Dimensions;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of monotonic timestamps.
pub trait Clock {
    type Instant;

    fn now(&self) -> Self::Instant;

    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// What one recompute did and how long it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeDiagnostics {
    /// Label of the active mode.
    pub mode: String,
    /// Kernel shape label, when the mode uses one.
    pub shape: Option<String>,
    /// The values handed to the transform.
    pub parameters: BTreeMap<ParamId, u32>,
    pub dimensions: Dimensions,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Output statistics.
    pub output: OutputStats,
}

/// Summary of an output image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputStats {
    /// Pixels at full intensity.
    pub white_pixels: u64,
    /// Pixels at zero intensity.
    pub black_pixels: u64,
    pub mean_intensity: f64,
}

impl OutputStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(image: &GrayImage) -> Self {
        let mut white = 0u64;
        let mut black = 0u64;
        let mut sum = 0u64;
        for p in image.pixels() {
            let v = p.0[0];
            sum += u64::from(v);
            match v {
                0 => black += 1,
                255 => white += 1,
                _ => {}
            }
        }
        let count = u64::from(image.width()) * u64::from(image.height());
        let mean_intensity = if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        };
        Self {
            white_pixels: white,
            black_pixels: black,
            mean_intensity,
        }
    }
}

impl RecomputeDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Recompute: {}", self.mode));
        if let Some(shape) = &self.shape {
            lines.push(format!("  shape       {shape}"));
        }
        for (id, value) in &self.parameters {
            lines.push(format!("  {:<11} {value}", id.label()));
        }
        lines.push(format!(
            "  image       {}x{} ({} pixels)",
            self.dimensions.width,
            self.dimensions.height,
            self.dimensions.pixel_count()
        ));
        lines.push(format!(
            "  duration    {:.3}ms",
            self.duration.as_secs_f64() * 1000.0
        ));
        lines.push(format!(
            "  output      {} white, {} black, mean {:.1}",
            self.output.white_pixels, self.output.black_pixels, self.output.mean_intensity
        ));
        lines.join("\n")
    }
}

/// [`recompute`], timed with `clock`.
pub fn recompute_with_diagnostics<R, C>(
    state: &EngineState,
    registry: &R,
    clock: &C,
) -> (GrayImage, RecomputeDiagnostics)
where
    R: TransformRegistry + ?Sized,
    C: Clock,
{
    let start = clock.now();
    let output = recompute(state, registry);
    let duration = clock.elapsed(&start);

    let diagnostics = RecomputeDiagnostics {
        mode: state.variant().label_of(state.mode()),
        shape: state.shape_visible().then(|| state.shape().label().to_owned()),
        parameters: state.transform_parameters().values,
        dimensions: Dimensions::of(&output),
        duration,
        output: OutputStats::of(&output),
    };
    tracing::debug!(
        mode = %diagnostics.mode,
        elapsed_ms = duration.as_secs_f64() * 1000.0,
        "recompute finished"
    );
    (output, diagnostics)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;

    use super::*;
    use crate::engine::{Event, Session};
    use crate::mode::{KernelShape, Mode, MorphOp, ThresholdOp, Variant};
    use crate::registry::StandardRegistry;

    /// Advances 4ms per reading.
    struct StepClock {
        ticks: Cell<u64>,
    }

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 4);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn clock() -> StepClock {
        StepClock {
            ticks: Cell::new(0),
        }
    }

    fn split_image() -> Arc<GrayImage> {
        Arc::new(GrayImage::from_fn(10, 4, |x, _| {
            image::Luma([if x < 5 { 0 } else { 255 }])
        }))
    }

    #[test]
    fn output_stats_count_extremes() {
        let stats = OutputStats::of(&split_image());
        assert_eq!(stats.white_pixels, 20);
        assert_eq!(stats.black_pixels, 20);
        assert!((stats.mean_intensity - 127.5).abs() < 1e-9);
    }

    #[test]
    fn output_stats_of_empty_image() {
        let stats = OutputStats::of(&GrayImage::new(0, 0));
        assert_eq!(stats.white_pixels, 0);
        assert!(stats.mean_intensity.abs() < f64::EPSILON);
    }

    #[test]
    fn diagnostics_match_plain_recompute() {
        let state = EngineState::new(Variant::Thresholding, split_image())
            .update(Event::SelectMode(Mode::Threshold(ThresholdOp::Binary)))
            .unwrap();
        let (out, diag) = recompute_with_diagnostics(&state, &StandardRegistry, &clock());
        assert_eq!(out, recompute(&state, &StandardRegistry));
        assert_eq!(diag.mode, "binary");
        assert_eq!(diag.shape, None);
        assert_eq!(diag.parameters.get(&ParamId::Threshold), Some(&127));
        assert_eq!(diag.duration, Duration::from_millis(4));
    }

    #[test]
    fn morphology_diagnostics_carry_the_shape() {
        let state = EngineState::new(Variant::Morphology, split_image())
            .update(Event::SelectMode(Mode::Morphology(MorphOp::Dilate)))
            .unwrap()
            .update(Event::SelectShape(KernelShape::Cross))
            .unwrap();
        let (_, diag) = recompute_with_diagnostics(&state, &StandardRegistry, &clock());
        assert_eq!(diag.mode, "DILATE");
        assert_eq!(diag.shape.as_deref(), Some("CROSS"));
        let report = diag.report();
        assert!(report.contains("DILATE"));
        assert!(report.contains("kernel-size"));
    }

    #[test]
    fn session_dispatch_reports_the_new_state() {
        let mut session = Session::new(
            EngineState::new(Variant::Morphology, split_image()),
            StandardRegistry,
        );
        let diag = session
            .dispatch_with_diagnostics(
                Event::SelectMode(Mode::Morphology(MorphOp::Open)),
                &clock(),
            )
            .unwrap();
        assert_eq!(diag.mode, "OPEN");
        assert_eq!(diag.output, OutputStats::of(session.output()));
        assert_eq!(session.output(), &recompute(session.state(), &StandardRegistry));
    }

    #[test]
    fn diagnostics_serialize_duration_as_seconds() {
        let state = EngineState::new(Variant::Morphology, split_image());
        let (_, diag) = recompute_with_diagnostics(&state, &StandardRegistry, &clock());
        let json = serde_json::to_value(&diag).unwrap();
        assert!((json["duration"].as_f64().unwrap() - 0.004).abs() < 1e-12);
        let back: RecomputeDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.duration, diag.duration);
    }
}
