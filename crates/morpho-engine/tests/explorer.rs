//! Integration test: drive both explorer variants from encoded image
//! bytes through the session, as the terminal sink does.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use morpho_engine::{
    Combinator, Composite, EngineState, Event, GrayImage, KernelShape, Mode, MorphOp, ParamId,
    RecomputeWorker, Session, StandardRegistry, ThresholdOp, TransformRegistry, Variant,
    recompute, source, visible_parameters,
};

/// Dark background, a bright rectangle, and a faint gradient so the
/// thresholding modes disagree with each other.
fn scene_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        let inside = x > width / 4 && x < width * 3 / 4 && y > height / 3 && y < height * 2 / 3;
        #[allow(clippy::cast_possible_truncation)]
        let v = if inside { 210 } else { (x * 60 / width) as u8 + 20 };
        image::Rgb([v, v, v])
    });
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgb8,
    )
    .unwrap();
    buf
}

fn load(width: u32, height: u32) -> Arc<GrayImage> {
    Arc::new(source::load(&scene_png(width, height)).expect("synthetic png decodes"))
}

#[test]
fn morphology_session_walkthrough() {
    let image = load(64, 48);
    let mut session = Session::new(
        EngineState::new(Variant::Morphology, Arc::clone(&image)),
        StandardRegistry,
    );
    assert_eq!(session.output(), &*image);

    session
        .dispatch(Event::SelectMode(Mode::Morphology(MorphOp::Erode)))
        .unwrap();
    let rect = session.output().clone();

    session.dispatch(Event::SelectShape(KernelShape::Cross)).unwrap();
    let cross = session.output().clone();
    assert_ne!(rect, cross, "shape ought to change the structuring element");
    assert_eq!(session.state().parameters().get(ParamId::KernelSize), Some(5));
    assert_eq!(session.state().parameters().get(ParamId::Iterations), Some(1));

    session
        .dispatch(Event::SetParameter {
            id: ParamId::KernelSize,
            value: 10.0,
        })
        .unwrap();
    assert_eq!(session.state().parameters().get(ParamId::KernelSize), Some(11));
    assert_eq!(session.output(), &recompute(session.state(), &StandardRegistry));
}

#[test]
fn thresholding_session_walkthrough() {
    let image = load(80, 60);
    let mut session = Session::new(
        EngineState::new(Variant::Thresholding, image),
        StandardRegistry,
    );

    for &mode in Variant::Thresholding.modes() {
        session.dispatch(Event::SelectMode(mode)).unwrap();
        let out = session.output();
        assert_eq!(out.dimensions(), (80, 60));
        if mode != Mode::Original {
            assert!(
                out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255),
                "{mode} output is binary"
            );
        }
    }

    // Block-size bound derived from the 80x60 image: 80 / 4 = 20 -> 19.
    session
        .dispatch(Event::SetParameter {
            id: ParamId::BlockSize,
            value: 500.0,
        })
        .unwrap();
    assert_eq!(session.state().parameters().get(ParamId::BlockSize), Some(19));
}

#[test]
fn composite_and_is_subset_of_or() {
    let image = load(64, 64);
    let state = EngineState::new(Variant::Thresholding, image);
    let composite = |combinator| {
        Mode::Composite(Composite {
            left: ThresholdOp::AdaptiveGaussian,
            combinator,
            right: ThresholdOp::Otsu,
        })
    };
    let and = recompute(
        &state.update(Event::SelectMode(composite(Combinator::And))).unwrap(),
        &StandardRegistry,
    );
    let or = recompute(
        &state.update(Event::SelectMode(composite(Combinator::Or))).unwrap(),
        &StandardRegistry,
    );
    for (a, o) in and.pixels().zip(or.pixels()) {
        assert!(a.0[0] <= o.0[0]);
    }
}

#[test]
fn odd_only_parameters_stay_odd_for_any_input() {
    let image = load(200, 120);
    let mut state = EngineState::new(Variant::Thresholding, image);
    for raw in [-10.0, 0.0, 2.0, 3.5, 4.0, 12.0, 49.9, 50.0, 1e9, f64::NAN] {
        state = state
            .update(Event::SetParameter {
                id: ParamId::BlockSize,
                value: raw,
            })
            .unwrap();
        let spec = *state.parameters().spec(ParamId::BlockSize).unwrap();
        let value = state.parameters().get(ParamId::BlockSize).unwrap();
        assert_eq!(value % 2, 1, "raw {raw}");
        assert!((spec.min..=spec.max).contains(&value), "raw {raw}");
    }
}

#[test]
fn visible_parameters_are_registered_for_the_variant() {
    for variant in Variant::ALL {
        for &mode in variant.modes() {
            for id in visible_parameters(mode) {
                assert!(variant.parameters().contains(id), "{mode} shows {id}");
            }
        }
    }
}

#[test]
fn original_is_identity_through_the_registry() {
    let image = load(30, 30);
    let state = EngineState::new(Variant::Morphology, Arc::clone(&image));
    let params = state.transform_parameters();
    assert_eq!(StandardRegistry.apply(Mode::Original, &image, &params), *image);
}

#[test]
fn worker_agrees_with_session() {
    let image = load(48, 48);
    let worker = RecomputeWorker::spawn(StandardRegistry).unwrap();
    let mut session = Session::new(
        EngineState::new(Variant::Morphology, image),
        StandardRegistry,
    );

    let events = [
        Event::SelectMode(Mode::Morphology(MorphOp::Gradient)),
        Event::SelectShape(KernelShape::Ellipse),
        Event::SetParameter {
            id: ParamId::Iterations,
            value: 2.0,
        },
    ];
    for event in events {
        session.dispatch(event).unwrap();
        worker.submit(session.state().clone());
    }
    let out = worker.wait_latest().unwrap();
    assert_eq!(&out.image, session.output());
}
