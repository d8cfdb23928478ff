//! Morphological operations with repeated application.
//!
//! Wraps [`imageproc::morphology::grayscale_erode`] and
//! [`imageproc::morphology::grayscale_dilate`] and derives the compound
//! operations from them the way OpenCV's `morphologyEx` does: with an
//! iteration count `n`, opening is `n` erosions followed by `n`
//! dilations, and the gradient and hat transforms use those repeated
//! primitives.

use image::GrayImage;
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

use crate::kernel::StructuringElement;
use crate::mode::MorphOp;

/// Erode `iterations` times.
#[must_use = "returns the eroded image"]
pub fn erode(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    repeat(image, iterations, |img| grayscale_erode(img, mask))
}

/// Dilate `iterations` times.
#[must_use = "returns the dilated image"]
pub fn dilate(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    repeat(image, iterations, |img| grayscale_dilate(img, mask))
}

/// Apply `op` with the given structuring element.
///
/// An iteration count of zero is treated as one.
#[must_use = "returns the transformed image"]
pub fn apply(
    op: MorphOp,
    image: &GrayImage,
    element: &StructuringElement,
    iterations: u32,
) -> GrayImage {
    let mask = element.to_mask();
    let n = iterations.max(1);

    match op {
        MorphOp::Erode => erode(image, &mask, n),
        MorphOp::Dilate => dilate(image, &mask, n),
        MorphOp::Open => dilate(&erode(image, &mask, n), &mask, n),
        MorphOp::Close => erode(&dilate(image, &mask, n), &mask, n),
        MorphOp::Gradient => subtract(&dilate(image, &mask, n), &erode(image, &mask, n)),
        MorphOp::TopHat => {
            let opened = dilate(&erode(image, &mask, n), &mask, n);
            subtract(image, &opened)
        }
        MorphOp::BlackHat => {
            let closed = erode(&dilate(image, &mask, n), &mask, n);
            subtract(&closed, image)
        }
    }
}

fn repeat(image: &GrayImage, iterations: u32, step: impl Fn(&GrayImage) -> GrayImage) -> GrayImage {
    let mut current = step(image);
    for _ in 1..iterations.max(1) {
        current = step(&current);
    }
    current
}

/// Pixelwise saturating `a - b`.
fn subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        image::Luma([a.get_pixel(x, y).0[0].saturating_sub(b.get_pixel(x, y).0[0])])
    })
}
