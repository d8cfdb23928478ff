//! Pixelwise boolean combination of binarized images.

use image::GrayImage;

use crate::mode::Combinator;

/// Map every non-zero pixel to 255.
#[must_use = "returns the binarized image"]
pub fn binarize(image: &GrayImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        image::Luma([if image.get_pixel(x, y).0[0] > 0 { 255 } else { 0 }])
    })
}

/// Combine two images pixel by pixel after binarizing both.
///
/// Both inputs must have identical dimensions; the image source only
/// ever produces same-sized sub-results from one source image.
#[must_use = "returns the combined image"]
pub fn combine(left: &GrayImage, combinator: Combinator, right: &GrayImage) -> GrayImage {
    debug_assert_eq!(
        left.dimensions(),
        right.dimensions(),
        "combined images must share dimensions"
    );
    let (left, right) = (binarize(left), binarize(right));
    GrayImage::from_fn(left.width(), left.height(), |x, y| {
        let a = left.get_pixel(x, y).0[0] == 255;
        let b = right.get_pixel(x, y).0[0] == 255;
        let on = match combinator {
            Combinator::And => a && b,
            Combinator::Or => a || b,
        };
        image::Luma([if on { 255 } else { 0 }])
    })
}
