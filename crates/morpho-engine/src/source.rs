//! Image source: decode to grayscale and bound the working size.
//!
//! Raw bytes in, an immutable `GrayImage` out. Large images are reduced
//! once here so every recompute runs on a bounded pixel grid.

use image::GrayImage;
use image::imageops::{self, FilterType};

use crate::types::{Dimensions, EngineError};

/// Images with more pixels than this are downscaled at load time.
pub const MAX_PIXELS: u64 = 1_200_000;

/// Height of a downscaled image. Width follows the aspect ratio.
pub const TARGET_HEIGHT: u32 = 1024;

/// Decode raw image bytes and convert to grayscale.
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] if `bytes` is empty, and
/// [`EngineError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt.
#[must_use = "returns the decoded grayscale image"]
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyInput);
    }
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_luma8())
}

/// Size an image of `dimensions` is reduced to, or `None` if it is
/// small enough already.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn working_size(dimensions: Dimensions) -> Option<Dimensions> {
    if dimensions.pixel_count() <= MAX_PIXELS || dimensions.height == 0 {
        return None;
    }
    let aspect = f64::from(dimensions.width) / f64::from(dimensions.height);
    let width = (f64::from(TARGET_HEIGHT) * aspect) as u32;
    Some(Dimensions {
        width: width.max(1),
        height: TARGET_HEIGHT,
    })
}

/// Downscale `image` with Catmull-Rom interpolation if it exceeds
/// [`MAX_PIXELS`].
///
/// Returns the (possibly unchanged) image and whether it was resized.
#[must_use]
pub fn downscale_if_large(image: GrayImage) -> (GrayImage, bool) {
    let original = Dimensions::of(&image);
    match working_size(original) {
        None => (image, false),
        Some(target) => {
            tracing::info!(
                from_width = original.width,
                from_height = original.height,
                to_width = target.width,
                to_height = target.height,
                "downscaling large image"
            );
            let resized = imageops::resize(
                &image,
                target.width,
                target.height,
                FilterType::CatmullRom,
            );
            (resized, true)
        }
    }
}

/// Decode and downscale: the full startup path from file bytes to the
/// engine's source image.
///
/// # Errors
///
/// Propagates [`decode_grayscale`] errors.
pub fn load(bytes: &[u8]) -> Result<GrayImage, EngineError> {
    let gray = decode_grayscale(bytes)?;
    let (image, _) = downscale_if_large(gray);
    Ok(image)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn png_bytes(img: &image::RgbImage) -> Vec<u8> {
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

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode_grayscale(&[]), Err(EngineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_decode_error() {
        let result = decode_grayscale(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(EngineError::ImageDecode(_))));
    }

    #[test]
    fn color_png_decodes_to_gray_with_same_dimensions() {
        let img = image::RgbImage::from_pixel(17, 9, image::Rgb([255, 255, 255]));
        let gray = decode_grayscale(&png_bytes(&img)).unwrap();
        assert_eq!(gray.dimensions(), (17, 9));
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn small_images_keep_their_size() {
        let d = Dimensions {
            width: 1200,
            height: 1000,
        };
        assert_eq!(working_size(d), None);
    }

    #[test]
    fn large_images_shrink_to_target_height() {
        let d = Dimensions {
            width: 2000,
            height: 1000,
        };
        assert_eq!(
            working_size(d),
            Some(Dimensions {
                width: 2048,
                height: 1024
            })
        );
    }

    #[test]
    fn downscale_reports_whether_it_resized() {
        let small = GrayImage::new(40, 30);
        let (out, resized) = downscale_if_large(small);
        assert!(!resized);
        assert_eq!(out.dimensions(), (40, 30));

        let large = GrayImage::from_pixel(1600, 800, image::Luma([90]));
        let (out, resized) = downscale_if_large(large);
        assert!(resized);
        assert_eq!(out.dimensions(), (2048, 1024));
    }

    #[test]
    fn load_decodes_and_bounds() {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        let gray = load(&png_bytes(&img)).unwrap();
        assert_eq!(gray.dimensions(), (8, 8));
    }
}
