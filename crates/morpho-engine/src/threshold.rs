//! Global and adaptive thresholding.
//!
//! Every function returns a binary image: 255 where the pixel is above
//! its cutoff, 0 elsewhere. Cutoffs follow OpenCV's `THRESH_BINARY`
//! convention: a pixel equal to the cutoff maps to 0.
//!
//! The adaptive variants compute a per-pixel cutoff from a
//! `block_size × block_size` neighborhood with replicated borders,
//! minus a constant offset. The gaussian weights are OpenCV's: its
//! fixed tables up to 7 taps, a sampled gaussian beyond.

use image::GrayImage;

/// How the adaptive local cutoff is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveMethod {
    /// Unweighted mean of the neighborhood.
    Mean,
    /// Gaussian-weighted mean of the neighborhood.
    Gaussian,
}

/// Map pixels strictly greater than `threshold` to 255, the rest to 0.
#[must_use = "returns the thresholded image"]
pub fn binary(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        image::Luma([if image.get_pixel(x, y).0[0] > threshold { 255 } else { 0 }])
    })
}

/// Binary threshold at the level chosen by Otsu's method.
#[must_use = "returns the thresholded image"]
pub fn otsu(image: &GrayImage) -> GrayImage {
    binary(image, otsu_level(image))
}

/// The global level Otsu's method picks for `image`.
///
/// Same search as `imageproc::contrast::otsu_level`, with weights and
/// sums held in `u64`/`f64` so very wide images cannot overflow.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn otsu_level(image: &GrayImage) -> u8 {
    let counts = &imageproc::stats::histogram(image).channels[0];
    let total_weight = u64::from(image.width()) * u64::from(image.height());
    let total_sum: f64 = counts
        .iter()
        .zip(0u64..)
        .map(|(&count, level)| (level * u64::from(count)) as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0f64;
    let mut largest_variance = 0f64;
    let mut best = 0u8;
    for (&count, level) in counts.iter().zip(0u8..=u8::MAX) {
        background_weight += u64::from(count);
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total_weight - background_weight;
        if foreground_weight == 0 {
            break;
        }
        background_sum += (u64::from(level) * u64::from(count)) as f64;
        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (total_sum - background_sum) / foreground_weight as f64;
        let variance = background_weight as f64
            * foreground_weight as f64
            * (background_mean - foreground_mean).powi(2);
        if variance > largest_variance {
            largest_variance = variance;
            best = level;
        }
    }
    best
}

/// Adaptive threshold: a pixel is foreground when it exceeds its local
/// mean minus `constant`.
///
/// `block_size` is expected to be odd and at least 3; other values are
/// bumped up to the next odd size.
#[must_use = "returns the thresholded image"]
pub fn adaptive(
    image: &GrayImage,
    method: AdaptiveMethod,
    block_size: u32,
    constant: i32,
) -> GrayImage {
    let block = block_size.max(3) | 1;
    let local = match method {
        AdaptiveMethod::Mean => box_mean(image, block),
        AdaptiveMethod::Gaussian => gaussian_mean(image, block),
    };
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = i32::from(image.get_pixel(x, y).0[0]);
        let cutoff = i32::from(local.get_pixel(x, y).0[0]) - constant;
        image::Luma([if value > cutoff { 255 } else { 0 }])
    })
}

/// Gaussian sigma OpenCV derives from a kernel size when none is given.
#[must_use]
pub fn gaussian_sigma(block_size: u32) -> f64 {
    0.3f64.mul_add((f64::from(block_size) - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Index into a run of `len` samples, replicating the edge samples for
/// out-of-range positions.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn replicate(index: i64, len: u32) -> u32 {
    index.clamp(0, i64::from(len) - 1) as u32
}

/// Local box mean with replicated borders.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn box_mean(image: &GrayImage, block: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let radius = i64::from(block / 2);

    // Horizontal window sums.
    let mut rows = vec![0u32; (w * h) as usize];
    let mut prefix = vec![0u32; (w + block) as usize];
    for y in 0..h {
        prefix[0] = 0;
        for i in 0..(w + block - 1) {
            let x = replicate(i64::from(i) - radius, w);
            prefix[(i + 1) as usize] = prefix[i as usize] + u32::from(image.get_pixel(x, y).0[0]);
        }
        for x in 0..w {
            rows[(y * w + x) as usize] = prefix[(x + block) as usize] - prefix[x as usize];
        }
    }

    // Vertical window sums over the horizontal sums.
    let area = f64::from(block) * f64::from(block);
    let mut out = GrayImage::new(w, h);
    let mut column = vec![0u64; (h + block) as usize];
    for x in 0..w {
        column[0] = 0;
        for i in 0..(h + block - 1) {
            let y = replicate(i64::from(i) - radius, h);
            column[(i + 1) as usize] = column[i as usize] + u64::from(rows[(y * w + x) as usize]);
        }
        for y in 0..h {
            #[allow(clippy::cast_precision_loss)]
            let sum = (column[(y + block) as usize] - column[y as usize]) as f64;
            let mean = (sum / area).round().clamp(0.0, 255.0) as u8;
            out.put_pixel(x, y, image::Luma([mean]));
        }
    }
    out
}

/// OpenCV's fixed kernels for odd sizes up to 7 when no sigma is given.
const SMALL_GAUSSIAN_KERNELS: [&[f64]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25],
];

/// Normalized 1-D gaussian kernel of `size` taps.
///
/// Sizes up to 7 use [`SMALL_GAUSSIAN_KERNELS`]; larger ones sample a
/// gaussian with [`gaussian_sigma`].
fn gaussian_kernel(size: u32) -> Vec<f64> {
    if size % 2 == 1
        && let Some(table) = SMALL_GAUSSIAN_KERNELS.get((size / 2) as usize)
    {
        return table.to_vec();
    }
    let sigma = gaussian_sigma(size);
    let center = f64::from(size / 2);
    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = f64::from(i) - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Separable gaussian-weighted local mean with replicated borders.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn gaussian_mean(image: &GrayImage, block: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let kernel = gaussian_kernel(block);
    let radius = i64::from(block / 2);

    let mut horizontal = vec![0.0f64; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let acc: f64 = kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(k, dx)| {
                    let sx = replicate(i64::from(x) + dx, w);
                    k * f64::from(image.get_pixel(sx, y).0[0])
                })
                .sum();
            horizontal[(y * w + x) as usize] = acc;
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        let acc: f64 = kernel
            .iter()
            .zip(-radius..=radius)
            .map(|(k, dy)| {
                let sy = replicate(i64::from(y) + dy, h);
                k * horizontal[(sy * w + x) as usize]
            })
            .sum();
        image::Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_values(width: u32, height: u32, values: &[u8]) -> GrayImage {
        GrayImage::from_raw(width, height, values.to_vec()).unwrap_or_default()
    }

    #[test]
    fn binary_maps_equal_to_zero_and_greater_to_white() {
        let img = from_values(2, 2, &[0, 100, 127, 255]);
        let out = binary(&img, 127);
        assert_eq!(out.as_raw(), &[0, 0, 0, 255]);
    }

    #[test]
    fn binary_extremes() {
        let img = from_values(3, 1, &[0, 128, 255]);
        assert_eq!(binary(&img, 0).as_raw(), &[0, 255, 255]);
        assert_eq!(binary(&img, 255).as_raw(), &[0, 0, 0]);
    }

    #[test]
    fn otsu_separates_two_populations() {
        let img = GrayImage::from_fn(20, 20, |x, _| image::Luma([if x < 10 { 40 } else { 200 }]));
        let level = otsu_level(&img);
        assert!((40..200).contains(&level), "level {level}");
        let out = otsu(&img);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(19, 0).0[0], 255);
    }

    #[test]
    fn otsu_level_agrees_with_imageproc_on_small_images() {
        let images = [
            GrayImage::from_fn(20, 20, |x, _| image::Luma([if x < 10 { 40 } else { 200 }])),
            GrayImage::from_fn(31, 17, |x, y| image::Luma([((x * 37 + y * 11) % 256) as u8])),
            GrayImage::from_fn(16, 16, |x, y| image::Luma([((x * y) % 97) as u8 + 80])),
        ];
        for img in &images {
            assert_eq!(otsu_level(img), imageproc::contrast::otsu_level(img));
        }
    }

    #[test]
    fn otsu_handles_very_wide_images() {
        // Height-1024 panorama with more than 2^32 / 255 pixels in one bin.
        let img = GrayImage::from_pixel(17_408, 1024, image::Luma([255]));
        assert_eq!(otsu_level(&img), 0);
        assert!(otsu(&img).pixels().all(|p| p.0[0] == 255));

        let split = GrayImage::from_fn(17_408, 1024, |x, _| {
            image::Luma([if x < 8_704 { 30 } else { 250 }])
        });
        let level = otsu_level(&split);
        assert!((30..250).contains(&level), "level {level}");
    }

    #[test]
    fn output_is_binary() {
        let img = GrayImage::from_fn(16, 16, |x, y| image::Luma([((x * 16 + y * 3) % 256) as u8]));
        for out in [
            binary(&img, 90),
            otsu(&img),
            adaptive(&img, AdaptiveMethod::Mean, 5, 2),
            adaptive(&img, AdaptiveMethod::Gaussian, 5, 2),
        ] {
            assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        }
    }

    #[test]
    fn adaptive_uniform_image_is_white_for_positive_constant() {
        // Every pixel equals its local mean, so value > mean - C holds
        // for any C > 0 and fails for C == 0.
        let img = GrayImage::from_pixel(9, 9, image::Luma([120]));
        for method in [AdaptiveMethod::Mean, AdaptiveMethod::Gaussian] {
            let white = adaptive(&img, method, 3, 2);
            assert!(white.pixels().all(|p| p.0[0] == 255), "{method:?}");
            let black = adaptive(&img, method, 3, 0);
            assert!(black.pixels().all(|p| p.0[0] == 0), "{method:?}");
        }
    }

    #[test]
    fn adaptive_picks_out_a_bright_dot() {
        let mut img = GrayImage::from_pixel(11, 11, image::Luma([50]));
        img.put_pixel(5, 5, image::Luma([200]));
        for method in [AdaptiveMethod::Mean, AdaptiveMethod::Gaussian] {
            let out = adaptive(&img, method, 5, 0);
            assert_eq!(out.get_pixel(5, 5).0[0], 255, "{method:?}");
            assert_eq!(out.get_pixel(0, 0).0[0], 0, "{method:?}");
        }
    }

    #[test]
    fn box_mean_of_uniform_image_is_uniform() {
        let img = GrayImage::from_pixel(7, 4, image::Luma([33]));
        let mean = box_mean(&img, 5);
        assert!(mean.pixels().all(|p| p.0[0] == 33));
    }

    #[test]
    fn box_mean_replicates_borders() {
        // 3x1 row [0, 0, 90] with a 3-wide window:
        // x=2 window is [0, 90, 90] (right edge replicated) -> mean 60.
        let img = from_values(3, 1, &[0, 0, 90]);
        let mean = box_mean(&img, 3);
        assert_eq!(mean.get_pixel(2, 0).0[0], 60);
        assert_eq!(mean.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn block_larger_than_image_is_tolerated() {
        let img = GrayImage::from_fn(4, 3, |x, y| image::Luma([(x * 40 + y * 10) as u8]));
        let out = adaptive(&img, AdaptiveMethod::Gaussian, 51, 5);
        assert_eq!(out.dimensions(), (4, 3));
    }

    #[test]
    fn gaussian_sigma_matches_opencv_formula() {
        assert!((gaussian_sigma(3) - 0.8).abs() < 1e-12);
        assert!((gaussian_sigma(11) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn gaussian_kernel_is_normalized_and_symmetric() {
        for size in [3, 5, 7, 9, 11, 25] {
            let kernel = gaussian_kernel(size);
            assert_eq!(kernel.len(), size as usize);
            let total: f64 = kernel.iter().sum();
            assert!((total - 1.0).abs() < 1e-12, "size {size}");
            for i in 0..kernel.len() {
                assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn small_gaussian_kernels_use_fixed_tables() {
        assert_eq!(gaussian_kernel(3), [0.25, 0.5, 0.25]);
        assert_eq!(gaussian_kernel(5), [0.0625, 0.25, 0.375, 0.25, 0.0625]);
        assert!((gaussian_kernel(7)[3] - 0.281_25).abs() < 1e-12);
    }

    #[test]
    fn block_three_gaussian_mean_uses_quarter_weights() {
        // Row [0, 100, 0] padded by replication: center = 0.25*0 + 0.5*100 + 0.25*0.
        let img = from_values(3, 3, &[0, 100, 0, 0, 100, 0, 0, 100, 0]);
        let mean = gaussian_mean(&img, 3);
        assert_eq!(mean.get_pixel(1, 1).0[0], 50);
    }
}
