//! Structuring elements for the morphological operations.
//!
//! Shapes are rasterized the same way OpenCV's `getStructuringElement`
//! does with the anchor at the center, so a given shape and size
//! covers the same cells as it does in OpenCV. The element is handed
//! to [`imageproc::morphology`] as a [`Mask`].

use image::GrayImage;
use imageproc::morphology::Mask;

use crate::mode::KernelShape;

/// A square structuring element of odd side length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
    cells: Vec<bool>,
}

impl StructuringElement {
    /// Rasterize `shape` into a `size × size` element.
    ///
    /// `size` is expected to be odd (the parameter store guarantees
    /// it); even sizes are bumped to the next odd value so the element
    /// always has a center cell.
    #[must_use]
    pub fn new(shape: KernelShape, size: u32) -> Self {
        let size = if size % 2 == 0 { size + 1 } else { size };
        let center = size / 2;
        let mut cells = vec![false; (size * size) as usize];

        for row in 0..size {
            let (start, end) = row_span(shape, size, center, row);
            for col in start..end {
                cells[(row * size + col) as usize] = true;
            }
        }

        Self { size, cells }
    }

    /// Side length in pixels.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Whether the cell at (`col`, `row`) belongs to the element.
    #[must_use]
    pub fn contains(&self, col: u32, row: u32) -> bool {
        col < self.size && row < self.size && self.cells[(row * self.size + col) as usize]
    }

    /// Number of cells in the element.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// The element as a binary image (255 inside, 0 outside).
    #[must_use]
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.size, self.size, |x, y| {
            image::Luma([if self.contains(x, y) { 255 } else { 0 }])
        })
    }

    /// The element as an `imageproc` mask anchored at its center.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_mask(&self) -> Mask {
        // Kernel sizes are bounded well below 511, the mask size limit.
        let center = (self.size / 2).min(u32::from(u8::MAX)) as u8;
        Mask::from_image(&self.to_image(), center, center)
    }
}

/// Half-open column span `[start, end)` covered by `row`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn row_span(shape: KernelShape, size: u32, center: u32, row: u32) -> (u32, u32) {
    match shape {
        KernelShape::Rect => (0, size),
        KernelShape::Cross if row == center => (0, size),
        KernelShape::Cross => (center, center + 1),
        KernelShape::Ellipse => {
            let r = f64::from(center);
            let dy = f64::from(row) - r;
            if r == 0.0 {
                return (0, size);
            }
            let dx = (r * ((r * r - dy * dy) / (r * r)).max(0.0).sqrt()).round() as i64;
            let c = i64::from(center);
            let start = (c - dx).max(0) as u32;
            let end = (c + dx + 1).min(i64::from(size)) as u32;
            (start, end)
        }
    }
}
