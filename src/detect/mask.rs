//! Highlight-mask construction.
//!
//! Turns the source bitmap into a binary mask in which candidate cell
//! content is foreground, then thickens the mask so the strokes inside
//! one cell merge into a single connected blob before contouring.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use crate::config::DetectionConfig;

/// Builds the binary highlight mask used for cell detection.
///
/// Pixels whose luma falls below the threshold become foreground white,
/// matching printed table content on a light background.
pub fn build_highlight_mask(img: &RgbaImage, config: &DetectionConfig) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut mask = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let r = pixel[0] as u32;
        let g = pixel[1] as u32;
        let b = pixel[2] as u32;
        // ITU-R BT.601 luma, integer arithmetic
        let luma = ((299 * r + 587 * g + 114 * b) / 1000) as u8;

        let value = if luma < config.mask_threshold { 255u8 } else { 0u8 };
        mask.put_pixel(x, y, Luma([value]));
    }

    // 3x3 dilation per iteration
    for _ in 0..config.dilate_iterations {
        mask = dilate(&mask, Norm::LInf, 1);
    }

    mask
}
