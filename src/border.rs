//! White stroke border synthesis
//!
//! Grows the subject's alpha footprint outward with an elliptical
//! structuring element and paints the grown band white, producing the
//! classic die-cut sticker outline. The output canvas is enlarged by the
//! margin on every side so the ring is never clipped at the image edge.

use crate::types::AlphaMask;
use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::morphology::{grayscale_dilate, Mask};
use log::debug;
use tracing::instrument;

/// Opaque white, used for the ring and for uncovered canvas
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Elliptical structuring element of side `2 * radius + 1`
///
/// Row `dy` spans `round(sqrt(radius² - dy²))` pixels either side of the
/// center, the same shape OpenCV's `MORPH_ELLIPSE` produces. This is a
/// little fuller on the diagonals than `Mask::disk`, which keeps only
/// offsets with `dx² + dy² <= radius²`.
fn ellipse_mask(radius: u8) -> Mask {
    let r = i32::from(radius);
    let side = 2 * u32::from(radius) + 1;
    let mut kernel = GrayImage::new(side, side);

    for dy in -r..=r {
        let half_width = f64::from(r * r - dy * dy).sqrt().round() as i32;
        for dx in -half_width..=half_width {
            kernel.put_pixel((dx + r) as u32, (dy + r) as u32, Luma([255]));
        }
    }

    Mask::from_image(&kernel, radius, radius)
}

/// Grayscale dilation of `mask` with an elliptical element of the given radius
///
/// Each output value is the maximum mask value within the element centered
/// on that position. Positions outside the mask count as zero.
#[must_use]
pub fn dilate_alpha(mask: &AlphaMask, radius: u8) -> AlphaMask {
    if radius == 0 {
        return mask.clone();
    }
    AlphaMask::from_gray(grayscale_dilate(mask.as_image(), &ellipse_mask(radius)))
}

/// Footprint of the finished sticker: the subject's alpha dilated by `margin`
///
/// Returned at the enlarged size `(w + 2*margin, h + 2*margin)`, aligned
/// with the output of [`add_border`].
#[must_use]
pub fn sticker_footprint(image: &RgbaImage, margin: u8) -> AlphaMask {
    let padded = AlphaMask::from_rgba_padded(image, u32::from(margin));
    dilate_alpha(&padded, margin)
}

/// Surround the subject of `image` with a white ring `margin` pixels wide
///
/// The result is `margin` pixels larger on every side. Pixels where the
/// input has any opacity keep their exact RGBA value. Pixels reached only
/// by the dilated mask become white with the dilated opacity. Everything
/// else is opaque white background.
#[instrument(level = "debug", skip(image), fields(width = image.width(), height = image.height()))]
#[must_use]
pub fn add_border(image: RgbaImage, margin: u8) -> RgbaImage {
    let pad = u32::from(margin);
    let (width, height) = image.dimensions();
    let footprint = sticker_footprint(&image, margin);

    let mut output = RgbaImage::from_pixel(width + 2 * pad, height + 2 * pad, WHITE);

    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let ring = footprint.value(x, y);
        if ring > 0 {
            pixel[3] = ring;
        }
    }

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            output.put_pixel(x + pad, y + pad, *pixel);
        }
    }

    debug!(
        "Added {}px border: {}x{} -> {}x{}",
        margin,
        width,
        height,
        output.width(),
        output.height()
    );

    output
}
