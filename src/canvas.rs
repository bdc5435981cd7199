//! Square canvas fitting
//!
//! Places a raster of any aspect ratio on a fixed-size square canvas.
//! Sources larger than the canvas are scaled down to fit; smaller sources
//! are only centered, never enlarged.

use crate::border::WHITE;
use crate::config::ResizeFilter;
use crate::error::{Result, StickerError};
use image::{imageops, Rgba, RgbaImage};
use log::debug;
use tracing::instrument;

/// Size the source occupies on a `target`-sized canvas
///
/// The longest side is scaled to `target` when it exceeds it, and the
/// other side follows with rounding. Never returns a zero side.
#[must_use]
pub fn scaled_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let max_dim = width.max(height);
    if max_dim <= target {
        return (width, height);
    }

    let scale = f64::from(target) / f64::from(max_dim);
    let scale_side = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, target);
    (scale_side(width), scale_side(height))
}

/// Top-left position that centers a `width`×`height` block on the canvas
#[must_use]
pub fn centering_offset(width: u32, height: u32, target: u32) -> (u32, u32) {
    (
        target.saturating_sub(width) / 2,
        target.saturating_sub(height) / 2,
    )
}

/// Composite one pixel source-over an opaque white background
#[must_use]
pub fn blend_over_white(pixel: Rgba<u8>) -> Rgba<u8> {
    let alpha = u32::from(pixel[3]);
    match alpha {
        255 => pixel,
        0 => WHITE,
        _ => {
            let inverse = 255 - alpha;
            let channel = |c: u8| ((u32::from(c) * alpha + 255 * inverse + 127) / 255) as u8;
            Rgba([channel(pixel[0]), channel(pixel[1]), channel(pixel[2]), 255])
        },
    }
}

/// Fit `image` onto a `target_size` square canvas using Lanczos3 resampling
///
/// # Errors
/// - `image` has a zero width or height
/// - `target_size` is zero
pub fn fit_to_square(image: RgbaImage, target_size: u32) -> Result<RgbaImage> {
    fit_to_square_with_filter(image, target_size, ResizeFilter::default())
}

/// Fit `image` onto a `target_size` square canvas
///
/// The output is always exactly `target_size`×`target_size` and fully
/// opaque: the source is alpha-blended over white and the remaining area
/// stays white.
///
/// # Errors
/// - `image` has a zero width or height
/// - `target_size` is zero
#[instrument(level = "debug", skip(image), fields(width = image.width(), height = image.height()))]
pub fn fit_to_square_with_filter(
    image: RgbaImage,
    target_size: u32,
    filter: ResizeFilter,
) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(StickerError::processing_stage_error(
            "canvas composition",
            "source raster is empty",
            Some(&format!("{}x{} RGBA", width, height)),
        ));
    }
    if target_size == 0 {
        return Err(StickerError::invalid_config("Canvas size must be greater than zero"));
    }

    let (final_width, final_height) = scaled_dimensions(width, height, target_size);
    let placed = if (final_width, final_height) == (width, height) {
        image
    } else {
        debug!(
            "Downscaling {}x{} -> {}x{} with {} filter",
            width, height, final_width, final_height, filter
        );
        imageops::resize(&image, final_width, final_height, filter.to_filter_type())
    };

    let (offset_x, offset_y) = centering_offset(final_width, final_height, target_size);
    let mut canvas = RgbaImage::from_pixel(target_size, target_size, WHITE);

    for (x, y, pixel) in placed.enumerate_pixels() {
        canvas.put_pixel(x + offset_x, y + offset_y, blend_over_white(*pixel));
    }

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE: Rgba<u8> = Rgba([20, 40, 220, 255]);

    fn assert_fully_opaque(image: &RgbaImage) {
        assert!(image.pixels().all(|p| p[3] == 255), "canvas has transparent pixels");
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(1000, 200, 512), (512, 102));
        assert_eq!(scaled_dimensions(200, 1000, 512), (102, 512));
        assert_eq!(scaled_dimensions(300, 300, 512), (300, 300));
        assert_eq!(scaled_dimensions(512, 512, 512), (512, 512));
        assert_eq!(scaled_dimensions(1024, 1024, 512), (512, 512));
        assert_eq!(scaled_dimensions(10_000, 1, 512), (512, 1));
        // 700 * 512 / 1000 = 358.4 and 999 * 0.512 = 511.488
        assert_eq!(scaled_dimensions(1000, 700, 512), (512, 358));
        assert_eq!(scaled_dimensions(999, 1000, 512), (511, 512));
    }

    #[test]
    fn test_centering_offset() {
        assert_eq!(centering_offset(512, 102, 512), (0, 205));
        assert_eq!(centering_offset(300, 300, 512), (106, 106));
        assert_eq!(centering_offset(511, 512, 512), (0, 0));
    }

    #[test]
    fn test_blend_over_white() {
        assert_eq!(blend_over_white(BLUE), BLUE);
        assert_eq!(blend_over_white(Rgba([1, 2, 3, 0])), WHITE);
        assert_eq!(blend_over_white(Rgba([0, 0, 0, 128])), Rgba([127, 127, 127, 255]));
        assert_eq!(blend_over_white(Rgba([255, 255, 255, 1])), WHITE);
    }

    #[test]
    fn test_wide_source_is_downscaled_and_centered() {
        let canvas = fit_to_square(RgbaImage::from_pixel(1000, 200, BLUE), 512).unwrap();

        assert_eq!(canvas.dimensions(), (512, 512));
        assert_fully_opaque(&canvas);
        // White bands above and below the 102px tall strip at y 205..307.
        assert_eq!(*canvas.get_pixel(256, 0), WHITE);
        assert_eq!(*canvas.get_pixel(256, 204), WHITE);
        assert_eq!(*canvas.get_pixel(256, 256), BLUE);
        assert_eq!(*canvas.get_pixel(256, 307), WHITE);
        assert_eq!(*canvas.get_pixel(256, 511), WHITE);
    }

    #[test]
    fn test_small_source_is_centered_without_resize() {
        let mut source = RgbaImage::from_pixel(300, 300, BLUE);
        source.put_pixel(0, 0, Rgba([9, 9, 9, 255]));
        let canvas = fit_to_square(source, 512).unwrap();

        assert_eq!(canvas.dimensions(), (512, 512));
        assert_fully_opaque(&canvas);
        assert_eq!(*canvas.get_pixel(105, 105), WHITE);
        assert_eq!(*canvas.get_pixel(106, 106), Rgba([9, 9, 9, 255]));
        assert_eq!(*canvas.get_pixel(405, 405), BLUE);
        assert_eq!(*canvas.get_pixel(406, 406), WHITE);
    }

    #[test]
    fn test_transparent_source_leaves_white_canvas() {
        let canvas = fit_to_square(RgbaImage::from_pixel(40, 80, Rgba([5, 5, 5, 0])), 64).unwrap();
        assert!(canvas.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_partial_alpha_is_blended_to_opaque() {
        let canvas = fit_to_square(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 128])), 8).unwrap();
        assert_fully_opaque(&canvas);
        assert_eq!(*canvas.get_pixel(3, 3), Rgba([127, 127, 127, 255]));
        assert_eq!(*canvas.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn test_tall_source_with_every_filter() {
        for filter in [
            ResizeFilter::Nearest,
            ResizeFilter::Triangle,
            ResizeFilter::CatmullRom,
            ResizeFilter::Gaussian,
            ResizeFilter::Lanczos3,
        ] {
            let canvas =
                fit_to_square_with_filter(RgbaImage::from_pixel(90, 600, BLUE), 120, filter)
                    .unwrap();
            assert_eq!(canvas.dimensions(), (120, 120));
            assert_fully_opaque(&canvas);
            // 90 * 120 / 600 = 18 wide, centered at x 51..69
            assert_eq!(*canvas.get_pixel(50, 60), WHITE);
            assert_eq!(*canvas.get_pixel(69, 60), WHITE);
        }
    }

    #[test]
    fn test_rejects_empty_source_and_zero_target() {
        assert!(matches!(
            fit_to_square(RgbaImage::new(0, 5), 512),
            Err(StickerError::Processing(_))
        ));
        assert!(matches!(
            fit_to_square(RgbaImage::new(5, 5), 0),
            Err(StickerError::InvalidConfig(_))
        ));
    }
}
