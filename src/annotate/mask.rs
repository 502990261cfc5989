use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use super::blend_over;
use crate::error::{Error, Result};

/// Opacity used for the "before" pane of the comparison view.
pub const DEFAULT_MASK_OPACITY: f32 = 0.15;

/// Wash `image` out with a uniform white layer of the given opacity.
///
/// The layer alpha is `round(255 * opacity)`. Returns a new RGBA image;
/// `image` is left untouched.
pub fn apply_mask(image: &DynamicImage, opacity: f32) -> Result<RgbaImage> {
    if !opacity.is_finite() || !(0.0..=1.0).contains(&opacity) {
        return Err(Error::InvalidArgument(format!(
            "mask opacity must be between 0 and 1, got {}",
            opacity
        )));
    }

    let alpha = (255.0 * opacity).round() as u8;
    let layer = Rgba([255, 255, 255, alpha]);
    debug!(alpha, "applying white mask");

    let mut masked = image.to_rgba8();
    for pixel in masked.pixels_mut() {
        blend_over(pixel, layer);
    }
    Ok(masked)
}
