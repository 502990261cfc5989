use image::{GenericImageView, Rgb, RgbImage, RgbaImage};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::SplitRatio;

/// Splice `before` (left of the split) and `after` (right of it) into one
/// opaque image.
///
/// `split_percent` must lie in [0, 100] and both images must share their
/// dimensions; anything else is rejected, never clamped or cropped to fit.
/// Alpha is dropped, not blended.
pub fn combine(before: &RgbaImage, after: &RgbaImage, split_percent: i32) -> Result<RgbImage> {
    let ratio = SplitRatio::new(split_percent)?;
    combine_at(before, after, ratio)
}

/// Same as [`combine`] with an already validated ratio.
pub fn combine_at(before: &RgbaImage, after: &RgbaImage, ratio: SplitRatio) -> Result<RgbImage> {
    if before.dimensions() != after.dimensions() {
        return Err(Error::InvalidArgument(format!(
            "shutter images must share dimensions, got {:?} and {:?}",
            before.dimensions(),
            after.dimensions()
        )));
    }

    let (width, height) = before.dimensions();
    let split_x = ratio.split_x(width);
    debug!(split_x, percent = ratio.percent(), "combining shutter panes");

    let mut canvas = RgbImage::new(width, height);
    paste_opaque(&mut canvas, before, 0, split_x);
    paste_opaque(&mut canvas, after, split_x, width);
    Ok(canvas)
}

/// Copy columns `[from, to)` of `source` into `canvas`, discarding alpha.
fn paste_opaque(canvas: &mut RgbImage, source: &RgbaImage, from: u32, to: u32) {
    if from >= to {
        return;
    }
    let region = source.view(from, 0, to - from, source.height());
    for (x, y, pixel) in region.pixels() {
        let [r, g, b, _] = pixel.0;
        canvas.put_pixel(from + x, y, Rgb([r, g, b]));
    }
}
