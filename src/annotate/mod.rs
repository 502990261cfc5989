//! Image annotation and comparison stages.
//!
//! Loader -> (mask || render) -> shutter. Every stage is a pure transform
//! over owned or borrowed images.

pub mod font;
pub mod loader;
pub mod mask;
pub mod render;
pub mod shutter;

use image::Rgba;

/// Porter-Duff "over": composite `src` onto `dst` in place.
pub(crate) fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    match src[3] {
        0 => return,
        255 => {
            *dst = src;
            return;
        }
        _ => {}
    }

    let src_a = src[3] as f32 / 255.0;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    for c in 0..3 {
        let value = (src[c] as f32 * src_a + dst[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Sizing shared by strokes and labels: 2% of the shorter side.
pub(crate) fn base_size(width: u32, height: u32) -> f32 {
    0.02 * width.min(height) as f32
}
