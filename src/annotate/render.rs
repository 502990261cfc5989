use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use super::font::LabelFont;
use super::{base_size, blend_over};
use crate::models::{Detection, DetectionSet};

/// Box outline and label text color.
pub const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 128, 0, 255]);
/// Translucent box interior, same hue as the outline.
pub const FILL_COLOR: Rgba<u8> = Rgba([0, 255, 0, 100]);
/// Solid backdrop behind confidence labels.
pub const LABEL_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// Horizontal gap between a box's right edge and its label.
pub const LABEL_MARGIN: f32 = 2.0;

const MIN_STROKE_WIDTH: u32 = 3;
const MIN_FONT_SIZE: u32 = 14;
const STROKE_FACTOR: f32 = 0.3;

/// Outline thickness for an image of the given size.
pub fn stroke_width(width: u32, height: u32) -> u32 {
    ((base_size(width, height) * STROKE_FACTOR).round() as u32).max(MIN_STROKE_WIDTH)
}

/// Label pixel size for an image of the given size.
pub fn font_size(width: u32, height: u32) -> u32 {
    (base_size(width, height).round() as u32).max(MIN_FONT_SIZE)
}

/// Geometry of everything drawn for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationPlan {
    pub stroke_width: u32,
    pub font_size: u32,
    pub boxes: Vec<BoxAnnotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxAnnotation {
    /// Box clamped to the image, inclusive of its edges.
    pub rect: Rect,
    pub label: Option<LabelAnnotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelAnnotation {
    pub text: String,
    /// `(xmax + LABEL_MARGIN, ymin)`; top-left of the unclipped background.
    pub anchor: (i32, i32),
    /// Background clipped to the image.
    pub background: Rect,
    pub text_origin: (i32, i32),
}

/// Lay out boxes and labels without touching pixels.
///
/// Boxes entirely outside the image are dropped.
pub fn plan_annotations(
    width: u32,
    height: u32,
    detections: &DetectionSet,
    show_confidence: bool,
    font: &LabelFont,
) -> AnnotationPlan {
    let stroke_width = stroke_width(width, height);
    let font_size = font_size(width, height);

    let boxes = detections
        .iter()
        .filter_map(|detection| {
            let Some(rect) = clamp_box(detection, width, height) else {
                debug!(?detection, "box outside image, skipped");
                return None;
            };

            let label = if show_confidence {
                place_label(detection, font, font_size, width, height)
            } else {
                None
            };

            Some(BoxAnnotation { rect, label })
        })
        .collect();

    AnnotationPlan {
        stroke_width,
        font_size,
        boxes,
    }
}

/// Lay out the confidence label of a box. Labels starting right of or below
/// the image are dropped; the rest have their background clipped to it.
fn place_label(
    detection: &Detection,
    font: &LabelFont,
    font_size: u32,
    width: u32,
    height: u32,
) -> Option<LabelAnnotation> {
    let text = detection.confidence_label();
    let (text_w, text_h) = font.text_size(font_size, &text);
    let padding = (font_size / 2) as i64;
    let (w, h) = (width as i64, height as i64);

    let ax = (detection.xmax + LABEL_MARGIN).round() as i64;
    let ay = detection.ymin.round() as i64;
    if ax >= w || ay >= h {
        debug!(?detection, "label outside image, skipped");
        return None;
    }

    let right = ax.saturating_add(text_w as i64 + 2 * padding).min(w);
    let bottom = ay.saturating_add(text_h as i64 + 2 * padding).min(h);
    let (left, top) = (ax.max(0), ay.max(0));
    if right <= left || bottom <= top {
        return None;
    }

    Some(LabelAnnotation {
        text,
        anchor: (to_i32(ax), to_i32(ay)),
        background: Rect::at(left as i32, top as i32)
            .of_size((right - left) as u32, (bottom - top) as u32),
        text_origin: (to_i32(ax.saturating_add(padding)), to_i32(ay.saturating_add(padding))),
    })
}

fn to_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Draw detection boxes, and confidence labels when `show_confidence` is set,
/// onto `image`. Pass a clone if the original must survive.
pub fn draw_detections(
    mut image: RgbaImage,
    detections: &DetectionSet,
    show_confidence: bool,
    font: &LabelFont,
) -> RgbaImage {
    let plan = plan_annotations(image.width(), image.height(), detections, show_confidence, font);
    render_plan(&mut image, &plan, font);
    image
}

/// Rasterize a plan. Boxes go down in order, labels on top of all boxes.
pub fn render_plan(image: &mut RgbaImage, plan: &AnnotationPlan, font: &LabelFont) {
    for annotation in &plan.boxes {
        fill_rect(image, annotation.rect, FILL_COLOR);
        draw_outline(image, annotation.rect, plan.stroke_width, OUTLINE_COLOR);
    }

    for label in plan.boxes.iter().filter_map(|b| b.label.as_ref()) {
        draw_filled_rect_mut(image, label.background, LABEL_BACKGROUND);
        font.draw(
            image,
            OUTLINE_COLOR,
            label.text_origin.0,
            label.text_origin.1,
            plan.font_size,
            &label.text,
        );
    }
    debug!(boxes = plan.boxes.len(), "rendered annotations");
}

/// Round a detection to whole pixels and clip it to the image.
fn clamp_box(detection: &Detection, width: u32, height: u32) -> Option<Rect> {
    if width == 0 || height == 0 {
        return None;
    }
    let (w, h) = (width as i64, height as i64);
    let x0 = detection.xmin.round() as i64;
    let y0 = detection.ymin.round() as i64;
    let x1 = detection.xmax.round() as i64;
    let y1 = detection.ymax.round() as i64;

    if x1 < 0 || y1 < 0 || x0 >= w || y0 >= h {
        return None;
    }

    let (x0, y0) = (x0.max(0), y0.max(0));
    let (x1, y1) = (x1.min(w - 1), y1.min(h - 1));
    Some(Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32))
}

fn fill_rect(image: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    for y in rect.top()..=rect.bottom() {
        for x in rect.left()..=rect.right() {
            blend_over(image.get_pixel_mut(x as u32, y as u32), color);
        }
    }
}

/// Outline drawn inward from the box edges.
fn draw_outline(image: &mut RgbaImage, rect: Rect, stroke: u32, color: Rgba<u8>) {
    let horizontal = stroke.min(rect.height());
    let vertical = stroke.min(rect.width());
    let (left, top) = (rect.left(), rect.top());

    let edges = [
        Rect::at(left, top).of_size(rect.width(), horizontal),
        Rect::at(left, rect.bottom() - horizontal as i32 + 1).of_size(rect.width(), horizontal),
        Rect::at(left, top).of_size(vertical, rect.height()),
        Rect::at(rect.right() - vertical as i32 + 1, top).of_size(vertical, rect.height()),
    ];
    for edge in edges {
        draw_filled_rect_mut(image, edge, color);
    }
}
