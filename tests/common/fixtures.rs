#![allow(dead_code)]

use cfucount::{Detection, DetectionSet, Detector};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Creates an RGB gradient so every column and row differs.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgb([r, g, 128])
    });
    DynamicImage::ImageRgb8(img)
}

pub fn solid_rgba(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// Encodes an image in the given container and returns the raw bytes.
pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).expect("Failed to encode test image");
    buffer.into_inner()
}

pub fn detection(xmin: f32, ymin: f32, xmax: f32, ymax: f32, confidence: f32) -> Detection {
    Detection::new(xmin, ymin, xmax, ymax, confidence).expect("valid test detection")
}

/// Three boxes on a 1000x800 plate with confidences 0.91, 0.40 and 0.995.
pub fn three_detections() -> DetectionSet {
    DetectionSet::new(vec![
        detection(100.0, 100.0, 200.0, 200.0, 0.91),
        detection(300.0, 150.0, 420.0, 260.0, 0.40),
        detection(600.0, 500.0, 700.0, 650.0, 0.995),
    ])
}

/// The bundled face, so layout does not depend on the host's fonts.
pub fn builtin_font() -> cfucount::LabelFont {
    cfucount::LabelFont::builtin().expect("bundled font parses")
}

pub fn builtin_pipeline() -> cfucount::Pipeline {
    cfucount::Pipeline::new(builtin_font())
}

/// Detector that returns a fixed set and counts how often it ran.
pub struct CountingDetector {
    pub detections: DetectionSet,
    pub calls: AtomicUsize,
}

impl CountingDetector {
    pub fn new(detections: DetectionSet) -> Self {
        Self {
            detections,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Detector for CountingDetector {
    async fn detect(&self, _image: &DynamicImage) -> cfucount::Result<DetectionSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }
}

/// Ground-truth table in the layout of the sample dataset.
pub const SAMPLE_CSV: &str = "image_name;result\ntest.jpg;42\ntest_2.jpg;117\ntest_3.jpg;8\n";
