use serde::{Deserialize, Serialize};
use std::ops::Deref;

use crate::error::{Error, Result};

/// One predicted object instance: a box in pixel coordinates and a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub confidence: f32,
    pub class_id: Option<i64>,
    pub class_label: Option<String>,
}

impl Detection {
    /// Build a detection, rejecting non-finite coordinates, inverted boxes
    /// and confidences outside [0, 1].
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32, confidence: f32) -> Result<Self> {
        let detection = Self {
            xmin,
            ymin,
            xmax,
            ymax,
            confidence,
            class_id: None,
            class_label: None,
        };
        detection.validate().map_err(Error::InvalidArgument)?;
        Ok(detection)
    }

    pub fn with_class(mut self, id: Option<i64>, label: Option<String>) -> Self {
        self.class_id = id;
        self.class_label = label;
        self
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Confidence as shown on labels, e.g. `0.995` -> `"99.50%"`.
    pub fn confidence_label(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let coords = [
            ("xmin", self.xmin),
            ("ymin", self.ymin),
            ("xmax", self.xmax),
            ("ymax", self.ymax),
            ("confidence", self.confidence),
        ];
        for (field, value) in coords {
            if !value.is_finite() {
                return Err(format!("`{}` is not a finite number", field));
            }
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        if self.xmin > self.xmax || self.ymin > self.ymax {
            return Err(format!(
                "inverted box ({}, {}) -> ({}, {})",
                self.xmin, self.ymin, self.xmax, self.ymax
            ));
        }
        Ok(())
    }
}

/// Ordered detections for one image. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionSet(Vec<Detection>);

impl DetectionSet {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self(detections)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Map wire rows into typed detections, failing on the first bad row.
    pub(crate) fn from_rows(rows: Vec<PredictionRow>) -> Result<Self> {
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| row.into_detection(index))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl Deref for DetectionSet {
    type Target = [Detection];

    fn deref(&self) -> &[Detection] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One record of the inference endpoint's prediction table.
///
/// Numeric fields are optional here so a null cell is reported with its row
/// index instead of as a generic JSON error.
#[derive(Debug, Deserialize)]
pub(crate) struct PredictionRow {
    xmin: Option<f64>,
    ymin: Option<f64>,
    xmax: Option<f64>,
    ymax: Option<f64>,
    confidence: Option<f64>,
    #[serde(default)]
    class: Option<i64>,
    #[serde(default)]
    name: Option<String>,
}

impl PredictionRow {
    fn into_detection(self, index: usize) -> Result<Detection> {
        let field = |name: &str, value: Option<f64>| {
            value.map(|v| v as f32).ok_or_else(|| Error::MalformedDetection {
                index,
                reason: format!("missing or null field `{}`", name),
            })
        };

        let detection = Detection {
            xmin: field("xmin", self.xmin)?,
            ymin: field("ymin", self.ymin)?,
            xmax: field("xmax", self.xmax)?,
            ymax: field("ymax", self.ymax)?,
            confidence: field("confidence", self.confidence)?,
            class_id: self.class,
            class_label: self.name,
        };
        detection
            .validate()
            .map_err(|reason| Error::MalformedDetection { index, reason })?;
        Ok(detection)
    }
}

/// Horizontal split position of the shutter view, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRatio(u8);

impl SplitRatio {
    pub const DEFAULT: SplitRatio = SplitRatio(50);

    /// Reject anything outside [0, 100]; values are never clamped.
    pub fn new(percent: i32) -> Result<Self> {
        if (0..=100).contains(&percent) {
            Ok(Self(percent as u8))
        } else {
            Err(Error::InvalidArgument(format!(
                "split percentage must be between 0 and 100, got {}",
                percent
            )))
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Column at which `after` takes over for an image `width` pixels wide.
    pub fn split_x(self, width: u32) -> u32 {
        (width as f64 * self.0 as f64 / 100.0).round() as u32
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i32> for SplitRatio {
    type Error = Error;

    fn try_from(percent: i32) -> Result<Self> {
        Self::new(percent)
    }
}
