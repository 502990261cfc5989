use image::{DynamicImage, RgbaImage};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::annotate::font::LabelFont;
use crate::annotate::mask::{DEFAULT_MASK_OPACITY, apply_mask};
use crate::annotate::render::draw_detections;
use crate::annotate::shutter::combine_at;
use crate::error::{Error, Result};
use crate::models::{DetectionSet, SplitRatio};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for stage dumps
    pub output_dir: PathBuf,
    pub enabled: bool,
}

/// Context available to every stage
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    fn debug_enabled(&self) -> bool {
        self.debug.as_ref().is_some_and(|d| d.enabled)
    }

    /// Save a stage image as `NN_<stage>/01.png` when debug mode is on
    fn save_stage(&self, index: usize, stage: &str, image: &DynamicImage) -> Result<()> {
        let Some(debug_config) = self.debug.as_ref().filter(|d| d.enabled) else {
            return Ok(());
        };

        let stage_dir_name = format!("{:02}_{}", index, stage);
        let stage_dir = debug_config.output_dir.join(&stage_dir_name);
        std::fs::create_dir_all(&stage_dir)?;
        image
            .save(stage_dir.join("01.png"))
            .map_err(Error::Encode)?;

        debug!("saved {}/01.png", stage_dir_name);
        Ok(())
    }
}

/// What the front end shows for an analyzed image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Annotated image only
    Annotated,
    /// Masked original left of the split, annotated image right of it
    Shutter(SplitRatio),
}

/// The two panes of the comparison view
#[derive(Debug, Clone)]
pub struct Panes {
    pub before: RgbaImage,
    pub after: RgbaImage,
}

/// Annotation pipeline: mask, draw, splice
#[derive(Debug)]
pub struct Pipeline {
    mask_opacity: f32,
    show_confidence: bool,
    font: LabelFont,
    context: PipelineContext,
}

impl Pipeline {
    pub fn new(font: LabelFont) -> Self {
        Self {
            mask_opacity: DEFAULT_MASK_OPACITY,
            show_confidence: false,
            font,
            context: PipelineContext::default(),
        }
    }

    pub fn with_mask_opacity(mut self, opacity: f32) -> Self {
        self.mask_opacity = opacity;
        self
    }

    pub fn with_show_confidence(mut self, show: bool) -> Self {
        self.show_confidence = show;
        self
    }

    /// Enable stage dumps into `output_dir`.
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            if std::fs::read_dir(&output_dir)?.next().is_some() {
                return Err(Error::InvalidArgument(format!(
                    "debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });
        Ok(self)
    }

    pub fn font(&self) -> &LabelFont {
        &self.font
    }

    pub fn mask_opacity(&self) -> f32 {
        self.mask_opacity
    }

    pub fn show_confidence(&self) -> bool {
        self.show_confidence
    }

    /// "Before" pane: the source washed out with the configured opacity
    pub fn mask(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let masked = apply_mask(image, self.mask_opacity)?;
        if self.context.debug_enabled() {
            self.context.save_stage(1, "mask", &DynamicImage::ImageRgba8(masked.clone()))?;
        }
        Ok(masked)
    }

    /// Record the decoded input, then build the "before" pane
    pub fn prepare(&self, image: &DynamicImage) -> Result<RgbaImage> {
        self.context.save_stage(0, "input", image)?;
        self.mask(image)
    }

    /// "After" pane: a copy of the source with detections drawn on it
    pub fn annotate(&self, image: &DynamicImage, detections: &DetectionSet) -> Result<RgbaImage> {
        let annotated = draw_detections(image.to_rgba8(), detections, self.show_confidence, &self.font);
        if self.context.debug_enabled() {
            self.context.save_stage(2, "annotate", &DynamicImage::ImageRgba8(annotated.clone()))?;
        }
        Ok(annotated)
    }

    pub fn panes(&self, image: &DynamicImage, detections: &DetectionSet) -> Result<Panes> {
        Ok(Panes {
            before: self.mask(image)?,
            after: self.annotate(image, detections)?,
        })
    }

    /// Produce the final image for `view`, reusing an already masked pane
    pub fn render(
        &self,
        image: &DynamicImage,
        masked: &RgbaImage,
        detections: &DetectionSet,
        view: View,
    ) -> Result<DynamicImage> {
        let annotated = self.annotate(image, detections)?;
        match view {
            View::Annotated => Ok(DynamicImage::ImageRgba8(annotated)),
            View::Shutter(ratio) => {
                let combined = DynamicImage::ImageRgb8(combine_at(masked, &annotated, ratio)?);
                self.context.save_stage(3, "shutter", &combined)?;
                Ok(combined)
            }
        }
    }

    /// Run every stage on one image
    pub fn run(&self, image: &DynamicImage, detections: &DetectionSet, view: View) -> Result<DynamicImage> {
        info!(
            width = image.width(),
            height = image.height(),
            detections = detections.len(),
            "running annotation pipeline"
        );
        let masked = self.prepare(image)?;
        self.render(image, &masked, detections, view)
    }
}
