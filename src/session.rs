use image::{DynamicImage, RgbaImage};
use tracing::{debug, info};

use crate::annotate::loader;
use crate::error::{Error, Result};
use crate::inference::Detector;
use crate::models::DetectionSet;
use crate::pipeline::{Pipeline, View};

/// Everything computed once per uploaded image
#[derive(Debug, Clone)]
pub struct Analysis {
    pub image_name: String,
    pub image: DynamicImage,
    pub masked: RgbaImage,
    /// Opacity `masked` was built with
    pub mask_opacity: f32,
    pub detections: DetectionSet,
}

/// Per-user state of the front end.
///
/// Re-renders (toggling labels, moving the shutter) reuse the analysis as
/// long as the same image name is submitted.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<Analysis>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode, mask and detect `raw` unless `image_name` is already the
    /// current image. A cached image is only re-masked when the pipeline's
    /// opacity changed. The previous analysis survives a failed one.
    pub async fn analyze<D: Detector>(
        &mut self,
        image_name: &str,
        raw: &[u8],
        detector: &D,
        pipeline: &Pipeline,
    ) -> Result<&Analysis> {
        let reusable = self
            .current
            .as_mut()
            .filter(|current| current.image_name == image_name);

        if let Some(current) = reusable {
            if current.mask_opacity == pipeline.mask_opacity() {
                debug!(image_name, "reusing cached analysis");
            } else {
                debug!(image_name, opacity = pipeline.mask_opacity(), "re-masking cached image");
                current.masked = pipeline.mask(&current.image)?;
                current.mask_opacity = pipeline.mask_opacity();
            }
        } else {
            let image = loader::load(raw)?;
            let masked = pipeline.prepare(&image)?;
            let detections = detector.detect(&image).await?;
            info!(image_name, count = detections.len(), "analyzed image");

            self.current = Some(Analysis {
                image_name: image_name.to_string(),
                image,
                masked,
                mask_opacity: pipeline.mask_opacity(),
                detections,
            });
        }

        self.current.as_ref().ok_or_else(no_analysis)
    }

    pub fn current(&self) -> Option<&Analysis> {
        self.current.as_ref()
    }

    pub fn predicted_count(&self) -> Option<usize> {
        self.current.as_ref().map(|a| a.detections.len())
    }

    /// Render the current analysis for `view`
    pub fn render(&self, pipeline: &Pipeline, view: View) -> Result<DynamicImage> {
        let analysis = self.current.as_ref().ok_or_else(no_analysis)?;
        pipeline.render(&analysis.image, &analysis.masked, &analysis.detections, view)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

fn no_analysis() -> Error {
    Error::InvalidArgument("no image has been analyzed in this session".to_string())
}
