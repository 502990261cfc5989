pub mod annotate;
pub mod error;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod samples;
pub mod session;

pub use annotate::font::LabelFont;
pub use annotate::loader::{load, load_path};
pub use annotate::mask::apply_mask;
pub use annotate::render::{draw_detections, plan_annotations};
pub use annotate::shutter::combine;
pub use error::{Error, Result};
pub use inference::{Detector, FixedDetector, HttpDetector};
pub use models::{Detection, DetectionSet, SplitRatio};
pub use pipeline::{Pipeline, View};
pub use samples::{CountVerdict, SampleCounts, SampleLibrary};
pub use session::Session;
