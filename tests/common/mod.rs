mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from cfucount for tests
#[allow(unused_imports)]
pub use cfucount::{
    Detection, DetectionSet, Detector, Error, LabelFont, Pipeline, Session, SplitRatio, View,
};
