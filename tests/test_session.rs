//! Integration tests for per-session analysis caching and rendering.

mod common;

use image::{GenericImageView, ImageFormat};

use common::*;

#[tokio::test]
async fn test_same_image_is_analyzed_once() -> anyhow::Result<()> {
    // 1. Prepare an upload and a detector that counts its calls
    let pipeline = builtin_pipeline();
    let detector = CountingDetector::new(three_detections());
    let raw = encode(&gradient_image(1000, 800), ImageFormat::Png);
    let mut session = Session::new();

    // 2. Analyze twice under the same name
    session.analyze("test.jpg", &raw, &detector, &pipeline).await?;
    let analysis = session.analyze("test.jpg", &raw, &detector, &pipeline).await?;

    // 3. Second call reuses the cached analysis
    assert_eq!(analysis.image_name, "test.jpg");
    assert_eq!(analysis.detections.len(), 3);
    assert_eq!(detector.calls(), 1);
    assert_eq!(session.predicted_count(), Some(3));

    Ok(())
}

#[tokio::test]
async fn test_new_image_triggers_new_analysis() -> anyhow::Result<()> {
    let pipeline = builtin_pipeline();
    let detector = CountingDetector::new(DetectionSet::empty());
    let mut session = Session::new();

    session
        .analyze("a.png", &encode(&gradient_image(20, 20), ImageFormat::Png), &detector, &pipeline)
        .await?;
    let analysis = session
        .analyze("b.png", &encode(&gradient_image(30, 10), ImageFormat::Png), &detector, &pipeline)
        .await?;

    assert_eq!(analysis.image_name, "b.png");
    assert_eq!(analysis.image.dimensions(), (30, 10));
    assert_eq!(analysis.masked.dimensions(), (30, 10));
    assert_eq!(detector.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_failed_decode_keeps_previous_analysis() -> anyhow::Result<()> {
    let pipeline = builtin_pipeline();
    let detector = CountingDetector::new(three_detections());
    let mut session = Session::new();
    let raw = encode(&gradient_image(40, 40), ImageFormat::Png);

    session.analyze("good.png", &raw, &detector, &pipeline).await?;
    let result = session.analyze("bad.png", b"garbage", &detector, &pipeline).await;

    assert!(matches!(result, Err(Error::Decode(_))));
    assert_eq!(session.current().map(|a| a.image_name.as_str()), Some("good.png"));
    assert_eq!(detector.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_changed_opacity_remasks_cached_image() -> anyhow::Result<()> {
    let detector = CountingDetector::new(three_detections());
    let raw = encode(&gradient_image(40, 30), ImageFormat::Png);
    let mut session = Session::new();

    let light = builtin_pipeline();
    let first = session.analyze("plate.png", &raw, &detector, &light).await?.masked.clone();

    let heavy = builtin_pipeline().with_mask_opacity(0.8);
    let analysis = session.analyze("plate.png", &raw, &detector, &heavy).await?;

    // Detection is reused, the before pane follows the new opacity
    assert_eq!(detector.calls(), 1);
    assert_eq!(analysis.mask_opacity, 0.8);
    assert_ne!(analysis.masked, first);
    assert_eq!(analysis.masked, cfucount::apply_mask(&analysis.image, 0.8)?);
    Ok(())
}

#[tokio::test]
async fn test_render_views() -> anyhow::Result<()> {
    let pipeline = builtin_pipeline().with_show_confidence(true);
    let detector = CountingDetector::new(three_detections());
    let mut session = Session::new();
    let raw = encode(&gradient_image(1000, 800), ImageFormat::Png);
    session.analyze("test.jpg", &raw, &detector, &pipeline).await?;

    let annotated = session.render(&pipeline, View::Annotated)?;
    let shutter = session.render(&pipeline, View::Shutter(SplitRatio::new(50)?))?;
    let all_after = session.render(&pipeline, View::Shutter(SplitRatio::new(0)?))?;

    assert_eq!(annotated.dimensions(), (1000, 800));
    assert_eq!(shutter.dimensions(), (1000, 800));
    assert_eq!(all_after.to_rgb8(), annotated.to_rgb8());
    assert_eq!(detector.calls(), 1);
    Ok(())
}

#[test]
fn test_render_without_analysis_is_rejected() {
    let session = Session::new();
    let result = session.render(&builtin_pipeline(), View::Annotated);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[tokio::test]
async fn test_clear_drops_state() -> anyhow::Result<()> {
    let pipeline = builtin_pipeline();
    let detector = CountingDetector::new(DetectionSet::empty());
    let mut session = Session::new();
    let raw = encode(&gradient_image(8, 8), ImageFormat::Png);

    session.analyze("x.png", &raw, &detector, &pipeline).await?;
    session.clear();

    assert!(session.current().is_none());
    assert_eq!(session.predicted_count(), None);
    Ok(())
}
