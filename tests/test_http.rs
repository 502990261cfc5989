//! Integration tests for the HTTP clients against a local mock server.
//!
//! Tests cover:
//! - Multipart upload to `predict/` and parsing of the 200 envelope
//! - Non-2xx responses surfacing as `Error::Status` with their body
//! - The health check message
//! - Sample downloads, including a missing sample

mod common;

use cfucount::{HttpDetector, SampleLibrary};
use image::ImageFormat;
use mockito::Matcher;
use std::time::Duration;

use common::*;

const TIMEOUT: Duration = Duration::from_secs(5);

const PREDICTIONS: &str = r#"{"predictions": "[{\"xmin\":10.0,\"ymin\":12.0,\"xmax\":30.0,\"ymax\":33.0,\"confidence\":0.87,\"class\":0,\"name\":\"CFU\"},{\"xmin\":40.0,\"ymin\":41.0,\"xmax\":52.0,\"ymax\":60.0,\"confidence\":0.55,\"class\":0,\"name\":\"CFU\"}]"}"#;

#[tokio::test]
async fn test_detect_posts_multipart_file() -> anyhow::Result<()> {
    // 1. Server expects a multipart upload in the `file` field
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/predict/")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
        .match_body(Matcher::Regex(r#"name="file"; filename="image.jpg""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PREDICTIONS)
        .create_async()
        .await;

    // 2. Detect on a small image
    let detector = HttpDetector::new(server.url(), TIMEOUT)?;
    let detections = detector.detect(&gradient_image(64, 64)).await?;

    // 3. Request matched and the table was parsed
    mock.assert_async().await;
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].confidence_label(), "87.00%");
    assert_eq!(detections[1].class_label.as_deref(), Some("CFU"));
    Ok(())
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/predict/")
        .with_status(200)
        .with_body(r#"{"predictions": "[]"}"#)
        .create_async()
        .await;

    let detector = HttpDetector::new(format!("{}/", server.url()), TIMEOUT)?;
    let jpeg = encode(&gradient_image(16, 16), ImageFormat::Jpeg);
    let detections = detector.predict_jpeg(jpeg).await?;

    mock.assert_async().await;
    assert!(detections.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rejected_image_is_a_status_error() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/predict/")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "Invalid image format"}"#)
        .create_async()
        .await;

    let detector = HttpDetector::new(server.url(), TIMEOUT)?;
    let result = detector.predict_jpeg(b"not a jpeg".to_vec()).await;

    mock.assert_async().await;
    match result {
        Err(Error::Status { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Invalid image format"));
        }
        other => panic!("expected a status error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_malformed_row_from_server() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict/")
        .with_status(200)
        .with_body(r#"{"predictions": "[{\"xmin\":null,\"ymin\":1,\"xmax\":2,\"ymax\":3,\"confidence\":0.5}]"}"#)
        .create_async()
        .await;

    let detector = HttpDetector::new(server.url(), TIMEOUT)?;
    let result = detector.detect(&gradient_image(8, 8)).await;

    assert!(matches!(result, Err(Error::MalformedDetection { index: 0, .. })));
    Ok(())
}

#[tokio::test]
async fn test_health_returns_message() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "Welcome to the CFU counter API"}"#)
        .create_async()
        .await;

    let detector = HttpDetector::new(server.url(), TIMEOUT)?;
    let message = detector.health().await?;

    mock.assert_async().await;
    assert_eq!(message, "Welcome to the CFU counter API");
    Ok(())
}

#[tokio::test]
async fn test_health_on_server_error() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .with_status(503)
        .with_body("Application error")
        .create_async()
        .await;

    let detector = HttpDetector::new(server.url(), TIMEOUT)?;

    assert!(matches!(
        detector.health().await,
        Err(Error::Status { status: 503, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_fetch_sample_bytes() -> anyhow::Result<()> {
    let raw = encode(&gradient_image(12, 9), ImageFormat::Png);
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/samples/test_3.jpg")
        .with_status(200)
        .with_body(raw.clone())
        .create_async()
        .await;

    let library = SampleLibrary::new(format!("{}/samples/", server.url()), TIMEOUT)?;
    let fetched = library.fetch("test_3.jpg").await?;

    mock.assert_async().await;
    assert_eq!(fetched, raw);
    Ok(())
}

#[tokio::test]
async fn test_fetch_missing_sample() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/samples/test_9.jpg")
        .with_status(404)
        .create_async()
        .await;

    let library = SampleLibrary::new(format!("{}/samples", server.url()), TIMEOUT)?;
    let result = library.fetch("test_9.jpg").await;

    mock.assert_async().await;
    match result {
        Err(Error::Status { status, body }) => {
            assert_eq!(status, 404);
            assert!(body.contains("test_9.jpg"));
        }
        other => panic!("expected a status error, got {:?}", other),
    }
    Ok(())
}
