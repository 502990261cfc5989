//! Client side of the detection model.
//!
//! The model itself runs behind an HTTP endpoint; this module encodes the
//! image, posts it, and maps the returned prediction table into a typed
//! [`DetectionSet`].

use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{DetectionSet, PredictionRow};

/// Hosted inference endpoint the dashboard talked to.
pub const DEFAULT_ENDPOINT: &str = "https://cfucounter-6baf3091d9c8.herokuapp.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that turns an image into detections.
#[allow(async_fn_in_trait)]
pub trait Detector {
    async fn detect(&self, image: &DynamicImage) -> Result<DetectionSet>;
}

/// Precomputed detections, e.g. loaded from a file.
#[derive(Debug, Clone)]
pub struct FixedDetector(pub DetectionSet);

impl Detector for FixedDetector {
    async fn detect(&self, _image: &DynamicImage) -> Result<DetectionSet> {
        Ok(self.0.clone())
    }
}

/// Remote model behind `POST {base}/predict/`
#[derive(Debug, Clone)]
pub struct HttpDetector {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct PredictionEnvelope {
    predictions: Predictions,
}

/// The endpoint ships the table as a JSON string; plain arrays are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum Predictions {
    Encoded(String),
    Rows(Vec<PredictionRow>),
}

#[derive(Deserialize)]
struct HealthResponse {
    message: String,
}

impl HttpDetector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Call the root endpoint and return its welcome message
    pub async fn health(&self) -> Result<String> {
        let response = self.client.get(self.url("")).send().await?;
        let body = check_status(response).await?;
        let health: HealthResponse = serde_json::from_str(&body)?;
        Ok(health.message)
    }

    /// Post an already encoded JPEG and parse the predictions
    pub async fn predict_jpeg(&self, jpeg: Vec<u8>) -> Result<DetectionSet> {
        let size = jpeg.len();
        let part = Part::bytes(jpeg)
            .file_name("image.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        debug!(bytes = size, url = %self.url("predict/"), "posting image for inference");
        let response = self
            .client
            .post(self.url("predict/"))
            .multipart(form)
            .send()
            .await?;
        let body = check_status(response).await?;

        let detections = parse_predictions(&body)?;
        info!(count = detections.len(), "received predictions");
        Ok(detections)
    }
}

impl Detector for HttpDetector {
    async fn detect(&self, image: &DynamicImage) -> Result<DetectionSet> {
        let jpeg = encode_jpeg(image)?;
        self.predict_jpeg(jpeg).await
    }
}

/// Return the body of a 2xx response, or a status error carrying it
async fn check_status(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        warn!(status = status.as_u16(), "inference endpoint request failed");
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Encode as baseline JPEG; alpha is dropped since JPEG has none
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(Error::Encode)?;
    Ok(buffer.into_inner())
}

/// Parse the endpoint response `{"predictions": "<json table>"}`
pub fn parse_predictions(body: &str) -> Result<DetectionSet> {
    let envelope: PredictionEnvelope = serde_json::from_str(body)?;
    match envelope.predictions {
        Predictions::Encoded(table) => parse_detections(&table),
        Predictions::Rows(rows) => DetectionSet::from_rows(rows),
    }
}

/// Parse a bare array of prediction records
pub fn parse_detections(json: &str) -> Result<DetectionSet> {
    let rows: Vec<PredictionRow> = serde_json::from_str(json)?;
    DetectionSet::from_rows(rows)
}
