use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// Containers accepted from uploads.
const ACCEPTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

/// Decode an uploaded JPEG or PNG byte stream
pub fn load(raw: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| Error::Decode(e.to_string()))?;

    match reader.format() {
        Some(format) if ACCEPTED_FORMATS.contains(&format) => {}
        Some(format) => {
            return Err(Error::Decode(format!("unsupported image format {:?}", format)));
        }
        None => return Err(Error::Decode("unrecognized image container".to_string())),
    }

    let img = reader.decode().map_err(|e| Error::Decode(e.to_string()))?;
    debug!(width = img.width(), height = img.height(), "decoded image");
    Ok(img)
}

/// Read an image file from disk and decode it
pub fn load_path(path: &Path) -> Result<DynamicImage> {
    let raw = std::fs::read(path)?;
    load(&raw)
}
