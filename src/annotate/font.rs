use ab_glyph::{FontRef, FontVec};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Scalable faces tried when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// DejaVu Sans Mono, shipped in the binary (Bitstream Vera license).
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

/// Face used to draw confidence labels.
pub enum LabelFont {
    /// Face loaded from a file at runtime.
    Scalable(FontVec),
    /// Face compiled into the binary.
    Builtin(FontRef<'static>),
}

impl LabelFont {
    /// Parse a TrueType/OpenType face from memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        FontVec::try_from_vec(bytes)
            .map(LabelFont::Scalable)
            .map_err(|e| Error::FontUnavailable(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::FontUnavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(bytes)
    }

    /// The face bundled with the crate. Output does not depend on the host.
    pub fn builtin() -> Result<Self> {
        FontRef::try_from_slice(BUNDLED_FONT)
            .map(LabelFont::Builtin)
            .map_err(|e| Error::FontUnavailable(format!("bundled face: {}", e)))
    }

    /// Load `preferred` if given, else the first usable system face, else the
    /// bundled face.
    pub fn load(preferred: Option<&Path>) -> Result<Self> {
        if let Some(path) = preferred {
            match Self::from_file(path) {
                Ok(font) => return Ok(font),
                Err(e) => warn!("{}; trying system fonts", e),
            }
        }

        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(font) => {
                    debug!(font = %path.display(), "using system font");
                    return Ok(font);
                }
                Err(e) => warn!("{}", e),
            }
        }

        warn!("{}", Error::FontUnavailable("no system font found, using bundled face".to_string()));
        Self::builtin()
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, LabelFont::Builtin(_))
    }

    /// Extent of `text` in pixels at the given pixel size.
    pub fn text_size(&self, size: u32, text: &str) -> (u32, u32) {
        match self {
            LabelFont::Scalable(font) => text_size(size as f32, font, text),
            LabelFont::Builtin(font) => text_size(size as f32, font, text),
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`. Clipped to the canvas.
    pub fn draw(&self, canvas: &mut RgbaImage, color: Rgba<u8>, x: i32, y: i32, size: u32, text: &str) {
        match self {
            LabelFont::Scalable(font) => draw_text_mut(canvas, color, x, y, size as f32, font, text),
            LabelFont::Builtin(font) => draw_text_mut(canvas, color, x, y, size as f32, font, text),
        }
    }
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelFont::Scalable(_) => f.write_str("LabelFont::Scalable"),
            LabelFont::Builtin(_) => f.write_str("LabelFont::Builtin"),
        }
    }
}
