use std::fmt;
use std::path::Path;

use image::ImageFormat;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{CompressError, Result};

lazy_static! {
    static ref SUPPORTED_MIME: Regex = Regex::new(r"^image/(jpeg|png)$").unwrap();
}

/// The two image types the compressor accepts and produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
}

impl ImageMime {
    /// Parse a MIME string, rejecting anything that is not PNG or JPEG.
    pub fn parse(mime_type: &str) -> Result<Self> {
        let normalized = mime_type.trim().to_ascii_lowercase();
        let caps = SUPPORTED_MIME
            .captures(&normalized)
            .ok_or_else(|| CompressError::UnsupportedFormat(mime_type.to_string()))?;
        match &caps[1] {
            "png" => Ok(ImageMime::Png),
            _ => Ok(ImageMime::Jpeg),
        }
    }

    pub fn from_format(format: ImageFormat) -> Result<Self> {
        match format {
            ImageFormat::Png => Ok(ImageMime::Png),
            ImageFormat::Jpeg => Ok(ImageMime::Jpeg),
            other => Err(CompressError::UnsupportedFormat(
                other.to_mime_type().to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
        }
    }

    pub fn format(&self) -> ImageFormat {
        match self {
            ImageMime::Png => ImageFormat::Png,
            ImageMime::Jpeg => ImageFormat::Jpeg,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageMime::Png => "png",
            ImageMime::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-requested quality in `[0.01, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct QualityFraction(f32);

impl QualityFraction {
    pub const MIN: f32 = 0.01;
    pub const MAX: f32 = 1.0;

    pub fn new(value: f32) -> Result<Self> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Ok(QualityFraction(value))
        } else {
            Err(CompressError::InvalidQuality(value))
        }
    }

    /// Slider value in percent (1-100).
    pub fn from_percent(percent: u8) -> Result<Self> {
        Self::new(percent as f32 / 100.0)
    }

    /// Slider value as JavaScript hands it over; fractional percentages are kept.
    pub fn from_percent_value(percent: f64) -> Result<Self> {
        if !percent.is_finite() || !(1.0..=100.0).contains(&percent) {
            return Err(CompressError::InvalidQuality(percent as f32 / 100.0));
        }
        Self::new(percent as f32 / 100.0)
    }

    pub fn get(&self) -> f32 {
        self.0
    }
}

/// An image selected for compression. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    name: String,
    mime: ImageMime,
    bytes: Vec<u8>,
}

impl SourceImage {
    /// Build a source from an uploaded file's name, declared MIME type and content.
    pub fn new(name: impl Into<String>, mime_type: &str, bytes: Vec<u8>) -> Result<Self> {
        let mime = ImageMime::parse(mime_type)?;
        Ok(Self::with_mime(name, mime, bytes))
    }

    pub fn with_mime(name: impl Into<String>, mime: ImageMime, bytes: Vec<u8>) -> Self {
        SourceImage {
            name: name.into(),
            mime,
            bytes,
        }
    }

    /// Read a file from disk, sniffing its type from the content.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let format = image::guess_format(&bytes)
            .map_err(|_| CompressError::UnsupportedFormat(path.display().to_string()))?;
        let mime = ImageMime::from_format(format)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("image.{}", mime.extension()));
        Ok(Self::with_mime(name, mime, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
