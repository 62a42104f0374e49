use thiserror::Error;

/// Errors surfaced by the compression pipeline.
#[derive(Debug, Error)]
pub enum CompressError {
    /// Only `image/png` and `image/jpeg` are accepted.
    #[error("Unsupported image type: {0} (only PNG and JPEG are accepted)")]
    UnsupportedFormat(String),

    #[error("Quality must be within 0.01..=1.0, got {0}")]
    InvalidQuality(f32),

    /// The image engine failed to decode or re-encode the source.
    #[error("Image compression failed: {0}")]
    Engine(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for CompressError {
    fn from(e: image::ImageError) -> Self {
        CompressError::Engine(e.to_string())
    }
}

pub type Result<T, E = CompressError> = std::result::Result<T, E>;
