//! Adaptive PNG/JPEG compression for the browser and the command line.
//!
//! The policy picks target size, max dimension and quality from the source
//! size, runs the engine, retries once more aggressively if the file did not
//! shrink, and otherwise hands back the original untouched.

pub mod engine;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod policy;
pub mod session;
pub mod source;

use wasm_bindgen::prelude::*;

pub use engine::{CompressionEngine, EncodedImage, ImageEngine};
pub use error::{CompressError, Result};
pub use format::{format_file_size, format_reduction};
pub use pipeline::{compress_source, Outcome, Presentation};
pub use policy::{
    decide, decide_retry, derive_parameters, CompressionParameters, Decision, RetryDecision,
};
pub use session::{Session, SessionTicket, SessionTracker};
pub use source::{ImageMime, QualityFraction, SourceImage};

/// Compression result as seen from JavaScript.
#[wasm_bindgen]
pub struct CompressedImage {
    inner: Presentation,
}

#[wasm_bindgen]
impl CompressedImage {
    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(&self.inner.bytes[..])
    }

    #[wasm_bindgen(getter, js_name = mimeType)]
    pub fn mime_type(&self) -> String {
        self.inner.mime.as_str().to_string()
    }

    /// `compressed_<name>`, or the original name when nothing was gained.
    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.inner.file_name.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn size(&self) -> f64 {
        self.inner.size() as f64
    }

    #[wasm_bindgen(getter, js_name = originalSize)]
    pub fn original_size(&self) -> f64 {
        self.inner.original_size as f64
    }

    #[wasm_bindgen(getter)]
    pub fn summary(&self) -> String {
        self.inner.summary()
    }

    #[wasm_bindgen(getter, js_name = originalSummary)]
    pub fn original_summary(&self) -> String {
        self.inner.original_summary()
    }

    #[wasm_bindgen(getter, js_name = alreadyOptimal)]
    pub fn already_optimal(&self) -> bool {
        self.inner.is_already_optimal()
    }
}

#[wasm_bindgen(js_name = compressImage)]
pub fn compress_image(
    input: &[u8],
    name: &str,
    mime_type: &str,
    quality_percent: f64,
) -> Result<CompressedImage, JsError> {
    let run = || -> Result<Presentation> {
        let quality = QualityFraction::from_percent_value(quality_percent)?;
        let source = SourceImage::new(name, mime_type, input.to_vec())?;
        compress_source(&ImageEngine::new(), &source, quality)
    };

    match run() {
        Ok(inner) => Ok(CompressedImage { inner }),
        Err(e) => {
            web_sys::console::error_1(&format!("Compression failed for {}: {}", name, e).into());
            Err(JsError::new(&e.to_string()))
        }
    }
}

#[wasm_bindgen(js_name = formatFileSize)]
pub fn format_size(bytes: f64) -> String {
    format_file_size(bytes.max(0.0) as u64)
}

/// Session ids for the page, so results of superseded requests can be ignored.
#[wasm_bindgen]
#[derive(Default)]
pub struct CompressionSessions {
    tracker: SessionTracker,
}

#[wasm_bindgen]
impl CompressionSessions {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> f64 {
        self.tracker.begin().id() as f64
    }

    #[wasm_bindgen(js_name = isCurrent)]
    pub fn is_current(&self, id: f64) -> bool {
        self.tracker.is_latest(id as u64)
    }
}
