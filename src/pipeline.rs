//! Runs the policy against an engine and builds what the user gets back.

use log::{error, info, warn};

use crate::engine::{CompressionEngine, EncodedImage};
use crate::error::Result;
use crate::format::{format_file_size, format_reduction};
use crate::policy::{
    decide, decide_retry, derive_parameters, CompressionParameters, Decision, RetryDecision,
};
use crate::source::{ImageMime, QualityFraction, SourceImage};

const DOWNLOAD_PREFIX: &str = "compressed_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An engine attempt shrank the file.
    Compressed { attempts: u8 },
    /// Neither attempt beat the original, which is presented instead.
    AlreadyOptimal,
}

/// The artifact handed back to the shell for display and download.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
    pub file_name: String,
    pub original_size: u64,
    pub outcome: Outcome,
}

impl Presentation {
    fn compressed(source: &SourceImage, encoded: EncodedImage, attempts: u8) -> Self {
        Presentation {
            bytes: encoded.bytes,
            mime: encoded.mime,
            file_name: format!("{}{}", DOWNLOAD_PREFIX, source.name()),
            original_size: source.size(),
            outcome: Outcome::Compressed { attempts },
        }
    }

    fn original(source: &SourceImage) -> Self {
        Presentation {
            bytes: source.bytes().to_vec(),
            mime: source.mime(),
            file_name: source.name().to_string(),
            original_size: source.size(),
            outcome: Outcome::AlreadyOptimal,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_already_optimal(&self) -> bool {
        self.outcome == Outcome::AlreadyOptimal
    }

    /// Percentage saved, one decimal.
    pub fn reduction(&self) -> String {
        format_reduction(self.original_size, self.size())
    }

    pub fn original_summary(&self) -> String {
        format_file_size(self.original_size)
    }

    pub fn summary(&self) -> String {
        match self.outcome {
            Outcome::Compressed { .. } => {
                format!("{} (reduced {}%)", format_file_size(self.size()), self.reduction())
            }
            Outcome::AlreadyOptimal => {
                format!("{} (already optimal)", format_file_size(self.size()))
            }
        }
    }
}

/// Compress `source` at `quality`, retrying once more aggressively and falling
/// back to the original when neither attempt makes the file smaller.
///
/// Engine failures are returned as errors, never turned into a fallback.
pub fn compress_source<E>(
    engine: &E,
    source: &SourceImage,
    quality: QualityFraction,
) -> Result<Presentation>
where
    E: CompressionEngine + ?Sized,
{
    let source_size = source.size();
    let params = derive_parameters(source_size, quality, source.mime());
    info!(
        "Compressing {} ({}): target {:.2} MB, max {}px, quality {:.2}",
        source.name(),
        format_file_size(source_size),
        params.target_size_mb,
        params.max_dimension_px,
        params.initial_quality
    );

    let first = run_attempt(engine, source, &params, 1)?;
    let presentation = match decide(source_size, first.size(), &params) {
        Decision::Accept(_) => Presentation::compressed(source, first, 1),
        Decision::Retry(retry_params) => {
            info!(
                "First attempt gave {} (not smaller), retrying with target {:.2} MB, quality {:.2}",
                format_file_size(first.size()),
                retry_params.target_size_mb,
                retry_params.initial_quality
            );
            let second = run_attempt(engine, source, &retry_params, 2)?;
            match decide_retry(source_size, second.size()) {
                RetryDecision::Accept(_) => Presentation::compressed(source, second, 2),
                RetryDecision::Fallback => {
                    warn!(
                        "{} is already optimal, keeping the original ({})",
                        source.name(),
                        format_file_size(source_size)
                    );
                    Presentation::original(source)
                }
            }
        }
    };

    info!(
        "Compression info: original {}, result {}, reduction {}%, type {}",
        presentation.original_summary(),
        format_file_size(presentation.size()),
        presentation.reduction(),
        presentation.mime
    );
    Ok(presentation)
}

fn run_attempt<E>(
    engine: &E,
    source: &SourceImage,
    params: &CompressionParameters,
    attempt: u8,
) -> Result<EncodedImage>
where
    E: CompressionEngine + ?Sized,
{
    engine.compress(source, params).map_err(|e| {
        error!("Attempt {} on {} failed: {}", attempt, source.name(), e);
        e
    })
}
