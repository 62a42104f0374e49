//! Adaptive compression policy.
//!
//! Picks engine parameters from the source size and decides, after each
//! attempt, whether to accept it, retry once more aggressively, or fall back
//! to the original file. No I/O happens here.

use crate::source::{ImageMime, QualityFraction};

const MIB: f64 = 1024.0 * 1024.0;

const BASE_TARGET_MB: f64 = 1.0;
const BASE_MAX_DIMENSION: u32 = 2000;

const LARGE_THRESHOLD: u64 = 5 * 1024 * 1024;
const LARGE_MAX_DIMENSION: u32 = 1500;

const MEDIUM_THRESHOLD: u64 = 2 * 1024 * 1024;
const MEDIUM_MAX_DIMENSION: u32 = 1800;

const RETRY_TARGET_FACTOR: f64 = 0.7;
const RETRY_QUALITY_CAP: f32 = 0.7;

/// Parameters handed to the engine for a single attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionParameters {
    pub target_size_mb: f64,
    pub max_dimension_px: u32,
    pub initial_quality: f32,
    pub output_mime: ImageMime,
}

impl CompressionParameters {
    pub fn target_size_bytes(&self) -> u64 {
        (self.target_size_mb * MIB).round() as u64
    }

    /// Parameters for the second, more aggressive attempt.
    pub fn aggressive(&self) -> Self {
        CompressionParameters {
            target_size_mb: self.target_size_mb * RETRY_TARGET_FACTOR,
            initial_quality: self.initial_quality.min(RETRY_QUALITY_CAP),
            ..*self
        }
    }
}

/// What to do after the first attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Keep the attempt; carries its size in bytes.
    Accept(u64),
    /// Run one more attempt with these parameters.
    Retry(CompressionParameters),
}

/// What to do after the retry. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Keep the retry; carries its size in bytes.
    Accept(u64),
    /// Present the original file.
    Fallback,
}

pub fn derive_parameters(
    source_size_bytes: u64,
    user_quality: QualityFraction,
    mime: ImageMime,
) -> CompressionParameters {
    let (target_size_mb, max_dimension_px) = if source_size_bytes > LARGE_THRESHOLD {
        (source_size_bytes as f64 / LARGE_THRESHOLD as f64, LARGE_MAX_DIMENSION)
    } else if source_size_bytes > MEDIUM_THRESHOLD {
        (source_size_bytes as f64 / MEDIUM_THRESHOLD as f64, MEDIUM_MAX_DIMENSION)
    } else {
        (BASE_TARGET_MB, BASE_MAX_DIMENSION)
    };

    CompressionParameters {
        target_size_mb,
        max_dimension_px,
        initial_quality: user_quality.get(),
        output_mime: mime,
    }
}

/// Judge the first attempt.
pub fn decide(
    source_size_bytes: u64,
    first_attempt_size_bytes: u64,
    params: &CompressionParameters,
) -> Decision {
    if first_attempt_size_bytes < source_size_bytes {
        Decision::Accept(first_attempt_size_bytes)
    } else {
        Decision::Retry(params.aggressive())
    }
}

/// Judge the retry. There is never a third attempt.
pub fn decide_retry(source_size_bytes: u64, retry_size_bytes: u64) -> RetryDecision {
    if retry_size_bytes < source_size_bytes {
        RetryDecision::Accept(retry_size_bytes)
    } else {
        RetryDecision::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn quality(q: f32) -> QualityFraction {
        QualityFraction::new(q).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_large_tier() {
        for size in [5 * MB + 1, 6 * MB, 40 * MB] {
            let p = derive_parameters(size, quality(0.8), ImageMime::Jpeg);
            assert_eq!(p.max_dimension_px, 1500);
            assert!(approx(p.target_size_mb, size as f64 / (5.0 * MB as f64)));
        }
    }

    #[test]
    fn test_medium_tier() {
        for size in [2 * MB + 1, 3 * MB, 5 * MB] {
            let p = derive_parameters(size, quality(0.8), ImageMime::Jpeg);
            assert_eq!(p.max_dimension_px, 1800);
            assert!(approx(p.target_size_mb, size as f64 / (2.0 * MB as f64)));
        }
    }

    #[test]
    fn test_base_tier() {
        for size in [1, 500 * 1024, 2 * MB] {
            let p = derive_parameters(size, quality(0.5), ImageMime::Png);
            assert_eq!(p.max_dimension_px, 2000);
            assert_eq!(p.target_size_mb, 1.0);
            assert_eq!(p.initial_quality, 0.5);
            assert_eq!(p.output_mime, ImageMime::Png);
        }
    }

    #[test]
    fn test_six_mib_scenario() {
        let source = 6 * MB;
        let p = derive_parameters(source, quality(0.8), ImageMime::Jpeg);
        assert_eq!(p.max_dimension_px, 1500);
        assert!(approx(p.target_size_mb, 1.2));

        let first = (6.2 * MB as f64) as u64;
        let retry = match decide(source, first, &p) {
            Decision::Retry(r) => r,
            other => panic!("expected retry, got {:?}", other),
        };
        assert!(approx(retry.target_size_mb, 0.84));
        assert_eq!(retry.initial_quality, 0.7);
        assert_eq!(retry.max_dimension_px, 1500);
        assert_eq!(retry.output_mime, ImageMime::Jpeg);

        assert_eq!(decide_retry(source, 4 * MB), RetryDecision::Accept(4 * MB));
    }

    #[test]
    fn test_accepts_smaller_first_attempt() {
        let p = derive_parameters(1000, quality(0.9), ImageMime::Png);
        assert_eq!(decide(1000, 999, &p), Decision::Accept(999));
    }

    #[test]
    fn test_equal_size_is_not_a_win() {
        let p = derive_parameters(1000, quality(0.9), ImageMime::Png);
        assert!(matches!(decide(1000, 1000, &p), Decision::Retry(_)));
        assert_eq!(decide_retry(1000, 1000), RetryDecision::Fallback);
        assert_eq!(decide_retry(1000, 5000), RetryDecision::Fallback);
    }

    #[test]
    fn test_retry_keeps_lower_quality() {
        let p = derive_parameters(1000, quality(0.4), ImageMime::Jpeg);
        assert_eq!(p.aggressive().initial_quality, 0.4);
    }

    #[test]
    fn test_target_size_bytes() {
        let p = derive_parameters(100, quality(1.0), ImageMime::Jpeg);
        assert_eq!(p.target_size_bytes(), MB);
    }
}
