use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::DynamicImage;
use log::debug;
use rayon::prelude::*;

use crate::error::Result;
use crate::policy::CompressionParameters;
use crate::source::{ImageMime, SourceImage};

/// Extra encode passes tried when the first pass misses the target size.
const MAX_REDUCTION_STEPS: i32 = 10;
const REDUCTION_FACTOR: f32 = 0.95;

/// One reduction step: (step, encoded bytes, width, height).
type Variant = (i32, Vec<u8>, u32, u32);

/// Output of one engine invocation.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
    pub width: u32,
    pub height: u32,
    /// What the engine did, for logging.
    pub actions: Vec<String>,
}

impl EncodedImage {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Something that can recompress an image given policy parameters.
pub trait CompressionEngine {
    fn compress(&self, source: &SourceImage, params: &CompressionParameters)
        -> Result<EncodedImage>;
}

/// Engine backed by the `image` crate.
///
/// Resizes to the parameter's max dimension, encodes at the initial quality
/// and, when the result is still above the target size, searches a few
/// lower-quality / smaller-dimension variants in parallel.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageEngine;

impl ImageEngine {
    pub fn new() -> Self {
        ImageEngine
    }
}

impl CompressionEngine for ImageEngine {
    fn compress(
        &self,
        source: &SourceImage,
        params: &CompressionParameters,
    ) -> Result<EncodedImage> {
        let mut actions = Vec::new();
        let img = image::load_from_memory_with_format(source.bytes(), source.mime().format())?;

        let max_dim = params.max_dimension_px;
        let resized = img.width() > max_dim || img.height() > max_dim;
        let img = if resized {
            let new_img = img.resize(max_dim, max_dim, FilterType::Lanczos3);
            actions.push(format!(
                "resize {}x{} -> {}x{}",
                img.width(),
                img.height(),
                new_img.width(),
                new_img.height()
            ));
            new_img
        } else {
            actions.push(format!("keep dims {}x{}", img.width(), img.height()));
            img
        };

        let target = params.target_size_bytes();
        let mime = params.output_mime;
        let first = encode(&img, mime, params.initial_quality)?;
        actions.push(format!(
            "encode {}(q={:.2}) = {} bytes",
            mime, params.initial_quality, first.len()
        ));

        let (bytes, width, height) = if first.len() as u64 <= target {
            (first, img.width(), img.height())
        } else {
            // Shrinking dimensions is the only lever PNG has, so always allow it there.
            let scale_dims = resized || mime == ImageMime::Png;
            let steps: Vec<Result<Variant>> = (1..=MAX_REDUCTION_STEPS)
                .into_par_iter()
                .map(|step| -> Result<Variant> {
                    let factor = REDUCTION_FACTOR.powi(step);
                    let candidate = if scale_dims {
                        let w = ((img.width() as f32 * factor).round() as u32).max(1);
                        let h = ((img.height() as f32 * factor).round() as u32).max(1);
                        img.resize(w, h, FilterType::Lanczos3)
                    } else {
                        img.clone()
                    };
                    let bytes = encode(&candidate, mime, params.initial_quality * factor)?;
                    Ok((step, bytes, candidate.width(), candidate.height()))
                })
                .collect();
            let steps = steps.into_iter().collect::<Result<Vec<_>>>()?;

            let chosen = steps
                .iter()
                .find(|(_, bytes, _, _)| bytes.len() as u64 <= target)
                .or_else(|| steps.iter().min_by_key(|(_, bytes, _, _)| bytes.len()));

            match chosen {
                Some((step, bytes, w, h)) if bytes.len() < first.len() => {
                    actions.push(format!(
                        "reduce step {} -> {}x{} = {} bytes (target {})",
                        step,
                        w,
                        h,
                        bytes.len(),
                        target
                    ));
                    (bytes.clone(), *w, *h)
                }
                _ => {
                    actions.push(format!("no smaller variant (target {})", target));
                    (first, img.width(), img.height())
                }
            }
        };

        debug!("{}: {}", source.name(), actions.join(", "));

        Ok(EncodedImage {
            bytes,
            mime,
            width,
            height,
            actions,
        })
    }
}

fn encode(img: &DynamicImage, mime: ImageMime, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match mime {
        ImageMime::Jpeg => {
            let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, q);
            rgb.write_with_encoder(encoder)?;
        }
        ImageMime::Png => {
            let encoder = PngEncoder::new_with_quality(
                Cursor::new(&mut buffer),
                CompressionType::Best,
                PngFilter::Adaptive,
            );
            img.write_with_encoder(encoder)?;
        }
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::derive_parameters;
    use crate::source::QualityFraction;
    use image::{Rgb, RgbImage};

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        }))
    }

    fn source_of(img: &DynamicImage, mime: ImageMime) -> SourceImage {
        let bytes = encode(img, mime, 1.0).unwrap();
        SourceImage::with_mime(format!("test.{}", mime.extension()), mime, bytes)
    }

    #[test]
    fn test_resizes_to_max_dimension() {
        let source = source_of(&gradient(400, 200), ImageMime::Jpeg);
        let mut params =
            derive_parameters(source.size(), QualityFraction::new(0.8).unwrap(), ImageMime::Jpeg);
        params.max_dimension_px = 100;
        params.target_size_mb = 10.0;

        let out = ImageEngine::new().compress(&source, &params).unwrap();
        assert_eq!((out.width, out.height), (100, 50));
        assert_eq!(out.mime, ImageMime::Jpeg);
        assert!(image::load_from_memory(&out.bytes).is_ok());
        assert!(out.actions[0].starts_with("resize 400x200"));
    }

    #[test]
    fn test_keeps_small_images() {
        let source = source_of(&gradient(64, 48), ImageMime::Png);
        let params =
            derive_parameters(source.size(), QualityFraction::new(0.5).unwrap(), ImageMime::Png);
        let out = ImageEngine::new().compress(&source, &params).unwrap();
        assert_eq!((out.width, out.height), (64, 48));
        assert_eq!(image::guess_format(&out.bytes).unwrap(), image::ImageFormat::Png);
    }

    #[test]
    fn test_png_shrinks_dimensions_towards_target() {
        // Deflate output for a flat image grows with pixel count, so smaller is always smaller.
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(600, 600, Rgb([40, 120, 200])));
        let source = source_of(&flat, ImageMime::Png);
        let mut params =
            derive_parameters(source.size(), QualityFraction::new(1.0).unwrap(), ImageMime::Png);
        params.target_size_mb = 1.0 / (1024.0 * 1024.0);

        let out = ImageEngine::new().compress(&source, &params).unwrap();
        assert!(out.width < 600 && out.height < 600);
        assert!(out.size() < encode(&flat, ImageMime::Png, 1.0).unwrap().len() as u64);
        assert!(out.actions.iter().any(|a| a.starts_with("reduce step")));
        assert_eq!(image::guess_format(&out.bytes).unwrap(), image::ImageFormat::Png);
    }

    #[test]
    fn test_jpeg_lowers_quality_without_resizing() {
        let img = gradient(200, 200);
        let source = source_of(&img, ImageMime::Jpeg);
        let mut params =
            derive_parameters(source.size(), QualityFraction::new(1.0).unwrap(), ImageMime::Jpeg);
        params.target_size_mb = 1.0 / (1024.0 * 1024.0);

        let out = ImageEngine::new().compress(&source, &params).unwrap();
        assert_eq!((out.width, out.height), (200, 200));
        assert!(out.actions[0].starts_with("keep dims 200x200"));
        assert!(out
            .actions
            .iter()
            .any(|a| a.starts_with("reduce step") && a.contains("-> 200x200")));

        let decoded = image::load_from_memory(source.bytes()).unwrap();
        let first_pass = encode(&decoded, ImageMime::Jpeg, 1.0).unwrap();
        assert!(out.size() < first_pass.len() as u64);
    }

    #[test]
    fn test_corrupt_input_is_engine_error() {
        let source = SourceImage::with_mime("broken.jpg", ImageMime::Jpeg, vec![0xFF, 0xD8, 1, 2]);
        let params =
            derive_parameters(source.size(), QualityFraction::new(0.8).unwrap(), ImageMime::Jpeg);
        let err = ImageEngine::new().compress(&source, &params).unwrap_err();
        assert!(matches!(err, crate::error::CompressError::Engine(_)));
    }
}
