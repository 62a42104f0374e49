use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use image_compressor_rust::{
    compress_source, format_file_size, ImageEngine, QualityFraction, SourceImage,
};

/// Adaptive PNG/JPEG compressor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image (PNG or JPEG)
    input: PathBuf,

    /// Output file [default: compressed_<name> next to the input]
    output: Option<PathBuf>,

    /// Quality in percent (1-100)
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,
}

fn default_output(input: &Path, file_name: &str) -> PathBuf {
    input.with_file_name(file_name)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let quality = QualityFraction::from_percent(args.quality)?;
    let source = SourceImage::from_path(&args.input)
        .with_context(|| format!("Failed to load image {:?}", args.input))?;
    println!(
        "Loaded {} ({}, {})",
        source.name(),
        source.mime(),
        format_file_size(source.size())
    );

    let start = Instant::now();
    let result = compress_source(&ImageEngine::new(), &source, quality)
        .context("Image compression failed, the original was left untouched")?;
    println!("Compressed in {:.2?}", start.elapsed());

    println!("Original size: {}", result.original_summary());
    println!("New size:      {}", result.summary());

    let output = match (&args.output, result.is_already_optimal()) {
        (Some(path), _) => path.clone(),
        (None, true) => {
            println!("Nothing written, the original is already optimal.");
            return Ok(());
        }
        (None, false) => default_output(&args.input, &result.file_name),
    };

    std::fs::write(&output, &result.bytes)
        .with_context(|| format!("Failed to write {:?}", output))?;
    println!("Saved to {:?}", output);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_sits_next_to_input() {
        let out = default_output(Path::new("/tmp/pics/cat.png"), "compressed_cat.png");
        assert_eq!(out, PathBuf::from("/tmp/pics/compressed_cat.png"));
    }

    #[test]
    fn test_quality_range_is_enforced() {
        assert!(Args::try_parse_from(["bin", "in.png", "--quality", "0"]).is_err());
        assert!(Args::try_parse_from(["bin", "in.png", "--quality", "101"]).is_err());
        let args = Args::try_parse_from(["bin", "in.png"]).unwrap();
        assert_eq!(args.quality, 80);
        assert!(args.output.is_none());
    }
}
