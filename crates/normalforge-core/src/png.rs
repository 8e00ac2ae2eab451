//! Deterministic PNG writer for encoded normal maps.
//!
//! Uses fixed compression settings so the same normal map always encodes to
//! byte-identical output, which keeps output hashes stable across runs.

use std::io::Write;

use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use thiserror::Error;

use crate::maps::EncodedNormalImage;

/// Errors from PNG operations.
#[derive(Debug, Error)]
pub enum PngError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
}

/// PNG export configuration for deterministic output.
#[derive(Debug, Clone)]
pub struct PngConfig {
    /// Compression level. Use a fixed value for determinism.
    pub compression: Compression,
    /// Filter type. Use a fixed value for determinism.
    pub filter: FilterType,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Default,
            filter: FilterType::NoFilter,
        }
    }
}

/// Write an encoded normal map as a 3-channel, 8-bit PNG to any writer.
///
/// The image is stored as (Z, Y, X), the blue-green-red layout of the
/// packed buffer. The PNG gets the same pixels as red-green-blue, so red
/// carries X, green Y and blue Z, and a flat map reads (128, 128, 255).
pub fn write_normal_to_writer<W: Write>(
    image: &EncodedNormalImage,
    writer: W,
    config: &PngConfig,
) -> Result<(), PngError> {
    let expected = image.width as usize * image.height as usize * 3;
    if image.width == 0 || image.height == 0 || image.data.len() != expected {
        return Err(PngError::InvalidDimensions(format!(
            "Expected {} bytes for {}x{} image, got {}",
            expected,
            image.width,
            image.height,
            image.data.len()
        )));
    }

    let mut encoder = Encoder::new(writer, image.width, image.height);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&image.to_rgb())?;
    png_writer.finish()?;

    Ok(())
}

/// Compute the BLAKE3 hash of PNG data.
pub fn hash_png(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Encode to a `Vec<u8>` and return the bytes with their hash.
pub fn write_normal_to_vec_with_hash(
    image: &EncodedNormalImage,
    config: &PngConfig,
) -> Result<(Vec<u8>, String), PngError> {
    let mut data = Vec::new();
    write_normal_to_writer(image, &mut data, config)?;
    let hash = hash_png(&data);
    Ok((data, hash))
}
