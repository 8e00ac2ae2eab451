//! Heightmap to tangent-space normal map generation.
//!
//! The kernel runs in three stages: Sobel gradients, unit normals, byte
//! encoding. [`generate`] chains them over an in-memory grid and performs no
//! I/O. [`generate_normal_map`] is the byte-level entry point used by batch
//! tooling: PNG in, PNG out.

use crate::decode::decode_heightmap;
use crate::error::NormalMapError;
use crate::maps::{EncodedNormalImage, HeightmapGrid};
use crate::png::{self, PngConfig};

mod conversion;


pub use conversion::{compute_normals, encode_component, encode_normals, sobel_gradients};

/// Neutral bump strength.
pub const DEFAULT_STRENGTH: f64 = 1.0;

/// Result of generating a normal map.
#[derive(Debug)]
pub struct NormalMapResult {
    /// The generated normal map data (3-channel PNG).
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// BLAKE3 hash of the PNG file.
    pub hash: String,
}

/// Check that a strength is usable: finite and strictly positive.
pub fn validate_strength(strength: f64) -> Result<(), NormalMapError> {
    if strength.is_finite() && strength > 0.0 {
        Ok(())
    } else {
        Err(NormalMapError::InvalidParameter(format!(
            "strength must be a finite value > 0, got {}",
            strength
        )))
    }
}

/// Convert a heightmap grid into an encoded normal image.
pub fn generate(grid: &HeightmapGrid, strength: f64) -> Result<EncodedNormalImage, NormalMapError> {
    validate_strength(strength)?;

    let gradients = sobel_gradients(grid);
    let normals = compute_normals(&gradients, strength);
    Ok(encode_normals(grid.width(), grid.height(), &normals))
}

/// Decode a PNG heightmap, generate its normal map and encode it as PNG.
pub fn generate_normal_map(
    heightmap_png: &[u8],
    strength: f64,
) -> Result<NormalMapResult, NormalMapError> {
    validate_strength(strength)?;

    let grid = decode_heightmap(heightmap_png)?;
    let image = generate(&grid, strength)?;
    encode_png(&image)
}

/// Encode a normal image with the default deterministic PNG settings.
pub fn encode_png(image: &EncodedNormalImage) -> Result<NormalMapResult, NormalMapError> {
    let (data, hash) = png::write_normal_to_vec_with_hash(image, &PngConfig::default())?;

    Ok(NormalMapResult {
        data,
        width: image.width,
        height: image.height,
        hash,
    })
}
