//! Heightmap loading.
//!
//! Any PNG the `image` crate can read is accepted (grayscale, palette, RGB,
//! 16-bit) and collapsed to 8-bit luma before normalization.

use std::path::Path;

use image::ImageFormat;

use crate::error::NormalMapError;
use crate::maps::HeightmapGrid;

/// Decode PNG bytes into a heightmap grid.
pub fn decode_heightmap(bytes: &[u8]) -> Result<HeightmapGrid, NormalMapError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    HeightmapGrid::from_luma8(width, height, luma.as_raw())
}

/// Read and decode a heightmap file.
pub fn load_heightmap(path: &Path) -> Result<HeightmapGrid, NormalMapError> {
    let bytes = std::fs::read(path)?;
    decode_heightmap(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_gray(width: u32, height: u32, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
        writer.finish().unwrap();
        out
    }

    #[test]
    fn test_decode_grayscale() {
        let bytes = encode_gray(2, 2, &[0, 255, 51, 102]);
        let grid = decode_heightmap(&bytes).unwrap();
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(1, 0), 1.0);
        assert!((grid.get(0, 1) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_decode_palette() {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, 2, 1);
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_palette(vec![0, 0, 0, 255, 255, 255]);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[1, 0]).unwrap();
            writer.finish().unwrap();
        }

        let grid = decode_heightmap(&out).unwrap();
        assert_eq!(grid.get(0, 0), 1.0);
        assert_eq!(grid.get(1, 0), 0.0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_heightmap(b"definitely not a png").unwrap_err();
        assert!(matches!(err, NormalMapError::Decode(_)));
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_heightmap(Path::new("/nonexistent/heightmap.png")).unwrap_err();
        assert!(matches!(err, NormalMapError::Io(_)));
    }
}
