//! In-memory buffers used by the normal map kernel.
//!
//! The heightmap grid is the kernel's only input; the gradient field and the
//! normal field are transient intermediates; the encoded image is the output.

use crate::error::NormalMapError;

/// Single-channel heightmap, samples normalized to `[0, 1]`.
///
/// Dimensions and samples are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightmapGrid {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl HeightmapGrid {
    /// Build a grid from row-major samples.
    ///
    /// Out-of-range samples are clamped to `[0, 1]`. Non-finite samples and
    /// zero dimensions are rejected.
    pub fn from_samples(width: u32, height: u32, samples: Vec<f64>) -> Result<Self, NormalMapError> {
        check_dimensions(width, height, samples.len())?;

        let mut data = samples;
        for (index, value) in data.iter_mut().enumerate() {
            if !value.is_finite() {
                return Err(NormalMapError::InvalidSample {
                    x: index as u32 % width,
                    y: index as u32 / width,
                });
            }
            *value = value.clamp(0.0, 1.0);
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a grid from 8-bit luma bytes (divide-by-255 normalization).
    pub fn from_luma8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, NormalMapError> {
        check_dimensions(width, height, bytes.len())?;

        Ok(Self {
            width,
            height,
            data: bytes.iter().map(|&b| f64::from(b) / 255.0).collect(),
        })
    }

    /// Build a grid filled with a single value.
    pub fn flat(width: u32, height: u32, value: f64) -> Result<Self, NormalMapError> {
        let size = width as usize * height as usize;
        Self::from_samples(width, height, vec![value; size])
    }

    /// Build a grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn(
        width: u32,
        height: u32,
        f: impl Fn(u32, u32) -> f64,
    ) -> Result<Self, NormalMapError> {
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Self::from_samples(width, height, samples)
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major samples.
    pub fn samples(&self) -> &[f64] {
        &self.data
    }

    /// Get a sample at the given coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f64 {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx]
    }

    /// Get a sample with reflect-101 border extension.
    ///
    /// `-1` reads index `1`, `n` reads index `n - 2`; an axis of length one
    /// always reads index `0`.
    #[inline]
    pub fn get_reflected(&self, x: i64, y: i64) -> f64 {
        let rx = reflect_101(x, self.width);
        let ry = reflect_101(y, self.height);
        self.get(rx, ry)
    }
}

fn check_dimensions(width: u32, height: u32, len: usize) -> Result<(), NormalMapError> {
    if width == 0 || height == 0 {
        return Err(NormalMapError::EmptyImage { width, height });
    }

    let expected = width as usize * height as usize;
    if len != expected {
        return Err(NormalMapError::InvalidParameter(format!(
            "expected {} samples for {}x{}, got {}",
            expected, width, height, len
        )));
    }

    Ok(())
}

/// Map an out-of-range index back into `0..len` by mirroring around the
/// edge samples without repeating them (`gfedcb|abcdefgh|gfedcba`).
pub(crate) fn reflect_101(index: i64, len: u32) -> u32 {
    let len = i64::from(len);
    if len <= 1 {
        return 0;
    }

    let period = 2 * (len - 1);
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as u32
}

/// Per-cell horizontal and vertical derivative estimates.
#[derive(Debug, Clone)]
pub struct GradientField {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `(dx, dy)` pairs, row-major.
    pub data: Vec<(f64, f64)>,
}

impl GradientField {
    /// Get the gradient at the given coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> (f64, f64) {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

/// Unit surface normal in tangent space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl NormalVector {
    /// The straight-up normal of a flat surface.
    pub const UP: NormalVector = NormalVector {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Encoded normal map, three bytes per pixel in storage order (Z, Y, X).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedNormalImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data, row-major, three bytes per pixel.
    pub data: Vec<u8>,
}

impl EncodedNormalImage {
    pub(crate) fn with_capacity(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: Vec::with_capacity(width as usize * height as usize * 3),
        }
    }

    /// Pixel channels exactly as stored: `[Z, Y, X]`.
    #[inline]
    pub fn stored(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Pixel channels in semantic order: `[X, Y, Z]`.
    #[inline]
    pub fn semantic(&self, x: u32, y: u32) -> [u8; 3] {
        let [z, y_, x_] = self.stored(x, y);
        [x_, y_, z]
    }

    /// Iterate over stored pixels.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    /// Pixel data with every triplet reversed to `[X, Y, Z]`, i.e. RGB.
    pub fn to_rgb(&self) -> Vec<u8> {
        self.data
            .chunks_exact(3)
            .flat_map(|c| [c[2], c[1], c[0]])
            .collect()
    }
}
