//! normalforge normal map kernel
//!
//! Converts single-channel heightmaps into tangent-space normal maps.
//!
//! # Pipeline
//!
//! 1. Samples are normalized to `[0, 1]` ([`HeightmapGrid`]).
//! 2. A 3x3 Sobel pair estimates `(dx, dy)` per cell, with reflect-101
//!    border extension ([`sobel_gradients`]).
//! 3. Both derivatives are scaled by `strength`, the candidate
//!    `(-dx, dy, 1)` is normalized ([`compute_normals`]).
//! 4. Components are remapped from `[-1, 1]` to `[0, 255]` and stored in
//!    (Z, Y, X) channel order ([`encode_normals`]).
//!
//! A flat heightmap therefore stores every pixel as `(255, 128, 128)`. PNG
//! output writes the same pixels as RGB `(X, Y, Z)`, so a flat map reads
//! `(128, 128, 255)` in an image viewer.
//!
//! # Example
//!
//! ```
//! use normalforge_core::{generate, HeightmapGrid};
//!
//! let grid = HeightmapGrid::flat(4, 4, 0.5).unwrap();
//! let image = generate(&grid, 1.0).unwrap();
//! assert_eq!(image.stored(0, 0), [255, 128, 128]);
//! ```
//!
//! # Determinism
//!
//! The PNG encoder uses fixed compression and filter settings, so the same
//! heightmap and strength always produce byte-identical output with the same
//! BLAKE3 hash.

pub mod decode;
pub mod error;
pub mod maps;
pub mod normal_map;
pub mod png;

pub use decode::{decode_heightmap, load_heightmap};
pub use error::{CodedError, NormalMapError};
pub use maps::{EncodedNormalImage, GradientField, HeightmapGrid, NormalVector};
pub use normal_map::{
    compute_normals, encode_normals, encode_png, generate, generate_normal_map, sobel_gradients,
    validate_strength, NormalMapResult, DEFAULT_STRENGTH,
};
pub use png::{PngConfig, PngError};
