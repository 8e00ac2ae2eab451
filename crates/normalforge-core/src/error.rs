//! Error types for normal map generation.

use thiserror::Error;

use crate::png::PngError;

/// Common trait for errors surfaced by the conversion tools.
///
/// Gives every error a stable code for reports and a category for grouping,
/// so callers can handle kernel and tool failures uniformly.
pub trait CodedError: std::error::Error {
    /// Stable error code, e.g. "NORMAL_001".
    fn code(&self) -> &'static str;

    /// Error category, e.g. "normal_map" or "reduce".
    fn category(&self) -> &'static str;
}

/// Errors from normal map generation.
#[derive(Debug, Error)]
pub enum NormalMapError {
    #[error("Failed to decode heightmap: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Heightmap has zero dimensions ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Non-finite height sample at ({x}, {y})")]
    InvalidSample { x: u32, y: u32 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("PNG error: {0}")]
    Png(#[from] PngError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodedError for NormalMapError {
    fn code(&self) -> &'static str {
        match self {
            NormalMapError::Decode(_) => "NORMAL_001",
            NormalMapError::EmptyImage { .. } => "NORMAL_002",
            NormalMapError::InvalidSample { .. } => "NORMAL_003",
            NormalMapError::InvalidParameter(_) => "NORMAL_004",
            NormalMapError::Png(_) => "NORMAL_005",
            NormalMapError::Io(_) => "NORMAL_006",
        }
    }

    fn category(&self) -> &'static str {
        "normal_map"
    }
}

impl NormalMapError {
    /// Whether the source image itself was unusable (unreadable, undecodable
    /// or empty), as opposed to a bad parameter or an encoding failure.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            NormalMapError::Decode(_)
                | NormalMapError::EmptyImage { .. }
                | NormalMapError::InvalidSample { .. }
                | NormalMapError::Io(_)
        )
    }
}
