//! Error taxonomy for the stitching core.
//!
//! Per-pixel issues (an inverse transform that fails to converge, a sample
//! landing outside the source) are absorbed locally as zero-weight pixels and
//! never surface here. Everything that reaches the caller is a whole-stitch
//! or per-image failure.

use thiserror::Error;

/// Errors surfaced by the stitching core.
#[derive(Debug, Error)]
pub enum StitchError {
    /// Invalid configuration detected before any remapping work starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A source image's geometry produced no usable canvas coverage.
    #[error("geometry failure for image {image_index}: {reason}")]
    Geometry { image_index: usize, reason: String },

    /// The pixel-data accessor could not serve a request.
    #[error("pixel source: {0}")]
    PixelSource(String),

    /// A blender received a region it cannot accept. Indicates an
    /// orchestration bug, always fatal.
    #[error("blend accumulation: {0}")]
    Accumulation(String),

    /// The stitch was cancelled before completion. No partial canvas is
    /// returned.
    #[error("stitch cancelled")]
    Cancelled,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StitchError>;
