//! Configuration error types.

use thiserror::Error;

/// Errors reported by [`RenderConfig::validate`](crate::RenderConfig::validate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("Invalid extent: {width}x{height}")]
    ZeroExtent { width: u32, height: u32 },

    /// The requested swap image count is zero.
    #[error("Requested swap image count must be at least 1")]
    ZeroImageCount,

    /// The frame-in-flight ring is empty.
    #[error("Frames in flight must be at least 1")]
    ZeroFramesInFlight,

    /// A fence wait with a zero timeout would spin.
    #[error("Fence timeout must be non-zero")]
    ZeroFenceTimeout,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, ConfigError>;
