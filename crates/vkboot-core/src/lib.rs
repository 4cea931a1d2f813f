//! Core configuration for the vkboot presentation core.
//!
//! This crate provides the types shared by every other vkboot crate:
//! - Render configuration with builder-style setters
//! - Configuration validation errors
//! - Fixed constants of the bootstrap sequence

pub mod config;
pub mod error;

pub use config::{FenceMode, RenderConfig};
pub use error::{ConfigError, Result};

/// Fixed constants of the bootstrap sequence and frame loop.
pub mod constants {
    /// Default surface width in pixels.
    pub const DEFAULT_WIDTH: u32 = 1280;
    /// Default surface height in pixels.
    pub const DEFAULT_HEIGHT: u32 = 720;
    /// Swap image count requested at creation (double buffering).
    pub const REQUESTED_IMAGE_COUNT: u32 = 2;
    /// Timeout of a single fence wait, in nanoseconds (100 ms).
    pub const FENCE_TIMEOUT_NS: u64 = 100_000_000;
    /// Timeout of an image acquire, in nanoseconds. Effectively infinite.
    pub const ACQUIRE_TIMEOUT_NS: u64 = u64::MAX;
    /// Number of frame slots in the synchronization ring.
    pub const FRAMES_IN_FLIGHT: usize = 2;
    /// Clear colour of the default per-image recording (RGBA).
    pub const CLEAR_COLOR: [f32; 4] = [1.0, 0.8, 0.4, 0.0];
}
