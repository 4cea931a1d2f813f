//! Render configuration.

use crate::constants;
use crate::error::{ConfigError, Result};

/// How submissions are fenced by the frame synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FenceMode {
    /// A fresh fence per submission, waited on and destroyed before present.
    PerSubmission,
    /// One persistent fence per frame slot, reset before each reuse.
    #[default]
    Recycled,
}

/// Configuration of the bootstrap sequence and the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Requested surface width.
    pub width: u32,
    /// Requested surface height.
    pub height: u32,
    /// Requested swap image count. The driver may hand out more.
    pub requested_image_count: u32,
    /// Size of the frame slot ring.
    pub frames_in_flight: usize,
    /// Submission fencing strategy.
    pub fence_mode: FenceMode,
    /// Timeout of a single fence wait in nanoseconds.
    pub fence_timeout_ns: u64,
    /// Timeout of an image acquire in nanoseconds.
    pub acquire_timeout_ns: u64,
    /// Force FIFO presentation.
    pub vsync: bool,
    /// Transition every swap image to colour-attachment layout at creation.
    /// Off by default: the per-frame recording transitions the acquired image.
    pub transition_swap_images: bool,
    /// Clear colour used by the default recording.
    pub clear_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: constants::DEFAULT_WIDTH,
            height: constants::DEFAULT_HEIGHT,
            requested_image_count: constants::REQUESTED_IMAGE_COUNT,
            frames_in_flight: constants::FRAMES_IN_FLIGHT,
            fence_mode: FenceMode::default(),
            fence_timeout_ns: constants::FENCE_TIMEOUT_NS,
            acquire_timeout_ns: constants::ACQUIRE_TIMEOUT_NS,
            vsync: false,
            transition_swap_images: false,
            clear_color: constants::CLEAR_COLOR,
        }
    }
}

impl RenderConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the surface dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the requested swap image count.
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.requested_image_count = count;
        self
    }

    /// Set the number of frame slots.
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Set the fencing strategy.
    pub fn with_fence_mode(mut self, mode: FenceMode) -> Self {
        self.fence_mode = mode;
        self
    }

    /// Set the fence wait timeout.
    pub fn with_fence_timeout_ns(mut self, timeout_ns: u64) -> Self {
        self.fence_timeout_ns = timeout_ns;
        self
    }

    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable the initial swap image layout transition.
    pub fn with_swap_image_transition(mut self, enable: bool) -> Self {
        self.transition_swap_images = enable;
        self
    }

    /// Set the clear colour.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Check the configuration for values the bootstrap cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroExtent {
                width: self.width,
                height: self.height,
            });
        }
        if self.requested_image_count == 0 {
            return Err(ConfigError::ZeroImageCount);
        }
        if self.frames_in_flight == 0 {
            return Err(ConfigError::ZeroFramesInFlight);
        }
        if self.fence_timeout_ns == 0 {
            return Err(ConfigError::ZeroFenceTimeout);
        }
        Ok(())
    }
}
