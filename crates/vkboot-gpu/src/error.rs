//! GPU error types.

use std::fmt;

use ash::vk;
use thiserror::Error;
use vkboot_core::ConfigError;

/// Step of the bootstrap pipeline, reported when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    Config,
    Instance,
    Capabilities,
    Device,
    CommandPool,
    Swapchain,
    DepthBuffer,
    RenderPass,
    Framebuffers,
    Synchronization,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Instance => "instance and surface",
            Self::Capabilities => "capability query",
            Self::Device => "device creation",
            Self::CommandPool => "command pool",
            Self::Swapchain => "swapchain",
            Self::DepthBuffer => "depth buffer",
            Self::RenderPass => "render pass",
            Self::Framebuffers => "framebuffers",
            Self::Synchronization => "synchronization",
        };
        f.write_str(name)
    }
}

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// No queue family supports both graphics and presentation to the surface.
    #[error("No queue family supports both graphics and present")]
    NoPresentQueueFamily,

    /// The surface reports no formats.
    #[error("Surface reports no formats")]
    NoSurfaceFormat,

    /// Neither tiling mode supports depth-stencil attachment for the format.
    #[error("Depth format {0:?} is unsupported")]
    UnsupportedDepthFormat(vk::Format),

    /// No memory type satisfies both the type mask and the property flags.
    #[error("No memory type in mask {type_bits:#b} has flags {required:?}")]
    NoCompatibleMemoryType {
        type_bits: u32,
        required: vk::MemoryPropertyFlags,
    },

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Per-image resource counts diverged from the swapchain image count.
    #[error(
        "Image count mismatch: {images} images, {views} views, \
         {command_buffers} command buffers, {framebuffers} framebuffers, \
         {semaphores} semaphores"
    )]
    ImageCountMismatch {
        images: usize,
        views: usize,
        command_buffers: usize,
        framebuffers: usize,
        semaphores: usize,
    },

    /// The swapchain returned an image index outside the image list.
    #[error("Acquired image index {index} out of range ({count} images)")]
    ImageIndexOutOfRange { index: u32, count: usize },

    /// A bootstrap step failed.
    #[error("Bootstrap failed at {step}: {source}")]
    Bootstrap {
        step: BootstrapStep,
        #[source]
        source: Box<GpuError>,
    },

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl GpuError {
    /// Wrap this error with the bootstrap step that produced it.
    pub fn at(self, step: BootstrapStep) -> Self {
        Self::Bootstrap {
            step,
            source: Box::new(self),
        }
    }

    /// The failing bootstrap step, if this error came from the bootstrap.
    pub fn step(&self) -> Option<BootstrapStep> {
        match self {
            Self::Bootstrap { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
