//! Vulkan bootstrap and present loop for vkboot.
//!
//! This crate provides:
//! - A backend seam ([`Adapter`], [`DeviceApi`]) with an ash implementation
//! - Capability probing and the choices derived from it
//! - Device, command pool, swapchain, depth buffer, render pass and
//!   framebuffer creation, in bootstrap order
//! - A frames-in-flight synchronizer for acquire, submit and present
//! - [`Presenter`], which owns all of the above

pub mod attachment;
pub mod backend;
pub mod capabilities;
pub mod command;
pub mod context;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod instance;
pub mod presenter;
pub mod surface;
pub mod swapchain;
pub mod sync;

#[cfg(test)]
mod mock;

pub use attachment::{DepthAttachment, RenderPassDesc};
pub use backend::{Adapter, DeviceApi, FenceWait, Submission};
pub use capabilities::{GpuVendor, PhysicalDeviceInfo};
pub use command::CommandPool;
pub use context::LogicalDeviceContext;
pub use device::AshDevice;
pub use error::{BootstrapStep, GpuError, Result};
pub use framebuffer::{record_clear_pass, RecordTarget};
pub use presenter::{FrameOutcome, Presenter, PresenterBuilder};
pub use surface::AshAdapter;
pub use swapchain::{SwapImage, Swapchain};
pub use sync::{FrameSynchronizer, SyncState, SyncStats};
