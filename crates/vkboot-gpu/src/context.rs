//! Logical device context.

use ash::vk;

use crate::backend::{Adapter, DeviceApi};
use crate::error::Result;

/// Priority of the single graphics+present queue.
const QUEUE_PRIORITY: f32 = 1.0;

/// Owns the logical device and its single graphics+present queue.
pub struct LogicalDeviceContext<D: DeviceApi> {
    device: D,
    queue: vk::Queue,
    queue_family: u32,
}

impl<D: DeviceApi> LogicalDeviceContext<D> {
    /// Get the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Get the graphics+present queue.
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        self.device.device_wait_idle()
    }
}

/// Create the logical device with exactly one queue from `queue_family`.
pub fn create_device<A: Adapter>(
    adapter: &A,
    queue_family: u32,
) -> Result<LogicalDeviceContext<A::Device>> {
    let device = adapter.create_device(queue_family, &[QUEUE_PRIORITY])?;
    let queue = device.get_queue(queue_family, 0);

    tracing::debug!("Logical device created on queue family {queue_family}");

    Ok(LogicalDeviceContext {
        device,
        queue,
        queue_family,
    })
}
