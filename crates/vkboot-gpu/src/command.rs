//! Command buffer management.

use ash::vk;

use crate::backend::{DeviceApi, Submission};
use crate::error::{GpuError, Result};

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a new command pool.
    pub fn new<D: DeviceApi>(
        device: &D,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let pool = device.create_command_pool(queue_family, flags)?;
        Ok(Self { pool, queue_family })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate a single primary command buffer.
    pub fn allocate_command_buffer<D: DeviceApi>(&self, device: &D) -> Result<vk::CommandBuffer> {
        let buffers = device.allocate_command_buffers(self.pool, 1)?;
        buffers
            .into_iter()
            .next()
            .ok_or_else(|| GpuError::InvalidState("Empty command buffer allocation".into()))
    }

    /// Allocate multiple primary command buffers.
    pub fn allocate_command_buffers<D: DeviceApi>(
        &self,
        device: &D,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        device.allocate_command_buffers(self.pool, count)
    }

    /// Return command buffers to the pool.
    pub fn free<D: DeviceApi>(&self, device: &D, buffers: &[vk::CommandBuffer]) {
        if !buffers.is_empty() {
            device.free_command_buffers(self.pool, buffers);
        }
    }

    /// Destroy the command pool.
    pub fn destroy<D: DeviceApi>(&self, device: &D) {
        device.destroy_command_pool(self.pool);
    }
}

/// Record and run a throwaway command buffer, waiting for the queue to drain.
pub fn execute_one_shot<D, F>(
    device: &D,
    pool: &CommandPool,
    queue: vk::Queue,
    f: F,
) -> Result<()>
where
    D: DeviceApi,
    F: FnOnce(&D, vk::CommandBuffer),
{
    let cmd = pool.allocate_command_buffer(device)?;

    let result = (|| {
        device.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        f(device, cmd);
        device.end_command_buffer(cmd)?;

        let command_buffers = [cmd];
        let submission = Submission {
            command_buffers: &command_buffers,
            ..Default::default()
        };
        device.queue_submit(queue, &submission, vk::Fence::null())?;
        device.queue_wait_idle(queue)
    })();

    pool.free(device, &[cmd]);
    result
}

/// Record a single image layout transition.
///
/// Access masks are derived from the layouts; stages are passed through.
#[allow(clippy::too_many_arguments)]
pub fn transition_image_layout<D: DeviceApi>(
    device: &D,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .src_access_mask(access_mask_for(old_layout, true))
        .dst_access_mask(access_mask_for(new_layout, false))
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(single_subresource(aspect_mask));

    device.cmd_pipeline_barrier(cmd, src_stage, dst_stage, &[barrier]);
}

/// Subresource range covering mip 0 and layer 0.
pub fn single_subresource(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(aspect_mask)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1)
}

fn access_mask_for(layout: vk::ImageLayout, source: bool) -> vk::AccessFlags {
    match layout {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => {
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        }
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => vk::AccessFlags::TRANSFER_WRITE,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => vk::AccessFlags::TRANSFER_READ,
        vk::ImageLayout::PREINITIALIZED if source => vk::AccessFlags::HOST_WRITE,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => vk::AccessFlags::SHADER_READ,
        // Presentation engine reads are made visible by the present semaphore
        _ => vk::AccessFlags::empty(),
    }
}
