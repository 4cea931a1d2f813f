//! The seam between the presentation core and the Vulkan driver.
//!
//! Every builder and the frame synchronizer talk to the driver through these
//! two traits. The ash-backed implementations live in [`crate::surface`] and
//! [`crate::device`].

use ash::vk;

use crate::attachment::RenderPassDesc;
use crate::error::Result;

/// Outcome of a single bounded fence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceWait {
    /// The fence is signaled.
    Signaled,
    /// The timeout elapsed first.
    TimedOut,
}

/// One queue submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct Submission<'a> {
    pub command_buffers: &'a [vk::CommandBuffer],
    pub wait_semaphores: &'a [vk::Semaphore],
    pub wait_stages: &'a [vk::PipelineStageFlags],
    pub signal_semaphores: &'a [vk::Semaphore],
}

/// A physical device paired with the surface it presents to.
pub trait Adapter {
    /// Logical device type created from this adapter.
    type Device: DeviceApi;

    /// Device properties (name, vendor, API version).
    fn properties(&self) -> vk::PhysicalDeviceProperties;

    /// Queue family properties, in family index order.
    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties>;

    /// Whether the given queue family can present to the surface.
    fn surface_support(&self, queue_family_index: u32) -> Result<bool>;

    /// Surface capabilities.
    fn surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR>;

    /// Supported surface formats.
    fn surface_formats(&self) -> Result<Vec<vk::SurfaceFormatKHR>>;

    /// Supported present modes.
    fn surface_present_modes(&self) -> Result<Vec<vk::PresentModeKHR>>;

    /// Memory heaps and types.
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties;

    /// Tiling features of a format.
    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties;

    /// The surface handle.
    fn surface(&self) -> vk::SurfaceKHR;

    /// Create a logical device with one queue per priority from the given family.
    fn create_device(&self, queue_family_index: u32, priorities: &[f32]) -> Result<Self::Device>;
}

/// Logical device operations used by the core.
pub trait DeviceApi {
    fn get_queue(&self, queue_family_index: u32, queue_index: u32) -> vk::Queue;

    fn create_command_pool(
        &self,
        queue_family_index: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<vk::CommandPool>;
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>>;
    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]);

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> Result<()>;
    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()>;
    fn cmd_pipeline_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        image_barriers: &[vk::ImageMemoryBarrier<'_>],
    );
    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    );
    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR<'_>)
        -> Result<vk::SwapchainKHR>;
    fn get_swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>>;
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);
    /// Returns the image index and whether the swapchain is suboptimal.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout_ns: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool)>;
    /// Returns whether the swapchain is suboptimal.
    fn queue_present(
        &self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<bool>;

    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> Result<vk::Image>;
    fn destroy_image(&self, image: vk::Image);
    fn get_image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements;
    fn allocate_memory(&self, size: vk::DeviceSize, memory_type_index: u32)
        -> Result<vk::DeviceMemory>;
    fn free_memory(&self, memory: vk::DeviceMemory);
    fn bind_image_memory(
        &self,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<()>;
    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> Result<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<vk::RenderPass>;
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    fn create_semaphore(&self) -> Result<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    fn create_fence(&self, signaled: bool) -> Result<vk::Fence>;
    fn destroy_fence(&self, fence: vk::Fence);
    /// Wait once, up to `timeout_ns`. A timeout is not an error.
    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<FenceWait>;
    fn reset_fence(&self, fence: vk::Fence) -> Result<()>;

    fn queue_submit(
        &self,
        queue: vk::Queue,
        submission: &Submission<'_>,
        fence: vk::Fence,
    ) -> Result<()>;
    fn queue_wait_idle(&self, queue: vk::Queue) -> Result<()>;
    fn device_wait_idle(&self) -> Result<()>;

    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule>;
    fn destroy_shader_module(&self, module: vk::ShaderModule);
}
