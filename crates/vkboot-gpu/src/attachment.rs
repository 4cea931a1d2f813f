//! Depth attachment and render pass creation.

use ash::vk;

use crate::backend::DeviceApi;
use crate::capabilities::{PhysicalDeviceInfo, DEPTH_FORMAT};
use crate::command::{execute_one_shot, single_subresource, transition_image_layout, CommandPool};
use crate::error::Result;

/// One attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub format: vk::Format,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub initial_layout: vk::ImageLayout,
    pub final_layout: vk::ImageLayout,
    /// Layout during the subpass.
    pub subpass_layout: vk::ImageLayout,
}

impl AttachmentDesc {
    /// Convert to the Vulkan description.
    pub fn to_vk(&self) -> vk::AttachmentDescription {
        vk::AttachmentDescription::default()
            .format(self.format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(self.load_op)
            .store_op(self.store_op)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(self.initial_layout)
            .final_layout(self.final_layout)
    }
}

/// Static description of a single-subpass colour + depth render pass.
///
/// Attachment 0 is colour, attachment 1 is depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub color: AttachmentDesc,
    pub depth: AttachmentDesc,
    /// Order the subpass after prior commands touching the attachments.
    pub external_dependency: bool,
}

impl RenderPassDesc {
    /// Colour attachment cleared and stored, depth cleared and discarded.
    pub fn color_depth(color_format: vk::Format, depth_format: vk::Format) -> Self {
        Self {
            color: AttachmentDesc {
                format: color_format,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                initial_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                final_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                subpass_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            },
            depth: AttachmentDesc {
                format: depth_format,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                final_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                subpass_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            },
            external_dependency: true,
        }
    }

    /// The EXTERNAL -> 0 dependency, if enabled.
    pub fn dependency(&self) -> Option<vk::SubpassDependency> {
        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        self.external_dependency.then(|| {
            vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(0)
                .src_stage_mask(stages)
                .dst_stage_mask(stages)
                .src_access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
                .dst_access_mask(
                    vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                )
        })
    }
}

/// Create the render pass described by `desc`.
pub fn create_render_pass<D: DeviceApi>(device: &D, desc: &RenderPassDesc) -> Result<vk::RenderPass> {
    let render_pass = device.create_render_pass(desc)?;
    tracing::debug!(
        "Render pass created: colour {:?}, depth {:?}",
        desc.color.format,
        desc.depth.format
    );
    Ok(render_pass)
}

/// Depth buffer shared by every framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthAttachment {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl DepthAttachment {
    /// Destroy the view, image and memory.
    pub fn destroy<D: DeviceApi>(&self, device: &D) {
        device.destroy_image_view(self.view);
        device.destroy_image(self.image);
        device.free_memory(self.memory);
    }
}

/// Create the depth buffer and move it to depth-attachment layout.
pub fn create_depth_buffer<D: DeviceApi>(
    device: &D,
    info: &PhysicalDeviceInfo,
    pool: &CommandPool,
    queue: vk::Queue,
    extent: vk::Extent2D,
) -> Result<DepthAttachment> {
    let format = DEPTH_FORMAT;
    let tiling = info.depth_tiling()?;

    let image_info = vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .format(format)
        .extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })
        .mip_levels(1)
        .array_layers(1)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(tiling)
        .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::UNDEFINED);
    let image = device.create_image(&image_info)?;

    let memory = match bind_device_local_memory(device, info, image) {
        Ok(memory) => memory,
        Err(e) => {
            device.destroy_image(image);
            return Err(e);
        }
    };
    tracing::debug!(
        "Depth buffer {}x{} {:?} tiling",
        extent.width,
        extent.height,
        tiling
    );

    match depth_view(device, pool, queue, image, format) {
        Ok(view) => Ok(DepthAttachment {
            image,
            memory,
            view,
            format,
            extent,
        }),
        Err(e) => {
            device.destroy_image(image);
            device.free_memory(memory);
            Err(e)
        }
    }
}

/// Allocate device-local memory for `image` and bind it at offset 0.
fn bind_device_local_memory<D: DeviceApi>(
    device: &D,
    info: &PhysicalDeviceInfo,
    image: vk::Image,
) -> Result<vk::DeviceMemory> {
    let requirements = device.get_image_memory_requirements(image);
    let memory_type_index = info.memory_type_index(
        requirements.memory_type_bits,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;
    let memory = device.allocate_memory(requirements.size, memory_type_index)?;
    if let Err(e) = device.bind_image_memory(image, memory, 0) {
        device.free_memory(memory);
        return Err(e);
    }
    tracing::trace!(
        "{} bytes bound in memory type {}",
        requirements.size,
        memory_type_index
    );
    Ok(memory)
}

/// Move the depth image to attachment layout and create its view.
fn depth_view<D: DeviceApi>(
    device: &D,
    pool: &CommandPool,
    queue: vk::Queue,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    execute_one_shot(device, pool, queue, |device, cmd| {
        transition_image_layout(
            device,
            cmd,
            image,
            vk::ImageAspectFlags::DEPTH,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        );
    })?;

    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(single_subresource(vk::ImageAspectFlags::DEPTH));
    device.create_image_view(&view_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::query_capabilities;
    use crate::mock::{MockAdapter, MockDevice};

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 320,
        height: 200,
    };

    fn depth_buffer(device: &MockDevice, adapter: &MockAdapter) -> Result<DepthAttachment> {
        let info = query_capabilities(adapter)?;
        let pool = CommandPool::new(device, 1, vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)?;
        create_depth_buffer(device, &info, &pool, device.get_queue(1, 0), EXTENT)
    }

    #[test]
    fn depth_buffer_round_trip() {
        let adapter = MockAdapter::new();
        let device = MockDevice::new();
        let depth = depth_buffer(&device, &adapter).unwrap();

        let state = device.state();
        let image = &state.images[&depth.image];
        assert_eq!(image.format, vk::Format::D16_UNORM);
        assert_eq!(image.tiling, vk::ImageTiling::OPTIMAL);
        assert_eq!((image.extent.width, image.extent.height), (320, 200));

        let requirements = state.image_requirements(depth.image);
        assert_eq!(state.allocations[&depth.memory], (requirements.size, 1));
        assert_eq!(state.bindings[&depth.image], (depth.memory, 0));
        assert_eq!(state.view_targets[&depth.view], depth.image);
        assert_eq!(
            state.transitions,
            vec![(
                depth.image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
            )]
        );
    }

    #[test]
    fn depth_buffer_prefers_linear_tiling() {
        let mut adapter = MockAdapter::new();
        adapter.depth_properties.linear_tiling_features =
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
        let device = MockDevice::new();
        let depth = depth_buffer(&device, &adapter).unwrap();
        assert_eq!(
            device.state().images[&depth.image].tiling,
            vk::ImageTiling::LINEAR
        );
    }

    #[test]
    fn depth_buffer_without_device_local_memory_fails() {
        let mut adapter = MockAdapter::new();
        adapter.memory_types = vec![vk::MemoryPropertyFlags::HOST_VISIBLE];
        let device = MockDevice::new();
        assert!(matches!(
            depth_buffer(&device, &adapter),
            Err(crate::GpuError::NoCompatibleMemoryType { .. })
        ));
    }

    #[test]
    fn failed_depth_buffer_step_releases_earlier_objects() {
        for call in ["allocate_memory", "create_image_view"] {
            let adapter = MockAdapter::new();
            let device = MockDevice::new();
            device.state_mut().fail_on = Some(call);
            assert!(depth_buffer(&device, &adapter).is_err(), "{call}");

            let state = device.state();
            assert_eq!(state.live("image"), 0, "{call}");
            assert_eq!(state.live("memory"), 0, "{call}");
            assert_eq!(state.live("image_view"), 0, "{call}");
        }
    }

    #[test]
    fn depth_buffer_destroy_releases_everything() {
        let adapter = MockAdapter::new();
        let device = MockDevice::new();
        let depth = depth_buffer(&device, &adapter).unwrap();
        depth.destroy(&device);
        let state = device.state();
        assert_eq!(state.live("image"), 0);
        assert_eq!(state.live("memory"), 0);
        assert_eq!(state.live("image_view"), 0);
    }

    #[test]
    fn color_depth_layout() {
        let desc = RenderPassDesc::color_depth(vk::Format::B8G8R8A8_SRGB, DEPTH_FORMAT);
        assert_eq!(desc.color.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(desc.color.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(desc.depth.store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(
            desc.depth.subpass_layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
        let dependency = desc.dependency().unwrap();
        assert_eq!(dependency.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(dependency.dst_subpass, 0);
    }

    #[test]
    fn render_pass_records_description() {
        let device = MockDevice::new();
        let desc = RenderPassDesc::color_depth(vk::Format::B8G8R8A8_UNORM, DEPTH_FORMAT);
        let render_pass = create_render_pass(&device, &desc).unwrap();
        assert_eq!(device.state().render_passes[&render_pass], desc);
    }
}
