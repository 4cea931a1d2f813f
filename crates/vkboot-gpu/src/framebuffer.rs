//! Framebuffers and the default per-image recording.

use ash::vk;

use crate::backend::DeviceApi;
use crate::command::transition_image_layout;
use crate::error::Result;
use crate::swapchain::SwapImage;
use crate::sync::WAIT_STAGE;

/// Create one framebuffer per swap image: attachment 0 is the image's view,
/// attachment 1 the shared depth view.
pub fn create_framebuffers<D: DeviceApi>(
    device: &D,
    render_pass: vk::RenderPass,
    images: &[SwapImage],
    depth_view: vk::ImageView,
    extent: vk::Extent2D,
) -> Result<Vec<vk::Framebuffer>> {
    let mut framebuffers = Vec::with_capacity(images.len());
    for swap_image in images {
        match device.create_framebuffer(render_pass, &[swap_image.view, depth_view], extent) {
            Ok(framebuffer) => framebuffers.push(framebuffer),
            Err(e) => {
                destroy_framebuffers(device, &framebuffers);
                return Err(e);
            }
        }
    }
    Ok(framebuffers)
}

/// Destroy framebuffers.
pub fn destroy_framebuffers<D: DeviceApi>(device: &D, framebuffers: &[vk::Framebuffer]) {
    for &framebuffer in framebuffers {
        device.destroy_framebuffer(framebuffer);
    }
}

/// Everything needed to record one swap image's command buffer.
#[derive(Debug, Clone, Copy)]
pub struct RecordTarget {
    pub image_index: u32,
    pub image: vk::Image,
    pub command_buffer: vk::CommandBuffer,
    pub framebuffer: vk::Framebuffer,
    pub render_pass: vk::RenderPass,
    pub extent: vk::Extent2D,
}

/// Clear colour and depth through the render pass and leave the image ready
/// for presentation.
///
/// The command buffer must be in the recording state.
pub fn record_clear_pass<D: DeviceApi>(
    device: &D,
    target: &RecordTarget,
    clear_color: [f32; 4],
) -> Result<()> {
    let cmd = target.command_buffer;

    // Source stage must match the acquire semaphore's wait stage
    transition_image_layout(
        device,
        cmd,
        target.image,
        vk::ImageAspectFlags::COLOR,
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        WAIT_STAGE,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    );

    let clear_values = [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ];
    device.cmd_begin_render_pass(
        cmd,
        target.render_pass,
        target.framebuffer,
        target.extent,
        &clear_values,
    );
    device.cmd_end_render_pass(cmd);

    transition_image_layout(
        device,
        cmd,
        target.image,
        vk::ImageAspectFlags::COLOR,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        vk::ImageLayout::PRESENT_SRC_KHR,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        vk::PipelineStageFlags::BOTTOM_OF_PIPE,
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    fn swap_images(device: &MockDevice, count: usize) -> Vec<SwapImage> {
        (0..count)
            .map(|_| SwapImage {
                image: device.create_image(&vk::ImageCreateInfo::default()).unwrap(),
                view: device
                    .create_image_view(&vk::ImageViewCreateInfo::default())
                    .unwrap(),
                command_buffer: vk::CommandBuffer::null(),
            })
            .collect()
    }

    #[test]
    fn one_framebuffer_per_image_sharing_depth() {
        let device = MockDevice::new();
        let images = swap_images(&device, 3);
        let depth_view = device
            .create_image_view(&vk::ImageViewCreateInfo::default())
            .unwrap();
        let render_pass = vk::RenderPass::null();
        let extent = vk::Extent2D {
            width: 8,
            height: 8,
        };

        let framebuffers =
            create_framebuffers(&device, render_pass, &images, depth_view, extent).unwrap();
        assert_eq!(framebuffers.len(), 3);

        let state = device.state();
        for (framebuffer, swap_image) in framebuffers.iter().zip(&images) {
            let (_, attachments, fb_extent) = &state.framebuffers[framebuffer];
            assert_eq!(attachments, &vec![swap_image.view, depth_view]);
            assert_eq!(*fb_extent, extent);
        }
        drop(state);

        destroy_framebuffers(&device, &framebuffers);
        assert_eq!(device.state().live("framebuffer"), 0);
    }

    #[test]
    fn failed_framebuffer_destroys_earlier_ones() {
        let device = MockDevice::new();
        let images = swap_images(&device, 3);
        {
            let mut state = device.state_mut();
            state.fail_on = Some("create_framebuffer");
            state.fail_after = 2;
        }

        let result = create_framebuffers(
            &device,
            vk::RenderPass::null(),
            &images,
            vk::ImageView::null(),
            vk::Extent2D {
                width: 8,
                height: 8,
            },
        );
        assert!(result.is_err());
        assert_eq!(device.state().live("framebuffer"), 0);
    }

    #[test]
    fn clear_pass_brackets_render_pass_with_transitions() {
        let device = MockDevice::new();
        let image = device.create_image(&vk::ImageCreateInfo::default()).unwrap();
        let cmd = vk::CommandBuffer::null();
        let target = RecordTarget {
            image_index: 0,
            image,
            command_buffer: cmd,
            framebuffer: vk::Framebuffer::null(),
            render_pass: vk::RenderPass::null(),
            extent: vk::Extent2D {
                width: 4,
                height: 4,
            },
        };

        device
            .begin_command_buffer(cmd, vk::CommandBufferUsageFlags::SIMULTANEOUS_USE)
            .unwrap();
        record_clear_pass(&device, &target, [1.0, 0.8, 0.4, 0.0]).unwrap();
        device.end_command_buffer(cmd).unwrap();

        let state = device.state();
        assert_eq!(
            state.commands[&cmd],
            vec![
                "begin",
                "barrier",
                "begin_render_pass",
                "end_render_pass",
                "barrier",
                "end"
            ]
        );
        assert_eq!(
            state.transitions,
            vec![
                (
                    image,
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
                ),
                (
                    image,
                    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                    vk::ImageLayout::PRESENT_SRC_KHR
                ),
            ]
        );
        assert_eq!(
            state.barrier_stages,
            vec![
                (
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                ),
                (
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                    vk::PipelineStageFlags::BOTTOM_OF_PIPE
                ),
            ]
        );

        let clear_values = &state.render_pass_begins[0].clear_values;
        assert_eq!(clear_values.len(), 2);
        // SAFETY: the recording wrote colour into slot 0 and depth into slot 1
        let (color, depth) = unsafe {
            (
                clear_values[0].color.float32,
                clear_values[1].depth_stencil.depth,
            )
        };
        assert_eq!(color, [1.0, 0.8, 0.4, 0.0]);
        assert_eq!(depth, 1.0);
    }
}
