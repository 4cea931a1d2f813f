//! `PresentApp` trait definition.

use vkboot_core::RenderConfig;
use vkboot_gpu::{record_clear_pass, AshDevice, RecordTarget};
use winit::event::WindowEvent;

use crate::context::AppContext;
use crate::frame::FrameContext;

/// Trait for vkboot applications.
///
/// The framework creates the window, runs the bootstrap, records every swap
/// image's command buffer through [`PresentApp::record`] and then drives the
/// acquire, submit and present loop until the window asks to exit.
pub trait PresentApp: Sized {
    /// Initialize the application.
    ///
    /// Called once after the presenter has been built and before the first
    /// recording.
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self>;

    /// Record one swap image's command buffer.
    ///
    /// Called once per image at startup and again after every rebuild. The
    /// buffer is already recording and is ended by the framework.
    ///
    /// Default implementation clears colour and depth.
    fn record(
        &mut self,
        config: &RenderConfig,
        device: &AshDevice,
        target: &RecordTarget,
    ) -> vkboot_gpu::Result<()> {
        record_clear_pass(device, target, config.clear_color)
    }

    /// Called every frame before the frame is submitted.
    #[allow(unused_variables)]
    fn update(&mut self, ctx: &AppContext, frame: &FrameContext) {}

    /// Called after the swapchain was rebuilt for a new size.
    #[allow(unused_variables)]
    fn on_resize(&mut self, ctx: &mut AppContext, width: u32, height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handle window events. Return `true` to stop further processing.
    #[allow(unused_variables)]
    fn on_event(&mut self, event: &WindowEvent) -> bool {
        false
    }

    /// Cleanup resources before shutdown. The device is idle.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut AppContext) {}
}
