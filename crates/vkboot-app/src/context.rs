//! Application context.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use vkboot_core::RenderConfig;
use vkboot_gpu::{AshAdapter, AshDevice, BootstrapStep, DeviceApi, Presenter, PresenterBuilder};
use winit::window::Window;

use crate::app::PresentApp;

/// Application context shared across all app methods.
///
/// Field order matters: the presenter (and with it the logical device) drops
/// before the adapter that owns the surface and instance.
pub struct AppContext {
    /// Bootstrap result and frame loop.
    pub presenter: Presenter<AshDevice>,
    adapter: AshAdapter,
    /// The window handle.
    pub window: Arc<Window>,
    /// Total frames presented.
    pub frame_count: u64,
    /// Time of last frame (for delta time calculation).
    pub(crate) last_frame_time: Instant,
}

impl AppContext {
    /// Create the adapter for `window` and run the bootstrap.
    pub(crate) fn new(
        window: Arc<Window>,
        title: &str,
        validation: bool,
        config: RenderConfig,
    ) -> vkboot_gpu::Result<Self> {
        let adapter = AshAdapter::new(window.as_ref(), title, validation)
            .map_err(|e| e.at(BootstrapStep::Instance))?;

        let presenter = PresenterBuilder::new(&adapter).config(config).build()?;
        tracing::info!("GPU: {}", presenter.info().summary());

        Ok(Self {
            presenter,
            adapter,
            window,
            frame_count: 0,
            last_frame_time: Instant::now(),
        })
    }

    /// Get the current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.presenter.extent()
    }

    /// Get the render configuration.
    pub fn config(&self) -> &RenderConfig {
        self.presenter.config()
    }

    /// Get the logical device.
    pub fn device(&self) -> &AshDevice {
        self.presenter.device()
    }

    /// Record every swap image's command buffer with the application.
    pub(crate) fn record<A: PresentApp>(&mut self, app: &mut A) -> vkboot_gpu::Result<()> {
        let config = self.presenter.config().clone();
        self.presenter
            .record_commands(|device, target| app.record(&config, device, target))
    }

    /// Rebuild everything sized by the swapchain.
    pub(crate) fn resize(&mut self, width: u32, height: u32) -> vkboot_gpu::Result<()> {
        self.presenter.resize(&self.adapter, width, height)
    }

    /// Wait for the device to be idle.
    pub fn wait_idle(&self) -> vkboot_gpu::Result<()> {
        self.presenter.device().device_wait_idle()
    }

    /// Destroy every presenter-owned object.
    pub(crate) fn cleanup(&mut self) -> vkboot_gpu::Result<()> {
        self.presenter.destroy()
    }
}
