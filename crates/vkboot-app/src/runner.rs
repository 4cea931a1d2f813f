//! Application runner and event loop.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vkboot_core::RenderConfig;
use vkboot_gpu::GpuError;
use vkboot_platform::{create_window, is_exit_request, window_size, WindowConfig};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::app::PresentApp;
use crate::context::AppContext;
use crate::frame::{FrameContext, FrameStats};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title, also used as the Vulkan application name.
    pub title: String,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Allow the user to resize the window.
    pub resizable: bool,
    /// Swapchain, synchronization and clear settings.
    pub render: RenderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "vkboot".to_string(),
            validation: cfg!(debug_assertions),
            resizable: false,
            render: RenderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.render = self.render.with_size(width, height);
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Allow window resizing.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Replace the render configuration.
    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    fn window_config(&self) -> WindowConfig {
        WindowConfig::default()
            .with_title(self.title.clone())
            .with_size(self.render.width, self.render.height)
            .with_resizable(self.resizable)
    }
}

/// Run a [`PresentApp`] with the given configuration.
///
/// Initializes logging, creates the window and presenter, and runs the event
/// loop until the application exits. The first fatal error, if any, is
/// returned after everything has been torn down.
pub fn run_app<A: PresentApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    config.render.validate()?;
    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner::<A> {
        config,
        state: None,
        error: None,
    };
    event_loop.run_app(&mut runner)?;

    match runner.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner<A: PresentApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
    error: Option<anyhow::Error>,
}

/// Internal application state.
struct AppState<A: PresentApp> {
    ctx: AppContext,
    app: A,
    needs_rebuild: bool,
    stats: FrameStats,
}

impl<A: PresentApp + 'static> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        // Let the app handle the event first
        if state.app.on_event(&event) {
            return;
        }

        if is_exit_request(&event) {
            info!("Exit requested");
            self.shutdown(event_loop);
            return;
        }

        match event {
            WindowEvent::RedrawRequested => {
                if let Err(e) = state.render_frame() {
                    error!("Render error: {e:#}");
                    self.error = Some(e);
                    self.shutdown(event_loop);
                }
            }
            WindowEvent::Resized(size) => {
                tracing::debug!("Window resized to {}x{}", size.width, size.height);
                state.needs_rebuild = true;
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.ctx.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.take() {
            self.finish(state);
        }
    }
}

impl<A: PresentApp + 'static> AppRunner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window = Arc::new(create_window(event_loop, &self.config.window_config())?);

        let mut ctx = AppContext::new(
            window,
            &self.config.title,
            self.config.validation,
            self.config.render.clone(),
        )?;

        let mut app = A::init(&mut ctx)?;
        ctx.record(&mut app)?;

        Ok(AppState {
            ctx,
            app,
            needs_rebuild: false,
            stats: FrameStats::default(),
        })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.take() {
            self.finish(state);
        }
        event_loop.exit();
    }

    fn finish(&mut self, mut state: AppState<A>) {
        if let Err(e) = state.cleanup() {
            error!("Cleanup error: {e:#}");
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
    }
}

fn is_out_of_date(error: &GpuError) -> bool {
    matches!(error, GpuError::Vulkan(vk::Result::ERROR_OUT_OF_DATE_KHR))
}

impl<A: PresentApp> AppState<A> {
    #[tracing::instrument(level = "trace", skip_all)]
    fn render_frame(&mut self) -> anyhow::Result<()> {
        let (width, height) = window_size(&self.ctx.window);
        if width == 0 || height == 0 {
            // Minimized
            return Ok(());
        }

        if self.needs_rebuild {
            self.rebuild(width, height)?;
        }

        let now = Instant::now();
        let dt = now.duration_since(self.ctx.last_frame_time).as_secs_f32();
        self.ctx.last_frame_time = now;
        self.stats.record(dt);

        let frame = FrameContext {
            dt,
            frame_number: self.ctx.frame_count,
        };
        self.app.update(&self.ctx, &frame);

        match self.ctx.presenter.draw_frame() {
            Ok(outcome) => {
                self.ctx.frame_count += 1;
                if outcome.needs_rebuild {
                    self.needs_rebuild = true;
                }
                Ok(())
            }
            Err(e) if is_out_of_date(&e) => {
                warn!("Swapchain out of date on acquire");
                self.needs_rebuild = true;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn rebuild(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.ctx.resize(width, height)?;
        self.ctx.record(&mut self.app)?;
        let extent = self.ctx.extent();
        self.app.on_resize(&mut self.ctx, extent.width, extent.height)?;
        self.needs_rebuild = false;
        Ok(())
    }

    fn cleanup(&mut self) -> anyhow::Result<()> {
        info!("Shutting down...");
        self.stats.log();

        let sync = self.ctx.presenter.stats();
        info!(
            "Presented {} frames, {} fence timeouts",
            sync.frames_presented, sync.fence_timeouts
        );

        self.ctx.wait_idle()?;
        self.app.cleanup(&mut self.ctx);
        self.ctx.cleanup()?;
        Ok(())
    }
}
