//! Clear demo application.

use anyhow::{bail, Context};
use vkboot_app::{AppConfig, AppContext, FrameContext, PresentApp};
use vkboot_core::{FenceMode, RenderConfig};

/// Frames between progress reports.
const REPORT_INTERVAL: u64 = 1000;

/// Command line options of the clear demo.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearOptions {
    pub render: RenderConfig,
    pub resizable: bool,
    pub validation: bool,
}

impl Default for ClearOptions {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            resizable: false,
            validation: cfg!(debug_assertions),
        }
    }
}

impl ClearOptions {
    /// Parse options, program name excluded.
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut options = Self::default();
        let mut args = args.iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--vsync" => options.render = options.render.with_vsync(true),
                "--fence-per-submission" => {
                    options.render = options.render.with_fence_mode(FenceMode::PerSubmission);
                }
                "--frames-in-flight" => {
                    let frames = parse_value(arg, args.next())?;
                    options.render = options.render.with_frames_in_flight(frames);
                }
                "--images" => {
                    let count = parse_value(arg, args.next())?;
                    options.render = options.render.with_image_count(count);
                }
                "--resizable" => options.resizable = true,
                "--no-validation" => options.validation = false,
                other => bail!("Unknown option {other} (see --help)"),
            }
        }

        options.render.validate()?;
        Ok(options)
    }

    /// Application configuration for these options.
    pub fn app_config(&self) -> AppConfig {
        AppConfig::new("vkboot clear")
            .with_render(self.render.clone())
            .with_resizable(self.resizable)
            .with_validation(self.validation)
    }
}

fn parse_value<T>(flag: &str, value: Option<&String>) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.with_context(|| format!("{flag} needs a value"))?;
    value
        .parse()
        .with_context(|| format!("Invalid value {value:?} for {flag}"))
}

/// Presents the default clear every frame.
pub struct ClearApp {
    frames: u64,
}

impl PresentApp for ClearApp {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        let extent = ctx.extent();
        let config = ctx.config();
        tracing::info!(
            "Clearing {}x{} to {:?} with {} frame slots ({:?} fences)",
            extent.width,
            extent.height,
            config.clear_color,
            config.frames_in_flight,
            config.fence_mode
        );
        Ok(Self { frames: 0 })
    }

    fn update(&mut self, ctx: &AppContext, frame: &FrameContext) {
        self.frames += 1;
        if frame.frame_number > 0 && frame.frame_number % REPORT_INTERVAL == 0 {
            let stats = ctx.presenter.stats();
            tracing::debug!(
                "Frame {}: {} presented, {} fence timeouts",
                frame.frame_number,
                stats.frames_presented,
                stats.fence_timeouts
            );
        }
    }

    fn on_resize(&mut self, _ctx: &mut AppContext, width: u32, height: u32) -> anyhow::Result<()> {
        tracing::info!("Now clearing {width}x{height}");
        Ok(())
    }

    fn cleanup(&mut self, _ctx: &mut AppContext) {
        tracing::info!("Clear demo ran {} frames", self.frames);
    }
}
