//! Per-frame context and frame timing.

/// Context for the frame about to be drawn.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Delta time since last frame in seconds.
    pub dt: f32,
    /// Current frame number.
    pub frame_number: u64,
}

/// Min/max/average FPS over the run.
#[derive(Debug, Clone, Copy)]
pub struct FrameStats {
    min_fps: f64,
    max_fps: f64,
    fps_sum: f64,
    samples: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            min_fps: f64::MAX,
            max_fps: 0.0,
            fps_sum: 0.0,
            samples: 0,
        }
    }
}

impl FrameStats {
    /// Record one frame's delta time. Non-positive deltas are ignored.
    pub fn record(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let fps = 1.0 / f64::from(dt);
        self.min_fps = self.min_fps.min(fps);
        self.max_fps = self.max_fps.max(fps);
        self.fps_sum += fps;
        self.samples += 1;
    }

    /// Number of recorded frames.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Minimum, maximum and average FPS, if any frame was recorded.
    pub fn summary(&self) -> Option<(f64, f64, f64)> {
        (self.samples > 0).then(|| {
            (
                self.min_fps,
                self.max_fps,
                self.fps_sum / self.samples as f64,
            )
        })
    }

    /// Log the summary.
    pub fn log(&self) {
        if let Some((min, max, avg)) = self.summary() {
            tracing::info!("FPS Statistics:");
            tracing::info!("  Min: {min:.1}");
            tracing::info!("  Max: {max:.1}");
            tracing::info!("  Avg: {avg:.1}");
            tracing::info!("  Total frames: {}", self.samples);
        }
    }
}
