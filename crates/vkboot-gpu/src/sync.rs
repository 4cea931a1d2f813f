//! Frame synchronization.
//!
//! A ring of frame slots, each with an image-available semaphore and, when
//! fences are recycled, a persistent in-flight fence. Rendering-finished
//! semaphores belong to swap images, not slots: the slot index and the swap
//! image index are unrelated.

use ash::vk;
use vkboot_core::{FenceMode, RenderConfig};

use crate::backend::{DeviceApi, FenceWait, Submission};
use crate::error::{GpuError, Result};
use crate::swapchain::Swapchain;

/// Stage at which a submission waits for its swap image.
pub const WAIT_STAGE: vk::PipelineStageFlags = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;

/// Wait for a fence, retrying while single waits time out.
///
/// Returns the number of timeouts observed before the fence signaled.
#[tracing::instrument(level = "trace", skip_all)]
pub fn wait_for_fence<D: DeviceApi>(device: &D, fence: vk::Fence, timeout_ns: u64) -> Result<u32> {
    let mut timeouts = 0;
    loop {
        match device.wait_for_fence(fence, timeout_ns)? {
            FenceWait::Signaled => return Ok(timeouts),
            FenceWait::TimedOut => {
                timeouts += 1;
                tracing::trace!("Fence wait timed out ({timeouts}), retrying");
            }
        }
    }
}

/// Lifecycle of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Objects exist, nothing recorded yet.
    Idle,
    /// Per-image command buffers recorded; ready for the first frame.
    RecordedOnce,
    /// An image was acquired and awaits submission.
    AcquirePending,
    /// The acquired image was submitted and awaits presentation.
    Submitted,
    /// The last frame was presented.
    Presented,
    /// Waiting for the device to go idle before teardown.
    ShutdownDraining,
    /// Every synchronization object has been destroyed.
    Terminated,
}

/// Per-slot synchronization objects.
#[derive(Debug, Clone, Copy)]
pub struct FrameSlot {
    pub image_available: vk::Semaphore,
    /// Present only with [`FenceMode::Recycled`].
    pub in_flight: Option<vk::Fence>,
}

/// An acquired swap image and the slot that acquired it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredFrame {
    pub slot: usize,
    pub image_index: u32,
    pub suboptimal: bool,
}

/// Counters of the frame loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub frames_presented: u64,
    pub fence_timeouts: u64,
}

/// Drives acquire, submit and present for a frames-in-flight ring.
pub struct FrameSynchronizer {
    slots: Vec<FrameSlot>,
    /// Indexed by swap image.
    rendering_finished: Vec<vk::Semaphore>,
    /// Slot that last submitted work for each swap image.
    images_in_flight: Vec<Option<usize>>,
    current_slot: usize,
    fence_mode: FenceMode,
    fence_timeout_ns: u64,
    acquire_timeout_ns: u64,
    state: SyncState,
    pending: Option<AcquiredFrame>,
    stats: SyncStats,
}

impl FrameSynchronizer {
    /// Create the ring for `image_count` swap images.
    pub fn new<D: DeviceApi>(device: &D, image_count: usize, config: &RenderConfig) -> Result<Self> {
        let mut sync = Self {
            slots: Vec::new(),
            rendering_finished: Vec::new(),
            images_in_flight: Vec::new(),
            current_slot: 0,
            fence_mode: config.fence_mode,
            fence_timeout_ns: config.fence_timeout_ns,
            acquire_timeout_ns: config.acquire_timeout_ns,
            state: SyncState::Idle,
            pending: None,
            stats: SyncStats::default(),
        };
        if let Err(e) = sync.create_objects(device, config.frames_in_flight, image_count) {
            sync.destroy_objects(device);
            return Err(e);
        }

        tracing::debug!(
            "Frame sync: {} slots, {} swap images, {:?} fences",
            config.frames_in_flight,
            image_count,
            config.fence_mode
        );
        Ok(sync)
    }

    fn create_objects<D: DeviceApi>(
        &mut self,
        device: &D,
        frames_in_flight: usize,
        image_count: usize,
    ) -> Result<()> {
        for _ in 0..frames_in_flight {
            let image_available = device.create_semaphore()?;
            let in_flight = match self.fence_mode {
                FenceMode::Recycled => match device.create_fence(true) {
                    Ok(fence) => Some(fence),
                    Err(e) => {
                        device.destroy_semaphore(image_available);
                        return Err(e);
                    }
                },
                FenceMode::PerSubmission => None,
            };
            self.slots.push(FrameSlot {
                image_available,
                in_flight,
            });
        }
        for _ in 0..image_count {
            self.rendering_finished.push(device.create_semaphore()?);
        }
        self.images_in_flight = vec![None; image_count];
        Ok(())
    }

    fn destroy_objects<D: DeviceApi>(&mut self, device: &D) {
        for slot in self.slots.drain(..) {
            device.destroy_semaphore(slot.image_available);
            if let Some(fence) = slot.in_flight {
                device.destroy_fence(fence);
            }
        }
        for semaphore in self.rendering_finished.drain(..) {
            device.destroy_semaphore(semaphore);
        }
        self.images_in_flight.clear();
    }

    fn expect_state(&self, operation: &str, allowed: &[SyncState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(GpuError::InvalidState(format!(
                "{operation} called in state {:?}",
                self.state
            )))
        }
    }

    fn wait_slot_fence<D: DeviceApi>(&mut self, device: &D, slot: usize) -> Result<()> {
        if let Some(fence) = self.slots.get(slot).and_then(|s| s.in_flight) {
            let timeouts = wait_for_fence(device, fence, self.fence_timeout_ns)?;
            self.stats.fence_timeouts += u64::from(timeouts);
        }
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Slot used by the next acquire.
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Size of the slot ring.
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Number of per-image rendering-finished semaphores.
    pub fn image_count(&self) -> usize {
        self.rendering_finished.len()
    }

    /// Frame counters.
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Slot objects, in ring order.
    pub fn slots(&self) -> &[FrameSlot] {
        &self.slots
    }

    /// Rendering-finished semaphore of a swap image.
    pub fn rendering_finished(&self, image_index: u32) -> Option<vk::Semaphore> {
        self.rendering_finished.get(image_index as usize).copied()
    }

    /// Note that every per-image command buffer has been recorded.
    pub fn mark_recorded(&mut self) -> Result<()> {
        self.expect_state(
            "mark_recorded",
            &[SyncState::Idle, SyncState::RecordedOnce, SyncState::Presented],
        )?;
        self.state = SyncState::RecordedOnce;
        Ok(())
    }

    /// Acquire the next swap image on the current slot.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn acquire<D: DeviceApi>(&mut self, device: &D, swapchain: &Swapchain) -> Result<AcquiredFrame> {
        self.expect_state("acquire", &[SyncState::RecordedOnce, SyncState::Presented])?;

        let slot = self.current_slot;
        self.wait_slot_fence(device, slot)?;

        let image_available = self.slots[slot].image_available;
        let (image_index, suboptimal) =
            swapchain.acquire_next_image(device, image_available, self.acquire_timeout_ns)?;
        if suboptimal {
            tracing::warn!("Swapchain is suboptimal");
        }

        let count = self.images_in_flight.len();
        let previous = self
            .images_in_flight
            .get(image_index as usize)
            .copied()
            .ok_or(GpuError::ImageIndexOutOfRange {
                index: image_index,
                count,
            })?;
        // The image may still be in use by a submission from another slot
        if let Some(previous_slot) = previous.filter(|&s| s != slot) {
            self.wait_slot_fence(device, previous_slot)?;
        }
        self.images_in_flight[image_index as usize] = Some(slot);

        let frame = AcquiredFrame {
            slot,
            image_index,
            suboptimal,
        };
        tracing::trace!("Acquired image {image_index} on slot {slot}");
        self.pending = Some(frame);
        self.state = SyncState::AcquirePending;
        Ok(frame)
    }

    /// Submit the acquired image's command buffer.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn submit<D: DeviceApi>(
        &mut self,
        device: &D,
        queue: vk::Queue,
        command_buffer: vk::CommandBuffer,
    ) -> Result<()> {
        self.expect_state("submit", &[SyncState::AcquirePending])?;
        let frame = self
            .pending
            .ok_or_else(|| GpuError::InvalidState("submit without an acquired image".into()))?;

        let slot = self.slots[frame.slot];
        let command_buffers = [command_buffer];
        let wait_semaphores = [slot.image_available];
        let wait_stages = [WAIT_STAGE];
        let signal_semaphores = [self.rendering_finished[frame.image_index as usize]];
        let submission = Submission {
            command_buffers: &command_buffers,
            wait_semaphores: &wait_semaphores,
            wait_stages: &wait_stages,
            signal_semaphores: &signal_semaphores,
        };

        match (self.fence_mode, slot.in_flight) {
            (FenceMode::Recycled, Some(fence)) => {
                device.reset_fence(fence)?;
                if let Err(e) = device.queue_submit(queue, &submission, fence) {
                    self.restore_slot_fence(device, frame.slot);
                    return Err(e);
                }
            }
            _ => {
                let fence = device.create_fence(false)?;
                let result = device
                    .queue_submit(queue, &submission, fence)
                    .and_then(|()| wait_for_fence(device, fence, self.fence_timeout_ns));
                device.destroy_fence(fence);
                self.stats.fence_timeouts += u64::from(result?);
            }
        }

        self.state = SyncState::Submitted;
        Ok(())
    }

    /// Replace a slot's reset fence with a signaled one after a failed
    /// submission, so the next wait on the slot returns.
    ///
    /// The synchronizer stays in `AcquirePending`; [`Self::rebuild`] is the
    /// way back to a usable ring.
    fn restore_slot_fence<D: DeviceApi>(&mut self, device: &D, slot: usize) {
        match device.create_fence(true) {
            Ok(fence) => {
                if let Some(old) = self.slots[slot].in_flight.replace(fence) {
                    device.destroy_fence(old);
                }
            }
            Err(e) => tracing::error!("Failed to restore fence of slot {slot}: {e}"),
        }
    }

    /// Present the submitted image and advance the slot.
    ///
    /// Returns whether the swapchain should be recreated.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn present<D: DeviceApi>(
        &mut self,
        device: &D,
        swapchain: &Swapchain,
        queue: vk::Queue,
    ) -> Result<bool> {
        self.expect_state("present", &[SyncState::Submitted])?;
        let frame = self
            .pending
            .take()
            .ok_or_else(|| GpuError::InvalidState("present without a submitted image".into()))?;

        let wait_semaphores = [self.rendering_finished[frame.image_index as usize]];
        let needs_rebuild = swapchain.present(device, queue, frame.image_index, &wait_semaphores)?;
        if needs_rebuild {
            tracing::warn!("Swapchain out of date or suboptimal at present");
        }

        self.current_slot = (self.current_slot + 1) % self.slots.len().max(1);
        self.stats.frames_presented += 1;
        self.state = SyncState::Presented;
        Ok(needs_rebuild)
    }

    /// Recreate every object for a new swap image count. The device must be
    /// idle. Command buffers must be recorded again afterwards.
    pub fn rebuild<D: DeviceApi>(&mut self, device: &D, image_count: usize) -> Result<()> {
        self.expect_state(
            "rebuild",
            &[
                SyncState::Idle,
                SyncState::RecordedOnce,
                SyncState::AcquirePending,
                SyncState::Submitted,
                SyncState::Presented,
            ],
        )?;
        let frames_in_flight = self.slots.len();
        self.destroy_objects(device);
        self.create_objects(device, frames_in_flight, image_count)?;
        self.current_slot = 0;
        self.pending = None;
        self.state = SyncState::Idle;
        Ok(())
    }

    /// Wait for the device to finish all submitted work.
    pub fn drain<D: DeviceApi>(&mut self, device: &D) -> Result<()> {
        if matches!(self.state, SyncState::Terminated) {
            return Err(GpuError::InvalidState("drain after destroy".into()));
        }
        self.state = SyncState::ShutdownDraining;
        device.device_wait_idle()
    }

    /// Destroy every semaphore and fence. Requires a prior [`Self::drain`].
    pub fn destroy<D: DeviceApi>(&mut self, device: &D) -> Result<()> {
        self.expect_state("destroy", &[SyncState::ShutdownDraining])?;
        self.destroy_objects(device);
        self.pending = None;
        self.state = SyncState::Terminated;
        Ok(())
    }
}
