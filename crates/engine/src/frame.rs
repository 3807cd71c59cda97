//! Frame slots and their synchronization primitives.
//!
//! The engine rotates through [`FRAME_OVERLAP`] slots, one per frame that
//! may be in flight. Each slot owns everything one frame's recording
//! needs: a command pool with one primary command buffer (reset and
//! reused, never reallocated), the two semaphores ordering that frame's
//! GPU work against the swapchain, the fence the CPU waits on before
//! reusing the slot, and a private deletion queue for objects retired
//! during that frame.
//!
//! # Slot state machine
//!
//! ```text
//! Idle (fence signaled)
//!   -> Recording (fence wait passed, buffer reset and recording)
//!   -> Submitted (fence reset, command buffer in flight)
//!   -> Idle (fence signaled by GPU completion, observed by the next
//!      cycle's wait)
//! ```
//!
//! A slot only re-enters Recording after its own fence wait succeeds,
//! which caps the number of frames in flight at the slot count. This is
//! the frame loop's backpressure mechanism.

use std::sync::Arc;

use tracing::{debug, info};

use ember_rhi::RhiResult;
use ember_rhi::command::{CommandBuffer, CommandPool};
use ember_rhi::device::Device;
use ember_rhi::sync::{Fence, Semaphore};

use crate::FRAME_OVERLAP;
use crate::deletion::DeletionQueue;

/// Per-frame resources and synchronization.
pub struct FrameSlot {
    /// Command pool owning this slot's command buffer.
    pub command_pool: CommandPool,
    /// Primary command buffer, reset and re-recorded every cycle.
    pub command_buffer: CommandBuffer,
    /// Signaled when the acquired swapchain image is ready for GPU use.
    pub swapchain_semaphore: Semaphore,
    /// Signaled when this frame's GPU work completes; presentation waits
    /// on it.
    pub render_semaphore: Semaphore,
    /// Signaled when the GPU finishes this slot's previous submission.
    pub render_fence: Fence,
    /// Objects retired during this frame, released the next time the slot
    /// is reused.
    pub deletion_queue: DeletionQueue,
}

impl FrameSlot {
    /// Creates one frame slot.
    ///
    /// The fence starts signaled so the very first wait on the slot does
    /// not block.
    ///
    /// # Errors
    ///
    /// Returns an error if any resource creation fails.
    fn new(device: Arc<Device>) -> RhiResult<Self> {
        let graphics_family = device.queue_families().graphics_family.unwrap();

        let command_pool = CommandPool::new(device.clone(), graphics_family)?;
        let command_buffer = CommandBuffer::new(device.clone(), &command_pool)?;
        let swapchain_semaphore = Semaphore::new(device.clone())?;
        let render_semaphore = Semaphore::new(device.clone())?;
        let render_fence = Fence::new(device, true)?;

        Ok(Self {
            command_pool,
            command_buffer,
            swapchain_semaphore,
            render_semaphore,
            render_fence,
            deletion_queue: DeletionQueue::new(),
        })
    }
}

/// The rotating set of frame slots, keyed by a monotonic frame counter.
pub struct FrameSlots {
    slots: Vec<FrameSlot>,
    frame_count: u64,
}

impl FrameSlots {
    /// Creates [`FRAME_OVERLAP`] slots.
    ///
    /// # Errors
    ///
    /// Returns an error if any slot's resource creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let mut slots = Vec::with_capacity(FRAME_OVERLAP);
        for _ in 0..FRAME_OVERLAP {
            slots.push(FrameSlot::new(device.clone())?);
        }

        info!("Created {} frame slots", FRAME_OVERLAP);

        Ok(Self {
            slots,
            frame_count: 0,
        })
    }

    /// Returns the slot for the current frame.
    #[inline]
    pub fn current(&self) -> &FrameSlot {
        &self.slots[slot_index(self.frame_count)]
    }

    /// Returns the slot for the current frame, mutably.
    #[inline]
    pub fn current_mut(&mut self) -> &mut FrameSlot {
        let index = slot_index(self.frame_count);
        &mut self.slots[index]
    }

    /// Returns the monotonic frame counter.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Advances to the next frame.
    ///
    /// Called only after a fully successful cycle; an aborted cycle
    /// retries on the same slot.
    pub fn advance(&mut self) {
        self.frame_count += 1;
    }

    /// Flushes every slot's deletion queue.
    ///
    /// Only valid once the device is idle, e.g. during shutdown.
    pub fn flush_all_deletion_queues(&mut self) {
        for slot in &mut self.slots {
            slot.deletion_queue.flush();
        }
    }

    /// Replaces every slot's semaphores with fresh ones.
    ///
    /// An abandoned acquire can leave a slot's swapchain semaphore
    /// signaled with no submission ever waiting on it. The device must be
    /// idle when this is called; swapchain recreation guarantees that.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn reset_semaphores(&mut self, device: &Arc<Device>) -> RhiResult<()> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.swapchain_semaphore = Semaphore::new(device.clone())?;
            slot.render_semaphore = Semaphore::new(device.clone())?;
            debug!("Reset semaphores for slot {}", i);
        }
        Ok(())
    }
}

/// Maps a frame counter to its slot index.
#[inline]
pub fn slot_index(frame_count: u64) -> usize {
    (frame_count % FRAME_OVERLAP as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_index_alternates() {
        assert_eq!(slot_index(0), 0);
        assert_eq!(slot_index(1), 1);
        assert_eq!(slot_index(2), 0);
        assert_eq!(slot_index(3), 1);
    }

    #[test]
    fn test_five_cycles_reuse_each_slot_at_least_twice() {
        let mut uses = [0usize; FRAME_OVERLAP];
        for frame in 0..5u64 {
            uses[slot_index(frame)] += 1;
        }

        // 5 completed cycles over 2 slots: one slot runs 3 times, the
        // other 2
        assert!(uses.iter().all(|&n| n >= 2));
        assert_eq!(uses.iter().sum::<usize>(), 5);
    }
}
