//! Immediate submission channel.
//!
//! A synchronous, blocking single-use command execution path for one-off
//! GPU operations outside the main frame loop: staging copies for mesh
//! uploads and similar setup-time work. Submissions fully serialize with
//! frame-loop GPU usage on the shared graphics queue, so this channel is
//! not meant to be used during steady-state rendering.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use ember_rhi::RhiResult;
use ember_rhi::command::{CommandBuffer, CommandPool, command_buffer_submit_info};
use ember_rhi::device::Device;
use ember_rhi::sync::Fence;

/// Timeout for the blocking wait, in nanoseconds. Effectively unbounded:
/// an upload that takes this long means the device is gone.
const IMMEDIATE_WAIT_NS: u64 = 9_999_999_999;

/// One-shot command execution channel with its own pool, buffer, and
/// fence.
pub struct ImmediateSubmit {
    device: Arc<Device>,
    command_pool: CommandPool,
    command_buffer: CommandBuffer,
    fence: Fence,
}

impl ImmediateSubmit {
    /// Creates the channel's dedicated command pool, buffer, and fence.
    ///
    /// # Errors
    ///
    /// Returns an error if any resource creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let graphics_family = device.queue_families().graphics_family.unwrap();

        let command_pool = CommandPool::new(device.clone(), graphics_family)?;
        let command_buffer = CommandBuffer::new(device.clone(), &command_pool)?;
        let fence = Fence::new(device.clone(), true)?;

        debug!("Immediate submission channel created");

        Ok(Self {
            device,
            command_pool,
            command_buffer,
            fence,
        })
    }

    /// Records commands through the caller's closure, submits them on the
    /// graphics queue, and blocks until the GPU signals completion.
    ///
    /// # Arguments
    ///
    /// * `record` - Invoked exactly once with the open command buffer
    ///
    /// # Errors
    ///
    /// Returns an error if recording control, submission, or the fence
    /// wait fails.
    pub fn submit<F>(&self, record: F) -> RhiResult<()>
    where
        F: FnOnce(&CommandBuffer),
    {
        self.fence.reset()?;
        self.command_buffer.reset()?;

        self.command_buffer.begin()?;
        record(&self.command_buffer);
        self.command_buffer.end()?;

        let cmd_infos = [command_buffer_submit_info(self.command_buffer.handle())];
        let submit = vk::SubmitInfo2::default().command_buffer_infos(&cmd_infos);

        // SAFETY: the command buffer is fully recorded, nothing else
        // references it, and the fence was just reset
        unsafe {
            self.device.submit_graphics(&[submit], self.fence.handle())?;
        }

        self.fence.wait(IMMEDIATE_WAIT_NS)?;

        debug!("Immediate submission completed");

        Ok(())
    }

    /// Returns a reference to the channel's command pool.
    #[inline]
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_wait_is_effectively_unbounded() {
        // ~10 seconds in nanoseconds
        assert!(IMMEDIATE_WAIT_NS > 9_000_000_000);
    }

    #[test]
    fn test_immediate_submit_is_send() {
        // Compile-time check that ImmediateSubmit is Send
        fn assert_send<T: Send>() {}
        assert_send::<ImmediateSubmit>();
    }
}
