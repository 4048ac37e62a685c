//! The compute-platform capability the benchmark drives.
//!
//! A [`ComputePlatform`] enumerates platforms and devices and opens a
//! [`DeviceContext`] (context plus one in-order command queue) on the chosen
//! device. Everything the core does after selection goes through the context.

use crate::device::{DeviceClass, SelectedDevice};
use crate::error::Result;

/// Status codes shared by every backend, numbered as in `cl.h`.
pub mod status {
    pub const SUCCESS: i32 = 0;
    pub const MEM_OBJECT_ALLOCATION_FAILURE: i32 = -4;
    pub const OUT_OF_RESOURCES: i32 = -5;
    pub const BUILD_PROGRAM_FAILURE: i32 = -11;
    pub const INVALID_VALUE: i32 = -30;
    pub const INVALID_DEVICE: i32 = -33;
    pub const INVALID_MEM_OBJECT: i32 = -38;
    pub const INVALID_KERNEL_NAME: i32 = -46;
    pub const INVALID_ARG_INDEX: i32 = -49;
    pub const INVALID_KERNEL_ARGS: i32 = -52;
    pub const INVALID_WORK_DIMENSION: i32 = -53;
    pub const INVALID_WORK_GROUP_SIZE: i32 = -54;
    pub const INVALID_BUFFER_SIZE: i32 = -61;
    pub const INVALID_GLOBAL_WORK_SIZE: i32 = -63;
}

/// Host-visible description of one enumerated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo<D> {
    pub handle: D,
    pub class: DeviceClass,
    pub vendor_id: u32,
    pub name: String,
}

/// How a kernel may access a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

pub trait ComputePlatform {
    type Platform: Copy + std::fmt::Debug;
    type Device: Copy + std::fmt::Debug;
    type Context: DeviceContext;

    /// Short name for logs.
    fn name(&self) -> &str;

    fn platforms(&self) -> Result<Vec<Self::Platform>>;

    fn devices(&self, platform: Self::Platform) -> Result<Vec<DeviceInfo<Self::Device>>>;

    fn create_context(
        &self,
        device: &SelectedDevice<Self::Platform, Self::Device>,
    ) -> Result<Self::Context>;
}

/// A context with a single in-order command queue.
///
/// Enqueue operations return as soon as the command is queued. Their effects
/// are only guaranteed visible after [`DeviceContext::drain`].
pub trait DeviceContext {
    type Buffer;
    type Kernel;

    fn create_buffer(&self, label: &'static str, access: MemAccess, size: usize)
        -> Result<Self::Buffer>;

    /// Queue a non-blocking copy of `data` into `buffer`.
    ///
    /// # Safety
    ///
    /// `data` must stay alive and unmodified until the next
    /// [`DeviceContext::drain`] returns, whether or not it succeeds.
    unsafe fn enqueue_write(&self, buffer: &Self::Buffer, data: &[u8]) -> Result<()>;

    /// Queue a non-blocking copy of `buffer` into `data`.
    ///
    /// # Safety
    ///
    /// `data` must stay alive and must not be read or written until the next
    /// [`DeviceContext::drain`] returns, whether or not it succeeds.
    unsafe fn enqueue_read(&self, buffer: &Self::Buffer, data: &mut [u8]) -> Result<()>;

    /// Compile `source` for the context's device and create `entry`.
    ///
    /// A failed build returns [`crate::BenchError::Build`] carrying the
    /// compiler log.
    fn build_kernel(&self, source: &str, entry: &str) -> Result<Self::Kernel>;

    fn set_kernel_arg(&self, kernel: &Self::Kernel, index: u32, buffer: &Self::Buffer)
        -> Result<()>;

    fn enqueue_nd_range(
        &self,
        kernel: &Self::Kernel,
        global: [usize; 3],
        local: [usize; 3],
    ) -> Result<()>;

    /// Enqueue a marker and block until it completes.
    ///
    /// On error, no previously queued transfer touches host memory after
    /// this returns.
    fn drain(&self) -> Result<()>;
}

/// Pass `result` through, draining the queue first when it is an error so
/// queued transfers are finished before the caller's host data goes away.
pub fn settle<C: DeviceContext, T>(ctx: &C, result: Result<T>) -> Result<T> {
    if result.is_err() {
        if let Err(err) = ctx.drain() {
            tracing::warn!("drain after failure: {err}");
        }
    }
    result
}
