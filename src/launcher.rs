//! Kernel build, argument binding and submission.

use crate::config::ExecutionConfig;
use crate::error::Result;
use crate::matrix::KernelSource;
use crate::platform::DeviceContext;
use crate::stager::DeviceBuffers;
use tracing::{debug, info};

/// A built kernel ready to be bound and submitted.
pub struct KernelLauncher<K> {
    kernel: K,
    entry: String,
}

impl<K> KernelLauncher<K> {
    /// Build `source` for the context's device and create `entry`.
    ///
    /// A failed build surfaces the compiler log in the error.
    pub fn build<C>(ctx: &C, source: &KernelSource, entry: &str) -> Result<Self>
    where
        C: DeviceContext<Kernel = K>,
    {
        info!("building '{}' from {}", entry, source.path().display());
        let kernel = ctx.build_kernel(source.text(), entry)?;
        Ok(Self {
            kernel,
            entry: entry.to_string(),
        })
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Bind A, B, width and C to argument slots 0..=3.
    pub fn bind<C>(&self, ctx: &C, buffers: &DeviceBuffers<C::Buffer>) -> Result<()>
    where
        C: DeviceContext<Kernel = K>,
    {
        for (index, buffer) in (0u32..).zip(buffers.in_arg_order()) {
            ctx.set_kernel_arg(&self.kernel, index, buffer)?;
        }
        debug!("bound 4 arguments to '{}'", self.entry);
        Ok(())
    }

    /// Queue the kernel over a width x width grid of tile x tile groups.
    /// Returns once the launch is queued, not when it completes.
    pub fn submit<C>(&self, ctx: &C, config: &ExecutionConfig) -> Result<()>
    where
        C: DeviceContext<Kernel = K>,
    {
        debug!(
            "enqueue '{}': {} x {} work-groups of {} x {}",
            self.entry,
            config.groups_per_axis(),
            config.groups_per_axis(),
            config.tile(),
            config.tile()
        );
        ctx.enqueue_nd_range(&self.kernel, config.global_size(), config.local_size())
    }
}
