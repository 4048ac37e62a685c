//! Device buffer allocation and input upload.

use crate::config::ExecutionConfig;
use crate::error::{BenchError, Result};
use crate::matrix::Matrix;
use crate::platform::{settle, DeviceContext, MemAccess};
use tracing::info;

/// The four buffers the kernel consumes, in argument order.
pub struct DeviceBuffers<B> {
    pub a: B,
    pub b: B,
    pub width: B,
    pub c: B,
}

impl<B> DeviceBuffers<B> {
    /// Buffers in kernel-argument order: A, B, width, C.
    pub fn in_arg_order(&self) -> [&B; 4] {
        [&self.a, &self.b, &self.width, &self.c]
    }
}

pub struct BufferStager;

impl BufferStager {
    /// Allocate all four buffers, queue the three uploads, and wait until
    /// they have landed on the device.
    pub fn stage<C: DeviceContext>(
        ctx: &C,
        config: &ExecutionConfig,
        a: &Matrix,
        b: &Matrix,
    ) -> Result<DeviceBuffers<C::Buffer>> {
        for (name, m) in [("A", a), ("B", b)] {
            if m.width() != config.width() {
                return Err(BenchError::config(format!(
                    "matrix {name} is {w}x{w}, expected {cw}x{cw}",
                    w = m.width(),
                    cw = config.width()
                )));
            }
        }
        let mw = i32::try_from(config.width())
            .map_err(|_| BenchError::config("matrix width exceeds i32"))?
            .to_ne_bytes();

        let bytes = config.matrix_bytes();
        let buffers = DeviceBuffers {
            a: ctx.create_buffer("dA", MemAccess::ReadOnly, bytes)?,
            b: ctx.create_buffer("dB", MemAccess::ReadOnly, bytes)?,
            width: ctx.create_buffer("dMW", MemAccess::ReadOnly, mw.len())?,
            c: ctx.create_buffer("dC", MemAccess::WriteOnly, bytes)?,
        };

        // SAFETY: `a`, `b` and `mw` outlive the drain below, or the settling
        // drain when one of the writes is refused.
        let queued = unsafe {
            ctx.enqueue_write(&buffers.a, a.as_bytes())
                .and_then(|()| ctx.enqueue_write(&buffers.b, b.as_bytes()))
                .and_then(|()| ctx.enqueue_write(&buffers.width, &mw))
        };
        settle(ctx, queued)?;
        ctx.drain()?;

        info!("staged {} bytes per matrix on the device", bytes);
        Ok(buffers)
    }

    /// Upload one matrix into a fresh read-only buffer and wait.
    pub fn upload<C: DeviceContext>(
        ctx: &C,
        label: &'static str,
        m: &Matrix,
    ) -> Result<C::Buffer> {
        let buffer = ctx.create_buffer(label, MemAccess::ReadOnly, m.byte_len())?;
        // SAFETY: `m` outlives the drain below.
        let queued = unsafe { ctx.enqueue_write(&buffer, m.as_bytes()) };
        settle(ctx, queued)?;
        ctx.drain()?;
        Ok(buffer)
    }
}
