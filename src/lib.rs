//! OpenCL tiled matrix multiplication benchmark.
//!
//! A run picks one compute device, uploads two square matrices, launches the
//! multiply kernel over a 2-D grid of square work-groups, times only the
//! kernel, and reports the achieved rate in billions of multiplies per second.
//!
//! Stages, in order: [`device::DeviceSelector`], [`stager::BufferStager`],
//! [`launcher::KernelLauncher`] timed by [`timing::TimingHarness`], and
//! [`collector::ResultCollector`]. [`bench::Benchmark`] chains them.
//!
//! Two backends implement [`platform::ComputePlatform`]. The `opencl`
//! feature (off by default) adds `opencl::OpenClPlatform`, which drives real
//! devices. [`host::HostPlatform`] is always built: a single-threaded software
//! device that runs `MatrixMult` natively. Rates measured on it are host CPU
//! rates, not device rates. [`BenchmarkOutcome::backend`] records which one ran.

pub mod bench;
pub mod collector;
pub mod config;
pub mod device;
pub mod error;
pub mod host;
pub mod launcher;
pub mod matrix;
pub mod platform;
pub mod stager;
pub mod timing;

#[cfg(feature = "opencl")]
#[macro_use]
mod macros {
    /// Call an OpenCL function returning a status code; non-success becomes
    /// [`BenchError::Platform`](crate::BenchError::Platform).
    #[doc(hidden)]
    #[macro_export]
    macro_rules! cl_check {
        ($func:ident($($arg:expr),* $(,)?)) => {{
            let code = unsafe { $func($($arg),*) };
            if code != $crate::platform::status::SUCCESS {
                Err($crate::BenchError::Platform {
                    call: stringify!($func),
                    code,
                })
            } else {
                Ok(())
            }
        }};
    }

    /// Call an OpenCL constructor, appending the `errcode_ret` argument.
    /// Yields the handle, or the status code when creation failed.
    #[doc(hidden)]
    #[macro_export]
    macro_rules! cl_create {
        ($func:ident($($arg:expr),* $(,)?)) => {{
            let mut code: i32 = 0;
            let obj = unsafe { $func($($arg,)* &mut code) };
            if obj.is_null() || code != $crate::platform::status::SUCCESS {
                Err(if code == $crate::platform::status::SUCCESS {
                    $crate::platform::status::OUT_OF_RESOURCES
                } else {
                    code
                })
            } else {
                Ok(obj)
            }
        }};
    }
}

#[cfg(feature = "opencl")]
pub mod opencl;

pub use bench::{Benchmark, BenchmarkOutcome};
pub use config::{ExecutionConfig, ReportFormat};
pub use error::{BenchError, Result};
pub use matrix::{KernelSource, Matrix, MatrixType};
