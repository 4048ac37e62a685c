//! OpenCL backend
//!
//! Raw bindings to the system `libOpenCL` and a [`ComputePlatform`]
//! implementation on top of them.
//!
//! [`ComputePlatform`]: crate::platform::ComputePlatform

pub mod bindings;
pub mod context;
pub mod types;
pub mod utils;

pub use context::{OpenClBuffer, OpenClContext, OpenClDevice, OpenClKernel, OpenClPlatform};
