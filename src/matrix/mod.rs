//! Host-side matrices and the kernel that multiplies them
//!
//! Provides:
//! - the square [`Matrix`] type and fill patterns
//! - reference multiplication and result comparison on the host
//! - loading of the kernel source file

mod types;
pub mod operations;
pub mod kernels;

pub use types::{Matrix, MatrixType};
pub use operations::{compare_results, cpu_matrix_multiply, initialize_matrices, Comparison};
pub use kernels::KernelSource;
