//! Error types for every stage of a benchmark run.
//!
//! Each variant names the stage that failed. The orchestrator stops at the
//! first error, so no handle is ever used after its creation failed.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("cannot open kernel source file '{}': {source}", .path.display())]
    KernelSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no compute devices found on any platform")]
    NoDevices,

    #[error("{call} failed with status {code}")]
    Platform { call: &'static str, code: i32 },

    #[error("context creation failed with status {0}")]
    Context(i32),

    #[error("command queue creation failed with status {0}")]
    Queue(i32),

    #[error("allocation of buffer '{buffer}' ({size} bytes) failed with status {code}")]
    Allocation {
        buffer: &'static str,
        size: usize,
        code: i32,
    },

    #[error("upload to buffer '{buffer}' failed with status {code}")]
    Upload { buffer: &'static str, code: i32 },

    #[error("kernel build failed:\n{log}")]
    Build { log: String },

    #[error("creation of kernel '{entry}' failed with status {code}")]
    KernelCreate { entry: String, code: i32 },

    #[error("binding kernel argument {index} failed with status {code}")]
    ArgBind { index: u32, code: i32 },

    #[error("kernel enqueue failed with status {0}")]
    Enqueue(i32),

    #[error("kernel '{entry}' failed during execution with status {code}")]
    Execution { entry: String, code: i32 },

    #[error("drain barrier: {step} failed with status {code}")]
    Barrier { step: &'static str, code: i32 },

    #[error("download of buffer '{buffer}' failed with status {code}")]
    Download { buffer: &'static str, code: i32 },

    #[error("invalid elapsed time {0} s")]
    Elapsed(f64),
}

impl BenchError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        BenchError::Config(msg.into())
    }

    /// Process exit status for this failure.
    ///
    /// Every failure is fatal for a run, so all of them map to 1.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_keeps_log_verbatim() {
        let log = "<kernel>:3:5: error: use of undeclared identifier 'x'\n    x = 1;\n    ^";
        let err = BenchError::Build { log: log.to_string() };
        assert!(err.to_string().ends_with(log));
    }

    #[test]
    fn allocation_error_names_buffer() {
        let err = BenchError::Allocation {
            buffer: "dB",
            size: 4096,
            code: -4,
        };
        let msg = err.to_string();
        assert!(msg.contains("'dB'"));
        assert!(msg.contains("4096"));
        assert!(msg.contains("-4"));
    }

    #[test]
    fn every_failure_exits_with_one() {
        assert_eq!(BenchError::NoDevices.exit_code(), 1);
        assert_eq!(BenchError::Enqueue(-54).exit_code(), 1);
    }

    #[test]
    fn execution_error_names_kernel() {
        let err = BenchError::Execution {
            entry: "MatrixMult".to_string(),
            code: -5,
        };
        assert_eq!(
            err.to_string(),
            "kernel 'MatrixMult' failed during execution with status -5"
        );
    }
}
