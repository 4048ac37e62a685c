//! Matrix multiplication throughput benchmark
//!
//! Prints one line to stderr: a CSV row by default, or a labelled line when
//! built without the `csv` feature. Exits with status 1 on any failure.
//!
//! The default build has no OpenCL dependency and measures the software host
//! device, so its numbers say nothing about GPU throughput. Build with
//! `--features opencl` to benchmark real hardware through `libOpenCL`.

use anyhow::Result;
use opencl_matmul::config::{KERNEL_ENTRY_POINT, KERNEL_FILE_NAME};
use opencl_matmul::{collector::ResultCollector, Benchmark, BenchError, ExecutionConfig, KernelSource};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<BenchError>()
                .map(BenchError::exit_code)
                .unwrap_or(1);
            eprintln!("{err:#}");
            ExitCode::from(code as u8)
        }
    }
}

fn run() -> Result<()> {
    // Nothing touches a device until the kernel source has been read.
    let source = KernelSource::load(KERNEL_FILE_NAME)?;
    let config = ExecutionConfig::compiled();
    let bench = Benchmark::new(config, &source, KERNEL_ENTRY_POINT);

    #[cfg(feature = "opencl")]
    let outcome = bench.run(&opencl_matmul::opencl::OpenClPlatform::new())?;

    #[cfg(not(feature = "opencl"))]
    let outcome = {
        tracing::warn!("built without the `opencl` feature; running on the host device");
        bench.run(&opencl_matmul::host::HostPlatform::new())?
    };

    tracing::info!("measured on the {} backend", outcome.backend);
    ResultCollector::emit(&outcome.report);
    Ok(())
}
