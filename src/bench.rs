//! One benchmark run: select, stage, build, time, collect.

use crate::collector::{Report, ResultCollector};
use crate::config::{ExecutionConfig, ReportFormat};
use crate::device::{DeviceSelector, SelectedDevice};
use crate::error::Result;
use crate::launcher::KernelLauncher;
use crate::matrix::{initialize_matrices, KernelSource, Matrix, MatrixType};
use crate::platform::ComputePlatform;
use crate::stager::BufferStager;
use crate::timing::{TimingHarness, TimingSample};
use tracing::{info, warn};

/// Everything a run produces.
pub struct BenchmarkOutcome<P, D> {
    /// [`ComputePlatform::name`] of the backend that ran.
    pub backend: String,
    pub device: SelectedDevice<P, D>,
    pub sample: TimingSample,
    pub report: Report,
    pub output: Matrix,
}

pub struct Benchmark<'a> {
    pub config: ExecutionConfig,
    pub source: &'a KernelSource,
    pub entry: &'a str,
    pub inputs: MatrixType,
    pub format: ReportFormat,
}

impl<'a> Benchmark<'a> {
    pub fn new(config: ExecutionConfig, source: &'a KernelSource, entry: &'a str) -> Self {
        Self {
            config,
            source,
            entry,
            inputs: MatrixType::OnesAndTwos,
            format: ReportFormat::compiled(),
        }
    }

    pub fn inputs(mut self, inputs: MatrixType) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Run every stage in order and stop at the first failure.
    pub fn run<C: ComputePlatform>(
        &self,
        platform: &C,
    ) -> Result<BenchmarkOutcome<C::Platform, C::Device>> {
        let config = &self.config;
        let device = DeviceSelector::select(platform)?;
        if self.format == ReportFormat::Human {
            eprintln!(
                "Selected Platform #{}, Device #{}: Vendor = {}, Type = {}",
                device.platform_index,
                device.device_index,
                device.vendor_name(),
                device.class_name()
            );
        }

        let ctx = platform.create_context(&device)?;
        info!("{} context ready on '{}'", platform.name(), device.name);

        let (a, b) = initialize_matrices(self.inputs, config.width());
        let buffers = BufferStager::stage(&ctx, config, &a, &b)?;

        let launcher = KernelLauncher::build(&ctx, self.source, self.entry)?;
        launcher.bind(&ctx, &buffers)?;

        if self.format == ReportFormat::Human {
            eprintln!(
                "Number of Work Groups = {:5} x {:5}",
                config.groups_per_axis(),
                config.groups_per_axis()
            );
        }

        let sample = TimingHarness::time(&ctx, || launcher.submit(&ctx, config))?;

        let mut output = Matrix::zeros(config.width());
        ResultCollector::download(&ctx, &buffers.c, &mut output)?;

        if let Some((x, y)) = self.inputs.constants() {
            let expected = config.width() as f32 * x * y;
            let bad = output.as_slice().iter().filter(|&&v| v != expected).count();
            if bad > 0 {
                warn!("{bad} output elements differ from the expected {expected}");
            }
        }

        let report = ResultCollector::report(config, &sample, self.format)?;
        Ok(BenchmarkOutcome {
            backend: platform.name().to_string(),
            device,
            sample,
            report,
            output,
        })
    }
}
