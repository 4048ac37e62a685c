//! Result download and throughput reporting.

use crate::config::{ExecutionConfig, ReportFormat};
use crate::error::{BenchError, Result};
use crate::matrix::Matrix;
use crate::platform::{settle, DeviceContext};
use crate::timing::TimingSample;
use std::fmt;
use tracing::{info, warn};

/// Shortest window a report will divide by. Coarse clocks can read zero for a
/// small grid.
pub const MIN_ELAPSED_SECS: f64 = 1e-9;

/// Billions of multiply-adds per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Throughput(f64);

impl Throughput {
    /// `width³ / seconds / 1e9`; `seconds` must be positive and finite.
    pub fn from_elapsed(width: usize, seconds: f64) -> Result<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(BenchError::Elapsed(seconds));
        }
        let w = width as f64;
        Ok(Self(w * w * w / seconds / 1_000_000_000.0))
    }

    pub fn giga_mults(self) -> f64 {
        self.0
    }
}

/// One result line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub width: usize,
    pub tile: usize,
    pub throughput: Throughput,
    pub format: ReportFormat,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gmults = self.throughput.giga_mults();
        match self.format {
            ReportFormat::Csv => write!(
                f,
                "{:8} , {:6} , {:10.2}",
                self.width * self.width,
                self.tile * self.tile,
                gmults
            ),
            ReportFormat::Human => write!(
                f,
                "Matrix Size: {:6} x {:6} , Work Elements: {:4} x {:4} , GigaMultsPerSecond: {:10.2}",
                self.width, self.width, self.tile, self.tile, gmults
            ),
        }
    }
}

pub struct ResultCollector;

impl ResultCollector {
    /// Queue a download of `buffer` into `out` and wait until it is populated.
    pub fn download<C: DeviceContext>(ctx: &C, buffer: &C::Buffer, out: &mut Matrix) -> Result<()> {
        // SAFETY: `out` stays borrowed until the drain below returns.
        let queued = unsafe { ctx.enqueue_read(buffer, out.as_bytes_mut()) };
        settle(ctx, queued)?;
        ctx.drain()
    }

    /// Build the report line for `sample`. A window shorter than
    /// [`MIN_ELAPSED_SECS`] is reported at that floor.
    pub fn report(
        config: &ExecutionConfig,
        sample: &TimingSample,
        format: ReportFormat,
    ) -> Result<Report> {
        let mut seconds = sample.elapsed_secs();
        if seconds < MIN_ELAPSED_SECS {
            warn!("compute window of {seconds} s is below clock resolution, using {MIN_ELAPSED_SECS} s");
            seconds = MIN_ELAPSED_SECS;
        }
        let throughput = Throughput::from_elapsed(config.width(), seconds)?;
        info!("{:.2} GigaMults/s", throughput.giga_mults());
        Ok(Report {
            width: config.width(),
            tile: config.tile(),
            throughput,
            format,
        })
    }

    /// Write the report line to stderr.
    pub fn emit(report: &Report) {
        eprintln!("{report}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn one_second_at_1024() {
        let t = Throughput::from_elapsed(1024, 1.0).unwrap();
        assert!((t.giga_mults() - 1.073741824).abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_elapsed() {
        for secs in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(Throughput::from_elapsed(1024, secs).is_err());
        }
    }

    #[test]
    fn zero_window_still_reports() {
        let now = Instant::now();
        let sample = TimingSample { start: now, end: now };
        let config = ExecutionConfig::new(4, 2).unwrap();
        let report = ResultCollector::report(&config, &sample, ReportFormat::Csv).unwrap();
        let gmults = report.throughput.giga_mults();
        assert!(gmults.is_finite());
        assert!((gmults - 64.0 / MIN_ELAPSED_SECS / 1e9).abs() < 1e-6);
    }

    #[test]
    fn csv_row_layout() {
        let report = Report {
            width: 1024,
            tile: 8,
            throughput: Throughput::from_elapsed(1024, 1.0).unwrap(),
            format: ReportFormat::Csv,
        };
        assert_eq!(report.to_string(), " 1048576 ,     64 ,       1.07");
    }

    #[test]
    fn human_line_layout() {
        let report = Report {
            width: 1024,
            tile: 8,
            throughput: Throughput::from_elapsed(1024, 0.5).unwrap(),
            format: ReportFormat::Human,
        };
        assert_eq!(
            report.to_string(),
            "Matrix Size:   1024 x   1024 , Work Elements:    8 x    8 , GigaMultsPerSecond:       2.15"
        );
    }
}
