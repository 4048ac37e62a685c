//! Timing of the compute-only window.

use crate::error::Result;
use crate::platform::DeviceContext;
use std::time::{Duration, Instant};
use tracing::info;

/// Timestamps bracketing one kernel from submission to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    pub start: Instant,
    pub end: Instant,
}

impl TimingSample {
    pub fn elapsed(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

pub struct TimingHarness;

impl TimingHarness {
    /// Drain the queue, run `submit`, drain again, and return the interval
    /// between the two drains. Transfers queued earlier finish before the
    /// clock starts.
    pub fn time<C, F>(ctx: &C, submit: F) -> Result<TimingSample>
    where
        C: DeviceContext,
        F: FnOnce() -> Result<()>,
    {
        ctx.drain()?;
        let start = Instant::now();
        submit()?;
        ctx.drain()?;
        let end = Instant::now();

        let sample = TimingSample { start, end };
        info!("compute window: {:?}", sample.elapsed());
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceSelector;
    use crate::error::BenchError;
    use crate::host::HostPlatform;
    use crate::platform::{ComputePlatform, MemAccess};

    #[test]
    fn pending_uploads_finish_before_the_clock_starts() {
        let platform = HostPlatform::new();
        let device = DeviceSelector::select(&platform).unwrap();
        let ctx = platform.create_context(&device).unwrap();
        let buf = ctx.create_buffer("dA", MemAccess::ReadOnly, 4).unwrap();
        let data = [9u8; 4];
        unsafe { ctx.enqueue_write(&buf, &data).unwrap() };

        let sample = TimingHarness::time(&ctx, || {
            assert_eq!(ctx.pending(), 0);
            Ok(())
        })
        .unwrap();
        assert!(sample.end >= sample.start);
    }

    #[test]
    fn failed_submit_aborts_timing() {
        let platform = HostPlatform::new();
        let device = DeviceSelector::select(&platform).unwrap();
        let ctx = platform.create_context(&device).unwrap();
        let err = TimingHarness::time(&ctx, || Err(BenchError::Enqueue(-5))).unwrap_err();
        assert!(matches!(err, BenchError::Enqueue(-5)));
        // Only the leading drain ran.
        assert_eq!(ctx.calls(), 1);
    }

    #[test]
    fn elapsed_never_negative() {
        let now = Instant::now();
        let sample = TimingSample {
            start: now + Duration::from_millis(5),
            end: now,
        };
        assert_eq!(sample.elapsed(), Duration::ZERO);
    }
}
