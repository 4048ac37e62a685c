//! Device enumeration and selection.
//!
//! Every device on every platform is ranked; the highest rank wins and a
//! later device only replaces the current pick when it ranks strictly higher.
//!
//! Ranking:
//! 1. any GPU beats any non-GPU;
//! 2. among GPUs, a non-Intel GPU beats an Intel GPU. The vendor id stands in
//!    for "discrete beats integrated"; it is a heuristic and can misrank a
//!    weak discrete card against a strong integrated one;
//! 3. otherwise the first device found wins.

use crate::error::{BenchError, Result};
use crate::platform::{ComputePlatform, DeviceInfo};
use tracing::{debug, info};

pub const VENDOR_AMD: u32 = 0x1002;
pub const VENDOR_INTEL: u32 = 0x8086;
pub const VENDOR_NVIDIA: u32 = 0x10de;

pub const DEVICE_TYPE_CPU: u64 = 1 << 1;
pub const DEVICE_TYPE_GPU: u64 = 1 << 2;
pub const DEVICE_TYPE_ACCELERATOR: u64 = 1 << 3;

/// Device class as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Cpu,
    Gpu,
    Accelerator,
    Other(u64),
}

impl DeviceClass {
    pub fn from_type_bits(bits: u64) -> Self {
        match bits {
            DEVICE_TYPE_CPU => DeviceClass::Cpu,
            DEVICE_TYPE_GPU => DeviceClass::Gpu,
            DEVICE_TYPE_ACCELERATOR => DeviceClass::Accelerator,
            other => DeviceClass::Other(other),
        }
    }

    pub fn type_bits(self) -> u64 {
        match self {
            DeviceClass::Cpu => DEVICE_TYPE_CPU,
            DeviceClass::Gpu => DEVICE_TYPE_GPU,
            DeviceClass::Accelerator => DEVICE_TYPE_ACCELERATOR,
            DeviceClass::Other(bits) => bits,
        }
    }

    pub fn name(self) -> &'static str {
        device_class_name(self.type_bits())
    }
}

/// Vendor name for a PCI vendor id; unrecognized ids are "Unknown".
pub fn vendor_name(vendor_id: u32) -> &'static str {
    match vendor_id {
        VENDOR_AMD => "AMD",
        VENDOR_INTEL => "Intel",
        VENDOR_NVIDIA => "NVIDIA",
        _ => "Unknown",
    }
}

/// Device-class name for raw device-type bits; unrecognized bits are "Unknown".
pub fn device_class_name(type_bits: u64) -> &'static str {
    match type_bits {
        DEVICE_TYPE_CPU => "CPU",
        DEVICE_TYPE_GPU => "GPU",
        DEVICE_TYPE_ACCELERATOR => "Accelerator",
        _ => "Unknown",
    }
}

/// Ordering key for selection. Field order is significance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeviceRank {
    pub gpu: bool,
    pub non_intel_gpu: bool,
}

impl DeviceRank {
    pub fn of(class: DeviceClass, vendor_id: u32) -> Self {
        let gpu = class == DeviceClass::Gpu;
        Self {
            gpu,
            non_intel_gpu: gpu && vendor_id != VENDOR_INTEL,
        }
    }
}

/// A device found during enumeration, tagged with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<P, D> {
    pub platform_index: usize,
    pub device_index: usize,
    pub platform: P,
    pub info: DeviceInfo<D>,
}

impl<P, D> Candidate<P, D> {
    pub fn rank(&self) -> DeviceRank {
        DeviceRank::of(self.info.class, self.info.vendor_id)
    }
}

/// Highest-ranked candidate; ties keep the earliest.
pub fn pick_best<P, D, I>(candidates: I) -> Option<Candidate<P, D>>
where
    I: IntoIterator<Item = Candidate<P, D>>,
{
    candidates
        .into_iter()
        .reduce(|best, next| if next.rank() > best.rank() { next } else { best })
}

/// The chosen device. Fixed for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedDevice<P, D> {
    pub platform_index: usize,
    pub device_index: usize,
    pub platform: P,
    pub device: D,
    pub class: DeviceClass,
    pub vendor_id: u32,
    pub name: String,
}

impl<P, D> SelectedDevice<P, D> {
    pub fn vendor_name(&self) -> &'static str {
        vendor_name(self.vendor_id)
    }

    pub fn class_name(&self) -> &'static str {
        self.class.name()
    }
}

impl<P, D> From<Candidate<P, D>> for SelectedDevice<P, D> {
    fn from(c: Candidate<P, D>) -> Self {
        Self {
            platform_index: c.platform_index,
            device_index: c.device_index,
            platform: c.platform,
            device: c.info.handle,
            class: c.info.class,
            vendor_id: c.info.vendor_id,
            name: c.info.name,
        }
    }
}

pub struct DeviceSelector;

impl DeviceSelector {
    /// Every device on every platform, in discovery order.
    pub fn enumerate<C: ComputePlatform>(
        platform: &C,
    ) -> Result<Vec<Candidate<C::Platform, C::Device>>> {
        let mut found = Vec::new();
        for (p, plat) in platform.platforms()?.into_iter().enumerate() {
            for (d, info) in platform.devices(plat)?.into_iter().enumerate() {
                debug!(
                    "platform #{p} device #{d}: {} (vendor = {}, type = {})",
                    info.name,
                    vendor_name(info.vendor_id),
                    info.class.name()
                );
                found.push(Candidate {
                    platform_index: p,
                    device_index: d,
                    platform: plat,
                    info,
                });
            }
        }
        Ok(found)
    }

    /// Enumerate and pick one device; fails with [`BenchError::NoDevices`]
    /// when nothing is found.
    pub fn select<C: ComputePlatform>(
        platform: &C,
    ) -> Result<SelectedDevice<C::Platform, C::Device>> {
        let candidates = Self::enumerate(platform)?;
        let best = pick_best(candidates).ok_or(BenchError::NoDevices)?;
        let selected = SelectedDevice::from(best);
        info!(
            "selected platform #{}, device #{}: {} (vendor = {}, type = {})",
            selected.platform_index,
            selected.device_index,
            selected.name,
            selected.vendor_name(),
            selected.class_name()
        );
        Ok(selected)
    }
}
