//! Property tests for device selection and throughput.

use opencl_matmul::collector::Throughput;
use opencl_matmul::device::{
    device_class_name, pick_best, vendor_name, Candidate, DeviceClass, DeviceSelector,
    VENDOR_AMD, VENDOR_INTEL, VENDOR_NVIDIA,
};
use opencl_matmul::host::{HostDeviceSpec, HostPlatform};
use opencl_matmul::platform::DeviceInfo;
use opencl_matmul::ExecutionConfig;
use proptest::prelude::*;

fn arb_class() -> impl Strategy<Value = DeviceClass> {
    prop_oneof![
        Just(DeviceClass::Cpu),
        Just(DeviceClass::Gpu),
        Just(DeviceClass::Accelerator),
        any::<u64>().prop_map(DeviceClass::from_type_bits),
    ]
}

fn arb_vendor() -> impl Strategy<Value = u32> {
    prop_oneof![
        Just(VENDOR_AMD),
        Just(VENDOR_INTEL),
        Just(VENDOR_NVIDIA),
        any::<u32>(),
    ]
}

fn candidates(specs: &[(DeviceClass, u32)]) -> Vec<Candidate<usize, usize>> {
    specs
        .iter()
        .enumerate()
        .map(|(i, &(class, vendor_id))| Candidate {
            platform_index: 0,
            device_index: i,
            platform: 0,
            info: DeviceInfo {
                handle: i,
                class,
                vendor_id,
                name: format!("dev{i}"),
            },
        })
        .collect()
}

proptest! {
    #[test]
    fn any_gpu_beats_every_cpu(
        cpus in prop::collection::vec(arb_vendor(), 1..6),
        gpu_vendor in arb_vendor(),
        gpu_at in 0usize..6,
    ) {
        let mut specs: Vec<_> = cpus.iter().map(|&v| (DeviceClass::Cpu, v)).collect();
        let at = gpu_at.min(specs.len());
        specs.insert(at, (DeviceClass::Gpu, gpu_vendor));
        let best = pick_best(candidates(&specs)).unwrap();
        prop_assert_eq!(best.info.class, DeviceClass::Gpu);
        prop_assert_eq!(best.device_index, at);
    }

    #[test]
    fn non_intel_gpu_beats_intel_gpu(
        other in prop_oneof![Just(VENDOR_AMD), Just(VENDOR_NVIDIA)],
        intel_first in any::<bool>(),
    ) {
        let intel = (DeviceClass::Gpu, VENDOR_INTEL);
        let discrete = (DeviceClass::Gpu, other);
        let specs = if intel_first { vec![intel, discrete] } else { vec![discrete, intel] };
        let best = pick_best(candidates(&specs)).unwrap();
        prop_assert_eq!(best.info.vendor_id, other);
    }

    #[test]
    fn cpu_only_picks_the_first(vendors in prop::collection::vec(arb_vendor(), 1..8)) {
        let specs: Vec<_> = vendors.iter().map(|&v| (DeviceClass::Cpu, v)).collect();
        let best = pick_best(candidates(&specs)).unwrap();
        prop_assert_eq!(best.device_index, 0);
    }

    #[test]
    fn winner_is_never_outranked(specs in prop::collection::vec((arb_class(), arb_vendor()), 1..10)) {
        let all = candidates(&specs);
        let best = pick_best(all.clone()).unwrap();
        for c in &all {
            prop_assert!(c.rank() <= best.rank());
            if c.rank() == best.rank() {
                prop_assert!(c.device_index >= best.device_index);
            }
        }
    }

    #[test]
    fn selection_across_platforms(
        layout in prop::collection::vec(
            prop::collection::vec((arb_class(), arb_vendor()), 0..4),
            0..4,
        ),
    ) {
        let platform = HostPlatform::with_platforms(
            layout
                .iter()
                .map(|devs| {
                    devs.iter()
                        .map(|&(class, vendor)| HostDeviceSpec::new(class, vendor, "d"))
                        .collect()
                })
                .collect(),
        );
        let flat: Vec<_> = layout.iter().flatten().copied().collect();
        match DeviceSelector::select(&platform) {
            Ok(sel) => {
                let expected = pick_best(candidates(&flat)).unwrap();
                prop_assert_eq!(sel.class, expected.info.class);
                prop_assert_eq!(sel.vendor_id, expected.info.vendor_id);
            }
            Err(e) => {
                prop_assert!(flat.is_empty());
                prop_assert!(matches!(e, opencl_matmul::BenchError::NoDevices));
            }
        }
    }

    #[test]
    fn lookups_are_total(vendor in any::<u32>(), bits in any::<u64>()) {
        let v = vendor_name(vendor);
        prop_assert!(["AMD", "Intel", "NVIDIA", "Unknown"].contains(&v));
        let t = device_class_name(bits);
        prop_assert!(["CPU", "GPU", "Accelerator", "Unknown"].contains(&t));
    }

    #[test]
    fn throughput_finite_and_positive(width in 1usize..=8192, secs in 1e-9f64..1e6) {
        let t = Throughput::from_elapsed(width, secs).unwrap();
        prop_assert!(t.giga_mults().is_finite());
        prop_assert!(t.giga_mults() > 0.0);
    }

    #[test]
    fn config_accepts_only_dividing_tiles(width in 1usize..=4096, tile in 1usize..=64) {
        let ok = ExecutionConfig::new(width, tile).is_ok();
        prop_assert_eq!(ok, tile <= width && width % tile == 0);
    }
}
