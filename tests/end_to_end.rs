//! Full runs against the host device.

use opencl_matmul::collector::ResultCollector;
use opencl_matmul::config::{KERNEL_ENTRY_POINT, KERNEL_FILE_NAME};
use opencl_matmul::device::{DeviceClass, DeviceSelector, VENDOR_INTEL, VENDOR_NVIDIA};
use opencl_matmul::host::{HostDeviceSpec, HostFaults, HostPlatform};
use opencl_matmul::matrix::{compare_results, cpu_matrix_multiply, initialize_matrices};
use opencl_matmul::platform::{ComputePlatform, DeviceContext};
use opencl_matmul::stager::BufferStager;
use opencl_matmul::{
    BenchError, Benchmark, ExecutionConfig, KernelSource, Matrix, MatrixType, ReportFormat,
};
use std::path::Path;

fn shipped_source() -> KernelSource {
    KernelSource::load(Path::new(env!("CARGO_MANIFEST_DIR")).join(KERNEL_FILE_NAME)).unwrap()
}

#[test]
fn ones_times_twos_gives_width_times_two() {
    let source = shipped_source();
    let config = ExecutionConfig::new(4, 2).unwrap();
    let outcome = Benchmark::new(config, &source, KERNEL_ENTRY_POINT)
        .run(&HostPlatform::new())
        .unwrap();

    assert_eq!(outcome.backend, "host");
    assert_eq!(outcome.output.width(), 4);
    assert!(outcome.output.as_slice().iter().all(|&v| v == 8.0));
    assert_eq!(outcome.report.width, 4);
    assert_eq!(outcome.report.tile, 2);
    assert!(outcome.report.throughput.giga_mults() > 0.0);
    assert!(outcome.report.throughput.giga_mults().is_finite());
}

#[test]
fn random_inputs_match_host_reference() {
    let source = shipped_source();
    let config = ExecutionConfig::new(16, 4).unwrap();
    let platform = HostPlatform::new();
    let device = DeviceSelector::select(&platform).unwrap();
    let ctx = platform.create_context(&device).unwrap();

    let (a, b) = initialize_matrices(MatrixType::Random, 16);
    let buffers = BufferStager::stage(&ctx, &config, &a, &b).unwrap();
    let launcher =
        opencl_matmul::launcher::KernelLauncher::build(&ctx, &source, KERNEL_ENTRY_POINT).unwrap();
    launcher.bind(&ctx, &buffers).unwrap();
    opencl_matmul::timing::TimingHarness::time(&ctx, || launcher.submit(&ctx, &config)).unwrap();

    let mut out = Matrix::zeros(16);
    ResultCollector::download(&ctx, &buffers.c, &mut out).unwrap();
    let cmp = compare_results(&out, &cpu_matrix_multiply(&a, &b), 1e-5);
    assert!(cmp.matches(), "{cmp:?}");
}

#[test]
fn upload_then_download_is_bit_exact() {
    let platform = HostPlatform::new();
    let device = DeviceSelector::select(&platform).unwrap();
    let ctx = platform.create_context(&device).unwrap();

    let data: Vec<f32> = (0..64)
        .map(|i| match i {
            0 => f32::MIN_POSITIVE,
            1 => -0.0,
            2 => f32::from_bits(0x7fc0_0001),
            _ => i as f32 * 0.1 - 3.0,
        })
        .collect();
    let original = Matrix::from_vec(8, data).unwrap();
    let buffer = BufferStager::upload(&ctx, "dA", &original).unwrap();

    let mut back = Matrix::zeros(8);
    ResultCollector::download(&ctx, &buffer, &mut back).unwrap();
    assert_eq!(back.as_bytes(), original.as_bytes());
}

#[test]
fn gpu_is_chosen_for_the_run() {
    let platform = HostPlatform::with_platforms(vec![
        vec![HostDeviceSpec::new(DeviceClass::Cpu, VENDOR_INTEL, "cpu")],
        vec![
            HostDeviceSpec::new(DeviceClass::Gpu, VENDOR_INTEL, "igpu"),
            HostDeviceSpec::new(DeviceClass::Gpu, VENDOR_NVIDIA, "dgpu"),
        ],
    ]);
    let source = shipped_source();
    let config = ExecutionConfig::new(8, 2).unwrap();
    let outcome = Benchmark::new(config, &source, KERNEL_ENTRY_POINT)
        .inputs(MatrixType::ThreesAndFours)
        .format(ReportFormat::Human)
        .run(&platform)
        .unwrap();

    assert_eq!(outcome.device.name, "dgpu");
    assert_eq!((outcome.device.platform_index, outcome.device.device_index), (1, 1));
    assert!(outcome.output.as_slice().iter().all(|&v| v == 96.0));
    assert!(outcome.report.to_string().starts_with("Matrix Size:      8 x      8"));
}

#[test]
fn no_devices_is_fatal_before_any_device_work() {
    let platform = HostPlatform::with_platforms(vec![vec![], vec![]]);
    let source = shipped_source();
    let config = ExecutionConfig::new(4, 2).unwrap();
    let err = Benchmark::new(config, &source, KERNEL_ENTRY_POINT)
        .run(&platform)
        .err()
        .unwrap();
    assert!(matches!(err, BenchError::NoDevices));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn build_failure_aborts_the_run() {
    let source = KernelSource::from_text("__kernel void Something(int x) {}");
    let config = ExecutionConfig::new(4, 2).unwrap();
    let err = Benchmark::new(config, &source, KERNEL_ENTRY_POINT)
        .run(&HostPlatform::new())
        .err()
        .unwrap();
    assert!(matches!(err, BenchError::Build { .. }));
}

#[test]
fn failed_launch_aborts_the_run() {
    let platform = HostPlatform::new().with_faults(HostFaults {
        fail_enqueue: true,
        ..Default::default()
    });
    let source = shipped_source();
    let config = ExecutionConfig::new(4, 2).unwrap();
    let err = Benchmark::new(config, &source, KERNEL_ENTRY_POINT)
        .run(&platform)
        .err()
        .unwrap();
    assert!(matches!(err, BenchError::Enqueue(_)));
}

#[test]
fn drain_leaves_nothing_queued() {
    let platform = HostPlatform::new();
    let device = DeviceSelector::select(&platform).unwrap();
    let ctx = platform.create_context(&device).unwrap();
    let config = ExecutionConfig::new(4, 2).unwrap();
    BufferStager::stage(&ctx, &config, &Matrix::filled(4, 1.0), &Matrix::filled(4, 2.0)).unwrap();
    assert_eq!(ctx.pending(), 0);
    ctx.drain().unwrap();
    assert_eq!(ctx.pending(), 0);
}
