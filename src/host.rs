//! Software compute platform.
//!
//! Used when the crate is built without the `opencl` feature and by the test
//! suite. Commands go into an in-order queue and only execute when the queue
//! is drained, so callers see the same visibility rules as on a real device.
//! The only kernel it can run is `MatrixMult`, executed work-group by
//! work-group on the calling thread.

use crate::device::{DeviceClass, SelectedDevice};
use crate::error::{BenchError, Result};
use crate::platform::{status, ComputePlatform, DeviceContext, DeviceInfo, MemAccess};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

/// Entry point the host device can execute.
pub const HOST_MATRIX_MULT: &str = "MatrixMult";

/// One simulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDeviceSpec {
    pub class: DeviceClass,
    pub vendor_id: u32,
    pub name: String,
}

impl HostDeviceSpec {
    pub fn new(class: DeviceClass, vendor_id: u32, name: impl Into<String>) -> Self {
        Self {
            class,
            vendor_id,
            name: name.into(),
        }
    }
}

/// Failures to inject, for exercising the fatal paths.
#[derive(Debug, Clone, Default)]
pub struct HostFaults {
    /// Allocation of the buffer with this label fails.
    pub fail_allocation: Option<&'static str>,
    /// Queuing an upload into the buffer with this label fails.
    pub fail_upload: Option<&'static str>,
    /// Binding this argument index fails.
    pub fail_arg: Option<u32>,
    /// Every kernel enqueue fails.
    pub fail_enqueue: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostDeviceId {
    pub platform: usize,
    pub device: usize,
}

#[derive(Debug, Clone)]
pub struct HostPlatform {
    platforms: Vec<Vec<HostDeviceSpec>>,
    faults: HostFaults,
}

impl HostPlatform {
    /// One platform with one CPU device.
    pub fn new() -> Self {
        Self::with_platforms(vec![vec![HostDeviceSpec::new(
            DeviceClass::Cpu,
            0,
            "host cpu",
        )]])
    }

    pub fn with_platforms(platforms: Vec<Vec<HostDeviceSpec>>) -> Self {
        Self {
            platforms,
            faults: HostFaults::default(),
        }
    }

    pub fn with_faults(mut self, faults: HostFaults) -> Self {
        self.faults = faults;
        self
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputePlatform for HostPlatform {
    type Platform = usize;
    type Device = HostDeviceId;
    type Context = HostContext;

    fn name(&self) -> &str {
        "host"
    }

    fn platforms(&self) -> Result<Vec<usize>> {
        Ok((0..self.platforms.len()).collect())
    }

    fn devices(&self, platform: usize) -> Result<Vec<DeviceInfo<HostDeviceId>>> {
        let specs = self.platforms.get(platform).ok_or(BenchError::Platform {
            call: "host_get_device_ids",
            code: status::INVALID_VALUE,
        })?;
        Ok(specs
            .iter()
            .enumerate()
            .map(|(device, spec)| DeviceInfo {
                handle: HostDeviceId { platform, device },
                class: spec.class,
                vendor_id: spec.vendor_id,
                name: spec.name.clone(),
            })
            .collect())
    }

    fn create_context(
        &self,
        device: &SelectedDevice<usize, HostDeviceId>,
    ) -> Result<HostContext> {
        let exists = self
            .platforms
            .get(device.device.platform)
            .is_some_and(|d| device.device.device < d.len());
        if !exists {
            return Err(BenchError::Context(status::INVALID_DEVICE));
        }
        Ok(HostContext {
            faults: self.faults.clone(),
            queue: RefCell::new(VecDeque::new()),
            calls: Cell::new(0),
            launches: Cell::new(0),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HostBuffer {
    label: &'static str,
    access: MemAccess,
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl HostBuffer {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.borrow().len()
    }

    fn kernel_readable(&self) -> bool {
        self.access != MemAccess::WriteOnly
    }

    fn kernel_writable(&self) -> bool {
        self.access != MemAccess::ReadOnly
    }
}

#[derive(Debug)]
pub struct HostKernel {
    entry: String,
    args: RefCell<[Option<HostBuffer>; 4]>,
}

enum Command {
    Write {
        target: HostBuffer,
        src: *const u8,
        len: usize,
    },
    Read {
        source: HostBuffer,
        dst: *mut u8,
        len: usize,
    },
    Launch {
        args: [HostBuffer; 4],
        global: [usize; 3],
        local: [usize; 3],
    },
    Marker,
}

pub struct HostContext {
    faults: HostFaults,
    queue: RefCell<VecDeque<Command>>,
    calls: Cell<usize>,
    launches: Cell<usize>,
}

impl HostContext {
    /// Number of context operations issued so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Number of kernel launches that have executed.
    pub fn launches(&self) -> usize {
        self.launches.get()
    }

    /// Commands queued but not yet executed.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    fn count(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::Write { target, src, len } => {
                // SAFETY: `enqueue_write` callers keep `src` valid until drain returns.
                let data = unsafe { std::slice::from_raw_parts(src, len) };
                target.bytes.borrow_mut()[..len].copy_from_slice(data);
                debug!("host: wrote {len} bytes to '{}'", target.label);
            }
            Command::Read { source, dst, len } => {
                let bytes = source.bytes.borrow();
                // SAFETY: `enqueue_read` callers keep `dst` valid and untouched until drain returns.
                unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, len) };
                debug!("host: read {len} bytes from '{}'", source.label);
            }
            Command::Launch {
                args,
                global,
                local,
            } => {
                matrix_mult(&args, global, local).map_err(|code| BenchError::Execution {
                    entry: HOST_MATRIX_MULT.to_string(),
                    code,
                })?;
                self.launches.set(self.launches.get() + 1);
            }
            Command::Marker => {}
        }
        Ok(())
    }
}

impl DeviceContext for HostContext {
    type Buffer = HostBuffer;
    type Kernel = HostKernel;

    fn create_buffer(
        &self,
        label: &'static str,
        access: MemAccess,
        size: usize,
    ) -> Result<HostBuffer> {
        self.count();
        if size == 0 {
            return Err(BenchError::Allocation {
                buffer: label,
                size,
                code: status::INVALID_BUFFER_SIZE,
            });
        }
        if self.faults.fail_allocation == Some(label) {
            return Err(BenchError::Allocation {
                buffer: label,
                size,
                code: status::MEM_OBJECT_ALLOCATION_FAILURE,
            });
        }
        Ok(HostBuffer {
            label,
            access,
            bytes: Rc::new(RefCell::new(vec![0u8; size])),
        })
    }

    unsafe fn enqueue_write(&self, buffer: &HostBuffer, data: &[u8]) -> Result<()> {
        self.count();
        if self.faults.fail_upload == Some(buffer.label) {
            return Err(BenchError::Upload {
                buffer: buffer.label,
                code: status::OUT_OF_RESOURCES,
            });
        }
        if data.len() > buffer.len() {
            return Err(BenchError::Upload {
                buffer: buffer.label,
                code: status::INVALID_VALUE,
            });
        }
        self.queue.borrow_mut().push_back(Command::Write {
            target: buffer.clone(),
            src: data.as_ptr(),
            len: data.len(),
        });
        Ok(())
    }

    unsafe fn enqueue_read(&self, buffer: &HostBuffer, data: &mut [u8]) -> Result<()> {
        self.count();
        if data.len() > buffer.len() {
            return Err(BenchError::Download {
                buffer: buffer.label,
                code: status::INVALID_VALUE,
            });
        }
        self.queue.borrow_mut().push_back(Command::Read {
            source: buffer.clone(),
            dst: data.as_mut_ptr(),
            len: data.len(),
        });
        Ok(())
    }

    fn build_kernel(&self, source: &str, entry: &str) -> Result<HostKernel> {
        self.count();
        if !declares_kernel(source, entry) {
            return Err(BenchError::Build {
                log: format!("<host>: error: no kernel function '{entry}' declared in program source"),
            });
        }
        if entry != HOST_MATRIX_MULT {
            return Err(BenchError::KernelCreate {
                entry: entry.to_string(),
                code: status::INVALID_KERNEL_NAME,
            });
        }
        Ok(HostKernel {
            entry: entry.to_string(),
            args: RefCell::new(Default::default()),
        })
    }

    fn set_kernel_arg(&self, kernel: &HostKernel, index: u32, buffer: &HostBuffer) -> Result<()> {
        self.count();
        if self.faults.fail_arg == Some(index) {
            return Err(BenchError::ArgBind {
                index,
                code: status::INVALID_MEM_OBJECT,
            });
        }
        let mut args = kernel.args.borrow_mut();
        let slot = args.get_mut(index as usize).ok_or(BenchError::ArgBind {
            index,
            code: status::INVALID_ARG_INDEX,
        })?;
        *slot = Some(buffer.clone());
        Ok(())
    }

    fn enqueue_nd_range(
        &self,
        kernel: &HostKernel,
        global: [usize; 3],
        local: [usize; 3],
    ) -> Result<()> {
        self.count();
        if self.faults.fail_enqueue {
            return Err(BenchError::Enqueue(status::OUT_OF_RESOURCES));
        }
        if global[2] != 1 || local[2] != 1 {
            return Err(BenchError::Enqueue(status::INVALID_WORK_DIMENSION));
        }
        if global[..2].iter().any(|&g| g == 0) {
            return Err(BenchError::Enqueue(status::INVALID_GLOBAL_WORK_SIZE));
        }
        if global.iter().zip(&local).any(|(&g, &l)| l == 0 || g % l != 0) {
            return Err(BenchError::Enqueue(status::INVALID_WORK_GROUP_SIZE));
        }
        let args = kernel.args.borrow();
        let [Some(a), Some(b), Some(mw), Some(c)] = args.clone() else {
            return Err(BenchError::Enqueue(status::INVALID_KERNEL_ARGS));
        };
        let readable = a.kernel_readable() && b.kernel_readable() && mw.kernel_readable();
        if !readable || !c.kernel_writable() {
            return Err(BenchError::Enqueue(status::INVALID_KERNEL_ARGS));
        }
        debug!(
            "host: queued '{}' over {}x{} in {}x{} groups",
            kernel.entry, global[0], global[1], local[0], local[1]
        );
        self.queue.borrow_mut().push_back(Command::Launch {
            args: [a, b, mw, c],
            global,
            local,
        });
        Ok(())
    }

    fn drain(&self) -> Result<()> {
        self.count();
        self.queue.borrow_mut().push_back(Command::Marker);
        loop {
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(Command::Marker) | None => return Ok(()),
                Some(command) => {
                    if let Err(err) = self.execute(command) {
                        // The marker can never complete once a command failed.
                        self.queue.borrow_mut().clear();
                        return Err(err);
                    }
                }
            }
        }
    }
}

/// True when `source` declares `kernel void <entry>(`.
fn declares_kernel(source: &str, entry: &str) -> bool {
    let spaced = source.replace('(', " ( ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    tokens.windows(4).any(|w| {
        matches!(w[0], "kernel" | "__kernel") && w[1] == "void" && w[2] == entry && w[3] == "("
    })
}

fn read_f32s(buffer: &HostBuffer) -> Vec<f32> {
    buffer
        .bytes
        .borrow()
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Native `MatrixMult(A, B, MW, C)`, one work-group at a time.
/// Runs `MatrixMult` over every work-group. Fails with the status a device
/// would report when the width argument or the buffers don't fit the grid.
fn matrix_mult(
    args: &[HostBuffer; 4],
    global: [usize; 3],
    local: [usize; 3],
) -> std::result::Result<(), i32> {
    let [a, b, mw, c] = args;

    let width = {
        let bytes = mw.bytes.borrow();
        let raw: [u8; 4] = bytes
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or(status::INVALID_KERNEL_ARGS)?;
        i32::from_ne_bytes(raw)
    };
    let width = usize::try_from(width).map_err(|_| status::INVALID_VALUE)?;

    let a = read_f32s(a);
    let b = read_f32s(b);
    let elements = width * width;
    if a.len() < elements || b.len() < elements || c.len() < elements * 4 {
        return Err(status::OUT_OF_RESOURCES);
    }
    if global[0] > width || global[1] > width {
        return Err(status::OUT_OF_RESOURCES);
    }

    let mut out = read_f32s(c);
    let groups = [global[0] / local[0], global[1] / local[1]];
    for gx in 0..groups[0] {
        for gy in 0..groups[1] {
            for lx in 0..local[0] {
                for ly in 0..local[1] {
                    let row = gx * local[0] + lx;
                    let col = gy * local[1] + ly;
                    let mut sum = 0.0f32;
                    for k in 0..width {
                        sum += a[row * width + k] * b[k * width + col];
                    }
                    out[row * width + col] = sum;
                }
            }
        }
    }

    let mut bytes = c.bytes.borrow_mut();
    for (dst, v) in bytes.chunks_exact_mut(4).zip(&out) {
        dst.copy_from_slice(&v.to_ne_bytes());
    }
    Ok(())
}
