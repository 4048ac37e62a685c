//! [`ComputePlatform`] over the raw OpenCL bindings
//!
//! Every handle is owned by a wrapper that releases it on drop, so a handle
//! whose creation failed is never released or used.

use super::bindings::*;
use super::types::*;
use super::utils::{device_info_scalar, device_info_string, to_c_string, trim_c_string};
use crate::device::{DeviceClass, SelectedDevice};
use crate::error::{BenchError, Result};
use crate::platform::{ComputePlatform, DeviceContext, DeviceInfo, MemAccess};
use crate::{cl_check, cl_create};
use std::ffi::{c_char, c_void};
use std::ptr;
use tracing::{debug, warn};

/// Returned by the ICD loader when no platform is installed.
const CL_PLATFORM_NOT_FOUND_KHR: cl_int = -1001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenClDevice(pub cl_device_id);

/// Entry point for the system OpenCL installation.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClPlatform;

impl OpenClPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl ComputePlatform for OpenClPlatform {
    type Platform = cl_platform_id;
    type Device = OpenClDevice;
    type Context = OpenClContext;

    fn name(&self) -> &str {
        "OpenCL"
    }

    fn platforms(&self) -> Result<Vec<cl_platform_id>> {
        let mut count: cl_uint = 0;
        match cl_check!(clGetPlatformIDs(0, ptr::null_mut(), &mut count)) {
            Err(BenchError::Platform {
                code: CL_PLATFORM_NOT_FOUND_KHR,
                ..
            }) => return Ok(Vec::new()),
            other => other?,
        }
        let mut platforms = vec![ptr::null_mut(); count as usize];
        cl_check!(clGetPlatformIDs(count, platforms.as_mut_ptr(), ptr::null_mut()))?;
        Ok(platforms)
    }

    fn devices(&self, platform: cl_platform_id) -> Result<Vec<DeviceInfo<OpenClDevice>>> {
        let mut count: cl_uint = 0;
        match cl_check!(clGetDeviceIDs(
            platform,
            CL_DEVICE_TYPE_ALL,
            0,
            ptr::null_mut(),
            &mut count
        )) {
            Err(BenchError::Platform {
                code: CL_DEVICE_NOT_FOUND,
                ..
            }) => return Ok(Vec::new()),
            other => other?,
        }

        let mut ids = vec![ptr::null_mut(); count as usize];
        cl_check!(clGetDeviceIDs(
            platform,
            CL_DEVICE_TYPE_ALL,
            count,
            ids.as_mut_ptr(),
            ptr::null_mut()
        ))?;

        ids.into_iter()
            .map(|id| {
                let type_bits: cl_device_type = device_info_scalar(id, CL_DEVICE_TYPE)?;
                let vendor_id: cl_uint = device_info_scalar(id, CL_DEVICE_VENDOR_ID)?;
                let name = device_info_string(id, CL_DEVICE_NAME)
                    .unwrap_or_else(|_| String::from("unnamed device"));
                Ok(DeviceInfo {
                    handle: OpenClDevice(id),
                    class: DeviceClass::from_type_bits(type_bits),
                    vendor_id,
                    name,
                })
            })
            .collect()
    }

    fn create_context(
        &self,
        device: &SelectedDevice<cl_platform_id, OpenClDevice>,
    ) -> Result<OpenClContext> {
        let id = device.device.0;
        let context = cl_create!(clCreateContext(
            ptr::null(),
            1,
            &id,
            None,
            ptr::null_mut()
        ))
        .map_err(BenchError::Context)?;

        let mut ctx = OpenClContext {
            context,
            queue: ptr::null_mut(),
            device: id,
        };
        ctx.queue = cl_create!(clCreateCommandQueue(context, id, 0)).map_err(BenchError::Queue)?;
        Ok(ctx)
    }
}

/// Context plus its single in-order command queue.
pub struct OpenClContext {
    context: cl_context,
    queue: cl_command_queue,
    device: cl_device_id,
}

impl Drop for OpenClContext {
    fn drop(&mut self) {
        unsafe {
            if !self.queue.is_null() {
                // Transfers queued on a failed path may still target host memory.
                clFinish(self.queue);
                clReleaseCommandQueue(self.queue);
            }
            clReleaseContext(self.context);
        }
    }
}

pub struct OpenClBuffer {
    mem: cl_mem,
    label: &'static str,
}

impl Drop for OpenClBuffer {
    fn drop(&mut self) {
        unsafe {
            clReleaseMemObject(self.mem);
        }
    }
}

pub struct OpenClKernel {
    program: cl_program,
    kernel: cl_kernel,
}

impl Drop for OpenClKernel {
    fn drop(&mut self) {
        unsafe {
            if !self.kernel.is_null() {
                clReleaseKernel(self.kernel);
            }
            clReleaseProgram(self.program);
        }
    }
}

impl OpenClContext {
    fn build_log(&self, program: cl_program) -> String {
        let mut size = 0usize;
        let status = unsafe {
            clGetProgramBuildInfo(
                program,
                self.device,
                CL_PROGRAM_BUILD_LOG,
                0,
                ptr::null_mut(),
                &mut size,
            )
        };
        if status != CL_SUCCESS {
            warn!("clGetProgramBuildInfo failed with status {status}");
            return String::new();
        }
        let mut log = vec![0u8; size];
        unsafe {
            clGetProgramBuildInfo(
                program,
                self.device,
                CL_PROGRAM_BUILD_LOG,
                size,
                log.as_mut_ptr() as *mut c_void,
                ptr::null_mut(),
            );
        }
        trim_c_string(&log)
    }
}

impl DeviceContext for OpenClContext {
    type Buffer = OpenClBuffer;
    type Kernel = OpenClKernel;

    fn create_buffer(
        &self,
        label: &'static str,
        access: MemAccess,
        size: usize,
    ) -> Result<OpenClBuffer> {
        let flags = match access {
            MemAccess::ReadOnly => CL_MEM_READ_ONLY,
            MemAccess::WriteOnly => CL_MEM_WRITE_ONLY,
            MemAccess::ReadWrite => CL_MEM_READ_WRITE,
        };
        let mem = cl_create!(clCreateBuffer(
            self.context,
            flags,
            size,
            ptr::null_mut()
        ))
        .map_err(|code| BenchError::Allocation {
            buffer: label,
            size,
            code,
        })?;
        debug!("allocated '{label}' ({size} bytes)");
        Ok(OpenClBuffer { mem, label })
    }

    unsafe fn enqueue_write(&self, buffer: &OpenClBuffer, data: &[u8]) -> Result<()> {
        cl_check!(clEnqueueWriteBuffer(
            self.queue,
            buffer.mem,
            CL_FALSE,
            0,
            data.len(),
            data.as_ptr() as *const c_void,
            0,
            ptr::null(),
            ptr::null_mut()
        ))
        .map_err(|e| BenchError::Upload {
            buffer: buffer.label,
            code: status_of(&e),
        })
    }

    unsafe fn enqueue_read(&self, buffer: &OpenClBuffer, data: &mut [u8]) -> Result<()> {
        cl_check!(clEnqueueReadBuffer(
            self.queue,
            buffer.mem,
            CL_FALSE,
            0,
            data.len(),
            data.as_mut_ptr() as *mut c_void,
            0,
            ptr::null(),
            ptr::null_mut()
        ))
        .map_err(|e| BenchError::Download {
            buffer: buffer.label,
            code: status_of(&e),
        })
    }

    fn build_kernel(&self, source: &str, entry: &str) -> Result<OpenClKernel> {
        let text = source.as_ptr() as *const c_char;
        let length = source.len();
        let program = cl_create!(clCreateProgramWithSource(
            self.context,
            1,
            &text,
            &length
        ))
        .map_err(|code| BenchError::Platform {
            call: "clCreateProgramWithSource",
            code,
        })?;
        let mut built = OpenClKernel {
            program,
            kernel: ptr::null_mut(),
        };

        let options = to_c_string("")?;
        let status = unsafe {
            clBuildProgram(
                program,
                1,
                &self.device,
                options.as_ptr(),
                None,
                ptr::null_mut(),
            )
        };
        if status != CL_SUCCESS {
            return Err(BenchError::Build {
                log: self.build_log(program),
            });
        }

        let name = to_c_string(entry)?;
        built.kernel = cl_create!(clCreateKernel(program, name.as_ptr())).map_err(|code| {
            BenchError::KernelCreate {
                entry: entry.to_string(),
                code,
            }
        })?;
        Ok(built)
    }

    fn set_kernel_arg(&self, kernel: &OpenClKernel, index: u32, buffer: &OpenClBuffer) -> Result<()> {
        cl_check!(clSetKernelArg(
            kernel.kernel,
            index,
            std::mem::size_of::<cl_mem>(),
            &buffer.mem as *const cl_mem as *const c_void
        ))
        .map_err(|e| BenchError::ArgBind {
            index,
            code: status_of(&e),
        })
    }

    fn enqueue_nd_range(
        &self,
        kernel: &OpenClKernel,
        global: [usize; 3],
        local: [usize; 3],
    ) -> Result<()> {
        cl_check!(clEnqueueNDRangeKernel(
            self.queue,
            kernel.kernel,
            2,
            ptr::null(),
            global.as_ptr(),
            local.as_ptr(),
            0,
            ptr::null(),
            ptr::null_mut()
        ))
        .map_err(|e| BenchError::Enqueue(status_of(&e)))
    }

    fn drain(&self) -> Result<()> {
        let mut marker: cl_event = ptr::null_mut();
        cl_check!(clEnqueueMarkerWithWaitList(
            self.queue,
            0,
            ptr::null(),
            &mut marker
        ))
        .map_err(|e| BenchError::Barrier {
            step: "marker",
            code: status_of(&e),
        })?;

        let waited = cl_check!(clWaitForEvents(1, &marker));
        unsafe {
            clReleaseEvent(marker);
            if waited.is_err() {
                clFinish(self.queue);
            }
        }
        waited.map_err(|e| BenchError::Barrier {
            step: "wait",
            code: status_of(&e),
        })
    }
}

fn status_of(err: &BenchError) -> cl_int {
    match err {
        BenchError::Platform { code, .. } => *code,
        _ => crate::platform::status::INVALID_VALUE,
    }
}
