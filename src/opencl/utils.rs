//! Helpers for OpenCL info queries

use super::bindings::clGetDeviceInfo;
use super::types::*;
use crate::error::{BenchError, Result};
use std::ffi::{c_void, CString};

/// Null-terminated copy of `s` for C. Interior NULs are rejected.
pub fn to_c_string(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| BenchError::config(format!("'{s}' contains a NUL byte")))
}

/// Fixed-size scalar device info.
pub fn device_info_scalar<T: bytemuck::Pod>(device: cl_device_id, param: cl_device_info) -> Result<T> {
    let mut value: T = bytemuck::Zeroable::zeroed();
    crate::cl_check!(clGetDeviceInfo(
        device,
        param,
        std::mem::size_of::<T>(),
        &mut value as *mut T as *mut c_void,
        std::ptr::null_mut()
    ))?;
    Ok(value)
}

/// String-valued device info, trailing NULs stripped.
pub fn device_info_string(device: cl_device_id, param: cl_device_info) -> Result<String> {
    let mut size = 0usize;
    crate::cl_check!(clGetDeviceInfo(device, param, 0, std::ptr::null_mut(), &mut size))?;
    let mut bytes = vec![0u8; size];
    crate::cl_check!(clGetDeviceInfo(
        device,
        param,
        size,
        bytes.as_mut_ptr() as *mut c_void,
        std::ptr::null_mut()
    ))?;
    Ok(trim_c_string(&bytes))
}

pub(crate) fn trim_c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}
