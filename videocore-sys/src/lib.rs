// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Low-level FFI bindings for the Broadcom VideoCore libraries.
//!
//! Covers the dispmanx display compositor (`libbcm_host.so`) and the MMAL
//! media framework (`libmmal.so`).  The libraries are opened with
//! `libloading` at runtime rather than linked at build time, so this crate
//! builds on any host; loading fails at runtime on machines without the
//! VideoCore stack.
//!
//! Only the subset of the vendor ABI used by the `videocore-grafx` backends
//! is bound.  Struct layouts follow the VideoCore userland headers.

#![allow(non_camel_case_types)]

use core::ffi::CStr;
use libc::{c_char, c_int, c_void};
use libloading::Library;

/// Soname of the VideoCore host library carrying dispmanx.
pub const BCM_HOST_LIBRARY: &str = "libbcm_host.so";
/// Soname of the MMAL umbrella library.
pub const MMAL_LIBRARY: &str = "libmmal.so";

pub const MMAL_COMPONENT_DEFAULT_CAMERA: &CStr = c"vc.ril.camera";
pub const MMAL_COMPONENT_DEFAULT_CAMERA_INFO: &CStr = c"vc.camera_info";
pub const MMAL_COMPONENT_DEFAULT_ISP: &CStr = c"vc.ril.isp";
pub const MMAL_COMPONENT_NULL_SINK: &CStr = c"vc.null_sink";

pub const DISPMANX_NO_HANDLE: u32 = 0;
pub const DISPMANX_PROTECTION_NONE: u32 = 0;
pub const DISPMANX_NO_ROTATE: u32 = 0;
pub const DISPMANX_FLAGS_ALPHA_FROM_SOURCE: u32 = 0;
pub const DISPMANX_FLAGS_ALPHA_FIXED_ALL_PIXELS: u32 = 1;

/// `VC_IMAGE_RGBA32` from `vc_image_types.h`.
pub const VC_IMAGE_RGBA32: c_int = 15;

pub const MMAL_SUCCESS: c_int = 0;
pub const MMAL_EINVAL: c_int = 3;
pub const MMAL_EAGAIN: c_int = 14;

pub const MMAL_ENCODING_RGBA: u32 = mmal_fourcc(b"RGBA");

pub const MMAL_PARAMETER_CAMERA_NUM: u32 = 0x10010;
pub const MMAL_PARAMETER_CAPTURE: u32 = 0x10011;
pub const MMAL_PARAMETER_CAMERA_INFO: u32 = 0x1001c;

pub const MMAL_BUFFER_HEADER_FLAG_EOS: u32 = 1 << 0;
pub const MMAL_BUFFER_HEADER_FLAG_FRAME_START: u32 = 1 << 1;
pub const MMAL_BUFFER_HEADER_FLAG_FRAME_END: u32 = 1 << 2;

pub const MMAL_CONNECTION_FLAG_TUNNELLING: u32 = 0x1;
pub const MMAL_CONNECTION_FLAG_ALLOCATION_ON_INPUT: u32 = 0x2;

pub const MMAL_WRAPPER_FLAG_WAIT: u32 = 1;

pub const MMAL_PARAMETER_CAMERA_INFO_MAX_CAMERAS: usize = 4;
pub const MMAL_PARAMETER_CAMERA_INFO_MAX_FLASHES: usize = 2;
pub const MMAL_PARAMETER_CAMERA_INFO_MAX_STR_LEN: usize = 16;

pub const fn mmal_fourcc(code: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*code)
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct VC_RECT_T {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct VC_DISPMANX_ALPHA_T {
    pub flags: u32,
    pub opacity: u32,
    pub mask: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DISPMANX_MODEINFO_T {
    pub width: i32,
    pub height: i32,
    pub transform: u32,
    pub input_format: u32,
    pub display_num: u32,
}

pub type MMAL_STATUS_T = c_int;
pub type MMAL_BOOL_T = i32;
pub type MMAL_FOURCC_T = u32;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct MMAL_RECT_T {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct MMAL_RATIONAL_T {
    pub num: i32,
    pub den: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct MMAL_VIDEO_FORMAT_T {
    pub width: u32,
    pub height: u32,
    pub crop: MMAL_RECT_T,
    pub frame_rate: MMAL_RATIONAL_T,
    pub par: MMAL_RATIONAL_T,
    pub color_space: MMAL_FOURCC_T,
}

/// Elementary stream specific format.  The video member is the largest, so
/// binding it alone preserves the union's size and field offsets.
#[repr(C)]
#[derive(Clone, Copy)]
pub union MMAL_ES_SPECIFIC_FORMAT_T {
    pub video: MMAL_VIDEO_FORMAT_T,
}

#[repr(C)]
pub struct MMAL_ES_FORMAT_T {
    pub type_: c_int,
    pub encoding: MMAL_FOURCC_T,
    pub encoding_variant: MMAL_FOURCC_T,
    pub es: *mut MMAL_ES_SPECIFIC_FORMAT_T,
    pub bitrate: u32,
    pub flags: u32,
    pub extradata_size: u32,
    pub extradata: *mut u8,
}

#[repr(C)]
pub struct MMAL_PORT_T {
    pub priv_: *mut c_void,
    pub name: *const c_char,
    pub type_: c_int,
    pub index: u16,
    pub index_all: u16,
    pub is_enabled: MMAL_BOOL_T,
    pub format: *mut MMAL_ES_FORMAT_T,
    pub buffer_num_min: u32,
    pub buffer_size_min: u32,
    pub buffer_alignment_min: u32,
    pub buffer_num_recommended: u32,
    pub buffer_size_recommended: u32,
    pub buffer_num: u32,
    pub buffer_size: u32,
    pub component: *mut MMAL_COMPONENT_T,
    pub userdata: *mut c_void,
    pub capabilities: u32,
}

#[repr(C)]
pub struct MMAL_COMPONENT_T {
    pub priv_: *mut c_void,
    pub userdata: *mut c_void,
    pub name: *const c_char,
    pub is_enabled: u32,
    pub control: *mut MMAL_PORT_T,
    pub input_num: u32,
    pub input: *mut *mut MMAL_PORT_T,
    pub output_num: u32,
    pub output: *mut *mut MMAL_PORT_T,
    pub clock_num: u32,
    pub clock: *mut *mut MMAL_PORT_T,
    pub port_num: u32,
    pub port: *mut *mut MMAL_PORT_T,
    pub id: u32,
}

#[repr(C)]
pub struct MMAL_BUFFER_HEADER_T {
    pub next: *mut MMAL_BUFFER_HEADER_T,
    pub priv_: *mut c_void,
    pub cmd: u32,
    pub data: *mut u8,
    pub alloc_size: u32,
    pub length: u32,
    pub offset: u32,
    pub flags: u32,
    pub pts: i64,
    pub dts: i64,
    pub type_: *mut c_void,
    pub user_data: *mut c_void,
}

#[repr(C)]
pub struct MMAL_WRAPPER_T {
    pub user_data: *mut c_void,
    pub callback: Option<unsafe extern "C" fn(*mut MMAL_WRAPPER_T)>,
    pub component: *mut MMAL_COMPONENT_T,
    pub status: MMAL_STATUS_T,
    pub control: *mut MMAL_PORT_T,
    pub input_num: u32,
    pub input: *mut *mut MMAL_PORT_T,
    pub output_num: u32,
    pub output: *mut *mut MMAL_PORT_T,
}

/// Opaque connection object managed by `mmal_connection_*`.
#[repr(C)]
pub struct MMAL_CONNECTION_T {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct MMAL_PARAMETER_HEADER_T {
    pub id: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct MMAL_PARAMETER_INT32_T {
    pub hdr: MMAL_PARAMETER_HEADER_T,
    pub value: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct MMAL_PARAMETER_CAMERA_INFO_CAMERA_T {
    pub port_id: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub lens_present: MMAL_BOOL_T,
    pub camera_name: [c_char; MMAL_PARAMETER_CAMERA_INFO_MAX_STR_LEN],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct MMAL_PARAMETER_CAMERA_INFO_FLASH_T {
    pub flash_type: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct MMAL_PARAMETER_CAMERA_INFO_T {
    pub hdr: MMAL_PARAMETER_HEADER_T,
    pub num_cameras: u32,
    pub num_flashes: u32,
    pub cameras: [MMAL_PARAMETER_CAMERA_INFO_CAMERA_T; MMAL_PARAMETER_CAMERA_INFO_MAX_CAMERAS],
    pub flashes: [MMAL_PARAMETER_CAMERA_INFO_FLASH_T; MMAL_PARAMETER_CAMERA_INFO_MAX_FLASHES],
}

/// Symbol table for the dispmanx entry points in `libbcm_host.so`.
pub struct dispmanx {
    _lib: Library,
    pub bcm_host_init: unsafe extern "C" fn(),
    pub bcm_host_deinit: unsafe extern "C" fn(),
    pub vc_dispmanx_display_open: unsafe extern "C" fn(u32) -> u32,
    pub vc_dispmanx_display_close: unsafe extern "C" fn(u32) -> c_int,
    pub vc_dispmanx_display_get_info: unsafe extern "C" fn(u32, *mut DISPMANX_MODEINFO_T) -> c_int,
    pub vc_dispmanx_update_start: unsafe extern "C" fn(i32) -> u32,
    pub vc_dispmanx_update_submit_sync: unsafe extern "C" fn(u32) -> c_int,
    pub vc_dispmanx_resource_create: unsafe extern "C" fn(c_int, u32, u32, *mut u32) -> u32,
    pub vc_dispmanx_resource_write_data:
        unsafe extern "C" fn(u32, c_int, c_int, *const c_void, *const VC_RECT_T) -> c_int,
    pub vc_dispmanx_resource_delete: unsafe extern "C" fn(u32) -> c_int,
    pub vc_dispmanx_element_add: unsafe extern "C" fn(
        u32,
        u32,
        i32,
        *const VC_RECT_T,
        u32,
        *const VC_RECT_T,
        u32,
        *mut VC_DISPMANX_ALPHA_T,
        *const c_void,
        u32,
    ) -> u32,
    pub vc_dispmanx_element_remove: unsafe extern "C" fn(u32, u32) -> c_int,
}

impl dispmanx {
    /// Open the library at `path` and resolve every dispmanx symbol.
    ///
    /// # Safety
    ///
    /// The library at `path` must export the VideoCore dispmanx ABI with
    /// the signatures declared here.
    pub unsafe fn new(path: &str) -> Result<Self, libloading::Error> {
        let lib = Library::new(path)?;
        let bcm_host_init: unsafe extern "C" fn() = *lib.get(b"bcm_host_init")?;
        let bcm_host_deinit: unsafe extern "C" fn() = *lib.get(b"bcm_host_deinit")?;
        let vc_dispmanx_display_open: unsafe extern "C" fn(u32) -> u32 =
            *lib.get(b"vc_dispmanx_display_open")?;
        let vc_dispmanx_display_close: unsafe extern "C" fn(u32) -> c_int =
            *lib.get(b"vc_dispmanx_display_close")?;
        let vc_dispmanx_display_get_info: unsafe extern "C" fn(
            u32,
            *mut DISPMANX_MODEINFO_T,
        ) -> c_int = *lib.get(b"vc_dispmanx_display_get_info")?;
        let vc_dispmanx_update_start: unsafe extern "C" fn(i32) -> u32 =
            *lib.get(b"vc_dispmanx_update_start")?;
        let vc_dispmanx_update_submit_sync: unsafe extern "C" fn(u32) -> c_int =
            *lib.get(b"vc_dispmanx_update_submit_sync")?;
        let vc_dispmanx_resource_create: unsafe extern "C" fn(c_int, u32, u32, *mut u32) -> u32 =
            *lib.get(b"vc_dispmanx_resource_create")?;
        let vc_dispmanx_resource_write_data: unsafe extern "C" fn(
            u32,
            c_int,
            c_int,
            *const c_void,
            *const VC_RECT_T,
        ) -> c_int = *lib.get(b"vc_dispmanx_resource_write_data")?;
        let vc_dispmanx_resource_delete: unsafe extern "C" fn(u32) -> c_int =
            *lib.get(b"vc_dispmanx_resource_delete")?;
        let vc_dispmanx_element_add: unsafe extern "C" fn(
            u32,
            u32,
            i32,
            *const VC_RECT_T,
            u32,
            *const VC_RECT_T,
            u32,
            *mut VC_DISPMANX_ALPHA_T,
            *const c_void,
            u32,
        ) -> u32 = *lib.get(b"vc_dispmanx_element_add")?;
        let vc_dispmanx_element_remove: unsafe extern "C" fn(u32, u32) -> c_int =
            *lib.get(b"vc_dispmanx_element_remove")?;
        Ok(Self {
            _lib: lib,
            bcm_host_init,
            bcm_host_deinit,
            vc_dispmanx_display_open,
            vc_dispmanx_display_close,
            vc_dispmanx_display_get_info,
            vc_dispmanx_update_start,
            vc_dispmanx_update_submit_sync,
            vc_dispmanx_resource_create,
            vc_dispmanx_resource_write_data,
            vc_dispmanx_resource_delete,
            vc_dispmanx_element_add,
            vc_dispmanx_element_remove,
        })
    }
}

/// Symbol table for the MMAL entry points in `libmmal.so`.
pub struct mmal {
    _lib: Library,
    pub mmal_component_create:
        unsafe extern "C" fn(*const c_char, *mut *mut MMAL_COMPONENT_T) -> MMAL_STATUS_T,
    pub mmal_component_destroy: unsafe extern "C" fn(*mut MMAL_COMPONENT_T) -> MMAL_STATUS_T,
    pub mmal_wrapper_create:
        unsafe extern "C" fn(*mut *mut MMAL_WRAPPER_T, *const c_char) -> MMAL_STATUS_T,
    pub mmal_wrapper_destroy: unsafe extern "C" fn(*mut MMAL_WRAPPER_T) -> MMAL_STATUS_T,
    pub mmal_wrapper_buffer_get_empty:
        unsafe extern "C" fn(*mut MMAL_PORT_T, *mut *mut MMAL_BUFFER_HEADER_T, u32) -> MMAL_STATUS_T,
    pub mmal_wrapper_buffer_get_full:
        unsafe extern "C" fn(*mut MMAL_PORT_T, *mut *mut MMAL_BUFFER_HEADER_T, u32) -> MMAL_STATUS_T,
    pub mmal_port_send_buffer:
        unsafe extern "C" fn(*mut MMAL_PORT_T, *mut MMAL_BUFFER_HEADER_T) -> MMAL_STATUS_T,
    pub mmal_buffer_header_release: unsafe extern "C" fn(*mut MMAL_BUFFER_HEADER_T),
    pub mmal_port_format_commit: unsafe extern "C" fn(*mut MMAL_PORT_T) -> MMAL_STATUS_T,
    pub mmal_port_parameter_set:
        unsafe extern "C" fn(*mut MMAL_PORT_T, *const MMAL_PARAMETER_HEADER_T) -> MMAL_STATUS_T,
    pub mmal_port_parameter_get:
        unsafe extern "C" fn(*mut MMAL_PORT_T, *mut MMAL_PARAMETER_HEADER_T) -> MMAL_STATUS_T,
    pub mmal_port_parameter_set_boolean:
        unsafe extern "C" fn(*mut MMAL_PORT_T, u32, MMAL_BOOL_T) -> MMAL_STATUS_T,
    pub mmal_connection_create: unsafe extern "C" fn(
        *mut *mut MMAL_CONNECTION_T,
        *mut MMAL_PORT_T,
        *mut MMAL_PORT_T,
        u32,
    ) -> MMAL_STATUS_T,
    pub mmal_connection_destroy: unsafe extern "C" fn(*mut MMAL_CONNECTION_T) -> MMAL_STATUS_T,
    pub mmal_connection_enable: unsafe extern "C" fn(*mut MMAL_CONNECTION_T) -> MMAL_STATUS_T,
}

impl mmal {
    /// Open the library at `path` and resolve every MMAL symbol.
    ///
    /// # Safety
    ///
    /// The library at `path` must export the MMAL ABI with the signatures
    /// declared here.
    pub unsafe fn new(path: &str) -> Result<Self, libloading::Error> {
        let lib = Library::new(path)?;
        let mmal_component_create: unsafe extern "C" fn(
            *const c_char,
            *mut *mut MMAL_COMPONENT_T,
        ) -> MMAL_STATUS_T = *lib.get(b"mmal_component_create")?;
        let mmal_component_destroy: unsafe extern "C" fn(*mut MMAL_COMPONENT_T) -> MMAL_STATUS_T =
            *lib.get(b"mmal_component_destroy")?;
        let mmal_wrapper_create: unsafe extern "C" fn(
            *mut *mut MMAL_WRAPPER_T,
            *const c_char,
        ) -> MMAL_STATUS_T = *lib.get(b"mmal_wrapper_create")?;
        let mmal_wrapper_destroy: unsafe extern "C" fn(*mut MMAL_WRAPPER_T) -> MMAL_STATUS_T =
            *lib.get(b"mmal_wrapper_destroy")?;
        let mmal_wrapper_buffer_get_empty: unsafe extern "C" fn(
            *mut MMAL_PORT_T,
            *mut *mut MMAL_BUFFER_HEADER_T,
            u32,
        ) -> MMAL_STATUS_T = *lib.get(b"mmal_wrapper_buffer_get_empty")?;
        let mmal_wrapper_buffer_get_full: unsafe extern "C" fn(
            *mut MMAL_PORT_T,
            *mut *mut MMAL_BUFFER_HEADER_T,
            u32,
        ) -> MMAL_STATUS_T = *lib.get(b"mmal_wrapper_buffer_get_full")?;
        let mmal_port_send_buffer: unsafe extern "C" fn(
            *mut MMAL_PORT_T,
            *mut MMAL_BUFFER_HEADER_T,
        ) -> MMAL_STATUS_T = *lib.get(b"mmal_port_send_buffer")?;
        let mmal_buffer_header_release: unsafe extern "C" fn(*mut MMAL_BUFFER_HEADER_T) =
            *lib.get(b"mmal_buffer_header_release")?;
        let mmal_port_format_commit: unsafe extern "C" fn(*mut MMAL_PORT_T) -> MMAL_STATUS_T =
            *lib.get(b"mmal_port_format_commit")?;
        let mmal_port_parameter_set: unsafe extern "C" fn(
            *mut MMAL_PORT_T,
            *const MMAL_PARAMETER_HEADER_T,
        ) -> MMAL_STATUS_T = *lib.get(b"mmal_port_parameter_set")?;
        let mmal_port_parameter_get: unsafe extern "C" fn(
            *mut MMAL_PORT_T,
            *mut MMAL_PARAMETER_HEADER_T,
        ) -> MMAL_STATUS_T = *lib.get(b"mmal_port_parameter_get")?;
        let mmal_port_parameter_set_boolean: unsafe extern "C" fn(
            *mut MMAL_PORT_T,
            u32,
            MMAL_BOOL_T,
        ) -> MMAL_STATUS_T = *lib.get(b"mmal_port_parameter_set_boolean")?;
        let mmal_connection_create: unsafe extern "C" fn(
            *mut *mut MMAL_CONNECTION_T,
            *mut MMAL_PORT_T,
            *mut MMAL_PORT_T,
            u32,
        ) -> MMAL_STATUS_T = *lib.get(b"mmal_connection_create")?;
        let mmal_connection_destroy: unsafe extern "C" fn(*mut MMAL_CONNECTION_T) -> MMAL_STATUS_T =
            *lib.get(b"mmal_connection_destroy")?;
        let mmal_connection_enable: unsafe extern "C" fn(*mut MMAL_CONNECTION_T) -> MMAL_STATUS_T =
            *lib.get(b"mmal_connection_enable")?;
        Ok(Self {
            _lib: lib,
            mmal_component_create,
            mmal_component_destroy,
            mmal_wrapper_create,
            mmal_wrapper_destroy,
            mmal_wrapper_buffer_get_empty,
            mmal_wrapper_buffer_get_full,
            mmal_port_send_buffer,
            mmal_buffer_header_release,
            mmal_port_format_commit,
            mmal_port_parameter_set,
            mmal_port_parameter_get,
            mmal_port_parameter_set_boolean,
            mmal_connection_create,
            mmal_connection_destroy,
            mmal_connection_enable,
        })
    }
}
