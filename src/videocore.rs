// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Backends over the real VideoCore stack.
//!
//! `VideoCoreDisplay` drives dispmanx through `libbcm_host.so`,
//! `MmalBackend` drives the MMAL component wrapper through `libmmal.so`.
//! All unsafe FFI of the crate is confined to this module and to
//! `videocore-sys`.  Loading the libraries only succeeds on a Raspberry Pi
//! class machine with the VideoCore userland installed.

use crate::backend::{
    AlphaMode, BufferFlags, BufferHandle, CameraDescriptor, ComponentId, ComponentKind,
    ConnectionId, DisplayBackend, ElementHandle, FullBuffer, MediaBackend, PortConfig,
    PortDirection, PortRef, ResourceHandle, ScreenInfo,
};
use crate::error::{Error, Result};
use crate::pixel::{PixelFormat, Rect};
use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::null_mut;
use tracing::{debug, warn};
use videocore_sys as sys;

fn check(op: &'static str, status: i32) -> Result<()> {
    if status == sys::MMAL_SUCCESS {
        Ok(())
    } else {
        Err(Error::driver(op, status))
    }
}

fn vc_rect(rect: Rect) -> sys::VC_RECT_T {
    sys::VC_RECT_T {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
    }
}

/// dispmanx display backend.
pub struct VideoCoreDisplay {
    lib: sys::dispmanx,
    display: u32,
    update: u32,
    open: bool,
}

impl VideoCoreDisplay {
    /// Load the VideoCore host library.  The display itself is opened by
    /// [`DisplayBackend::open`].
    pub fn new() -> Result<Self> {
        let lib = unsafe { sys::dispmanx::new(sys::BCM_HOST_LIBRARY) }.map_err(|err| {
            warn!("failed to load {}: {err}", sys::BCM_HOST_LIBRARY);
            Error::driver("bcm_host load", -1)
        })?;
        unsafe { (lib.bcm_host_init)() };
        Ok(VideoCoreDisplay {
            lib,
            display: sys::DISPMANX_NO_HANDLE,
            update: sys::DISPMANX_NO_HANDLE,
            open: false,
        })
    }
}

impl DisplayBackend for VideoCoreDisplay {
    fn open(&mut self, number: u32) -> Result<ScreenInfo> {
        let display = unsafe { (self.lib.vc_dispmanx_display_open)(number) };
        if display == sys::DISPMANX_NO_HANDLE {
            return Err(Error::driver("vc_dispmanx_display_open", 0));
        }
        let mut info: sys::DISPMANX_MODEINFO_T = Default::default();
        check("vc_dispmanx_display_get_info", unsafe {
            (self.lib.vc_dispmanx_display_get_info)(display, &mut info)
        })?;
        self.display = display;
        self.open = true;
        debug!(info.width, info.height, "display open");
        Ok(ScreenInfo {
            width: info.width as u32,
            height: info.height as u32,
        })
    }

    fn close(&mut self) -> Result<()> {
        check("vc_dispmanx_display_close", unsafe {
            (self.lib.vc_dispmanx_display_close)(self.display)
        })?;
        self.display = sys::DISPMANX_NO_HANDLE;
        self.open = false;
        Ok(())
    }

    fn begin_update(&mut self) -> Result<()> {
        let update = unsafe { (self.lib.vc_dispmanx_update_start)(0) };
        if update == sys::DISPMANX_NO_HANDLE {
            return Err(Error::driver("vc_dispmanx_update_start", 0));
        }
        self.update = update;
        Ok(())
    }

    fn submit_update(&mut self) -> Result<()> {
        check("vc_dispmanx_update_submit_sync", unsafe {
            (self.lib.vc_dispmanx_update_submit_sync)(self.update)
        })?;
        self.update = sys::DISPMANX_NO_HANDLE;
        Ok(())
    }

    fn create_resource(
        &mut self,
        _format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<ResourceHandle> {
        // Written by the driver but always zero; ignored.
        let mut native_image = 0u32;
        let resource = unsafe {
            (self.lib.vc_dispmanx_resource_create)(
                sys::VC_IMAGE_RGBA32,
                width,
                height,
                &mut native_image,
            )
        };
        if resource == 0 {
            return Err(Error::driver("vc_dispmanx_resource_create", 0));
        }
        Ok(ResourceHandle(resource))
    }

    fn write_resource(
        &mut self,
        resource: ResourceHandle,
        _format: PixelFormat,
        stride: usize,
        pixels: &[u8],
        region: Rect,
    ) -> Result<()> {
        let rect = vc_rect(region);
        check("vc_dispmanx_resource_write_data", unsafe {
            (self.lib.vc_dispmanx_resource_write_data)(
                resource.0,
                sys::VC_IMAGE_RGBA32,
                stride as i32,
                pixels.as_ptr() as *const c_void,
                &rect,
            )
        })
    }

    fn delete_resource(&mut self, resource: ResourceHandle) -> Result<()> {
        check("vc_dispmanx_resource_delete", unsafe {
            (self.lib.vc_dispmanx_resource_delete)(resource.0)
        })
    }

    fn add_element(
        &mut self,
        layer: i32,
        dst: Rect,
        resource: ResourceHandle,
        src: Rect,
        alpha: AlphaMode,
    ) -> Result<ElementHandle> {
        let dst_rect = vc_rect(dst);
        // Source rectangles are given to the compositor in 16.16 fixed point.
        let src_rect = sys::VC_RECT_T {
            x: src.x << 16,
            y: src.y << 16,
            width: src.width << 16,
            height: src.height << 16,
        };
        let mut alpha = match alpha {
            AlphaMode::FromSource { opacity } => sys::VC_DISPMANX_ALPHA_T {
                flags: sys::DISPMANX_FLAGS_ALPHA_FROM_SOURCE,
                opacity: opacity as u32,
                mask: 0,
            },
            AlphaMode::Fixed { opacity } => sys::VC_DISPMANX_ALPHA_T {
                flags: sys::DISPMANX_FLAGS_ALPHA_FIXED_ALL_PIXELS,
                opacity: opacity as u32,
                mask: 0,
            },
        };
        let element = unsafe {
            (self.lib.vc_dispmanx_element_add)(
                self.update,
                self.display,
                layer,
                &dst_rect,
                resource.0,
                &src_rect,
                sys::DISPMANX_PROTECTION_NONE,
                &mut alpha,
                std::ptr::null(),
                sys::DISPMANX_NO_ROTATE,
            )
        };
        if element == 0 {
            return Err(Error::driver("vc_dispmanx_element_add", 0));
        }
        Ok(ElementHandle(element))
    }

    fn remove_element(&mut self, element: ElementHandle) -> Result<()> {
        check("vc_dispmanx_element_remove", unsafe {
            (self.lib.vc_dispmanx_element_remove)(self.update, element.0)
        })
    }
}

impl Drop for VideoCoreDisplay {
    fn drop(&mut self) {
        if self.open {
            _ = unsafe { (self.lib.vc_dispmanx_display_close)(self.display) };
        }
        unsafe { (self.lib.bcm_host_deinit)() };
        debug!("display library closed");
    }
}

struct Component {
    kind: ComponentKind,
    wrapper: *mut sys::MMAL_WRAPPER_T,
}

/// MMAL media backend built on the component wrapper API.
pub struct MmalBackend {
    lib: sys::mmal,
    components: HashMap<u32, Component>,
    connections: HashMap<u32, *mut sys::MMAL_CONNECTION_T>,
    buffers: HashMap<u64, *mut sys::MMAL_BUFFER_HEADER_T>,
    next_component: u32,
    next_connection: u32,
    next_buffer: u64,
}

impl MmalBackend {
    pub fn new() -> Result<Self> {
        let lib = unsafe { sys::mmal::new(sys::MMAL_LIBRARY) }.map_err(|err| {
            warn!("failed to load {}: {err}", sys::MMAL_LIBRARY);
            Error::driver("mmal load", -1)
        })?;
        Ok(MmalBackend {
            lib,
            components: HashMap::new(),
            connections: HashMap::new(),
            buffers: HashMap::new(),
            next_component: 1,
            next_connection: 1,
            next_buffer: 1,
        })
    }

    fn port(&self, port: PortRef) -> Result<*mut sys::MMAL_PORT_T> {
        let component = self
            .components
            .get(&port.component.0)
            .ok_or(Error::driver("port lookup", sys::MMAL_EINVAL))?;
        unsafe {
            let wrapper = &*component.wrapper;
            let (count, list) = match port.direction {
                PortDirection::Input => (wrapper.input_num, wrapper.input),
                PortDirection::Output => (wrapper.output_num, wrapper.output),
            };
            if port.index >= count as usize {
                return Err(Error::driver("port lookup", sys::MMAL_EINVAL));
            }
            Ok(*list.add(port.index))
        }
    }

    fn header(&self, buffer: BufferHandle) -> Result<*mut sys::MMAL_BUFFER_HEADER_T> {
        self.buffers
            .get(&buffer.0)
            .copied()
            .ok_or(Error::driver("buffer lookup", sys::MMAL_EINVAL))
    }
}

fn flags_from_mmal(raw: u32) -> BufferFlags {
    let mut flags = BufferFlags::default();
    if raw & sys::MMAL_BUFFER_HEADER_FLAG_FRAME_END != 0 {
        flags = flags | BufferFlags::FRAME_END;
    }
    if raw & sys::MMAL_BUFFER_HEADER_FLAG_EOS != 0 {
        flags = flags | BufferFlags::END_OF_STREAM;
    }
    flags
}

fn flags_to_mmal(flags: BufferFlags) -> u32 {
    let mut raw = 0;
    if flags.contains(BufferFlags::FRAME_END) {
        raw |= sys::MMAL_BUFFER_HEADER_FLAG_FRAME_END;
    }
    if flags.contains(BufferFlags::END_OF_STREAM) {
        raw |= sys::MMAL_BUFFER_HEADER_FLAG_EOS;
    }
    raw
}

impl MediaBackend for MmalBackend {
    fn enumerate_cameras(&mut self) -> Result<Vec<CameraDescriptor>> {
        let mut component: *mut sys::MMAL_COMPONENT_T = null_mut();
        check("mmal_component_create", unsafe {
            (self.lib.mmal_component_create)(
                sys::MMAL_COMPONENT_DEFAULT_CAMERA_INFO.as_ptr(),
                &mut component,
            )
        })?;
        let mut info: sys::MMAL_PARAMETER_CAMERA_INFO_T = unsafe { std::mem::zeroed() };
        info.hdr.id = sys::MMAL_PARAMETER_CAMERA_INFO;
        info.hdr.size = std::mem::size_of::<sys::MMAL_PARAMETER_CAMERA_INFO_T>() as u32;
        let status =
            unsafe { (self.lib.mmal_port_parameter_get)((*component).control, &mut info.hdr) };
        let result = if status == sys::MMAL_SUCCESS {
            let count = (info.num_cameras as usize).min(sys::MMAL_PARAMETER_CAMERA_INFO_MAX_CAMERAS);
            Ok(info.cameras[..count]
                .iter()
                .map(|camera| CameraDescriptor {
                    max_width: camera.max_width,
                    max_height: camera.max_height,
                })
                .collect())
        } else {
            Err(Error::driver("mmal_port_parameter_get", status))
        };
        _ = unsafe { (self.lib.mmal_component_destroy)(component) };
        result
    }

    fn create_component(&mut self, kind: ComponentKind) -> Result<ComponentId> {
        let name = match kind {
            ComponentKind::Camera => sys::MMAL_COMPONENT_DEFAULT_CAMERA,
            ComponentKind::Resizer => sys::MMAL_COMPONENT_DEFAULT_ISP,
            ComponentKind::NullSink => sys::MMAL_COMPONENT_NULL_SINK,
        };
        let mut wrapper: *mut sys::MMAL_WRAPPER_T = null_mut();
        check("mmal_wrapper_create", unsafe {
            (self.lib.mmal_wrapper_create)(&mut wrapper, name.as_ptr())
        })?;
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        self.components.insert(id.0, Component { kind, wrapper });
        debug!(?kind, "component created");
        Ok(id)
    }

    fn destroy_component(&mut self, component: ComponentId) -> Result<()> {
        let removed = self
            .components
            .remove(&component.0)
            .ok_or(Error::driver("component lookup", sys::MMAL_EINVAL))?;
        debug!(kind = ?removed.kind, "component destroyed");
        check("mmal_wrapper_destroy", unsafe {
            (self.lib.mmal_wrapper_destroy)(removed.wrapper)
        })
    }

    fn set_camera_number(&mut self, component: ComponentId, number: usize) -> Result<()> {
        let component = self
            .components
            .get(&component.0)
            .ok_or(Error::driver("component lookup", sys::MMAL_EINVAL))?;
        let param = sys::MMAL_PARAMETER_INT32_T {
            hdr: sys::MMAL_PARAMETER_HEADER_T {
                id: sys::MMAL_PARAMETER_CAMERA_NUM,
                size: std::mem::size_of::<sys::MMAL_PARAMETER_INT32_T>() as u32,
            },
            value: number as i32,
        };
        check("mmal_port_parameter_set", unsafe {
            (self.lib.mmal_port_parameter_set)((*component.wrapper).control, &param.hdr)
        })
    }

    fn configure_port(&mut self, port: PortRef, config: &PortConfig) -> Result<()> {
        let port = self.port(port)?;
        unsafe {
            let format = (*port).format;
            (*format).encoding = sys::MMAL_ENCODING_RGBA;
            let video = &mut (*(*format).es).video;
            video.width = config.width;
            video.height = config.height;
            video.crop.x = config.crop.x;
            video.crop.y = config.crop.y;
            video.crop.width = config.crop.width;
            video.crop.height = config.crop.height;
            video.frame_rate.num = 0;
            video.frame_rate.den = 1;
        }
        check("mmal_port_format_commit", unsafe {
            (self.lib.mmal_port_format_commit)(port)
        })
    }

    fn set_capture_active(&mut self, port: PortRef, active: bool) -> Result<()> {
        let port = self.port(port)?;
        check("mmal_port_parameter_set_boolean", unsafe {
            (self.lib.mmal_port_parameter_set_boolean)(
                port,
                sys::MMAL_PARAMETER_CAPTURE,
                active as i32,
            )
        })
    }

    fn create_connection(&mut self, from: PortRef, to: PortRef) -> Result<ConnectionId> {
        let from = self.port(from)?;
        let to = self.port(to)?;
        let mut connection: *mut sys::MMAL_CONNECTION_T = null_mut();
        check("mmal_connection_create", unsafe {
            (self.lib.mmal_connection_create)(
                &mut connection,
                from,
                to,
                sys::MMAL_CONNECTION_FLAG_TUNNELLING
                    | sys::MMAL_CONNECTION_FLAG_ALLOCATION_ON_INPUT,
            )
        })?;
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(id.0, connection);
        Ok(id)
    }

    fn enable_connection(&mut self, connection: ConnectionId) -> Result<()> {
        let connection = self
            .connections
            .get(&connection.0)
            .copied()
            .ok_or(Error::driver("connection lookup", sys::MMAL_EINVAL))?;
        check("mmal_connection_enable", unsafe {
            (self.lib.mmal_connection_enable)(connection)
        })
    }

    fn destroy_connection(&mut self, connection: ConnectionId) -> Result<()> {
        let removed = self
            .connections
            .remove(&connection.0)
            .ok_or(Error::driver("connection lookup", sys::MMAL_EINVAL))?;
        check("mmal_connection_destroy", unsafe {
            (self.lib.mmal_connection_destroy)(removed)
        })
    }

    fn next_empty_buffer(&mut self, port: PortRef) -> Result<Option<BufferHandle>> {
        let port = self.port(port)?;
        let mut header: *mut sys::MMAL_BUFFER_HEADER_T = null_mut();
        let status = unsafe { (self.lib.mmal_wrapper_buffer_get_empty)(port, &mut header, 0) };
        if status != sys::MMAL_SUCCESS {
            // Pool drained.
            return Ok(None);
        }
        let id = self.next_buffer;
        self.next_buffer += 1;
        self.buffers.insert(id, header);
        Ok(Some(BufferHandle(id)))
    }

    fn submit_buffer(&mut self, port: PortRef, buffer: BufferHandle) -> Result<()> {
        let port = self.port(port)?;
        let header = self
            .buffers
            .remove(&buffer.0)
            .ok_or(Error::driver("buffer lookup", sys::MMAL_EINVAL))?;
        check("mmal_port_send_buffer", unsafe {
            (self.lib.mmal_port_send_buffer)(port, header)
        })
    }

    fn wait_full_buffer(&mut self, port: PortRef) -> Result<FullBuffer> {
        let port = self.port(port)?;
        let mut header: *mut sys::MMAL_BUFFER_HEADER_T = null_mut();
        check("mmal_wrapper_buffer_get_full", unsafe {
            (self.lib.mmal_wrapper_buffer_get_full)(port, &mut header, sys::MMAL_WRAPPER_FLAG_WAIT)
        })?;
        let id = self.next_buffer;
        self.next_buffer += 1;
        self.buffers.insert(id, header);
        let (length, raw_flags) = unsafe { ((*header).length as usize, (*header).flags) };
        Ok(FullBuffer {
            handle: BufferHandle(id),
            length,
            flags: flags_from_mmal(raw_flags),
        })
    }

    fn submit_payload(
        &mut self,
        port: PortRef,
        source: BufferHandle,
        length: usize,
        flags: BufferFlags,
    ) -> Result<()> {
        let port = self.port(port)?;
        let source = self.header(source)?;
        let mut header: *mut sys::MMAL_BUFFER_HEADER_T = null_mut();
        // Carry the payload in a real input header rather than a scratch one.
        check("mmal_wrapper_buffer_get_empty", unsafe {
            (self.lib.mmal_wrapper_buffer_get_empty)(port, &mut header, 0)
        })?;
        unsafe {
            (*header).data = (*source).data;
            (*header).length = length as u32;
            (*header).offset = 0;
            (*header).flags = flags_to_mmal(flags);
        }
        check("mmal_port_send_buffer", unsafe {
            (self.lib.mmal_port_send_buffer)(port, header)
        })
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        let header = self
            .buffers
            .remove(&buffer.0)
            .ok_or(Error::driver("buffer lookup", sys::MMAL_EINVAL))?;
        unsafe { (self.lib.mmal_buffer_header_release)(header) };
        Ok(())
    }

    fn buffer_pixels(&self, buffer: BufferHandle) -> Result<&[u8]> {
        let header = self.header(buffer)?;
        unsafe {
            Ok(std::slice::from_raw_parts(
                (*header).data.add((*header).offset as usize),
                (*header).length as usize,
            ))
        }
    }
}

impl Drop for MmalBackend {
    fn drop(&mut self) {
        // Leftovers from an aborted teardown; release in dependency order.
        for (_, header) in self.buffers.drain() {
            unsafe { (self.lib.mmal_buffer_header_release)(header) };
        }
        for (_, connection) in self.connections.drain() {
            _ = unsafe { (self.lib.mmal_connection_destroy)(connection) };
        }
        for (_, component) in self.components.drain() {
            _ = unsafe { (self.lib.mmal_wrapper_destroy)(component.wrapper) };
        }
        debug!("media components destroyed");
    }
}

/// Construct the dispmanx and MMAL backend pair.
pub fn open_backends() -> Result<(VideoCoreDisplay, MmalBackend)> {
    Ok((VideoCoreDisplay::new()?, MmalBackend::new()?))
}
