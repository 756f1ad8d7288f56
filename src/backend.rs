// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Backend interfaces for the two collaborators the library drives: the
//! display compositor and the media pipeline framework.
//!
//! The core never talks to vendor libraries directly; everything goes
//! through [`DisplayBackend`] and [`MediaBackend`].  The `videocore` module
//! implements them over the real VideoCore stack, the `virtual_backend`
//! module implements them in memory.

use crate::error::Result;
use crate::pixel::{align_up, PixelFormat, Rect};
use std::ops::BitOr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

#[derive(Debug, Clone, Copy)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
}

/// Alpha policy applied when an element is composited.
#[derive(Debug, Clone, Copy)]
pub enum AlphaMode {
    /// Blend each pixel using its own alpha channel, scaled by `opacity`.
    FromSource { opacity: u8 },
    /// Ignore source alpha and apply `opacity` to every pixel.
    Fixed { opacity: u8 },
}

/// Display compositor collaborator.
///
/// The backend owns at most one opened display and one pending update
/// batch.  Element additions and removals accumulate in the batch and
/// become visible only when [`DisplayBackend::submit_update`] commits it
/// synchronously.
pub trait DisplayBackend {
    /// Open display `number` and report its size.
    fn open(&mut self, number: u32) -> Result<ScreenInfo>;
    fn close(&mut self) -> Result<()>;
    /// Start a new update batch.
    fn begin_update(&mut self) -> Result<()>;
    /// Commit the pending batch synchronously.
    fn submit_update(&mut self) -> Result<()>;
    /// Allocate an image resource of the given size.
    fn create_resource(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<ResourceHandle>;
    /// Upload pixel rows spaced `stride` bytes apart into `region` of the
    /// resource.
    fn write_resource(
        &mut self,
        resource: ResourceHandle,
        format: PixelFormat,
        stride: usize,
        pixels: &[u8],
        region: Rect,
    ) -> Result<()>;
    fn delete_resource(&mut self, resource: ResourceHandle) -> Result<()>;
    /// Stage an on-screen element mapping `src` (in pixels) of the resource
    /// onto `dst` at the given compositing layer.  The element keeps its
    /// own reference to the uploaded pixels, so the resource may be deleted
    /// once the element exists.
    fn add_element(
        &mut self,
        layer: i32,
        dst: Rect,
        resource: ResourceHandle,
        src: Rect,
        alpha: AlphaMode,
    ) -> Result<ElementHandle>;
    fn remove_element(&mut self, element: ElementHandle) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Camera,
    Resizer,
    NullSink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

/// Reference to one port of a pipeline component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRef {
    pub component: ComponentId,
    pub direction: PortDirection,
    pub index: usize,
}

impl PortRef {
    pub const fn input(component: ComponentId, index: usize) -> Self {
        PortRef {
            component,
            direction: PortDirection::Input,
            index,
        }
    }

    pub const fn output(component: ComponentId, index: usize) -> Self {
        PortRef {
            component,
            direction: PortDirection::Output,
            index,
        }
    }
}

/// Camera output port layout, shared by every backend.
pub const CAMERA_PREVIEW_PORT: usize = 0;
pub const CAMERA_VIDEO_PORT: usize = 1;
pub const CAMERA_CAPTURE_PORT: usize = 2;

/// Flags reported on a filled buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferFlags(pub u32);

impl BufferFlags {
    pub const FRAME_END: BufferFlags = BufferFlags(1 << 0);
    pub const END_OF_STREAM: BufferFlags = BufferFlags(1 << 1);

    /// Whether this buffer completes a frame.  Still captures close with a
    /// frame-end flag while pushed streams close with end-of-stream;
    /// either terminates the wait in
    /// [`crate::capture::acquire_full_buffer`].
    pub const fn is_frame_boundary(self) -> bool {
        self.0 & (BufferFlags::FRAME_END.0 | BufferFlags::END_OF_STREAM.0) != 0
    }

    pub const fn contains(self, other: BufferFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for BufferFlags {
    type Output = BufferFlags;

    fn bitor(self, rhs: BufferFlags) -> BufferFlags {
        BufferFlags(self.0 | rhs.0)
    }
}

/// Static capabilities of one physical camera.
#[derive(Debug, Clone, Copy)]
pub struct CameraDescriptor {
    pub max_width: u32,
    pub max_height: u32,
}

/// Port format: padded allocation size plus the logical crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub crop: Rect,
}

impl PortConfig {
    /// Configuration for a logical `width` x `height` region: the
    /// allocation is rounded up to the hardware tiling (32-pixel columns,
    /// 16-pixel rows) while the crop carries the unrounded size to
    /// consumers.
    pub fn padded(format: PixelFormat, width: u32, height: u32) -> Self {
        PortConfig {
            format,
            width: align_up(width, 32),
            height: align_up(height, 16),
            crop: Rect::new(0, 0, width as i32, height as i32),
        }
    }
}

/// A buffer the framework reports as carrying data.
#[derive(Debug, Clone, Copy)]
pub struct FullBuffer {
    pub handle: BufferHandle,
    pub length: usize,
    pub flags: BufferFlags,
}

/// Media pipeline collaborator.
///
/// Components expose input/output ports; tunneled connections move data
/// between ports without application-visible copies; ports exchange opaque
/// buffers.  Buffers returned by [`MediaBackend::wait_full_buffer`] belong
/// to the caller until released.
pub trait MediaBackend {
    /// Enumerate the physical cameras once.
    fn enumerate_cameras(&mut self) -> Result<Vec<CameraDescriptor>>;
    fn create_component(&mut self, kind: ComponentKind) -> Result<ComponentId>;
    fn destroy_component(&mut self, component: ComponentId) -> Result<()>;
    /// Push the camera-select parameter to a camera component.
    fn set_camera_number(&mut self, component: ComponentId, number: usize) -> Result<()>;
    fn configure_port(&mut self, port: PortRef, config: &PortConfig) -> Result<()>;
    /// Arm or disarm frame production on a camera capture port.
    fn set_capture_active(&mut self, port: PortRef, active: bool) -> Result<()>;
    /// Create a tunneled connection between two ports.
    fn create_connection(&mut self, from: PortRef, to: PortRef) -> Result<ConnectionId>;
    fn enable_connection(&mut self, connection: ConnectionId) -> Result<()>;
    fn destroy_connection(&mut self, connection: ConnectionId) -> Result<()>;
    /// Non-blocking; `Ok(None)` once the port's pool is drained.
    fn next_empty_buffer(&mut self, port: PortRef) -> Result<Option<BufferHandle>>;
    /// Hand an empty buffer back to the pipeline for filling.
    fn submit_buffer(&mut self, port: PortRef, buffer: BufferHandle) -> Result<()>;
    /// Block until the pipeline hands back a filled buffer.
    fn wait_full_buffer(&mut self, port: PortRef) -> Result<FullBuffer>;
    /// Feed the payload of an already-held buffer into a processing input
    /// port, tagged with `flags`.
    fn submit_payload(
        &mut self,
        port: PortRef,
        source: BufferHandle,
        length: usize,
        flags: BufferFlags,
    ) -> Result<()>;
    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<()>;
    /// Borrow the pixel payload of a held buffer.
    fn buffer_pixels(&self, buffer: BufferHandle) -> Result<&[u8]>;
}
