// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Capture pipeline: buffer exchange, the camera→resize graph, and the
//! per-ignition frame cache.

use crate::backend::{
    BufferFlags, BufferHandle, CameraDescriptor, ComponentId, ComponentKind, ConnectionId,
    FullBuffer, MediaBackend, PortConfig, PortRef, CAMERA_CAPTURE_PORT, CAMERA_PREVIEW_PORT,
};
use crate::error::{Error, Result};
use crate::pixel::PixelFormat;
use tracing::debug;

/// Refill `port` with every empty buffer it owns, then block until the
/// pipeline hands back a filled buffer that completes a frame.
///
/// Filled buffers without a frame-boundary flag are mid-frame slices;
/// they are released and the wait repeats.  The returned buffer belongs to
/// the caller until released.  This blocks with no timeout: a frame that
/// never arrives hangs the calling thread.
pub fn acquire_full_buffer(media: &mut dyn MediaBackend, port: PortRef) -> Result<FullBuffer> {
    loop {
        while let Some(buffer) = media.next_empty_buffer(port)? {
            media.submit_buffer(port, buffer)?;
        }
        let full = media.wait_full_buffer(port)?;
        if full.flags.is_frame_boundary() {
            return Ok(full);
        }
        media.release_buffer(full.handle)?;
    }
}

/// A frame held out of the pipeline, pinned until the next ignition.
#[derive(Debug, Clone, Copy)]
pub struct HeldFrame {
    pub buffer: BufferHandle,
    pub length: usize,
}

struct ResizeBranch {
    component: ComponentId,
    link: ConnectionId,
}

/// The camera → (resize) → consumer graph and the frames held out of it.
///
/// The graph is in one of two states: *native*, where the camera capture
/// port feeds the consumer directly, and *resized*, where a resize branch
/// scales it to the requested size.  The resize branch exists exactly when
/// the requested frame size differs from the camera's native size.
pub struct CaptureGraph {
    camera: ComponentId,
    preview_sink: ComponentId,
    preview_link: ConnectionId,
    cameras: Vec<CameraDescriptor>,
    camera_index: usize,
    native_width: u32,
    native_height: u32,
    frame_width: u32,
    frame_height: u32,
    resize: Option<ResizeBranch>,
    ignited: bool,
    full: Option<HeldFrame>,
    resized: Option<HeldFrame>,
}

impl CaptureGraph {
    /// Build the graph: enumerate cameras, create the camera component
    /// configured for camera 0 at native size, and park the preview output
    /// on a null sink so the camera pipeline keeps running.
    pub fn new(media: &mut dyn MediaBackend) -> Result<Self> {
        let cameras = media.enumerate_cameras()?;
        if cameras.is_empty() {
            return Err(Error::NoCameras);
        }
        let (native_width, native_height) = (cameras[0].max_width, cameras[0].max_height);
        let camera = media.create_component(ComponentKind::Camera)?;
        media.configure_port(
            PortRef::output(camera, CAMERA_CAPTURE_PORT),
            &PortConfig::padded(PixelFormat::Rgba32, native_width, native_height),
        )?;
        let preview_sink = media.create_component(ComponentKind::NullSink)?;
        let preview_link = media.create_connection(
            PortRef::output(camera, CAMERA_PREVIEW_PORT),
            PortRef::input(preview_sink, 0),
        )?;
        media.enable_connection(preview_link)?;
        debug!(native_width, native_height, "capture graph built");
        Ok(CaptureGraph {
            camera,
            preview_sink,
            preview_link,
            cameras,
            camera_index: 0,
            native_width,
            native_height,
            frame_width: native_width,
            frame_height: native_height,
            resize: None,
            ignited: false,
            full: None,
            resized: None,
        })
    }

    pub fn cameras(&self) -> &[CameraDescriptor] {
        &self.cameras
    }

    pub fn camera_index(&self) -> usize {
        self.camera_index
    }

    pub fn native_size(&self) -> (u32, u32) {
        (self.native_width, self.native_height)
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    pub fn is_resize_active(&self) -> bool {
        self.resize.is_some()
    }

    fn capture_port(&self) -> PortRef {
        PortRef::output(self.camera, CAMERA_CAPTURE_PORT)
    }

    /// Switch to another camera.  The native size is re-derived from the
    /// camera's descriptor and the requested frame size re-applied, which
    /// may create or tear down the resize branch.
    pub fn select_camera(&mut self, media: &mut dyn MediaBackend, index: usize) -> Result<()> {
        if index >= self.cameras.len() {
            return Err(Error::CameraOutOfRange {
                index,
                count: self.cameras.len(),
            });
        }
        media.set_camera_number(self.camera, index)?;
        self.camera_index = index;
        let descriptor = self.cameras[index];
        self.native_width = descriptor.max_width;
        self.native_height = descriptor.max_height;
        media.configure_port(
            self.capture_port(),
            &PortConfig::padded(PixelFormat::Rgba32, self.native_width, self.native_height),
        )?;
        let (width, height) = (self.frame_width, self.frame_height);
        self.set_frame_size(media, width, height)
    }

    /// Request the output frame size, rebuilding the resize branch as
    /// needed.  Safe to call repeatedly with the same size.
    pub fn set_frame_size(
        &mut self,
        media: &mut dyn MediaBackend,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.frame_width = width;
        self.frame_height = height;

        if width == self.native_width && height == self.native_height {
            if let Some(branch) = self.resize.take() {
                media.destroy_connection(branch.link)?;
                media.destroy_component(branch.component)?;
                debug!("resize branch torn down");
            }
            return Ok(());
        }

        let component = match self.resize.take() {
            Some(branch) => {
                // Keep the component, replace the stale connection.
                media.destroy_connection(branch.link)?;
                branch.component
            }
            None => media.create_component(ComponentKind::Resizer)?,
        };
        media.configure_port(
            PortRef::input(component, 0),
            &PortConfig::padded(PixelFormat::Rgba32, self.native_width, self.native_height),
        )?;
        media.configure_port(
            PortRef::output(component, 0),
            &PortConfig::padded(PixelFormat::Rgba32, width, height),
        )?;
        let link = media.create_connection(self.capture_port(), PortRef::input(component, 0))?;
        media.enable_connection(link)?;
        self.resize = Some(ResizeBranch { component, link });
        debug!(width, height, "resize branch configured");
        Ok(())
    }

    /// Arm the camera capture port and invalidate any held frames.
    ///
    /// Must run before the first frame request after a configuration
    /// change; running it again discards frames held since the previous
    /// ignition.
    pub fn ignite(&mut self, media: &mut dyn MediaBackend) -> Result<()> {
        media.set_capture_active(self.capture_port(), true)?;
        self.release_frames(media)?;
        self.ignited = true;
        Ok(())
    }

    fn release_frames(&mut self, media: &mut dyn MediaBackend) -> Result<()> {
        // Both slots go stale together; a frame never outlives its ignition.
        if let Some(frame) = self.full.take() {
            media.release_buffer(frame.buffer)?;
        }
        if let Some(frame) = self.resized.take() {
            media.release_buffer(frame.buffer)?;
        }
        Ok(())
    }

    /// The full-resolution frame for the current ignition, acquiring it on
    /// first request.  Igniting implicitly if the caller has not.
    pub fn full_frame(&mut self, media: &mut dyn MediaBackend) -> Result<HeldFrame> {
        if let Some(frame) = self.full {
            return Ok(frame);
        }
        if !self.ignited {
            self.ignite(media)?;
        }
        let buffer = acquire_full_buffer(media, self.capture_port())?;
        let frame = HeldFrame {
            buffer: buffer.handle,
            length: buffer.length,
        };
        self.full = Some(frame);
        Ok(frame)
    }

    /// The frame at the requested size.  In native state this is the
    /// full-resolution frame; otherwise the full frame is pushed through
    /// the resize branch on first request and the result cached.
    pub fn frame(&mut self, media: &mut dyn MediaBackend) -> Result<HeldFrame> {
        let full = self.full_frame(media)?;
        let Some(branch) = &self.resize else {
            return Ok(full);
        };
        if let Some(frame) = self.resized {
            return Ok(frame);
        }
        let input = PortRef::input(branch.component, 0);
        let output = PortRef::output(branch.component, 0);
        media.submit_payload(input, full.buffer, full.length, BufferFlags::END_OF_STREAM)?;
        let buffer = acquire_full_buffer(media, output)?;
        let frame = HeldFrame {
            buffer: buffer.handle,
            length: buffer.length,
        };
        self.resized = Some(frame);
        Ok(frame)
    }

    /// Release held frames and destroy every component and connection.
    pub fn shutdown(&mut self, media: &mut dyn MediaBackend) -> Result<()> {
        self.release_frames(media)?;
        if let Some(branch) = self.resize.take() {
            media.destroy_connection(branch.link)?;
            media.destroy_component(branch.component)?;
        }
        media.destroy_connection(self.preview_link)?;
        media.destroy_component(self.preview_sink)?;
        media.destroy_component(self.camera)?;
        debug!("capture graph destroyed");
        Ok(())
    }
}
