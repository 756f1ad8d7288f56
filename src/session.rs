// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! The owned session tying the capture graph and the element registry to a
//! backend pair.

use crate::backend::{CameraDescriptor, DisplayBackend, ElementHandle, MediaBackend};
use crate::capture::CaptureGraph;
use crate::error::{Error, FailureMode, Result};
use crate::overlay::ElementRegistry;
use crate::pixel::{Color, PixelFormat};
use tracing::{debug, warn};

/// Builder for [`GrafxSession`].
pub struct SessionBuilder {
    display_number: u32,
    failure_mode: FailureMode,
}

impl SessionBuilder {
    /// Display number to open (0 is the default display).
    pub fn with_display(mut self, number: u32) -> Self {
        self.display_number = number;
        self
    }

    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Open a session over the given backend pair.
    pub fn open(
        self,
        mut display: Box<dyn DisplayBackend>,
        mut media: Box<dyn MediaBackend>,
    ) -> Result<GrafxSession> {
        let screen = display.open(self.display_number)?;
        display.begin_update()?;
        let capture = CaptureGraph::new(media.as_mut())?;
        debug!(screen.width, screen.height, "session open");
        Ok(GrafxSession {
            display,
            media,
            screen: (screen.width, screen.height),
            capture,
            overlay: ElementRegistry::new(),
            failure: self.failure_mode,
            closed: false,
        })
    }

    /// Open a session over the real VideoCore stack.
    #[cfg(feature = "videocore")]
    pub fn open_videocore(self) -> Result<GrafxSession> {
        let (display, media) = crate::videocore::open_backends()?;
        self.open(Box::new(display), Box::new(media))
    }
}

/// One capture-and-composite session.
///
/// The session owns the display and media backends, the camera→resize
/// capture graph, and the registry of composited elements.  Dropping it
/// (or calling [`GrafxSession::close`]) removes every element, submits the
/// final update, tears the graph down, and closes the display.
///
/// Operations follow the order select-camera → set-frame-size →
/// ignite-capture → frame requests; re-issuing configuration or ignition
/// invalidates cached frames.
pub struct GrafxSession {
    display: Box<dyn DisplayBackend>,
    media: Box<dyn MediaBackend>,
    screen: (u32, u32),
    capture: CaptureGraph,
    overlay: ElementRegistry,
    failure: FailureMode,
    closed: bool,
}

impl GrafxSession {
    pub fn builder() -> SessionBuilder {
        SessionBuilder {
            display_number: 0,
            failure_mode: FailureMode::default(),
        }
    }

    pub fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    pub fn cameras(&self) -> &[CameraDescriptor] {
        self.capture.cameras()
    }

    /// Validate the requested frame pixel format.  Only RGBA32 is
    /// supported; anything else is a configuration error.
    pub fn set_frame_format(&mut self, format: PixelFormat) -> Result<()> {
        let result = if format == PixelFormat::Rgba32 {
            Ok(())
        } else {
            Err(Error::UnsupportedFormat { found: format })
        };
        self.failure.check(result)
    }

    pub fn select_camera(&mut self, index: usize) -> Result<()> {
        let result = self.capture.select_camera(self.media.as_mut(), index);
        self.failure.check(result)
    }

    /// Native size of the selected camera.
    pub fn frame_full_size(&self) -> (u32, u32) {
        self.capture.native_size()
    }

    /// Currently requested frame size.
    pub fn frame_size(&self) -> (u32, u32) {
        self.capture.frame_size()
    }

    /// Whether a resize branch is currently built into the graph.
    pub fn is_resize_active(&self) -> bool {
        self.capture.is_resize_active()
    }

    pub fn set_frame_size(&mut self, width: u32, height: u32) -> Result<()> {
        let result = self.capture.set_frame_size(self.media.as_mut(), width, height);
        self.failure.check(result)
    }

    /// Arm capture and discard any frames held since the last ignition.
    pub fn ignite_capture(&mut self) -> Result<()> {
        let result = self.capture.ignite(self.media.as_mut());
        self.failure.check(result)
    }

    /// Pixels of the full-resolution frame for the current ignition.
    ///
    /// Acquired on first call, then served from cache until the next
    /// ignition; repeated calls borrow the identical buffer memory.
    pub fn full_frame(&mut self) -> Result<&[u8]> {
        let result = self.capture.full_frame(self.media.as_mut());
        let frame = self.failure.check(result)?;
        self.media.buffer_pixels(frame.buffer)
    }

    /// Pixels of the frame at the requested size (the full-resolution
    /// frame when no resize is active).
    pub fn frame(&mut self) -> Result<&[u8]> {
        let result = self.capture.frame(self.media.as_mut());
        let frame = self.failure.check(result)?;
        self.media.buffer_pixels(frame.buffer)
    }

    /// Composite the full-resolution frame scaled onto a
    /// `width` x `height` rectangle at `(x, y)`.
    pub fn display_frame(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Result<ElementHandle> {
        let result = self.capture.full_frame(self.media.as_mut());
        let frame = self.failure.check(result)?;
        let (native_width, native_height) = self.capture.native_size();
        let pixels = self.media.buffer_pixels(frame.buffer)?;
        let result = self.overlay.render_image_scaled(
            self.display.as_mut(),
            pixels,
            x,
            y,
            native_width,
            native_height,
            width,
            height,
        );
        self.failure.check(result)
    }

    /// Draw a bordered box; see [`ElementRegistry::draw_box`].
    pub fn draw_box(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        border: u32,
        color: Color,
    ) -> Result<ElementHandle> {
        let result = self
            .overlay
            .draw_box(self.display.as_mut(), x, y, width, height, border, color);
        self.failure.check(result)
    }

    /// Composite an RGBA32 image at `(x, y)` without scaling.
    pub fn render_image(
        &mut self,
        pixels: &[u8],
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Result<ElementHandle> {
        let result = self
            .overlay
            .render_image(self.display.as_mut(), pixels, x, y, width, height);
        self.failure.check(result)
    }

    /// Composite an RGBA32 image scaled onto a destination rectangle.
    #[allow(clippy::too_many_arguments)]
    pub fn render_image_scaled(
        &mut self,
        pixels: &[u8],
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        scaled_width: u32,
        scaled_height: u32,
    ) -> Result<ElementHandle> {
        let result = self.overlay.render_image_scaled(
            self.display.as_mut(),
            pixels,
            x,
            y,
            width,
            height,
            scaled_width,
            scaled_height,
        );
        self.failure.check(result)
    }

    /// Elements currently registered.
    pub fn element_count(&self) -> usize {
        self.overlay.len()
    }

    /// Submit all pending element additions and removals synchronously and
    /// open a new batch.  Nothing is visible on screen until committed.
    pub fn commit(&mut self) -> Result<()> {
        let result = self.commit_inner();
        self.failure.check(result)
    }

    fn commit_inner(&mut self) -> Result<()> {
        self.display.submit_update()?;
        self.display.begin_update()
    }

    /// Remove every element drawn through this session.  Takes effect on
    /// the next commit.  Returns the number of removals issued.
    pub fn remove_all_elements(&mut self) -> Result<usize> {
        let result = self.overlay.remove_all(self.display.as_mut());
        self.failure.check(result)
    }

    /// Tear the session down, propagating the first failure.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        let result = self.teardown();
        self.failure.check(result)
    }

    fn teardown(&mut self) -> Result<()> {
        self.capture.shutdown(self.media.as_mut())?;
        self.overlay.remove_all(self.display.as_mut())?;
        self.display.submit_update()?;
        self.display.close()
    }
}

impl std::fmt::Debug for GrafxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrafxSession")
            .field("screen", &self.screen)
            .field("failure", &self.failure)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Drop for GrafxSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        match self.teardown() {
            Ok(()) => debug!("session closed"),
            Err(err) => warn!("session teardown failed: {err}"),
        }
    }
}
