// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! On-screen element registry and software rendering of boxes and images.

use crate::backend::{AlphaMode, DisplayBackend, ElementHandle};
use crate::error::Result;
use crate::pixel::{align_up, Color, PixelFormat, Rect};
use tracing::debug;

/// Compositing layer for every element this library creates.  The raspicam
/// preview sits at layer 2, so overlays land above it.
const OVERLAY_LAYER: i32 = 5;

/// Base opacity for source-alpha blending.
const BASE_OPACITY: u8 = 128;

/// Elements composited onto the screen through the library, plus the
/// scratch memory used to stage software-rendered pixels before upload.
///
/// The element list is append-only between bulk removals.  The scratch
/// buffer grows to the largest staging request of the session and never
/// shrinks.
pub struct ElementRegistry {
    elements: Vec<ElementHandle>,
    scratch: Vec<u8>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        ElementRegistry {
            elements: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Bytes currently committed to the scratch staging buffer.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.len()
    }

    fn scratch(&mut self, len: usize) -> &mut [u8] {
        if self.scratch.len() < len {
            self.scratch.resize(len, 0);
        }
        &mut self.scratch[..len]
    }

    /// Upload `pixels` (tightly packed `width * 4` byte rows) and composite
    /// them at `(x, y)` without scaling.
    pub fn render_image(
        &mut self,
        display: &mut dyn DisplayBackend,
        pixels: &[u8],
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Result<ElementHandle> {
        self.render_image_scaled(display, pixels, x, y, width, height, width, height)
    }

    /// Upload `pixels` and composite them scaled onto a
    /// `scaled_width` x `scaled_height` destination rectangle.
    #[allow(clippy::too_many_arguments)]
    pub fn render_image_scaled(
        &mut self,
        display: &mut dyn DisplayBackend,
        pixels: &[u8],
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        scaled_width: u32,
        scaled_height: u32,
    ) -> Result<ElementHandle> {
        let tight = width as usize * 4;
        let stride = align_up(width * 4, 32) as usize;
        let element = if stride == tight {
            upload_element(
                display,
                pixels,
                stride,
                x,
                y,
                width,
                height,
                scaled_width,
                scaled_height,
            )?
        } else {
            // The compositor reads rows at the padded stride; repack.
            let len = stride * height as usize;
            {
                let staged = self.scratch(len);
                for row in 0..height as usize {
                    staged[row * stride..row * stride + tight]
                        .copy_from_slice(&pixels[row * tight..(row + 1) * tight]);
                }
            }
            upload_element(
                display,
                &self.scratch[..len],
                stride,
                x,
                y,
                width,
                height,
                scaled_width,
                scaled_height,
            )?
        };
        self.elements.push(element);
        Ok(element)
    }

    /// Rasterize a bordered box with a transparent interior and composite
    /// it at `(x, y)`.  A border thicker than half a dimension is clamped,
    /// which fills the box entirely.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_box(
        &mut self,
        display: &mut dyn DisplayBackend,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        border: u32,
        color: Color,
    ) -> Result<ElementHandle> {
        let border_w = border.min(width / 2) as usize;
        let border_h = border.min(height / 2) as usize;
        let stride = align_up(width * 4, 32) as usize;
        let len = stride * height as usize;
        let rgba = color.rgba();
        let clear = Color::Transparent.rgba();
        {
            let staged = self.scratch(len);
            for row in 0..height as usize {
                let edge_row = row < border_h || row >= height as usize - border_h;
                let line = &mut staged[row * stride..row * stride + width as usize * 4];
                for (col, pixel) in line.chunks_exact_mut(4).enumerate() {
                    let edge = edge_row || col < border_w || col >= width as usize - border_w;
                    pixel.copy_from_slice(if edge { &rgba } else { &clear });
                }
            }
        }
        let element = upload_element(
            display,
            &self.scratch[..len],
            stride,
            x,
            y,
            width,
            height,
            width,
            height,
        )?;
        self.elements.push(element);
        Ok(element)
    }

    /// Remove every registered element from the screen and reset the list.
    /// Returns how many removals were issued.
    pub fn remove_all(&mut self, display: &mut dyn DisplayBackend) -> Result<usize> {
        for element in &self.elements {
            display.remove_element(*element)?;
        }
        let removed = self.elements.len();
        self.elements.clear();
        debug!(removed, "elements removed");
        Ok(removed)
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        ElementRegistry::new()
    }
}

#[allow(clippy::too_many_arguments)]
fn upload_element(
    display: &mut dyn DisplayBackend,
    pixels: &[u8],
    stride: usize,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    scaled_width: u32,
    scaled_height: u32,
) -> Result<ElementHandle> {
    let resource = display.create_resource(PixelFormat::Rgba32, width, height)?;
    let region = Rect::new(0, 0, width as i32, height as i32);
    display.write_resource(resource, PixelFormat::Rgba32, stride, pixels, region)?;
    let element = display.add_element(
        OVERLAY_LAYER,
        Rect::new(x, y, scaled_width as i32, scaled_height as i32),
        resource,
        region,
        AlphaMode::FromSource {
            opacity: BASE_OPACITY,
        },
    )?;
    // The element retains the uploaded pixels; the resource handle is dead
    // weight once the element exists.
    display.delete_resource(resource)?;
    Ok(element)
}
