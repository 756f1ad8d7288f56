// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Synthetic in-memory backends.
//!
//! `VirtualDisplay` and `VirtualMedia` implement the backend traits without
//! hardware: the virtual camera emits patterned frames, the virtual resizer
//! resamples them, and the virtual compositor applies batch semantics in
//! memory.  Each constructor also returns a journal, a shared log of the
//! operations the backend saw, used by the integration tests and handy for
//! development off-target.

use crate::backend::{
    AlphaMode, BufferFlags, BufferHandle, CameraDescriptor, ComponentId, ComponentKind,
    ConnectionId, DisplayBackend, ElementHandle, FullBuffer, MediaBackend, PortConfig,
    PortDirection, PortRef, ResourceHandle, ScreenInfo, CAMERA_CAPTURE_PORT,
};
use crate::error::{Error, Result};
use crate::pixel::{PixelFormat, Rect};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Driver statuses reported by the virtual backends.
pub const STATUS_NOT_OPEN: i32 = 0x201;
pub const STATUS_ALREADY_OPEN: i32 = 0x202;
pub const STATUS_NO_BATCH: i32 = 0x203;
pub const STATUS_BATCH_OPEN: i32 = 0x204;
pub const STATUS_BAD_HANDLE: i32 = 0x205;
/// A blocking wait with nothing queued; a real pipeline would hang forever
/// here, the virtual one fails fast instead.
pub const STATUS_STARVED: i32 = 0x206;
pub const STATUS_NOT_ARMED: i32 = 0x207;
pub const STATUS_UNCONFIGURED: i32 = 0x208;

/// Empty buffers initially pooled on every output port.
const PORT_POOL: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    ResourceCreated(ResourceHandle),
    ResourceDeleted(ResourceHandle),
    ElementAdded(ElementHandle),
    ElementRemoved(ElementHandle),
    UpdateSubmitted,
}

struct Upload {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[derive(Default)]
struct DisplayLog {
    events: Vec<DisplayEvent>,
    uploads: HashMap<u32, Upload>,
    visible: Vec<ElementHandle>,
}

/// Shared log of the operations a [`VirtualDisplay`] performed.
#[derive(Clone, Default)]
pub struct DisplayJournal(Arc<Mutex<DisplayLog>>);

impl DisplayJournal {
    fn lock(&self) -> MutexGuard<'_, DisplayLog> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.lock().events.clone()
    }

    /// Removal operations issued so far.
    pub fn removals(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|event| matches!(event, DisplayEvent::ElementRemoved(_)))
            .count()
    }

    /// Update batches submitted so far.
    pub fn submits(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|event| matches!(event, DisplayEvent::UpdateSubmitted))
            .count()
    }

    /// Elements on screen after the most recent submit.
    pub fn visible(&self) -> Vec<ElementHandle> {
        self.lock().visible.clone()
    }

    /// Pixel content an element was created with, as tightly packed RGBA
    /// rows.  Retained even after the element's resource was deleted.
    pub fn element_content(&self, element: ElementHandle) -> Option<(u32, u32, Vec<u8>)> {
        self.lock()
            .uploads
            .get(&element.0)
            .map(|upload| (upload.width, upload.height, upload.pixels.clone()))
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        let mut log = self.lock();
        log.events.clear();
        log.uploads.clear();
    }

    fn push(&self, event: DisplayEvent) {
        self.lock().events.push(event);
    }
}

struct VirtualResource {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

enum Staged {
    Add(ElementHandle),
    Remove(ElementHandle),
}

/// In-memory display compositor with batch semantics.
pub struct VirtualDisplay {
    screen: ScreenInfo,
    open: bool,
    batch_open: bool,
    next_resource: u32,
    next_element: u32,
    resources: HashMap<u32, VirtualResource>,
    created: HashSet<u32>,
    staged: Vec<Staged>,
    visible: Vec<ElementHandle>,
    journal: DisplayJournal,
}

impl VirtualDisplay {
    pub fn new(width: u32, height: u32) -> (Self, DisplayJournal) {
        let journal = DisplayJournal::default();
        let display = VirtualDisplay {
            screen: ScreenInfo { width, height },
            open: false,
            batch_open: false,
            next_resource: 1,
            next_element: 1,
            resources: HashMap::new(),
            created: HashSet::new(),
            staged: Vec::new(),
            visible: Vec::new(),
            journal: journal.clone(),
        };
        (display, journal)
    }
}

impl DisplayBackend for VirtualDisplay {
    fn open(&mut self, _number: u32) -> Result<ScreenInfo> {
        if self.open {
            return Err(Error::driver("display_open", STATUS_ALREADY_OPEN));
        }
        self.open = true;
        Ok(self.screen)
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::driver("display_close", STATUS_NOT_OPEN));
        }
        self.open = false;
        Ok(())
    }

    fn begin_update(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::driver("update_start", STATUS_NOT_OPEN));
        }
        if self.batch_open {
            return Err(Error::driver("update_start", STATUS_BATCH_OPEN));
        }
        self.batch_open = true;
        Ok(())
    }

    fn submit_update(&mut self) -> Result<()> {
        if !self.open || !self.batch_open {
            return Err(Error::driver("update_submit", STATUS_NO_BATCH));
        }
        for staged in self.staged.drain(..) {
            match staged {
                Staged::Add(element) => self.visible.push(element),
                Staged::Remove(element) => self.visible.retain(|live| *live != element),
            }
        }
        self.batch_open = false;
        self.journal.push(DisplayEvent::UpdateSubmitted);
        self.journal.lock().visible = self.visible.clone();
        Ok(())
    }

    fn create_resource(
        &mut self,
        _format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<ResourceHandle> {
        if !self.open {
            return Err(Error::driver("resource_create", STATUS_NOT_OPEN));
        }
        let handle = ResourceHandle(self.next_resource);
        self.next_resource += 1;
        self.resources.insert(
            handle.0,
            VirtualResource {
                width,
                height,
                pixels: vec![0; width as usize * height as usize * 4],
            },
        );
        self.journal.push(DisplayEvent::ResourceCreated(handle));
        Ok(handle)
    }

    fn write_resource(
        &mut self,
        resource: ResourceHandle,
        _format: PixelFormat,
        stride: usize,
        pixels: &[u8],
        region: Rect,
    ) -> Result<()> {
        let target = self
            .resources
            .get_mut(&resource.0)
            .ok_or(Error::driver("resource_write", STATUS_BAD_HANDLE))?;
        if region.x < 0
            || region.y < 0
            || region.x + region.width > target.width as i32
            || region.y + region.height > target.height as i32
        {
            return Err(Error::driver("resource_write", STATUS_BAD_HANDLE));
        }
        let row_bytes = region.width as usize * 4;
        for row in 0..region.height as usize {
            let src = row * stride;
            if src + row_bytes > pixels.len() {
                return Err(Error::driver("resource_write", STATUS_BAD_HANDLE));
            }
            let dst =
                ((region.y as usize + row) * target.width as usize + region.x as usize) * 4;
            target.pixels[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
        }
        Ok(())
    }

    fn delete_resource(&mut self, resource: ResourceHandle) -> Result<()> {
        if self.resources.remove(&resource.0).is_none() {
            return Err(Error::driver("resource_delete", STATUS_BAD_HANDLE));
        }
        self.journal.push(DisplayEvent::ResourceDeleted(resource));
        Ok(())
    }

    fn add_element(
        &mut self,
        _layer: i32,
        _dst: Rect,
        resource: ResourceHandle,
        _src: Rect,
        _alpha: AlphaMode,
    ) -> Result<ElementHandle> {
        if !self.batch_open {
            return Err(Error::driver("element_add", STATUS_NO_BATCH));
        }
        let source = self
            .resources
            .get(&resource.0)
            .ok_or(Error::driver("element_add", STATUS_BAD_HANDLE))?;
        let handle = ElementHandle(self.next_element);
        self.next_element += 1;
        self.created.insert(handle.0);
        self.staged.push(Staged::Add(handle));
        {
            let mut log = self.journal.lock();
            log.uploads.insert(
                handle.0,
                Upload {
                    width: source.width,
                    height: source.height,
                    pixels: source.pixels.clone(),
                },
            );
            log.events.push(DisplayEvent::ElementAdded(handle));
        }
        Ok(handle)
    }

    fn remove_element(&mut self, element: ElementHandle) -> Result<()> {
        if !self.batch_open {
            return Err(Error::driver("element_remove", STATUS_NO_BATCH));
        }
        if !self.created.contains(&element.0) {
            return Err(Error::driver("element_remove", STATUS_BAD_HANDLE));
        }
        self.staged.push(Staged::Remove(element));
        self.journal.push(DisplayEvent::ElementRemoved(element));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    ComponentCreated(ComponentKind),
    ComponentDestroyed(ComponentKind),
    CameraSelected(usize),
    PortConfigured {
        kind: ComponentKind,
        port: PortRef,
        config: PortConfig,
    },
    CaptureArmed(bool),
    ConnectionCreated(ConnectionId),
    ConnectionDestroyed(ConnectionId),
    BufferReleased(BufferHandle),
    PayloadSubmitted {
        length: usize,
        flags: BufferFlags,
    },
}

/// Shared log of the operations a [`VirtualMedia`] performed.
#[derive(Clone, Default)]
pub struct MediaJournal(Arc<Mutex<Vec<MediaEvent>>>);

impl MediaJournal {
    fn lock(&self) -> MutexGuard<'_, Vec<MediaEvent>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<MediaEvent> {
        self.lock().clone()
    }

    /// Components of `kind` created and not yet destroyed.
    pub fn live_components(&self, kind: ComponentKind) -> usize {
        let mut live = 0usize;
        for event in self.lock().iter() {
            match event {
                MediaEvent::ComponentCreated(created) if *created == kind => live += 1,
                MediaEvent::ComponentDestroyed(destroyed) if *destroyed == kind => live -= 1,
                _ => {}
            }
        }
        live
    }

    /// Buffers released back to the pipeline so far.
    pub fn releases(&self) -> usize {
        self.lock()
            .iter()
            .filter(|event| matches!(event, MediaEvent::BufferReleased(_)))
            .count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn push(&self, event: MediaEvent) {
        self.lock().push(event);
    }
}

struct VirtualComponent {
    kind: ComponentKind,
    capture_active: bool,
    configs: HashMap<(PortDirection, usize), PortConfig>,
    /// Empty buffers available per output port.
    empties: HashMap<usize, u32>,
    /// Buffers submitted and waiting to be filled, per output port.
    queued: HashMap<usize, u32>,
    pending_input: Option<Vec<u8>>,
    boundary_next: bool,
    frame_counter: u64,
}

impl VirtualComponent {
    fn new(kind: ComponentKind) -> Self {
        let outputs = match kind {
            ComponentKind::Camera => 3,
            ComponentKind::Resizer => 1,
            ComponentKind::NullSink => 0,
        };
        let mut empties = HashMap::new();
        let mut queued = HashMap::new();
        for index in 0..outputs {
            empties.insert(index, PORT_POOL);
            queued.insert(index, 0);
        }
        VirtualComponent {
            kind,
            capture_active: false,
            configs: HashMap::new(),
            empties,
            queued,
            pending_input: None,
            boundary_next: false,
            frame_counter: 0,
        }
    }
}

struct Connection {
    from: PortRef,
    to: PortRef,
    enabled: bool,
}

/// In-memory media pipeline with a patterned camera and a nearest-neighbour
/// resizer.
pub struct VirtualMedia {
    cameras: Vec<CameraDescriptor>,
    components: HashMap<u32, VirtualComponent>,
    connections: HashMap<u32, Connection>,
    filled: HashMap<u64, Vec<u8>>,
    /// Origin port of loaned and filled buffers, for pool recycling.
    origins: HashMap<u64, (u32, usize)>,
    next_component: u32,
    next_connection: u32,
    next_buffer: u64,
    partial_delivery: bool,
    journal: MediaJournal,
}

impl VirtualMedia {
    /// One virtual camera with a 1920x1080 native size.
    pub fn new() -> (Self, MediaJournal) {
        VirtualMedia::with_cameras(vec![CameraDescriptor {
            max_width: 1920,
            max_height: 1080,
        }])
    }

    pub fn with_cameras(cameras: Vec<CameraDescriptor>) -> (Self, MediaJournal) {
        let journal = MediaJournal::default();
        let media = VirtualMedia {
            cameras,
            components: HashMap::new(),
            connections: HashMap::new(),
            filled: HashMap::new(),
            origins: HashMap::new(),
            next_component: 1,
            next_connection: 1,
            next_buffer: 1,
            partial_delivery: false,
            journal: journal.clone(),
        };
        (media, journal)
    }

    /// When enabled, the camera delivers a non-boundary buffer ahead of
    /// every frame-boundary buffer, exercising the release-and-retry path
    /// of the exchange helper.
    pub fn set_partial_delivery(&mut self, enabled: bool) {
        self.partial_delivery = enabled;
    }

    fn component(&mut self, id: ComponentId) -> Result<&mut VirtualComponent> {
        self.components
            .get_mut(&id.0)
            .ok_or(Error::driver("component lookup", STATUS_BAD_HANDLE))
    }

    fn store_filled(&mut self, origin: (u32, usize), data: Vec<u8>) -> BufferHandle {
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer += 1;
        self.filled.insert(handle.0, data);
        self.origins.insert(handle.0, origin);
        handle
    }
}

fn frame_payload(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut data = vec![0u8; width as usize * height as usize * 4];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = ((i as u64 / 4) + seed) as u8;
    }
    data
}

fn resample(src: &[u8], src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Vec<u8> {
    let mut out = vec![0u8; dst_w as usize * dst_h as usize * 4];
    if src_w == 0 || src_h == 0 {
        return out;
    }
    for y in 0..dst_h as usize {
        let sy = y * src_h as usize / dst_h as usize;
        for x in 0..dst_w as usize {
            let sx = x * src_w as usize / dst_w as usize;
            let s = (sy * src_w as usize + sx) * 4;
            let d = (y * dst_w as usize + x) * 4;
            if s + 4 <= src.len() {
                out[d..d + 4].copy_from_slice(&src[s..s + 4]);
            }
        }
    }
    out
}

impl MediaBackend for VirtualMedia {
    fn enumerate_cameras(&mut self) -> Result<Vec<CameraDescriptor>> {
        Ok(self.cameras.clone())
    }

    fn create_component(&mut self, kind: ComponentKind) -> Result<ComponentId> {
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        self.components.insert(id.0, VirtualComponent::new(kind));
        self.journal.push(MediaEvent::ComponentCreated(kind));
        Ok(id)
    }

    fn destroy_component(&mut self, component: ComponentId) -> Result<()> {
        let removed = self
            .components
            .remove(&component.0)
            .ok_or(Error::driver("component_destroy", STATUS_BAD_HANDLE))?;
        self.journal
            .push(MediaEvent::ComponentDestroyed(removed.kind));
        Ok(())
    }

    fn set_camera_number(&mut self, component: ComponentId, number: usize) -> Result<()> {
        let count = self.cameras.len();
        self.component(component)?;
        if number >= count {
            return Err(Error::driver("camera_num parameter", STATUS_BAD_HANDLE));
        }
        self.journal.push(MediaEvent::CameraSelected(number));
        Ok(())
    }

    fn configure_port(&mut self, port: PortRef, config: &PortConfig) -> Result<()> {
        let component = self.component(port.component)?;
        component
            .configs
            .insert((port.direction, port.index), *config);
        let kind = component.kind;
        self.journal.push(MediaEvent::PortConfigured {
            kind,
            port,
            config: *config,
        });
        Ok(())
    }

    fn set_capture_active(&mut self, port: PortRef, active: bool) -> Result<()> {
        let component = self.component(port.component)?;
        component.capture_active = active;
        self.journal.push(MediaEvent::CaptureArmed(active));
        Ok(())
    }

    fn create_connection(&mut self, from: PortRef, to: PortRef) -> Result<ConnectionId> {
        self.component(from.component)?;
        self.component(to.component)?;
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(
            id.0,
            Connection {
                from,
                to,
                enabled: false,
            },
        );
        self.journal.push(MediaEvent::ConnectionCreated(id));
        Ok(id)
    }

    fn enable_connection(&mut self, connection: ConnectionId) -> Result<()> {
        let link = self
            .connections
            .get_mut(&connection.0)
            .ok_or(Error::driver("connection_enable", STATUS_BAD_HANDLE))?;
        link.enabled = true;
        Ok(())
    }

    fn destroy_connection(&mut self, connection: ConnectionId) -> Result<()> {
        if self.connections.remove(&connection.0).is_none() {
            return Err(Error::driver("connection_destroy", STATUS_BAD_HANDLE));
        }
        self.journal.push(MediaEvent::ConnectionDestroyed(connection));
        Ok(())
    }

    fn next_empty_buffer(&mut self, port: PortRef) -> Result<Option<BufferHandle>> {
        if port.direction != PortDirection::Output {
            return Ok(None);
        }
        let next = self.next_buffer;
        let component = self.component(port.component)?;
        let Some(pool) = component.empties.get_mut(&port.index) else {
            return Ok(None);
        };
        if *pool == 0 {
            return Ok(None);
        }
        *pool -= 1;
        self.next_buffer += 1;
        let handle = BufferHandle(next);
        self.origins.insert(handle.0, (port.component.0, port.index));
        Ok(Some(handle))
    }

    fn submit_buffer(&mut self, port: PortRef, buffer: BufferHandle) -> Result<()> {
        if self.origins.remove(&buffer.0).is_none() {
            return Err(Error::driver("port_send_buffer", STATUS_BAD_HANDLE));
        }
        let component = self.component(port.component)?;
        let queued = component
            .queued
            .get_mut(&port.index)
            .ok_or(Error::driver("port_send_buffer", STATUS_BAD_HANDLE))?;
        *queued += 1;
        Ok(())
    }

    fn wait_full_buffer(&mut self, port: PortRef) -> Result<FullBuffer> {
        let partial_delivery = self.partial_delivery;
        // Processing components only run while an enabled connection feeds
        // their input.
        let input_linked = self.connections.values().any(|link| {
            link.enabled
                && link.from.direction == PortDirection::Output
                && link.to.component == port.component
        });
        let component = self.component(port.component)?;
        let kind = component.kind;
        let (data, flags) = match kind {
            ComponentKind::Camera if port.index == CAMERA_CAPTURE_PORT => {
                if !component.capture_active {
                    return Err(Error::driver("buffer_get_full", STATUS_NOT_ARMED));
                }
                let queued = component
                    .queued
                    .get_mut(&port.index)
                    .ok_or(Error::driver("buffer_get_full", STATUS_BAD_HANDLE))?;
                if *queued == 0 {
                    return Err(Error::driver("buffer_get_full", STATUS_STARVED));
                }
                *queued -= 1;
                let config = component
                    .configs
                    .get(&(PortDirection::Output, port.index))
                    .copied()
                    .ok_or(Error::driver("buffer_get_full", STATUS_UNCONFIGURED))?;
                let (width, height) =
                    (config.crop.width as u32, config.crop.height as u32);
                if partial_delivery && !component.boundary_next {
                    component.boundary_next = true;
                    // One row, no boundary flag: a mid-frame slice.
                    (
                        frame_payload(width, 1, component.frame_counter),
                        BufferFlags::default(),
                    )
                } else {
                    component.boundary_next = false;
                    let seed = component.frame_counter;
                    component.frame_counter += 1;
                    (
                        frame_payload(width, height, seed),
                        BufferFlags::FRAME_END,
                    )
                }
            }
            ComponentKind::Resizer if port.index == 0 => {
                if !input_linked {
                    return Err(Error::driver("buffer_get_full", STATUS_STARVED));
                }
                let queued = component
                    .queued
                    .get_mut(&port.index)
                    .ok_or(Error::driver("buffer_get_full", STATUS_BAD_HANDLE))?;
                if *queued == 0 {
                    return Err(Error::driver("buffer_get_full", STATUS_STARVED));
                }
                let input = component
                    .pending_input
                    .take()
                    .ok_or(Error::driver("buffer_get_full", STATUS_STARVED))?;
                *queued -= 1;
                let source = component
                    .configs
                    .get(&(PortDirection::Input, 0))
                    .copied()
                    .ok_or(Error::driver("buffer_get_full", STATUS_UNCONFIGURED))?;
                let target = component
                    .configs
                    .get(&(PortDirection::Output, 0))
                    .copied()
                    .ok_or(Error::driver("buffer_get_full", STATUS_UNCONFIGURED))?;
                let data = resample(
                    &input,
                    source.crop.width as u32,
                    source.crop.height as u32,
                    target.crop.width as u32,
                    target.crop.height as u32,
                );
                // The EOS tag on the pushed payload propagates.
                (data, BufferFlags::END_OF_STREAM)
            }
            _ => return Err(Error::driver("buffer_get_full", STATUS_STARVED)),
        };
        let length = data.len();
        let handle = self.store_filled((port.component.0, port.index), data);
        Ok(FullBuffer {
            handle,
            length,
            flags,
        })
    }

    fn submit_payload(
        &mut self,
        port: PortRef,
        source: BufferHandle,
        length: usize,
        flags: BufferFlags,
    ) -> Result<()> {
        let data = self
            .filled
            .get(&source.0)
            .ok_or(Error::driver("port_send_buffer", STATUS_BAD_HANDLE))?;
        let payload = data[..length.min(data.len())].to_vec();
        let component = self.component(port.component)?;
        if component.kind != ComponentKind::Resizer || port.direction != PortDirection::Input {
            return Err(Error::driver("port_send_buffer", STATUS_BAD_HANDLE));
        }
        component.pending_input = Some(payload);
        self.journal
            .push(MediaEvent::PayloadSubmitted { length, flags });
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        let origin = self
            .origins
            .remove(&buffer.0)
            .ok_or(Error::driver("buffer_header_release", STATUS_BAD_HANDLE))?;
        self.filled.remove(&buffer.0);
        // Recycle into the origin port's pool.
        if let Some(component) = self.components.get_mut(&origin.0) {
            if let Some(pool) = component.empties.get_mut(&origin.1) {
                *pool += 1;
            }
        }
        self.journal.push(MediaEvent::BufferReleased(buffer));
        Ok(())
    }

    fn buffer_pixels(&self, buffer: BufferHandle) -> Result<&[u8]> {
        self.filled
            .get(&buffer.0)
            .map(Vec::as_slice)
            .ok_or(Error::driver("buffer lookup", STATUS_BAD_HANDLE))
    }
}
