// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # VideoCore Capture & Overlay Library
//!
//! A thin convenience layer over the Broadcom VideoCore display compositor
//! (dispmanx) and media framework (MMAL) on Raspberry Pi class boards.
//! Applications capture camera frames and composite boxes, images, and
//! live frames onto the screen without driving the vendor APIs directly.
//!
//! ## Features
//!
//! - **Capture graph management**: a camera→resize pipeline that is
//!   reconfigured on demand; the resize stage exists exactly while the
//!   requested frame size differs from the camera's native size.
//! - **Frame caching**: at most one full-resolution and one resized frame
//!   are held per capture ignition and served zero-copy.
//! - **Overlay compositing**: boxes and RGBA32 images are uploaded as
//!   compositor elements, batched, and committed atomically.
//! - **Pluggable backends**: the vendor stack behind two narrow traits,
//!   with in-memory virtual backends for tests and off-target development.
//!
//! ## Example
//!
//! ```
//! use videocore_grafx::virtual_backend::{VirtualDisplay, VirtualMedia};
//! use videocore_grafx::GrafxSession;
//!
//! # fn main() -> videocore_grafx::Result<()> {
//! let (display, _display_journal) = VirtualDisplay::new(1280, 720);
//! let (media, _media_journal) = VirtualMedia::new();
//! let mut session = GrafxSession::builder().open(Box::new(display), Box::new(media))?;
//!
//! session.set_frame_size(640, 360)?;
//! session.ignite_capture()?;
//! let frame = session.frame()?;
//! assert_eq!(frame.len(), 640 * 360 * 4);
//! # Ok(())
//! # }
//! ```
//!
//! On a Raspberry Pi, build with the `videocore` feature (default) and use
//! [`SessionBuilder::open_videocore`] instead.
//!
//! ## Concurrency
//!
//! The session is single-threaded, synchronous, and blocking.  The
//! wait-for-frame step blocks the calling thread with no timeout.  A
//! session is one owned value; there are no process-wide singletons.
//!
//! ## Safety
//!
//! All unsafe FFI is confined to the `videocore` module and the
//! `videocore-sys` crate.  The core, the virtual backends, and the public
//! API are safe Rust.

pub mod backend;
pub mod capture;
pub mod error;
pub mod overlay;
pub mod pixel;
pub mod session;
#[cfg(feature = "videocore")]
pub mod videocore;
pub mod virtual_backend;

pub use error::{Error, FailureMode, Result};
pub use pixel::{Color, PixelFormat, Rect};
pub use session::{GrafxSession, SessionBuilder};
