// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use videocore_grafx::backend::{CameraDescriptor, ComponentKind, PortDirection};
use videocore_grafx::virtual_backend::{MediaEvent, MediaJournal, VirtualDisplay, VirtualMedia};
use videocore_grafx::{Error, GrafxSession};

fn open_session() -> (GrafxSession, MediaJournal) {
    let (display, _display_journal) = VirtualDisplay::new(1920, 1080);
    let (media, journal) = VirtualMedia::new();
    let session = GrafxSession::builder()
        .open(Box::new(display), Box::new(media))
        .expect("session open");
    (session, journal)
}

#[test]
fn native_size_keeps_graph_flat() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    session.set_frame_size(1920, 1080)?;

    assert!(!session.is_resize_active());
    assert_eq!(journal.live_components(ComponentKind::Resizer), 0);
    Ok(())
}

#[test]
fn resize_branch_crop_is_unrounded() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    // Neither dimension is on the hardware tiling grid.
    session.set_frame_size(500, 375)?;

    assert!(session.is_resize_active());
    assert_eq!(journal.live_components(ComponentKind::Resizer), 1);

    let output = journal
        .events()
        .iter()
        .rev()
        .find_map(|event| match event {
            MediaEvent::PortConfigured { kind, port, config }
                if *kind == ComponentKind::Resizer && port.direction == PortDirection::Output =>
            {
                Some(*config)
            }
            _ => None,
        })
        .expect("resize output configured");
    assert_eq!(output.width, 512);
    assert_eq!(output.height, 384);
    assert_eq!(output.crop.width, 500);
    assert_eq!(output.crop.height, 375);
    Ok(())
}

#[test]
fn returning_to_native_tears_down_resize_branch() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    session.set_frame_size(640, 480)?;
    assert!(session.is_resize_active());

    session.set_frame_size(1920, 1080)?;
    assert!(!session.is_resize_active());
    assert_eq!(journal.live_components(ComponentKind::Resizer), 0);
    assert!(journal
        .events()
        .iter()
        .any(|event| matches!(event, MediaEvent::ConnectionDestroyed(_))));
    Ok(())
}

#[test]
fn resize_reconfiguration_reuses_the_component() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    session.set_frame_size(640, 480)?;
    session.set_frame_size(320, 240)?;

    // The stale connection is replaced but the component survives.
    assert_eq!(journal.live_components(ComponentKind::Resizer), 1);
    let created = journal
        .events()
        .iter()
        .filter(|event| matches!(event, MediaEvent::ComponentCreated(ComponentKind::Resizer)))
        .count();
    assert_eq!(created, 1);
    Ok(())
}

#[test]
fn full_frame_requests_are_idempotent() -> videocore_grafx::Result<()> {
    let (mut session, _journal) = open_session();

    session.ignite_capture()?;
    let first = session.full_frame()?.as_ptr();
    let second = session.full_frame()?.as_ptr();
    assert_eq!(first, second);

    // In native state the sized frame is the full frame.
    let sized = session.frame()?.as_ptr();
    assert_eq!(first, sized);
    Ok(())
}

#[test]
fn double_ignition_releases_held_frames() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    session.set_frame_size(640, 480)?;
    session.ignite_capture()?;
    let _ = session.frame()?.len();

    let before = journal.releases();
    session.ignite_capture()?;
    // Full-resolution and resized frame go back together.
    assert_eq!(journal.releases(), before + 2);

    session.ignite_capture()?;
    assert_eq!(journal.releases(), before + 2);
    Ok(())
}

#[test]
fn exchange_skips_mid_frame_buffers() -> videocore_grafx::Result<()> {
    let (display, _display_journal) = VirtualDisplay::new(1920, 1080);
    let (mut media, journal) = VirtualMedia::new();
    media.set_partial_delivery(true);
    let mut session = GrafxSession::builder().open(Box::new(display), Box::new(media))?;

    session.ignite_capture()?;
    let frame = session.full_frame()?;
    assert_eq!(frame.len(), 1920 * 1080 * 4);

    // The mid-frame slice was released back to the pool.
    assert_eq!(journal.releases(), 1);
    Ok(())
}

#[test]
fn requested_frame_has_logical_size_despite_rounding() -> videocore_grafx::Result<()> {
    let (mut session, _journal) = open_session();

    session.select_camera(0)?;
    session.set_frame_size(640, 480)?;
    session.ignite_capture()?;

    let frame = session.frame()?;
    assert_eq!(frame.len(), 640 * 480 * 4);
    Ok(())
}

#[test]
fn camera_selection_rederives_native_size() -> videocore_grafx::Result<()> {
    let (display, _display_journal) = VirtualDisplay::new(1920, 1080);
    let (media, journal) = VirtualMedia::with_cameras(vec![
        CameraDescriptor {
            max_width: 1920,
            max_height: 1080,
        },
        CameraDescriptor {
            max_width: 2592,
            max_height: 1944,
        },
    ]);
    let mut session = GrafxSession::builder().open(Box::new(display), Box::new(media))?;

    session.set_frame_size(1920, 1080)?;
    assert!(!session.is_resize_active());

    // The requested size is re-applied against the new native size.
    session.select_camera(1)?;
    assert_eq!(session.frame_full_size(), (2592, 1944));
    assert_eq!(session.frame_size(), (1920, 1080));
    assert!(session.is_resize_active());
    assert!(journal
        .events()
        .iter()
        .any(|event| matches!(event, MediaEvent::CameraSelected(1))));
    Ok(())
}

#[test]
fn out_of_range_camera_is_a_configuration_error() {
    let (mut session, _journal) = open_session();

    let err = session.select_camera(7).unwrap_err();
    assert!(err.is_config());
    assert!(matches!(err, Error::CameraOutOfRange { index: 7, count: 1 }));
}

#[test]
fn no_cameras_fails_session_open() {
    let (display, _display_journal) = VirtualDisplay::new(1920, 1080);
    let (media, _journal) = VirtualMedia::with_cameras(Vec::new());

    let err = GrafxSession::builder()
        .open(Box::new(display), Box::new(media))
        .unwrap_err();
    assert!(matches!(err, Error::NoCameras));
}

#[test]
fn frame_format_is_validated() -> videocore_grafx::Result<()> {
    let (mut session, _journal) = open_session();
    session.set_frame_format(videocore_grafx::PixelFormat::Rgba32)?;
    Ok(())
}
