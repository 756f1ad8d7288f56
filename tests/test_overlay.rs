// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use videocore_grafx::backend::DisplayBackend;
use videocore_grafx::overlay::ElementRegistry;
use videocore_grafx::virtual_backend::{DisplayJournal, VirtualDisplay, VirtualMedia};
use videocore_grafx::{Color, GrafxSession};

fn open_session() -> (GrafxSession, DisplayJournal) {
    let (display, journal) = VirtualDisplay::new(1920, 1080);
    let (media, _media_journal) = VirtualMedia::new();
    let session = GrafxSession::builder()
        .open(Box::new(display), Box::new(media))
        .expect("session open");
    (session, journal)
}

#[test]
fn draw_box_renders_border_and_transparent_interior() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    let element = session.draw_box(10, 10, 100, 50, 5, Color::Red)?;
    session.commit()?;

    let (width, height, pixels) = journal.element_content(element).expect("uploaded content");
    assert_eq!(width, 100);
    assert_eq!(height, 50);
    let red = Color::Red.rgba();
    let clear = Color::Transparent.rgba();
    for y in 0..50usize {
        for x in 0..100usize {
            let expected = if y < 5 || y >= 45 || x < 5 || x >= 95 {
                red
            } else {
                clear
            };
            let at = (y * 100 + x) * 4;
            assert_eq!(
                pixels[at..at + 4],
                expected[..],
                "pixel mismatch at {x},{y}"
            );
        }
    }
    Ok(())
}

#[test]
fn oversized_border_fills_the_box() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    let element = session.draw_box(0, 0, 40, 20, 100, Color::Green)?;

    let (_, _, pixels) = journal.element_content(element).expect("uploaded content");
    let green = Color::Green.rgba();
    for pixel in pixels.chunks_exact(4) {
        assert_eq!(pixel, &green[..]);
    }
    Ok(())
}

#[test]
fn remove_all_issues_one_removal_per_element() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    for n in 0..5 {
        session.draw_box(n * 10, 0, 8, 8, 1, Color::White)?;
    }
    assert_eq!(session.element_count(), 5);

    let removed = session.remove_all_elements()?;
    assert_eq!(removed, 5);
    assert_eq!(journal.removals(), 5);
    assert_eq!(session.element_count(), 0);

    // The registry is reusable after the reset.
    session.draw_box(0, 0, 8, 8, 1, Color::White)?;
    assert_eq!(session.element_count(), 1);
    Ok(())
}

#[test]
fn nothing_is_visible_until_commit() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    let first = session.draw_box(0, 0, 16, 16, 2, Color::Blue)?;
    assert!(journal.visible().is_empty());

    session.commit()?;
    assert_eq!(journal.visible(), vec![first]);

    let second = session.draw_box(32, 0, 16, 16, 2, Color::Cyan)?;
    assert_eq!(journal.visible(), vec![first]);

    session.commit()?;
    assert_eq!(journal.visible(), vec![first, second]);

    session.remove_all_elements()?;
    assert_eq!(journal.visible(), vec![first, second]);

    session.commit()?;
    assert!(journal.visible().is_empty());
    Ok(())
}

#[test]
fn render_image_repacks_unaligned_rows() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    // 3-pixel rows are 12 bytes, well off the 32-byte stride.
    let pixels: Vec<u8> = (0..3 * 2 * 4).map(|byte| byte as u8).collect();
    let element = session.render_image(&pixels, 0, 0, 3, 2)?;

    let (width, height, content) = journal.element_content(element).expect("uploaded content");
    assert_eq!((width, height), (3, 2));
    assert_eq!(content, pixels);
    Ok(())
}

#[test]
fn display_frame_uploads_the_native_frame() -> videocore_grafx::Result<()> {
    let (mut session, journal) = open_session();

    let element = session.display_frame(0, 0, 640, 360)?;
    session.commit()?;

    let (width, height, _content) = journal.element_content(element).expect("uploaded content");
    assert_eq!((width, height), (1920, 1080));
    assert_eq!(session.element_count(), 1);
    assert_eq!(journal.visible(), vec![element]);
    Ok(())
}

#[test]
fn scratch_buffer_grows_monotonically() -> videocore_grafx::Result<()> {
    let (mut display, _journal) = VirtualDisplay::new(800, 600);
    display.open(0)?;
    display.begin_update()?;
    let mut registry = ElementRegistry::new();

    registry.draw_box(&mut display, 0, 0, 64, 64, 2, Color::Blue)?;
    let grown = registry.scratch_capacity();
    assert!(grown >= 64 * 64 * 4);

    registry.draw_box(&mut display, 0, 0, 8, 8, 1, Color::Red)?;
    assert_eq!(registry.scratch_capacity(), grown);

    registry.draw_box(&mut display, 0, 0, 128, 128, 2, Color::White)?;
    assert!(registry.scratch_capacity() >= 128 * 128 * 4);
    Ok(())
}
