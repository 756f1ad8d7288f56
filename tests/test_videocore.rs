// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

#![cfg(feature = "videocore")]

use serial_test::serial;
use videocore_grafx::{Color, GrafxSession};

/// End-to-end smoke test against the real VideoCore stack.  Needs a
/// Raspberry Pi with a camera attached, so it stays out of the default run.
#[test]
#[serial]
#[ignore = "requires a Raspberry Pi with the VideoCore stack (run with --include-ignored)"]
fn videocore_smoke() -> videocore_grafx::Result<()> {
    let mut session = GrafxSession::builder().open_videocore()?;

    let (width, height) = session.screen_size();
    assert!(width > 0 && height > 0);
    assert!(!session.cameras().is_empty());

    session.select_camera(0)?;
    session.set_frame_size(640, 480)?;
    session.ignite_capture()?;
    let frame = session.frame()?;
    assert_eq!(frame.len(), 640 * 480 * 4);

    session.draw_box(10, 10, 200, 100, 4, Color::Green)?;
    session.display_frame(16, 128, 320, 240)?;
    session.commit()?;

    session.remove_all_elements()?;
    session.commit()?;
    session.close()
}
