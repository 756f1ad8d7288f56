// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use std::time::{Duration, Instant};
use tracing::Level;
use videocore_grafx::virtual_backend::{VirtualDisplay, VirtualMedia};
use videocore_grafx::{Color, FailureMode, GrafxSession, SessionBuilder};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// camera number
    #[arg(short, long, default_value_t = 0)]
    camera: usize,

    /// display number
    #[arg(short, long, default_value_t = 0, env = "GRAFX_DISPLAY")]
    display: u32,

    /// requested frame resolution
    #[arg(long, default_value = "640 480", value_delimiter = ' ', num_args = 2)]
    frame_size: Vec<u32>,

    /// number of frames to capture
    #[arg(short = 'n', long, default_value_t = 10)]
    frames: u32,

    /// run against the in-memory virtual backends
    #[arg(long)]
    virtual_backends: bool,

    /// terminate on the first driver error like the legacy stack
    #[arg(long)]
    abort_on_error: bool,

    /// verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[cfg(feature = "videocore")]
fn open_hardware(builder: SessionBuilder) -> videocore_grafx::Result<GrafxSession> {
    builder.open_videocore()
}

#[cfg(not(feature = "videocore"))]
fn open_hardware(_builder: SessionBuilder) -> videocore_grafx::Result<GrafxSession> {
    Err(videocore_grafx::Error::driver("open_videocore", -1))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("VideoCore Capture & Overlay Demo");

    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    let failure = if args.abort_on_error {
        FailureMode::Abort
    } else {
        FailureMode::Propagate
    };
    let builder = GrafxSession::builder()
        .with_display(args.display)
        .with_failure_mode(failure);

    let mut session = if args.virtual_backends {
        let (display, _display_journal) = VirtualDisplay::new(1920, 1080);
        let (media, _media_journal) = VirtualMedia::new();
        builder.open(Box::new(display), Box::new(media))?
    } else {
        open_hardware(builder)?
    };

    let (screen_width, screen_height) = session.screen_size();
    println!(
        "screen {}x{}, {} camera(s)",
        screen_width,
        screen_height,
        session.cameras().len()
    );

    session.select_camera(args.camera)?;
    let (full_width, full_height) = session.frame_full_size();
    session.set_frame_size(args.frame_size[0], args.frame_size[1])?;
    println!(
        "camera {}: native {}x{}, frame {}x{}",
        args.camera, full_width, full_height, args.frame_size[0], args.frame_size[1]
    );

    // Frame the capture region with a box and put the live frame inside it.
    session.draw_box(
        8,
        8,
        args.frame_size[0] + 16,
        args.frame_size[1] + 16,
        4,
        Color::Red,
    )?;
    session.display_frame(16, 16, args.frame_size[0], args.frame_size[1])?;
    session.commit()?;

    let mut total = Duration::ZERO;
    for n in 0..args.frames {
        session.ignite_capture()?;
        let now = Instant::now();
        let frame = session.frame()?;
        let elapsed = now.elapsed();
        total += elapsed;
        if args.verbose {
            println!("frame {}: {} bytes in {:?}", n, frame.len(), elapsed);
        }
    }
    if args.frames > 0 {
        println!(
            "captured {} frame(s), average {:?}",
            args.frames,
            total / args.frames
        );
    }

    session.remove_all_elements()?;
    session.commit()?;
    session.close()?;
    Ok(())
}
