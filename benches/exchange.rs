// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use criterion::{criterion_group, criterion_main, Criterion};
use videocore_grafx::virtual_backend::{VirtualDisplay, VirtualMedia};
use videocore_grafx::GrafxSession;

pub fn benchmark_frame_exchange(c: &mut Criterion) {
    let dims = [(320u32, 240u32), (640, 480), (1280, 720)];
    let mut group = c.benchmark_group("frame");
    for dim in dims.iter() {
        let (display, _display_journal) = VirtualDisplay::new(1920, 1080);
        let (media, media_journal) = VirtualMedia::new();
        let mut session = GrafxSession::builder()
            .open(Box::new(display), Box::new(media))
            .unwrap();
        session.set_frame_size(dim.0, dim.1).unwrap();

        group.bench_with_input(format!("{}x{}", dim.0, dim.1), dim, |b, _| {
            b.iter(|| {
                session.ignite_capture().unwrap();
                let length = session.frame().unwrap().len();
                media_journal.clear();
                length
            })
        });
    }
}

criterion_group!(benches, benchmark_frame_exchange);
criterion_main!(benches);
