// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use criterion::{criterion_group, criterion_main, Criterion};
use videocore_grafx::virtual_backend::{VirtualDisplay, VirtualMedia};
use videocore_grafx::{Color, GrafxSession};

pub fn benchmark_draw_box(c: &mut Criterion) {
    let dims = [(64u32, 64u32), (256, 128), (512, 512), (1920, 1080)];
    let (display, display_journal) = VirtualDisplay::new(1920, 1080);
    let (media, _media_journal) = VirtualMedia::new();
    let mut session = GrafxSession::builder()
        .open(Box::new(display), Box::new(media))
        .unwrap();

    let mut group = c.benchmark_group("draw_box");
    for dim in dims.iter() {
        group.bench_with_input(format!("{}x{}", dim.0, dim.1), dim, |b, &(width, height)| {
            b.iter(|| {
                session.draw_box(0, 0, width, height, 4, Color::Red).unwrap();
                session.remove_all_elements().unwrap();
                session.commit().unwrap();
                // Keep the journal from accumulating across iterations.
                display_journal.clear();
            })
        });
    }
}

criterion_group!(benches, benchmark_draw_box);
criterion_main!(benches);
