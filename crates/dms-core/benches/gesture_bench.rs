//! Criterion benchmarks for the gesture hot path.
//!
//! Every pointer MOVE during a drag runs hot-zone classification once at
//! gesture start and the solver once per frame, so both need to stay well
//! well inside one frame.
//!
//! Run with:
//! ```bash
//! cargo bench --package dms-core --bench gesture_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dms_core::domain::geometry::{Decoration, Point, Rect, WindowLimits};
use dms_core::domain::pointer::SourceType;
use dms_core::gesture::area::{AreaType, HotZoneConfig};
use dms_core::gesture::solver::{GestureSession, MoveDragProperty};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn property(original: Rect, origin: Point) -> MoveDragProperty {
    MoveDragProperty::latch(
        0,
        SourceType::TouchScreen,
        origin,
        Point::new(origin.x - original.pos_x, origin.y - original.pos_y),
        original,
    )
}

fn drag_session(area: AreaType, aspect_ratio: f32) -> GestureSession {
    let original = Rect::new(100, 100, 1280, 720);
    GestureSession::for_drag(
        property(original, Point::new(original.right(), original.bottom())),
        area,
        aspect_ratio,
        WindowLimits::with_size(320, 240, 3840, 2160),
        Some(Decoration {
            left: 0.0,
            top: 37.0,
            right: 0.0,
            bottom: 0.0,
        }),
        1.5,
    )
}

// ── Benchmarks: classify ──────────────────────────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let cfg = HotZoneConfig::default();
    let mut group = c.benchmark_group("classify");

    group.bench_function("center_miss", |b| {
        b.iter(|| cfg.classify(black_box(Point::new(640, 360)), 1280, 720, SourceType::Mouse, 1.5))
    });

    group.bench_function("corner_hit", |b| {
        b.iter(|| cfg.classify(black_box(Point::new(1280, 720)), 1280, 720, SourceType::TouchScreen, 1.5))
    });

    group.finish();
}

// ── Benchmarks: drag_target ───────────────────────────────────────────────────

fn bench_drag_target(c: &mut Criterion) {
    let mut group = c.benchmark_group("drag_target");

    for &(name, ratio) in &[("freeform", 0.0f32), ("fixed_ratio", 16.0 / 9.0)] {
        group.bench_with_input(BenchmarkId::new("right_bottom", name), &ratio, |b, &ratio| {
            let mut session = drag_session(AreaType::RightBottom, ratio);
            let mut step = 0;
            b.iter(|| {
                step = (step + 7) % 400;
                session.drag_target(black_box(Point::new(1380 + step, 820 + step / 2)))
            })
        });
    }

    group.finish();
}

fn bench_move_target(c: &mut Criterion) {
    let mut session = GestureSession::for_move(property(Rect::new(0, 0, 800, 600), Point::new(400, 20)));
    c.bench_function("move_target", |b| {
        b.iter(|| session.move_target(black_box(Point::new(900, 340))))
    });
}

criterion_group!(benches, bench_classify, bench_drag_target, bench_move_target);
criterion_main!(benches);
