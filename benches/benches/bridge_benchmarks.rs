//! Bridge Benchmarks
//!
//! Measures the cost of the handle protocol: a parameter round trip
//! allocates, checks and releases several data handles, and density
//! extraction copies the whole voxel field out of the engine.

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stir_bridge::{Bridge, EllipsoidalCylinder, Image, Shape};
use stir_engine::MemoryEngine;

fn bridge() -> Bridge {
    Bridge::without_sinks(Rc::new(MemoryEngine::new()))
}

// ============================================================================
// Parameter Benchmarks
// ============================================================================

fn bench_parameter_round_trip(c: &mut Criterion) {
    let bridge = bridge();
    let shape = EllipsoidalCylinder::new(&bridge).expect("create shape");

    let mut group = c.benchmark_group("parameters");
    group.bench_function("float_set_get", |b| {
        b.iter(|| {
            shape.set_radius_x(black_box(4.0)).expect("set");
            black_box(shape.radius_x().expect("get"))
        })
    });
    group.bench_function("origin_set_get", |b| {
        b.iter(|| {
            shape.set_origin(black_box([1.0, 2.0, 3.0])).expect("set");
            black_box(shape.origin().expect("get"))
        })
    });
    group.finish();
}

// ============================================================================
// Image Benchmarks
// ============================================================================

fn bench_density_extraction(c: &mut Criterion) {
    let bridge = bridge();
    let mut group = c.benchmark_group("density");

    for n in [16, 64, 128] {
        let mut image = Image::new(&bridge);
        image.initialise((n, n, 16)).expect("initialise");
        image.fill(1.0).expect("fill");

        group.throughput(Throughput::Elements((n * n * 16) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &image, |b, image| {
            b.iter(|| black_box(image.density().expect("density")))
        });
    }

    group.finish();
}

fn bench_add_shape(c: &mut Criterion) {
    let bridge = bridge();
    let shape = EllipsoidalCylinder::new(&bridge).expect("create shape");
    shape.set_length(100.0).expect("length");
    shape.set_radii((20.0, 20.0)).expect("radii");

    let mut image = Image::new(&bridge);
    image.initialise((128, 128, 16)).expect("initialise");

    c.bench_function("add_shape_128x128x16", |b| {
        b.iter(|| image.add_shape(black_box(&shape), 1.0).expect("add shape"))
    });
}

criterion_group!(benches, bench_parameter_round_trip, bench_density_extraction, bench_add_shape);
criterion_main!(benches);
