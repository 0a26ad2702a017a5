//! Criterion benchmarks for full simulation ticks.
//!
//! Run with: cargo bench --bench tick_bench

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use cellcity::{
    engine::{Region, RunSettings},
    grid::CellType,
    layout::Layout,
    systems::{diffuse, flood_fill},
    Grid,
};

/// Blocks of zones separated by power line roads, with plants at the corners.
fn city_layout(size: usize) -> Layout {
    let rows = (0..size)
        .map(|y| {
            (0..size)
                .map(|x| {
                    if (x == 0 || x == size - 1) && (y == 0 || y == size - 1) {
                        CellType::PowerPlant
                    } else if x % 4 == 0 || y % 4 == 0 {
                        CellType::PowerlineRoad
                    } else {
                        match (x / 4 + y / 4) % 3 {
                            0 => CellType::Residential,
                            1 => CellType::Commercial,
                            _ => CellType::Industrial,
                        }
                    }
                })
                .collect()
        })
        .collect();
    Layout::from_rows(rows).expect("generated layout is valid")
}

fn bench_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_tick");
    for size in [16usize, 64, 128] {
        let layout = city_layout(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &layout, |b, layout| {
            b.iter_batched(
                || Region::new(layout, RunSettings::new(1_000, 1).expect("settings")),
                |mut region| {
                    for _ in 0..5 {
                        black_box(region.tick().expect("tick"));
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("phases");
    let layout = city_layout(128);
    let mut region = Region::new(&layout, RunSettings::new(1_000, 1).expect("settings"));
    for _ in 0..10 {
        region.tick().expect("tick");
    }
    let grid: &Grid = region.grid();

    group.bench_function("flood_fill_128", |b| {
        b.iter(|| black_box(flood_fill(black_box(grid))));
    });
    group.bench_function("diffuse_128", |b| {
        b.iter(|| black_box(diffuse(black_box(grid))));
    });
    group.finish();
}

criterion_group!(benches, bench_full_tick, bench_phases);
criterion_main!(benches);
