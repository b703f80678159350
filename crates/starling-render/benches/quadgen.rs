//! Benchmarks for the CPU side of the sprite pipeline: descriptor-to-quad
//! expansion and indirect sorting.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::vec2;
use starling_core::Color;
use starling_render::batch::{SpriteBatch, SpriteSort};
use starling_render::sprite::{SourceRect, SpriteDescriptor};

fn sprite(i: usize) -> SpriteDescriptor {
    SpriteDescriptor {
        position: vec2((i % 800) as f32, (i % 600) as f32),
        origin: vec2(16.0, 16.0),
        scale: vec2(1.0, 1.0),
        rotation: i as f32 * 0.01,
        tint: Color::WHITE,
        source: SourceRect::new(0, 0, 32, 32),
        texture_width: 256,
        texture_height: 256,
        layer_depth: (i % 16) as u32,
        render_state: (i % 7) as u32,
    }
}

fn bench_quad_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("quad_generation");

    for count in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut batch = SpriteBatch::with_capacity(count);
            b.iter(|| {
                batch.clear();
                for i in 0..count {
                    batch.push(sprite(i));
                }
                batch.generate_quads();
                black_box(batch.len())
            });
        });
    }

    group.finish();
}

fn bench_sorting(c: &mut Criterion) {
    let mut group = c.benchmark_group("sprite_sorting");
    const COUNT: usize = 10_000;
    group.throughput(Throughput::Elements(COUNT as u64));

    for (name, sort) in [
        ("back_to_front", SpriteSort::BackToFront),
        ("front_to_back", SpriteSort::FrontToBack),
        ("by_render_state", SpriteSort::ByRenderState),
    ] {
        group.bench_function(name, |b| {
            let mut batch = SpriteBatch::with_capacity(COUNT);
            for i in 0..COUNT {
                batch.push(sprite(i));
            }
            b.iter(|| {
                batch.generate_quads();
                batch.sort(black_box(sort));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_quad_generation, bench_sorting);
criterion_main!(benches);
