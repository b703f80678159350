//! Headless sprite-streaming demo.
//!
//! Renders a flock of rotating sprites into an offscreen target for a few
//! frames, alternating between two textures and switching blend modes
//! mid-frame, then logs the flush counters. The stream is deliberately
//! smaller than the flock so every frame exercises the orphan path.
//!
//! Run with: `cargo run -p starling-render --example flock`

use std::sync::Arc;

use glam::{Vec2, vec2};
use starling_core::{Color, logging};
use starling_render::{
    BlendMode, GraphicsContext, SpriteDescriptor, SpriteRenderer, SpriteRendererDescriptor,
    SpriteTexture, TextureBindings,
};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const SPRITES: usize = 5000;
const FRAMES: u32 = 8;

fn checkerboard(size: u32, a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let cell = ((x / 8) + (y / 8)) % 2 == 0;
            data.extend_from_slice(if cell { &a } else { &b });
        }
    }
    data
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let context = GraphicsContext::new_sync()?;

    let target = context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("flock_target"),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let mut renderer = SpriteRenderer::new(
        Arc::clone(&context),
        &SpriteRendererDescriptor {
            // Smaller than the flock so frames span several buffer
            // generations.
            quad_capacity: 1024,
            batch_capacity: SPRITES,
            ..SpriteRendererDescriptor::new(TARGET_FORMAT)
        },
    );
    renderer.set_viewport(WIDTH, HEIGHT);

    let bird = SpriteTexture::from_data(
        &context,
        &checkerboard(32, [240, 200, 80, 255], [60, 40, 20, 255]),
        32,
        32,
    );
    let spark = SpriteTexture::from_data(
        &context,
        &checkerboard(32, [120, 200, 255, 255], [20, 40, 90, 255]),
        32,
        32,
    );

    let mut bindings = TextureBindings::new();
    bindings.register(&context, &renderer, &bird);
    bindings.register(&context, &renderer, &spark);

    for frame in 0..FRAMES {
        let t = frame as f32 * 0.05;

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("flock_frame"),
            });
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("flock_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.05,
                        g: 0.06,
                        b: 0.1,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        renderer.set_blend_mode(&mut pass, &bindings, BlendMode::Alpha);
        renderer.begin(&mut pass, &bindings);

        for i in 0..SPRITES {
            let phase = i as f32 * 0.37 + t;
            let position = vec2(
                (WIDTH as f32 / 2.0) + phase.cos() * (i % 280) as f32,
                (HEIGHT as f32 / 2.0) + phase.sin() * (i % 200) as f32,
            );
            let texture = if i % 2 == 0 { &bird } else { &spark };
            renderer.add(
                SpriteDescriptor::new(texture, position)
                    .rotation(phase, vec2(16.0, 16.0))
                    .scale(Vec2::splat(0.5 + (i % 5) as f32 * 0.25))
                    .tint(Color::rgba(1.0, 1.0, 1.0, 0.8)),
            );
        }
        let body = renderer.flush(&mut pass, &bindings);

        // A second additive layer on top, restating the flush-first rule
        // on blend switches.
        let glow = renderer.set_blend_mode(&mut pass, &bindings, BlendMode::Additive);
        for i in 0..SPRITES / 10 {
            let phase = i as f32 * 1.3 + t;
            renderer.add(
                SpriteDescriptor::new(
                    &spark,
                    vec2(
                        (WIDTH as f32 / 2.0) + phase.cos() * 150.0,
                        (HEIGHT as f32 / 2.0) + phase.sin() * 150.0,
                    ),
                )
                .tint(Color::rgba(0.6, 0.8, 1.0, 1.0)),
            );
        }
        let overlay = renderer.flush(&mut pass, &bindings);
        drop(pass);

        context.queue.submit([encoder.finish()]);

        tracing::info!(
            frame,
            body_sprites = body.sprites,
            body_draws = body.draw_calls,
            body_orphans = body.orphans,
            glow_draws = glow.draw_calls,
            overlay_draws = overlay.draw_calls,
            "frame flushed"
        );
    }

    let _ = context.device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: None,
    });
    tracing::info!("done");
    Ok(())
}
