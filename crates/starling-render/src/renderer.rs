//! Batched sprite renderer over the streaming draw pipeline.
//!
//! [`SpriteRenderer`] owns the CPU batch, the streaming buffer pair, and
//! one prebuilt pipeline per blend preset. The frame loop is:
//!
//! 1. [`add`](SpriteRenderer::add) sprites to the batch,
//! 2. [`begin`](SpriteRenderer::begin) once the render pass is open,
//! 3. [`flush`](SpriteRenderer::flush) (or
//!    [`flush_sorted`](SpriteRenderer::flush_sorted)) to stream and draw
//!    everything batched so far.
//!
//! Switching blend modes mid-frame goes through
//! [`set_blend_mode`](SpriteRenderer::set_blend_mode), which flushes
//! pending sprites first so they draw with the preset they were added
//! under.

use std::sync::Arc;

use crate::batch::{SpriteBatch, SpriteSort};
use crate::coalesce::{self, FlushStats, StreamTarget};
use crate::context::GraphicsContext;
use crate::effect::{BlendMode, SpriteEffect, viewport_projection};
use crate::quad::{Quad, SpriteVertex};
use crate::sprite::SpriteDescriptor;
use crate::stream::{Acquired, StreamingUploader};

/// Per-state hook invoked during a flush.
///
/// `apply_state` runs once per coalesced run and binds whatever the render
/// state id stands for; for plain textured sprites that is
/// [`TextureBindings`](crate::TextureBindings) binding a texture group.
pub trait SpriteEffectApply {
    /// One-time pass setup beyond what [`SpriteRenderer::begin`] binds.
    fn setup_effect(&self, _pass: &mut wgpu::RenderPass<'_>) {}

    /// Bind the GPU state identified by `render_state`.
    fn apply_state(&self, render_state: u32, pass: &mut wgpu::RenderPass<'_>);
}

/// Configuration for [`SpriteRenderer::new`].
#[derive(Debug, Clone)]
pub struct SpriteRendererDescriptor {
    /// Stream capacity in quads per buffer generation.
    pub quad_capacity: u32,
    /// Initial CPU batch capacity, in sprites.
    pub batch_capacity: usize,
    /// Color target format the pipelines render to.
    pub format: wgpu::TextureFormat,
    /// Index width; `None` picks the narrowest format the capacity fits in.
    pub index_format: Option<wgpu::IndexFormat>,
}

impl SpriteRendererDescriptor {
    pub fn new(format: wgpu::TextureFormat) -> Self {
        Self {
            quad_capacity: 2048,
            batch_capacity: 0,
            format,
            index_format: None,
        }
    }

    fn resolve_index_format(&self) -> wgpu::IndexFormat {
        self.index_format.unwrap_or({
            // Uint16 addresses 65536 vertices, i.e. 16384 quads.
            if self.quad_capacity <= 16384 {
                wgpu::IndexFormat::Uint16
            } else {
                wgpu::IndexFormat::Uint32
            }
        })
    }
}

/// Streams batched sprites into bounded device buffers and draws them with
/// coalesced indexed draw calls.
pub struct SpriteRenderer {
    context: Arc<GraphicsContext>,
    pipelines: [wgpu::RenderPipeline; 4],
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    projection_buffer: wgpu::Buffer,
    projection_bind_group: wgpu::BindGroup,
    batch: SpriteBatch,
    effect: SpriteEffect,
}

impl SpriteRenderer {
    pub fn new(context: Arc<GraphicsContext>, descriptor: &SpriteRendererDescriptor) -> Self {
        let device = &context.device;
        let index_format = descriptor.resolve_index_format();

        let shader = device.create_shader_module(wgpu::include_wgsl!("shaders/sprite.wgsl"));

        let projection_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("sprite_projection_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite_texture_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[&projection_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Unorm8x4,
                    offset: 16,
                    shader_location: 1,
                },
            ],
        };

        // One pipeline per blend preset; switching presets is a pipeline
        // swap, never a pipeline build.
        let pipelines = BlendMode::ALL.map(|mode| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("sprite_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[vertex_layout.clone()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: descriptor.format,
                        blend: mode.to_blend_state(),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });

        let projection_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprite_projection"),
            size: std::mem::size_of::<glam::Mat4>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let projection_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite_projection_bind_group"),
            layout: &projection_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: projection_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let effect = SpriteEffect::new(device, descriptor.quad_capacity, index_format, 1, 1);

        tracing::debug!(
            quad_capacity = descriptor.quad_capacity,
            ?index_format,
            format = ?descriptor.format,
            "created sprite renderer"
        );

        Self {
            context,
            pipelines,
            texture_layout,
            sampler,
            projection_buffer,
            projection_bind_group,
            batch: SpriteBatch::with_capacity(descriptor.batch_capacity),
            effect,
        }
    }

    /// The effect state: buffers, blend preset, projection.
    pub fn effect(&self) -> &SpriteEffect {
        &self.effect
    }

    /// Sprites batched and not yet flushed.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Set the viewport the projection maps pixel coordinates into.
    ///
    /// Must be called at least once before drawing; the uniform upload
    /// takes effect with the next queue submission.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.effect.projection = viewport_projection(width, height);
        self.context.queue.write_buffer(
            &self.projection_buffer,
            0,
            bytemuck::bytes_of(&self.effect.projection),
        );
    }

    /// Batch one sprite for the next flush.
    pub fn add(&mut self, sprite: SpriteDescriptor) {
        self.batch.push(sprite);
    }

    /// Bind everything the flush path draws with: the pipeline for the
    /// active blend preset, the projection, the stream buffers, and any
    /// one-time state of `apply`. Call once per render pass before
    /// flushing into it.
    pub fn begin(&self, pass: &mut wgpu::RenderPass<'_>, apply: &impl SpriteEffectApply) {
        pass.set_pipeline(&self.pipelines[self.effect.blend.table_index()]);
        pass.set_bind_group(0, &self.projection_bind_group, &[]);
        pass.set_vertex_buffer(0, self.effect.stream.vertex_buffer().slice(..));
        pass.set_index_buffer(
            self.effect.stream.index_buffer().slice(..),
            self.effect.stream.index_format(),
        );
        apply.setup_effect(pass);
    }

    /// Switch the blend preset, flushing pending sprites first so they
    /// keep the preset they were added under. A no-op when `mode` is
    /// already active.
    pub fn set_blend_mode(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        apply: &impl SpriteEffectApply,
        mode: BlendMode,
    ) -> FlushStats {
        let mut blend = self.effect.blend;
        let flushed = switch_blend(&mut blend, mode, |_| self.flush(pass, apply));
        self.effect.blend = blend;
        match flushed {
            Some(stats) => {
                pass.set_pipeline(&self.pipelines[mode.table_index()]);
                stats
            }
            None => FlushStats::default(),
        }
    }

    /// Stream and draw every batched sprite in submission order.
    pub fn flush(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        apply: &impl SpriteEffectApply,
    ) -> FlushStats {
        self.flush_inner(pass, apply, None)
    }

    /// Sort the batch, then stream and draw it. Sorting is explicit:
    /// submission order is the default and is never reordered behind the
    /// caller's back.
    pub fn flush_sorted(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        apply: &impl SpriteEffectApply,
        sort: SpriteSort,
    ) -> FlushStats {
        self.flush_inner(pass, apply, Some(sort))
    }

    fn flush_inner(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        apply: &impl SpriteEffectApply,
        sort: Option<SpriteSort>,
    ) -> FlushStats {
        self.batch.generate_quads();
        if let Some(sort) = sort {
            self.batch.sort(sort);
        }

        let mut cursor = self.effect.stream.cursor.clone();
        let mut target = GpuStreamTarget {
            device: &self.context.device,
            queue: &self.context.queue,
            stream: &mut self.effect.stream,
            pass,
            apply,
            quads: self.batch.quads(),
            order: self.batch.order(),
        };
        let stats = coalesce::drain(&mut cursor, self.batch.keys(), self.batch.order(), &mut target);
        self.effect.stream.cursor = cursor;
        self.batch.clear();

        tracing::trace!(
            sprites = stats.sprites,
            draw_calls = stats.draw_calls,
            state_changes = stats.state_changes,
            orphans = stats.orphans,
            "sprite flush"
        );
        stats
    }

    /// Build a bind group for a texture view, matching the pipelines'
    /// texture layout.
    pub(crate) fn create_texture_bind_group(
        &self,
        device: &wgpu::Device,
        view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite_texture_bind_group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

/// Sequencing for a blend switch, separated from the GPU plumbing.
///
/// A request for the already-active preset does nothing — in particular
/// it must not flush, since callers restate the current mode freely. A
/// real switch drains pending geometry first, while the old preset is
/// still active, and only then records the new one; switching with
/// sprites still buffered would otherwise apply the new blend state
/// retroactively to geometry added under the old one.
fn switch_blend(
    current: &mut BlendMode,
    requested: BlendMode,
    flush_pending: impl FnOnce(BlendMode) -> FlushStats,
) -> Option<FlushStats> {
    if requested == *current {
        return None;
    }
    let stats = flush_pending(*current);
    *current = requested;
    Some(stats)
}

/// Adapter from the flush protocol to a live render pass. Orphaning swaps
/// in fresh buffers and rebinds them; draws recorded before the swap keep
/// the old pair alive until the pass completes.
struct GpuStreamTarget<'a, 'p, A: SpriteEffectApply> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    stream: &'a mut StreamingUploader,
    pass: &'a mut wgpu::RenderPass<'p>,
    apply: &'a A,
    quads: &'a [Quad],
    order: &'a [u32],
}

impl<A: SpriteEffectApply> StreamTarget for GpuStreamTarget<'_, '_, A> {
    fn orphan(&mut self) {
        self.stream.orphan(self.device);
        self.pass
            .set_vertex_buffer(0, self.stream.vertex_buffer().slice(..));
        self.pass.set_index_buffer(
            self.stream.index_buffer().slice(..),
            self.stream.index_format(),
        );
    }

    fn upload(&mut self, quad_offset: usize, range: Acquired) {
        self.stream
            .upload(self.queue, self.quads, self.order, quad_offset, range);
    }

    fn draw(&mut self, first_index: u32, index_count: u32) {
        self.pass
            .draw_indexed(first_index..first_index + index_count, 0, 0..1);
    }

    fn apply_state(&mut self, render_state: u32) {
        self.apply.apply_state(render_state, self.pass);
    }
}
