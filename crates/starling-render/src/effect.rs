//! The sprite effect: device buffer handles, blend configuration, and the
//! active projection.
//!
//! A [`SpriteEffect`] is the unit of GPU state the rest of the pipeline
//! operates against. Blend state in wgpu is baked into pipelines, so the
//! four presets correspond to four prebuilt pipelines owned by the
//! renderer; switching presets is free but must flush pending geometry
//! first (see [`SpriteRenderer::set_blend_mode`]).
//!
//! [`SpriteRenderer::set_blend_mode`]: crate::SpriteRenderer::set_blend_mode

use glam::Mat4;

use crate::stream::StreamingUploader;

/// Blend presets for sprite rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// No blending — source replaces destination.
    None,

    /// Standard straight-alpha blending.
    ///
    /// Formula: `src.rgb * src.a + dst.rgb * (1 - src.a)`
    #[default]
    Alpha,

    /// Additive blending; the destination alpha is left out of the sum.
    ///
    /// Formula: `src.rgb * src.a + dst.rgb`
    Additive,

    /// Source-over with premultiplied source alpha.
    ///
    /// Formula: `src.rgb + dst.rgb * (1 - src.a)`
    Premultiplied,
}

impl BlendMode {
    /// All presets, in pipeline-table order.
    pub(crate) const ALL: [BlendMode; 4] = [
        BlendMode::None,
        BlendMode::Alpha,
        BlendMode::Additive,
        BlendMode::Premultiplied,
    ];

    /// Convert to a wgpu blend state; `None` disables blending.
    pub fn to_blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::None => None,
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            BlendMode::Premultiplied => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        }
    }

    pub(crate) fn table_index(self) -> usize {
        match self {
            BlendMode::None => 0,
            BlendMode::Alpha => 1,
            BlendMode::Additive => 2,
            BlendMode::Premultiplied => 3,
        }
    }
}

/// Orthographic projection mapping pixel coordinates to clip space:
/// `(0, 0)` is the upper-left corner, `(width, height)` the lower-right.
pub(crate) fn viewport_projection(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width as f32, height as f32, 0.0, -1.0, 1.0)
}

/// GPU state bundle for sprite rendering: the streaming buffer pair, the
/// active blend preset, and the projection for the current viewport.
pub struct SpriteEffect {
    pub(crate) stream: StreamingUploader,
    pub(crate) blend: BlendMode,
    pub(crate) projection: Mat4,
}

impl SpriteEffect {
    pub(crate) fn new(
        device: &wgpu::Device,
        quad_capacity: u32,
        index_format: wgpu::IndexFormat,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            stream: StreamingUploader::new(device, quad_capacity, index_format),
            blend: BlendMode::default(),
            projection: viewport_projection(width, height),
        }
    }

    /// The active blend preset.
    pub fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    /// The active pixel-to-clip projection.
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// The index width the stream was configured with.
    pub fn index_format(&self) -> wgpu::IndexFormat {
        self.stream.index_format()
    }

    /// Stream capacity, in quads per buffer generation.
    pub fn quad_capacity(&self) -> u32 {
        self.stream.quad_capacity()
    }

    /// Current vertex buffer handle. Replaced on orphan.
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        self.stream.vertex_buffer()
    }

    /// Current index buffer handle. Replaced on orphan.
    pub fn index_buffer(&self) -> &wgpu::Buffer {
        self.stream.index_buffer()
    }
}
