//! Sprite textures and their bind groups.
//!
//! Every [`SpriteTexture`] carries a process-unique render state id. Sprites
//! referencing the same texture share the id, which is what lets the flush
//! path coalesce them into a single draw. [`TextureBindings`] maps those ids
//! back to bind groups at draw time.

use std::sync::atomic::{AtomicU32, Ordering};

use ahash::AHashMap;

use crate::context::GraphicsContext;
use crate::renderer::{SpriteEffectApply, SpriteRenderer};

static NEXT_RENDER_STATE: AtomicU32 = AtomicU32::new(0);

/// A texture sampled by sprites, plus the render state id that identifies it.
#[derive(Debug)]
pub struct SpriteTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    render_state: u32,
}

impl SpriteTexture {
    /// Create a sprite texture from raw RGBA8 pixel data.
    pub fn from_data(context: &GraphicsContext, data: &[u8], width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sprite_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            render_state: NEXT_RENDER_STATE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The render state id sprites of this texture are tagged with.
    pub fn render_state(&self) -> u32 {
        self.render_state
    }

    /// Texture width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Texture height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The texture view for binding.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// The underlying texture.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

/// Maps render state ids to texture bind groups.
///
/// Register every texture a batch may reference, then pass the bindings to
/// the renderer's flush so state changes bind the right texture.
#[derive(Default)]
pub struct TextureBindings {
    bind_groups: AHashMap<u32, wgpu::BindGroup>,
}

impl TextureBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a bind group for the texture's render state id.
    pub fn register(
        &mut self,
        context: &GraphicsContext,
        renderer: &SpriteRenderer,
        texture: &SpriteTexture,
    ) {
        let bind_group = renderer.create_texture_bind_group(&context.device, texture.view());
        self.bind_groups.insert(texture.render_state(), bind_group);
    }

    /// Number of registered textures.
    pub fn len(&self) -> usize {
        self.bind_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bind_groups.is_empty()
    }
}

impl SpriteEffectApply for TextureBindings {
    fn apply_state(&self, render_state: u32, pass: &mut wgpu::RenderPass<'_>) {
        match self.bind_groups.get(&render_state) {
            Some(bind_group) => pass.set_bind_group(1, bind_group, &[]),
            None => tracing::warn!(render_state, "no texture registered for render state"),
        }
    }
}
