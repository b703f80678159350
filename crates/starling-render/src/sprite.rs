//! Sprite draw descriptors.
//!
//! A [`SpriteDescriptor`] describes one sprite for one frame: where it goes
//! on screen, which rectangle of its texture it samples, and how it is
//! tinted, rotated and scaled. Descriptors are plain values — the
//! application builds them each frame and hands them to
//! [`SpriteRenderer::add`](crate::SpriteRenderer::add), which copies them
//! into the batch. Nothing here touches the GPU.

use glam::Vec2;
use starling_core::Color;

use crate::texture::SpriteTexture;

/// A rectangle in texture pixels: upper-left corner plus extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Everything needed to draw one sprite.
///
/// The hot path performs no validation: `texture_width` and
/// `texture_height` are used as UV divisors and must be non-zero, and the
/// `source` rectangle is trusted to lie within the texture. Supplying a
/// zero-sized texture produces NaN/infinite UVs rather than an error.
///
/// `render_state` is an opaque batching key; sprites that are adjacent in
/// draw order and share it are drawn with a single draw call. In practice
/// it is the texture identity (see
/// [`SpriteTexture::render_state`](crate::SpriteTexture::render_state)).
#[derive(Debug, Clone, Copy)]
pub struct SpriteDescriptor {
    /// Screen-space position of the sprite's origin, in pixels.
    pub position: Vec2,
    /// Rotation pivot, as an offset in source pixels from the upper-left
    /// corner of the sprite.
    pub origin: Vec2,
    /// Scale factors applied to the source rectangle's extent.
    pub scale: Vec2,
    /// Clockwise rotation about the origin, in radians.
    pub rotation: f32,
    /// Tint multiplied with the texture sample.
    pub tint: Color,
    /// Source rectangle in texture pixels.
    pub source: SourceRect,
    /// Width of the owning texture, in pixels. UV divisor; must be non-zero.
    pub texture_width: u32,
    /// Height of the owning texture, in pixels. UV divisor; must be non-zero.
    pub texture_height: u32,
    /// Layer depth, increasing into the background.
    pub layer_depth: u32,
    /// Opaque batching key, typically the texture identity.
    pub render_state: u32,
}

impl SpriteDescriptor {
    /// Describe the full extent of `texture` drawn at `position`.
    pub fn new(texture: &SpriteTexture, position: Vec2) -> Self {
        Self {
            position,
            origin: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            tint: Color::WHITE,
            source: SourceRect::new(0, 0, texture.width(), texture.height()),
            texture_width: texture.width(),
            texture_height: texture.height(),
            layer_depth: 0,
            render_state: texture.render_state(),
        }
    }

    /// Restrict sampling to a sub-rectangle of the texture.
    pub fn source(mut self, source: SourceRect) -> Self {
        self.source = source;
        self
    }

    /// Set the tint color.
    pub fn tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    /// Rotate clockwise by `radians` about `pivot` (source-pixel offset
    /// from the sprite's upper-left corner).
    pub fn rotation(mut self, radians: f32, pivot: Vec2) -> Self {
        self.rotation = radians;
        self.origin = pivot;
        self
    }

    /// Set the scale factors.
    pub fn scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Set the layer depth (larger values are further back).
    pub fn layer_depth(mut self, depth: u32) -> Self {
        self.layer_depth = depth;
        self
    }
}
