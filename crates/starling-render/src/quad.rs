//! Quad generation: sprite descriptors → transformed quads → vertex and
//! index streams.
//!
//! Sprites are transformed on the CPU. Each [`SpriteDescriptor`] becomes one
//! [`Quad`] (screen rectangle + source rectangle + rotation data), and each
//! quad later expands to 4 [`SpriteVertex`] records and 6 indices when it is
//! streamed to the GPU. Everything in this module is a pure function over
//! slices, with no failure modes beyond the documented caller contracts.

use crate::sprite::SpriteDescriptor;

/// A sprite transformed for buffering. One quad maps 1:1 to one descriptor
/// and is never mutated after generation within a frame.
#[derive(Debug, Clone, Copy)]
pub struct Quad {
    /// XYWH rectangle on the source texture, in pixels.
    pub source: [f32; 4],
    /// XYWH rectangle on the screen, in pixels (extent is pre-scaled).
    pub target: [f32; 4],
    /// Rotation pivot, in source pixels from the upper-left corner.
    pub origin: [f32; 2],
    /// Reciprocal texture dimensions, for UV normalization.
    pub uv_scale: [f32; 2],
    /// Clockwise rotation, in radians.
    pub rotation: f32,
    /// Packed ABGR tint.
    pub tint: u32,
}

/// Per-quad sort data, kept in a parallel array so order-array sorts and
/// coalescing scans touch 8 bytes per entry instead of a whole [`Quad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Layer depth, increasing into the background.
    pub layer_depth: u32,
    /// Opaque batching key.
    pub render_state: u32,
}

/// One interleaved position-texcoord-color vertex: screen XY and UV as four
/// floats, plus a packed ABGR tint consumed as a normalized `u8x4`
/// attribute. 20 bytes on the wire.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub xyuv: [f32; 4],
    pub tint: u32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<SpriteVertex>(), 20);

/// Vertices emitted per quad.
pub const VERTICES_PER_QUAD: u32 = 4;
/// Indices emitted per quad (two counter-clockwise triangles).
pub const INDICES_PER_QUAD: u32 = 6;

/// Unit-square corner offsets, in emission order: upper-left, upper-right,
/// lower-right, lower-left.
const CORNER_X: [f32; 4] = [0.0, 1.0, 1.0, 0.0];
const CORNER_Y: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// Transforms sprite descriptors into quads, sort keys, and identity order
/// entries, appending to the output vectors.
///
/// `Order[base + i] = base + i` where `base` is the output length before the
/// call, so the order array stays a permutation of `[0, count)` across
/// repeated calls.
pub fn generate_quads(
    sprites: &[SpriteDescriptor],
    quads: &mut Vec<Quad>,
    keys: &mut Vec<SortKey>,
    order: &mut Vec<u32>,
) {
    for sprite in sprites {
        let src_w = sprite.source.width as f32;
        let src_h = sprite.source.height as f32;
        quads.push(Quad {
            source: [
                sprite.source.x as f32,
                sprite.source.y as f32,
                src_w,
                src_h,
            ],
            target: [
                sprite.position.x,
                sprite.position.y,
                src_w * sprite.scale.x,
                src_h * sprite.scale.y,
            ],
            origin: [sprite.origin.x, sprite.origin.y],
            uv_scale: [
                1.0 / sprite.texture_width as f32,
                1.0 / sprite.texture_height as f32,
            ],
            rotation: sprite.rotation,
            tint: sprite.tint.to_abgr8(),
        });
        keys.push(SortKey {
            layer_depth: sprite.layer_depth,
            render_state: sprite.render_state,
        });
        order.push(order.len() as u32);
    }
}

/// Emits 4 transformed vertices per quad for `order[quad_offset..quad_offset
/// + quad_count]`, appending to `out`.
///
/// Corner rule: unit-square offsets minus the normalized pivot
/// (`origin / source extent`), scaled by the target extent, rotated about
/// the pivot, translated by the target position. The V coordinate is
/// flipped (`1 - v`) to bridge top-left-origin image storage and
/// bottom-left-origin texture sampling.
pub fn generate_vertices(
    out: &mut Vec<SpriteVertex>,
    quads: &[Quad],
    order: &[u32],
    quad_offset: usize,
    quad_count: usize,
) {
    for id in &order[quad_offset..quad_offset + quad_count] {
        let quad = &quads[*id as usize];
        let [src_x, src_y, src_w, src_h] = quad.source;
        let [dst_x, dst_y, dst_w, dst_h] = quad.target;
        let pivot_x = quad.origin[0] / src_w;
        let pivot_y = quad.origin[1] / src_h;
        let [scl_u, scl_v] = quad.uv_scale;
        let (sin_o, cos_o) = quad.rotation.sin_cos();

        for corner in 0..4 {
            let ofs_x = CORNER_X[corner];
            let ofs_y = CORNER_Y[corner];
            let x = (ofs_x - pivot_x) * dst_w;
            let y = (ofs_y - pivot_y) * dst_h;
            out.push(SpriteVertex {
                xyuv: [
                    (dst_x + x * cos_o) - y * sin_o,
                    (dst_y + x * sin_o) + y * cos_o,
                    (src_x + ofs_x * src_w) * scl_u,
                    1.0 - (src_y + ofs_y * src_h) * scl_v,
                ],
                tint: quad.tint,
            });
        }
    }
}

/// Emits 6 16-bit indices per quad, appending to `out`.
///
/// For base vertex `b` the pattern is `{b+1, b+0, b+2, b+2, b+0, b+3}`: two
/// counter-clockwise triangles sharing the diagonal from corner 0 to
/// corner 2. This ordering is a hard contract — texture orientation depends
/// on it.
pub fn generate_indices_u16(out: &mut Vec<u16>, base_vertex: u32, quad_count: usize) {
    // The counter stays 32-bit: a full 16-bit stream ends at base vertex
    // 65532, and the post-quad increment would overflow a u16 there.
    let mut base = base_vertex;
    for _ in 0..quad_count {
        out.extend_from_slice(&[
            (base + 1) as u16,
            base as u16,
            (base + 2) as u16,
            (base + 2) as u16,
            base as u16,
            (base + 3) as u16,
        ]);
        base += 4;
    }
}

/// Emits 6 32-bit indices per quad, appending to `out`. Same winding
/// contract as [`generate_indices_u16`].
pub fn generate_indices_u32(out: &mut Vec<u32>, base_vertex: u32, quad_count: usize) {
    let mut base = base_vertex;
    for _ in 0..quad_count {
        out.extend_from_slice(&[base + 1, base, base + 2, base + 2, base, base + 3]);
        base += 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::SourceRect;
    use glam::Vec2;
    use starling_core::Color;

    fn sprite(x: f32, y: f32, w: u32, h: u32) -> SpriteDescriptor {
        SpriteDescriptor {
            position: Vec2::new(x, y),
            origin: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            tint: Color::WHITE,
            source: SourceRect::new(0, 0, w, h),
            texture_width: 256,
            texture_height: 256,
            layer_depth: 0,
            render_state: 7,
        }
    }

    fn vertices_for(descriptors: &[SpriteDescriptor]) -> Vec<SpriteVertex> {
        let mut quads = Vec::new();
        let mut keys = Vec::new();
        let mut order = Vec::new();
        generate_quads(descriptors, &mut quads, &mut keys, &mut order);
        let mut out = Vec::new();
        generate_vertices(&mut out, &quads, &order, 0, quads.len());
        out
    }

    #[test]
    fn identity_transform_produces_axis_aligned_corners() {
        let verts = vertices_for(&[sprite(10.0, 20.0, 32, 16)]);
        let corners: Vec<[f32; 2]> = verts.iter().map(|v| [v.xyuv[0], v.xyuv[1]]).collect();
        assert_eq!(
            corners,
            vec![
                [10.0, 20.0],
                [42.0, 20.0],
                [42.0, 36.0],
                [10.0, 36.0],
            ]
        );
    }

    #[test]
    fn full_turn_reproduces_identity_corners() {
        let size = 32;
        let pivot = Vec2::new(16.0, 16.0);
        let plain = vertices_for(&[sprite(100.0, 100.0, size, size)]);
        let turned = vertices_for(&[
            sprite(100.0, 100.0, size, size).rotation(std::f32::consts::TAU, Vec2::ZERO)
        ]);
        for (a, b) in plain.iter().zip(&turned) {
            for axis in 0..2 {
                assert!(
                    (a.xyuv[axis] - b.xyuv[axis]).abs() < 1e-3,
                    "corner drifted after a 2π turn: {:?} vs {:?}",
                    a.xyuv,
                    b.xyuv
                );
            }
        }
        // A quarter turn about the center must actually move corners.
        let quarter = vertices_for(&[
            sprite(100.0, 100.0, size, size).rotation(std::f32::consts::FRAC_PI_2, pivot)
        ]);
        assert!((plain[0].xyuv[0] - quarter[0].xyuv[0]).abs() > 1.0);
    }

    #[test]
    fn uvs_are_normalized_and_v_flipped() {
        let verts = vertices_for(&[sprite(0.0, 0.0, 64, 64).source(SourceRect::new(64, 0, 64, 64))]);
        // Corner 0 (upper-left of the sprite) samples the source rect's
        // upper-left texel column, with V flipped.
        assert_eq!(verts[0].xyuv[2], 64.0 / 256.0);
        assert_eq!(verts[0].xyuv[3], 1.0);
        // Corner 2 (lower-right) samples the opposite corner.
        assert_eq!(verts[2].xyuv[2], 128.0 / 256.0);
        assert_eq!(verts[2].xyuv[3], 1.0 - 64.0 / 256.0);
    }

    #[test]
    fn quad_generation_fills_identity_order() {
        let sprites = vec![sprite(0.0, 0.0, 8, 8); 5];
        let mut quads = Vec::new();
        let mut keys = Vec::new();
        let mut order = Vec::new();
        generate_quads(&sprites[..2], &mut quads, &mut keys, &mut order);
        generate_quads(&sprites[2..], &mut quads, &mut keys, &mut order);
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert_eq!(keys.len(), 5);
        assert_eq!(quads.len(), 5);
    }

    #[test]
    fn index_pattern_matches_winding_contract() {
        let mut out16 = Vec::new();
        generate_indices_u16(&mut out16, 8, 2);
        assert_eq!(out16, vec![9, 8, 10, 10, 8, 11, 13, 12, 14, 14, 12, 15]);

        let mut out32 = Vec::new();
        generate_indices_u32(&mut out32, 100_000, 1);
        assert_eq!(
            out32,
            vec![100_001, 100_000, 100_002, 100_002, 100_000, 100_003]
        );
    }

    #[test]
    fn u16_emission_covers_the_full_index_range() {
        // The last two quads of a completely full 16-bit stream (16384
        // quads = 65536 vertices): the final base vertex is 65532 and the
        // emitted indices reach 65535 exactly, with no overflow in the
        // per-quad advance.
        let mut out = Vec::new();
        generate_indices_u16(&mut out, 65528, 2);
        assert_eq!(
            out,
            vec![
                65529, 65528, 65530, 65530, 65528, 65531,
                65533, 65532, 65534, 65534, 65532, 65535,
            ]
        );
    }

    #[test]
    fn tint_is_carried_packed() {
        let tinted = sprite(0.0, 0.0, 8, 8).tint(Color::from_rgba_u8(0x10, 0x20, 0x30, 0x40));
        let verts = vertices_for(&[tinted]);
        assert!(verts.iter().all(|v| v.tint == 0x4030_2010));
    }
}
