//! The batch buffer: pending sprites, their transformed quads, the parallel
//! sort-key array, and the draw-order index array.
//!
//! Growth policy is exact-fit: every reallocation is sized to the immediate
//! need (`reserve_exact`), never doubled. That is a documented behavior of
//! this renderer, not an accident — callers size the batch up front with
//! [`SpriteBatch::with_capacity`] and the buffer then stays put. Clearing
//! resets counts and keeps the storage.

use crate::quad::{self, Quad, SortKey};
use crate::sprite::SpriteDescriptor;

/// Draw-order policies for [`SpriteBatch::sort`].
///
/// Sorting is an explicit pre-flush step; nothing sorts automatically. All
/// three orders resolve ties by original insertion index, so equal keys
/// keep a deterministic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteSort {
    /// Descending layer depth (background first), then render state.
    BackToFront,
    /// Ascending layer depth (foreground first), then render state.
    FrontToBack,
    /// Render state only: maximal run coalescing, ignores depth.
    ByRenderState,
}

/// Buffered sprites awaiting a flush.
#[derive(Debug, Default)]
pub struct SpriteBatch {
    sprites: Vec<SpriteDescriptor>,
    quads: Vec<Quad>,
    keys: Vec<SortKey>,
    order: Vec<u32>,
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch with room for `capacity` sprites.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut batch = Self::new();
        batch.sprites.reserve_exact(capacity);
        batch.quads.reserve_exact(capacity);
        batch.keys.reserve_exact(capacity);
        batch.order.reserve_exact(capacity);
        batch
    }

    /// Number of buffered sprites.
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Current capacity, in sprites.
    pub fn capacity(&self) -> usize {
        self.sprites.capacity()
    }

    /// Appends one sprite, growing storage by exactly one slot if full.
    pub fn push(&mut self, sprite: SpriteDescriptor) {
        if self.sprites.len() == self.sprites.capacity() {
            self.sprites.reserve_exact(1);
        }
        self.sprites.push(sprite);
    }

    /// Discards buffered content; storage is retained.
    pub fn clear(&mut self) {
        self.sprites.clear();
        self.quads.clear();
        self.keys.clear();
        self.order.clear();
    }

    /// Transforms the buffered sprites into quads, sort keys, and an
    /// identity order array. The renderer calls this at the start of a
    /// flush; it only needs to be called directly when inspecting or
    /// benchmarking the expansion itself.
    pub fn generate_quads(&mut self) {
        self.quads.clear();
        self.keys.clear();
        self.order.clear();
        let needed = self.sprites.len();
        if self.quads.capacity() < needed {
            self.quads.reserve_exact(needed - self.quads.len());
            self.keys.reserve_exact(needed - self.keys.len());
            self.order.reserve_exact(needed - self.order.len());
        }
        quad::generate_quads(&self.sprites, &mut self.quads, &mut self.keys, &mut self.order);
    }

    /// Re-sorts the order array. Indirect: quads and keys never move, only
    /// the order entries do.
    pub fn sort(&mut self, sort: SpriteSort) {
        let keys = &self.keys;
        match sort {
            SpriteSort::BackToFront => self.order.sort_unstable_by(|&ia, &ib| {
                let a = &keys[ia as usize];
                let b = &keys[ib as usize];
                b.layer_depth
                    .cmp(&a.layer_depth)
                    .then(a.render_state.cmp(&b.render_state))
                    .then(ia.cmp(&ib))
            }),
            SpriteSort::FrontToBack => self.order.sort_unstable_by(|&ia, &ib| {
                let a = &keys[ia as usize];
                let b = &keys[ib as usize];
                a.layer_depth
                    .cmp(&b.layer_depth)
                    .then(a.render_state.cmp(&b.render_state))
                    .then(ib.cmp(&ia))
            }),
            SpriteSort::ByRenderState => self.order.sort_unstable_by(|&ia, &ib| {
                let a = &keys[ia as usize];
                let b = &keys[ib as usize];
                a.render_state.cmp(&b.render_state).then(ia.cmp(&ib))
            }),
        }
    }

    pub(crate) fn quads(&self) -> &[Quad] {
        &self.quads
    }

    pub(crate) fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub(crate) fn order(&self) -> &[u32] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::SourceRect;
    use glam::Vec2;
    use starling_core::Color;

    fn sprite(layer_depth: u32, render_state: u32) -> SpriteDescriptor {
        SpriteDescriptor {
            position: Vec2::ZERO,
            origin: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            tint: Color::WHITE,
            source: SourceRect::new(0, 0, 16, 16),
            texture_width: 16,
            texture_height: 16,
            layer_depth,
            render_state,
        }
    }

    fn batch_of(entries: &[(u32, u32)]) -> SpriteBatch {
        let mut batch = SpriteBatch::with_capacity(entries.len());
        for &(depth, state) in entries {
            batch.push(sprite(depth, state));
        }
        batch.generate_quads();
        batch
    }

    #[test]
    fn growth_is_exact_fit() {
        let mut batch = SpriteBatch::with_capacity(2);
        assert_eq!(batch.capacity(), 2);
        for _ in 0..3 {
            batch.push(sprite(0, 0));
        }
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.capacity(), 3);
    }

    #[test]
    fn clear_retains_storage() {
        let mut batch = batch_of(&[(0, 0), (0, 0), (0, 0)]);
        let cap = batch.capacity();
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.capacity(), cap);
        assert!(batch.order().is_empty());
    }

    #[test]
    fn generated_order_is_identity_permutation() {
        let batch = batch_of(&[(3, 9), (1, 9), (2, 8)]);
        assert_eq!(batch.order(), &[0, 1, 2]);
        assert_eq!(batch.keys()[2].render_state, 8);
    }

    #[test]
    fn back_to_front_sorts_descending_depth_with_stable_ties() {
        let mut batch = batch_of(&[(1, 5), (3, 5), (3, 4), (1, 5)]);
        batch.sort(SpriteSort::BackToFront);
        // depth 3 first (state 4 before 5), then depth 1 in insertion order.
        assert_eq!(batch.order(), &[2, 1, 0, 3]);
    }

    #[test]
    fn front_to_back_reverses_the_insertion_tiebreak() {
        let mut batch = batch_of(&[(1, 5), (1, 5), (2, 5)]);
        batch.sort(SpriteSort::FrontToBack);
        assert_eq!(batch.order(), &[1, 0, 2]);
    }

    #[test]
    fn by_render_state_groups_states_and_keeps_insertion_order() {
        let mut batch = batch_of(&[(0, 7), (9, 3), (0, 7), (1, 3)]);
        batch.sort(SpriteSort::ByRenderState);
        assert_eq!(batch.order(), &[1, 3, 0, 2]);
    }
}
