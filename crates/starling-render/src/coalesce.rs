//! Draw-call coalescing over runs of equal render state.
//!
//! One forward pass over the order array, no backtracking: contiguous
//! entries sharing a render state become a single indexed draw, and the
//! state-apply callback runs once per run boundary. The walk is interleaved
//! with streaming — [`drain`] asks the cursor for space, uploads what was
//! accepted, and coalesces within that region; when the stream is
//! exhausted mid-run the run simply continues in the next region after an
//! orphan, producing a second draw call without re-applying state. That
//! split is a deliberate consequence of bounded device memory, not
//! something to smooth over by buffering unconditionally.
//!
//! The GPU side is abstracted behind [`StreamTarget`] so the whole
//! protocol — partial acceptance, orphan boundaries, run detection — runs
//! under test with a recording target and no device.

use crate::quad::{INDICES_PER_QUAD, SortKey};
use crate::stream::{Acquired, StreamCursor};

/// Sentinel distinct from any real render state. Every flush starts from
/// it, so the first run always triggers one `apply_state`.
pub(crate) const NO_RENDER_STATE: u32 = u32::MAX;

/// Counters for one flush, in emission order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Sprites consumed from the batch.
    pub sprites: u32,
    /// Indexed draw calls issued.
    pub draw_calls: u32,
    /// `apply_state` invocations, including the first run's initial bind.
    pub state_changes: u32,
    /// Buffer orphan-and-reset events.
    pub orphans: u32,
}

/// Receiver for the streaming draw sequence.
pub(crate) trait StreamTarget {
    /// Discard the exhausted device buffers and start fresh ones.
    fn orphan(&mut self);
    /// Write vertex/index data for the accepted range starting at
    /// `quad_offset` in the order array.
    fn upload(&mut self, quad_offset: usize, range: Acquired);
    /// Issue one indexed draw covering `index_count` indices starting at
    /// `first_index`.
    fn draw(&mut self, first_index: u32, index_count: u32);
    /// A new run is starting: apply its render state.
    fn apply_state(&mut self, render_state: u32);
}

/// Streams and draws every quad referenced by `order`, coalescing runs of
/// equal render state. Returns the flush counters.
pub(crate) fn drain(
    cursor: &mut StreamCursor,
    keys: &[SortKey],
    order: &[u32],
    target: &mut impl StreamTarget,
) -> FlushStats {
    let mut stats = FlushStats {
        sprites: order.len() as u32,
        ..FlushStats::default()
    };
    let mut current_state = NO_RENDER_STATE;
    let mut quad_offset = 0usize;
    let mut remaining = order.len();

    while remaining > 0 {
        if cursor.is_exhausted() {
            target.orphan();
            cursor.reset();
            stats.orphans += 1;
        }
        let range = cursor.acquire(remaining as u32);
        if range.quad_count == 0 {
            // Zero-capacity stream; unreachable through the renderer, which
            // asserts a positive quad capacity at construction.
            break;
        }
        target.upload(quad_offset, range);
        current_state = draw_region(keys, order, quad_offset, range, current_state, target, &mut stats);
        quad_offset += range.quad_count as usize;
        remaining -= range.quad_count as usize;
    }
    stats
}

/// Walks one buffered region of the order array, emitting a draw per run.
/// Returns the render state in effect at the end of the region so a run
/// split by an orphan boundary is not re-applied.
fn draw_region(
    keys: &[SortKey],
    order: &[u32],
    quad_offset: usize,
    range: Acquired,
    mut current_state: u32,
    target: &mut impl StreamTarget,
    stats: &mut FlushStats,
) -> u32 {
    let quad_count = range.quad_count as usize;
    let mut run_start = 0usize;
    let mut first_index = range.base_index;

    for i in 0..quad_count {
        let quad_id = order[quad_offset + i] as usize;
        let state = keys[quad_id].render_state;
        if state != current_state {
            if i > run_start {
                let index_count = (i - run_start) as u32 * INDICES_PER_QUAD;
                target.draw(first_index, index_count);
                stats.draw_calls += 1;
                first_index += index_count;
            }
            target.apply_state(state);
            stats.state_changes += 1;
            current_state = state;
            run_start = i;
        }
    }
    // The tail run is flushed unconditionally.
    let index_count = (quad_count - run_start) as u32 * INDICES_PER_QUAD;
    target.draw(first_index, index_count);
    stats.draw_calls += 1;
    current_state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        uploads: Vec<(usize, u32)>,
        draws: Vec<(u32, u32)>,
        applies: Vec<u32>,
        orphans: u32,
    }

    impl StreamTarget for Recorder {
        fn orphan(&mut self) {
            self.orphans += 1;
        }

        fn upload(&mut self, quad_offset: usize, range: Acquired) {
            self.uploads.push((quad_offset, range.quad_count));
        }

        fn draw(&mut self, first_index: u32, index_count: u32) {
            self.draws.push((first_index, index_count));
        }

        fn apply_state(&mut self, render_state: u32) {
            self.applies.push(render_state);
        }
    }

    fn keys_of(states: &[u32]) -> Vec<SortKey> {
        states
            .iter()
            .map(|&render_state| SortKey {
                layer_depth: 0,
                render_state,
            })
            .collect()
    }

    fn identity_order(count: usize) -> Vec<u32> {
        (0..count as u32).collect()
    }

    #[test]
    fn empty_batch_touches_nothing() {
        let mut cursor = StreamCursor::new(8);
        let mut target = Recorder::default();
        let stats = drain(&mut cursor, &[], &[], &mut target);
        assert_eq!(stats, FlushStats::default());
        assert!(target.draws.is_empty());
        assert!(target.uploads.is_empty());
    }

    #[test]
    fn uniform_state_batch_is_one_draw_covering_insertion_order() {
        let keys = keys_of(&[7; 10]);
        let order = identity_order(10);
        let mut cursor = StreamCursor::new(64);
        let mut target = Recorder::default();
        let stats = drain(&mut cursor, &keys, &order, &mut target);

        assert_eq!(stats.draw_calls, 1);
        assert_eq!(target.draws, vec![(0, 60)]);
        assert_eq!(target.applies, vec![7]);
        // Uploaded ranges concatenated in emission order cover [0, N).
        assert_eq!(target.uploads, vec![(0, 10)]);
    }

    #[test]
    fn runs_coalesce_into_one_draw_each() {
        // Render-state sequence A A A B B A with ample capacity:
        // three draws of 3, 2, 1 quads, and apply_state for the initial A
        // plus the two transitions (to B and back to A).
        const A: u32 = 1;
        const B: u32 = 2;
        let keys = keys_of(&[A, A, A, B, B, A]);
        let order = identity_order(6);
        let mut cursor = StreamCursor::new(64);
        let mut target = Recorder::default();
        let stats = drain(&mut cursor, &keys, &order, &mut target);

        assert_eq!(stats.draw_calls, 3);
        assert_eq!(target.draws, vec![(0, 18), (18, 12), (30, 6)]);
        assert_eq!(target.applies, vec![A, B, A]);
        assert_eq!(stats.state_changes, 3);
        assert_eq!(stats.orphans, 0);
    }

    #[test]
    fn sorted_order_array_drives_run_detection() {
        // Out-of-order states become coalescible through the order array
        // alone; quads and keys never move.
        let keys = keys_of(&[2, 1, 2, 1]);
        let order = vec![1, 3, 0, 2];
        let mut cursor = StreamCursor::new(64);
        let mut target = Recorder::default();
        let stats = drain(&mut cursor, &keys, &order, &mut target);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(target.draws, vec![(0, 12), (12, 12)]);
        assert_eq!(target.applies, vec![1, 2]);
    }

    #[test]
    fn exhausted_stream_splits_a_run_without_reapplying_state() {
        // Capacity K, batch of K + 1 quads sharing one state: the run is
        // split by the orphan into draws of K and 1 quads, state applied
        // once, nothing dropped.
        const K: usize = 4;
        let keys = keys_of(&[9; K + 1]);
        let order = identity_order(K + 1);
        let mut cursor = StreamCursor::new(K as u32);
        let mut target = Recorder::default();
        let stats = drain(&mut cursor, &keys, &order, &mut target);

        assert_eq!(stats.orphans, 1);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(target.draws, vec![(0, (K as u32) * 6), (0, 6)]);
        assert_eq!(target.applies, vec![9]);
        let total_quads: u32 = target.uploads.iter().map(|&(_, n)| n).sum();
        assert_eq!(total_quads as usize, K + 1);
        assert_eq!(target.uploads, vec![(0, K as u32), (K, 1)]);
    }

    #[test]
    fn state_change_lands_exactly_on_an_orphan_boundary() {
        // First region ends as state A's run ends; B starts in the fresh
        // buffer. B must still be applied even though its run begins a new
        // region.
        let keys = keys_of(&[1, 1, 2, 2]);
        let order = identity_order(4);
        let mut cursor = StreamCursor::new(2);
        let mut target = Recorder::default();
        let stats = drain(&mut cursor, &keys, &order, &mut target);

        assert_eq!(stats.orphans, 1);
        assert_eq!(target.draws, vec![(0, 12), (0, 12)]);
        assert_eq!(target.applies, vec![1, 2]);
    }

    #[test]
    fn consecutive_drains_share_the_cursor() {
        // Two flushes against one stream: the second starts where the first
        // stopped (no overlap) and re-applies its state from the sentinel.
        let keys = keys_of(&[3, 3]);
        let order = identity_order(2);
        let mut cursor = StreamCursor::new(16);
        let mut target = Recorder::default();

        drain(&mut cursor, &keys, &order, &mut target);
        drain(&mut cursor, &keys, &order, &mut target);

        assert_eq!(target.draws, vec![(0, 12), (12, 12)]);
        assert_eq!(target.applies, vec![3, 3]);
        assert_eq!(target.uploads, vec![(0, 2), (0, 2)]);
    }
}
