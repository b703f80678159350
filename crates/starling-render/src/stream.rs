//! Streaming vertex/index upload with an orphan-and-refill ring discipline.
//!
//! Two bounded device buffers (vertex + index) are written front to back by
//! a forward-only cursor. When the cursor reaches capacity the buffers are
//! *orphaned*: a fresh allocation replaces them and the cursor resets, so
//! new writes never wait for in-flight GPU reads of the old contents. A
//! request that does not fit in the remaining space is satisfied partially;
//! the caller resumes with the remainder after the next orphan.
//!
//! The cursor arithmetic lives in [`StreamCursor`], a plain struct with no
//! GPU types, so the clamp/orphan/resume protocol is testable on its own.
//! [`StreamingUploader`] pairs a cursor with the actual `wgpu` buffers;
//! uploads go through `Queue::write_buffer`, whose internal staging makes
//! the write non-stalling, and the forward-only cursor guarantees each
//! region of a given buffer is written at most once in its lifetime.

use crate::quad::{
    self, INDICES_PER_QUAD, Quad, SpriteVertex, VERTICES_PER_QUAD, generate_vertices,
};

/// A sub-range of the stream accepted by [`StreamCursor::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Acquired {
    /// Quads accepted; may be less than requested.
    pub quad_count: u32,
    /// First vertex slot of the range.
    pub base_vertex: u32,
    /// First index slot of the range.
    pub base_index: u32,
}

/// Write cursor over a bounded vertex/index buffer pair.
///
/// Invariant: `0 <= offset <= capacity` for both cursors at all times, and
/// offsets only ever move forward between resets.
#[derive(Debug, Clone)]
pub(crate) struct StreamCursor {
    vertex_capacity: u32,
    index_capacity: u32,
    vertex_offset: u32,
    index_offset: u32,
}

impl StreamCursor {
    pub fn new(quad_capacity: u32) -> Self {
        Self {
            vertex_capacity: quad_capacity * VERTICES_PER_QUAD,
            index_capacity: quad_capacity * INDICES_PER_QUAD,
            vertex_offset: 0,
            index_offset: 0,
        }
    }

    /// True when no further quad fits and the buffers must be orphaned
    /// before the next acquire.
    pub fn is_exhausted(&self) -> bool {
        self.vertex_offset == self.vertex_capacity
    }

    /// Resets both offsets. Only called on the orphan path.
    pub fn reset(&mut self) {
        self.vertex_offset = 0;
        self.index_offset = 0;
    }

    /// Accepts up to `quad_count` quads, clamped to the remaining space,
    /// and advances the cursor past the accepted range.
    pub fn acquire(&mut self, quad_count: u32) -> Acquired {
        let requested = quad_count * VERTICES_PER_QUAD;
        let available = self.vertex_capacity - self.vertex_offset;
        let accepted = requested.min(available) / VERTICES_PER_QUAD;
        let range = Acquired {
            quad_count: accepted,
            base_vertex: self.vertex_offset,
            base_index: self.index_offset,
        };
        self.vertex_offset += accepted * VERTICES_PER_QUAD;
        self.index_offset += accepted * INDICES_PER_QUAD;
        range
    }
}

fn index_size(format: wgpu::IndexFormat) -> u64 {
    match format {
        wgpu::IndexFormat::Uint16 => 2,
        wgpu::IndexFormat::Uint32 => 4,
    }
}

fn create_buffers(device: &wgpu::Device, quad_capacity: u32, format: wgpu::IndexFormat) -> (wgpu::Buffer, wgpu::Buffer) {
    let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sprite_stream_vertices"),
        size: (quad_capacity * VERTICES_PER_QUAD) as u64
            * std::mem::size_of::<SpriteVertex>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sprite_stream_indices"),
        size: (quad_capacity * INDICES_PER_QUAD) as u64 * index_size(format),
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    (vertex_buffer, index_buffer)
}

/// Bounded device buffers plus the scratch space used to fill them.
///
/// The scratch vectors are retained across frames, so steady-state uploads
/// perform no heap allocation.
pub(crate) struct StreamingUploader {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    quad_capacity: u32,
    index_format: wgpu::IndexFormat,
    pub(crate) cursor: StreamCursor,
    vertex_scratch: Vec<SpriteVertex>,
    index_scratch16: Vec<u16>,
    index_scratch32: Vec<u32>,
}

impl StreamingUploader {
    pub fn new(device: &wgpu::Device, quad_capacity: u32, index_format: wgpu::IndexFormat) -> Self {
        assert!(quad_capacity > 0, "stream capacity must hold at least one quad");
        let (vertex_buffer, index_buffer) = create_buffers(device, quad_capacity, index_format);
        Self {
            vertex_buffer,
            index_buffer,
            quad_capacity,
            index_format,
            cursor: StreamCursor::new(quad_capacity),
            vertex_scratch: Vec::new(),
            index_scratch16: Vec::new(),
            index_scratch32: Vec::new(),
        }
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    pub fn index_format(&self) -> wgpu::IndexFormat {
        self.index_format
    }

    pub fn quad_capacity(&self) -> u32 {
        self.quad_capacity
    }

    /// Replaces the exhausted buffers with a fresh pair and resets the
    /// cursor. Draws already recorded against the old pair keep it alive
    /// inside the pass; nothing waits on the GPU here.
    pub fn orphan(&mut self, device: &wgpu::Device) {
        tracing::trace!(
            quad_capacity = self.quad_capacity,
            "orphaning sprite stream buffers"
        );
        let (vertex_buffer, index_buffer) =
            create_buffers(device, self.quad_capacity, self.index_format);
        self.vertex_buffer = vertex_buffer;
        self.index_buffer = index_buffer;
        self.cursor.reset();
    }

    /// Writes vertex and index data for `order[quad_offset..]` limited to
    /// the accepted range, at the range's cursor positions.
    pub fn upload(
        &mut self,
        queue: &wgpu::Queue,
        quads: &[Quad],
        order: &[u32],
        quad_offset: usize,
        range: Acquired,
    ) {
        let quad_count = range.quad_count as usize;

        self.vertex_scratch.clear();
        generate_vertices(&mut self.vertex_scratch, quads, order, quad_offset, quad_count);
        queue.write_buffer(
            &self.vertex_buffer,
            range.base_vertex as u64 * std::mem::size_of::<SpriteVertex>() as u64,
            bytemuck::cast_slice(&self.vertex_scratch),
        );

        let index_offset_bytes = range.base_index as u64 * index_size(self.index_format);
        match self.index_format {
            wgpu::IndexFormat::Uint16 => {
                self.index_scratch16.clear();
                quad::generate_indices_u16(&mut self.index_scratch16, range.base_vertex, quad_count);
                queue.write_buffer(
                    &self.index_buffer,
                    index_offset_bytes,
                    bytemuck::cast_slice(&self.index_scratch16),
                );
            }
            wgpu::IndexFormat::Uint32 => {
                self.index_scratch32.clear();
                quad::generate_indices_u32(&mut self.index_scratch32, range.base_vertex, quad_count);
                queue.write_buffer(
                    &self.index_buffer,
                    index_offset_bytes,
                    bytemuck::cast_slice(&self.index_scratch32),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_advances_both_cursors() {
        let mut cursor = StreamCursor::new(8);
        let a = cursor.acquire(3);
        assert_eq!(
            a,
            Acquired {
                quad_count: 3,
                base_vertex: 0,
                base_index: 0
            }
        );
        let b = cursor.acquire(2);
        assert_eq!(b.base_vertex, 12);
        assert_eq!(b.base_index, 18);
        assert!(!cursor.is_exhausted());
    }

    #[test]
    fn acquire_clamps_to_remaining_space() {
        let mut cursor = StreamCursor::new(4);
        cursor.acquire(3);
        let tail = cursor.acquire(10);
        assert_eq!(tail.quad_count, 1);
        assert_eq!(tail.base_vertex, 12);
        assert!(cursor.is_exhausted());
        // Exhausted cursor accepts nothing until reset.
        assert_eq!(cursor.acquire(1).quad_count, 0);
    }

    #[test]
    fn reset_restarts_at_zero() {
        let mut cursor = StreamCursor::new(2);
        cursor.acquire(2);
        assert!(cursor.is_exhausted());
        cursor.reset();
        assert!(!cursor.is_exhausted());
        let range = cursor.acquire(2);
        assert_eq!(range.base_vertex, 0);
        assert_eq!(range.base_index, 0);
    }

    #[test]
    fn oversized_request_resumes_after_orphan() {
        // Capacity K, request K+1: first acquire takes K, then the caller
        // orphans (reset) and the remainder fits.
        const K: u32 = 16;
        let mut cursor = StreamCursor::new(K);
        let first = cursor.acquire(K + 1);
        assert_eq!(first.quad_count, K);
        assert!(cursor.is_exhausted());
        cursor.reset();
        let second = cursor.acquire(1);
        assert_eq!(second.quad_count, 1);
        assert_eq!(second.base_index, 0);
    }
}
