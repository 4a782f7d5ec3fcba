// renderer/batch.rs
//! CPU-side scratch for quads between two flushes.

use glam::Vec2;

use crate::device::{BufferId, GraphicsDevice};

use super::batcher::BatchStorage;
use super::error::RenderError;
use super::vertex::QuadVertex;

pub const VERTICES_PER_QUAD: u32 = 4;
pub const INDICES_PER_QUAD: u32 = 6;

/// Most quads one batch may hold. Every vertex index and index count of such
/// a batch fits in a `u32`, and its vertex buffer stays under 256 MiB.
pub const MAX_BATCH_QUADS: u32 = 1 << 20;

/// Two triangles sharing the 0-2 diagonal of a four vertex block.
pub const QUAD_INDEX_PATTERN: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Corners of the unit quad every submit transforms, in emission order.
pub const UNIT_QUAD: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// Texture coordinates covering a whole texture, matching [`UNIT_QUAD`].
pub const FULL_TEXTURE_UVS: [Vec2; 4] = UNIT_QUAD;

/// The static index buffer contents for `max_quads` quads.
pub fn quad_indices(max_quads: u32) -> Vec<u32> {
    (0..max_quads)
        .flat_map(|quad| {
            QUAD_INDEX_PATTERN
                .iter()
                .map(move |&i| quad * VERTICES_PER_QUAD + i)
        })
        .collect()
}

#[derive(Debug)]
pub struct QuadBatch {
    vertices: Vec<QuadVertex>,
    max_quads: u32,
    max_vertices: u32,
    max_indices: u32,
    index_count: u32,
}

impl QuadBatch {
    /// Allocates room for `max_quads` quads once; the storage is reused for
    /// every batch afterwards. `max_quads` must lie in `1..=MAX_BATCH_QUADS`.
    pub fn new(max_quads: u32) -> Result<Self, RenderError> {
        let out_of_range = || RenderError::Capacity {
            setting: "max_sprites",
            value: max_quads,
            min: 1,
            max: MAX_BATCH_QUADS,
        };
        if !(1..=MAX_BATCH_QUADS).contains(&max_quads) {
            return Err(out_of_range());
        }
        let max_vertices = max_quads
            .checked_mul(VERTICES_PER_QUAD)
            .ok_or_else(out_of_range)?;
        let max_indices = max_quads
            .checked_mul(INDICES_PER_QUAD)
            .ok_or_else(out_of_range)?;

        Ok(Self {
            vertices: Vec::with_capacity(max_vertices as usize),
            max_quads,
            max_vertices,
            max_indices,
            index_count: 0,
        })
    }

    pub fn max_quads(&self) -> u32 {
        self.max_quads
    }

    pub fn max_vertices(&self) -> u32 {
        self.max_vertices
    }

    pub fn max_indices(&self) -> u32 {
        self.max_indices
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn quad_count(&self) -> u32 {
        self.index_count / INDICES_PER_QUAD
    }

    pub fn is_empty(&self) -> bool {
        self.index_count == 0
    }

    pub fn has_room_for_quad(&self) -> bool {
        self.index_count + INDICES_PER_QUAD <= self.max_indices()
    }

    /// Rewinds the write cursor. Capacity is kept.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.index_count = 0;
    }

    /// Appends one quad. Callers check [`Self::has_room_for_quad`] first.
    pub fn push_quad(&mut self, corners: [QuadVertex; 4]) {
        debug_assert!(
            self.has_room_for_quad(),
            "quad batch overflow: {} of {} indices used",
            self.index_count,
            self.max_indices()
        );
        self.vertices.extend_from_slice(&corners);
        self.index_count += INDICES_PER_QUAD;
    }

    /// The used range of the scratch, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

impl BatchStorage for QuadBatch {
    fn is_empty(&self) -> bool {
        QuadBatch::is_empty(self)
    }

    fn vertex_count(&self) -> u32 {
        QuadBatch::vertex_count(self)
    }

    fn index_count(&self) -> u32 {
        QuadBatch::index_count(self)
    }

    fn reset(&mut self) {
        QuadBatch::reset(self);
    }

    /// Only vertices move; the index buffer is static.
    fn upload<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        vertex_buffer: BufferId,
        _index_buffer: BufferId,
    ) {
        device.write_buffer(vertex_buffer, self.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn quad() -> [QuadVertex; 4] {
        UNIT_QUAD.map(|c| QuadVertex::new(c.extend(0.0), c, Vec4::ONE, 0))
    }

    #[test]
    fn index_pattern_is_offset_per_quad() {
        let indices = quad_indices(3);
        assert_eq!(indices.len(), 18);
        assert_eq!(&indices[..6], &[0, 1, 2, 2, 3, 0]);
        assert_eq!(&indices[6..12], &[4, 5, 6, 6, 7, 4]);
        assert_eq!(&indices[12..], &[8, 9, 10, 10, 11, 8]);
    }

    #[test]
    fn capacity_is_derived_from_max_quads() {
        let batch = QuadBatch::new(1000).unwrap();
        assert_eq!(batch.max_vertices(), 4000);
        assert_eq!(batch.max_indices(), 6000);
        assert!(batch.is_empty());
    }

    #[test]
    fn capacity_outside_the_supported_range_is_rejected() {
        for max_quads in [0, MAX_BATCH_QUADS + 1, 1_100_000_000, u32::MAX] {
            assert!(
                matches!(
                    QuadBatch::new(max_quads),
                    Err(RenderError::Capacity {
                        setting: "max_sprites",
                        ..
                    })
                ),
                "max_quads = {max_quads}"
            );
        }

        assert_eq!(QuadBatch::new(1).unwrap().max_indices(), 6);
    }

    #[test]
    fn last_index_of_the_largest_batch_fits() {
        let last_quad = MAX_BATCH_QUADS - 1;
        let highest = last_quad
            .checked_mul(VERTICES_PER_QUAD)
            .and_then(|base| base.checked_add(3));
        assert!(highest.is_some());
        assert!(MAX_BATCH_QUADS.checked_mul(INDICES_PER_QUAD).is_some());
        assert!(
            MAX_BATCH_QUADS as u64 * 4 * std::mem::size_of::<QuadVertex>() as u64 <= 256 << 20
        );
    }

    #[test]
    fn push_advances_cursor_and_index_count() {
        let mut batch = QuadBatch::new(2).unwrap();
        batch.push_quad(quad());
        assert_eq!(batch.vertex_count(), 4);
        assert_eq!(batch.index_count(), 6);
        assert!(batch.has_room_for_quad());

        batch.push_quad(quad());
        assert_eq!(batch.quad_count(), 2);
        assert!(!batch.has_room_for_quad());
        assert_eq!(
            batch.as_bytes().len(),
            8 * std::mem::size_of::<QuadVertex>()
        );
    }

    #[test]
    fn reset_keeps_storage() {
        let mut batch = QuadBatch::new(4).unwrap();
        batch.push_quad(quad());
        let capacity = batch.vertices.capacity();

        batch.reset();
        assert!(batch.is_empty());
        assert_eq!(batch.vertex_count(), 0);
        assert_eq!(batch.vertices.capacity(), capacity);
        assert!(batch.vertices.is_empty());
    }
}
