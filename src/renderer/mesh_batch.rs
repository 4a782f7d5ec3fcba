// renderer/mesh_batch.rs
use crate::device::{BufferId, GraphicsDevice};

use super::batcher::BatchStorage;
use super::error::RenderError;
use super::vertex::MeshVertex;

/// Most vertices one mesh batch may hold.
pub const MAX_BATCH_MESH_VERTICES: u32 = 1 << 20;
/// Most indices one mesh batch may hold.
pub const MAX_BATCH_MESH_INDICES: u32 = 3 << 20;

/// Vertex and index scratch for pre-transformed meshes. Unlike quads, mesh
/// topology varies, so indices are accumulated and uploaded per flush.
#[derive(Debug)]
pub struct MeshBatch {
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
    max_vertices: u32,
    max_indices: u32,
}

impl MeshBatch {
    /// Needs room for at least one vertex and one triangle.
    pub fn new(max_vertices: u32, max_indices: u32) -> Result<Self, RenderError> {
        if !(1..=MAX_BATCH_MESH_VERTICES).contains(&max_vertices) {
            return Err(RenderError::Capacity {
                setting: "max_mesh_vertices",
                value: max_vertices,
                min: 1,
                max: MAX_BATCH_MESH_VERTICES,
            });
        }
        if !(3..=MAX_BATCH_MESH_INDICES).contains(&max_indices) {
            return Err(RenderError::Capacity {
                setting: "max_mesh_indices",
                value: max_indices,
                min: 3,
                max: MAX_BATCH_MESH_INDICES,
            });
        }

        Ok(Self {
            vertices: Vec::with_capacity(max_vertices as usize),
            indices: Vec::with_capacity(max_indices as usize),
            max_vertices,
            max_indices,
        })
    }

    pub fn max_vertices(&self) -> u32 {
        self.max_vertices
    }

    pub fn max_indices(&self) -> u32 {
        self.max_indices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether an empty batch could ever hold this much.
    pub fn fits_at_all(&self, vertices: usize, indices: usize) -> bool {
        vertices <= self.max_vertices as usize && indices <= self.max_indices as usize
    }

    pub fn has_room_for(&self, vertices: usize, indices: usize) -> bool {
        self.vertices.len() + vertices <= self.max_vertices as usize
            && self.indices.len() + indices <= self.max_indices as usize
    }

    pub fn reset(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Appends a mesh; `indices` are relative to its first vertex.
    pub fn push_mesh(&mut self, vertices: impl IntoIterator<Item = MeshVertex>, indices: &[u32]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(vertices);
        self.indices.extend(indices.iter().map(|&i| base + i));
        debug_assert!(
            self.vertices.len() <= self.max_vertices as usize
                && self.indices.len() <= self.max_indices as usize,
            "mesh batch overflow"
        );
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

impl BatchStorage for MeshBatch {
    fn is_empty(&self) -> bool {
        MeshBatch::is_empty(self)
    }

    fn vertex_count(&self) -> u32 {
        MeshBatch::vertex_count(self)
    }

    fn index_count(&self) -> u32 {
        MeshBatch::index_count(self)
    }

    fn reset(&mut self) {
        MeshBatch::reset(self);
    }

    fn upload<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
    ) {
        device.write_buffer(vertex_buffer, self.vertex_bytes());
        device.write_buffer(index_buffer, self.index_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[test]
    fn indices_are_rebased_per_mesh() {
        let mut batch = MeshBatch::new(16, 16).unwrap();
        batch.push_mesh([MeshVertex::zeroed(); 3], &[0, 1, 2]);
        batch.push_mesh([MeshVertex::zeroed(); 3], &[2, 1, 0]);
        assert_eq!(batch.indices, vec![0, 1, 2, 5, 4, 3]);
        assert_eq!(batch.vertex_count(), 6);
    }

    #[test]
    fn room_accounts_for_both_budgets() {
        let mut batch = MeshBatch::new(4, 6).unwrap();
        assert!(batch.has_room_for(4, 6));
        batch.push_mesh([MeshVertex::zeroed(); 3], &[0, 1, 2]);
        assert!(!batch.has_room_for(2, 3));
        assert!(!batch.has_room_for(1, 6));
        assert!(batch.has_room_for(1, 3));
        assert!(batch.fits_at_all(4, 6));
        assert!(!batch.fits_at_all(5, 6));

        batch.reset();
        assert!(batch.is_empty());
        assert_eq!(batch.vertex_bytes().len(), 0);
    }

    #[test]
    fn budgets_below_one_triangle_are_rejected() {
        assert!(matches!(
            MeshBatch::new(0, 36),
            Err(RenderError::Capacity {
                setting: "max_mesh_vertices",
                ..
            })
        ));
        assert!(matches!(
            MeshBatch::new(24, 2),
            Err(RenderError::Capacity {
                setting: "max_mesh_indices",
                min: 3,
                ..
            })
        ));
        assert!(MeshBatch::new(MAX_BATCH_MESH_VERTICES + 1, 36).is_err());
        assert!(MeshBatch::new(1, 3).is_ok());
    }
}
