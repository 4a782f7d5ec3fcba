use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::device::{BufferLayout, VertexFormat};

/// One corner of a batched quad.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
    pub color: [f32; 4],
    pub tex_index: f32,
}

impl QuadVertex {
    pub fn new(position: Vec3, tex_coord: Vec2, color: Vec4, tex_index: u32) -> Self {
        Self {
            position: position.to_array(),
            tex_coord: tex_coord.to_array(),
            color: color.to_array(),
            tex_index: tex_index as f32,
        }
    }

    pub fn layout() -> BufferLayout {
        BufferLayout::new(&[
            ("position", VertexFormat::Float3),
            ("tex_coord", VertexFormat::Float2),
            ("color", VertexFormat::Float4),
            ("tex_index", VertexFormat::Float),
        ])
    }
}

/// A mesh vertex after the per-submit transform has been applied.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub color: [f32; 4],
    pub tex_index: f32,
}

impl MeshVertex {
    pub fn layout() -> BufferLayout {
        BufferLayout::new(&[
            ("position", VertexFormat::Float3),
            ("normal", VertexFormat::Float3),
            ("tex_coord", VertexFormat::Float2),
            ("color", VertexFormat::Float4),
            ("tex_index", VertexFormat::Float),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_vertex_stride_matches_struct_size() {
        assert_eq!(
            QuadVertex::layout().stride(),
            std::mem::size_of::<QuadVertex>() as u64
        );
    }

    #[test]
    fn mesh_vertex_stride_matches_struct_size() {
        assert_eq!(
            MeshVertex::layout().stride(),
            std::mem::size_of::<MeshVertex>() as u64
        );
    }

    #[test]
    fn slot_index_is_stored_as_float() {
        let v = QuadVertex::new(Vec3::ZERO, Vec2::ONE, Vec4::ONE, 7);
        assert_eq!(v.tex_index, 7.0);
    }
}
