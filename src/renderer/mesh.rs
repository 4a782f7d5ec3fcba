// renderer/mesh.rs
//! Model-space meshes submitted to the 3D batch.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::f32::consts::PI;

use super::error::RenderError;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[inline]
pub fn v(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Vertex {
    Vertex { pos, normal, uv }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Fails when an index points past the vertex list.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, RenderError> {
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(RenderError::InvalidMesh {
                index,
                vertex_count: vertices.len(),
            });
        }
        Ok(Self { vertices, indices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Unit quad in the XY plane facing +Z, matching the 2D corner order.
    pub fn quad() -> Self {
        let n = [0.0, 0.0, 1.0];
        Self {
            vertices: vec![
                v([0.0, 0.0, 0.0], n, [0.0, 0.0]),
                v([1.0, 0.0, 0.0], n, [1.0, 0.0]),
                v([1.0, 1.0, 0.0], n, [1.0, 1.0]),
                v([0.0, 1.0, 0.0], n, [0.0, 1.0]),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Axis-aligned cube centred on the origin with flat per-face normals.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        // normal, u axis, v axis for each face
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, w) in faces {
            let base = vertices.len() as u32;
            for (su, sv, uv) in [
                (-1.0, -1.0, [0.0, 1.0]),
                (1.0, -1.0, [1.0, 1.0]),
                (1.0, 1.0, [1.0, 0.0]),
                (-1.0, 1.0, [0.0, 0.0]),
            ] {
                let pos = (normal + u * su + w * sv) * h;
                vertices.push(v(pos.to_array(), normal.to_array(), uv));
            }
            indices.extend([0, 1, 2, 2, 3, 0].map(|i| base + i));
        }

        Self { vertices, indices }
    }

    pub fn sphere(radius: f32, sectors: u32, stacks: u32) -> Self {
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for stack in 0..=stacks {
            let phi = PI * stack as f32 / stacks as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for sector in 0..=sectors {
                let theta = 2.0 * PI * sector as f32 / sectors as f32;
                let normal = [ring_radius * theta.cos(), y, ring_radius * theta.sin()];
                let pos = normal.map(|c| c * radius);
                let uv = [
                    sector as f32 / sectors as f32,
                    stack as f32 / stacks as f32,
                ];
                vertices.push(v(pos, normal, uv));
            }
        }

        for stack in 0..stacks {
            for sector in 0..sectors {
                let current = stack * (sectors + 1) + sector;
                let next = current + sectors + 1;

                indices.extend([current, next, current + 1]);
                indices.extend([current + 1, next, next + 1]);
            }
        }

        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_index_is_rejected() {
        let err = Mesh::new(vec![v([0.0; 3], [0.0; 3], [0.0; 2])], vec![0, 1, 0]).unwrap_err();
        assert!(matches!(
            err,
            RenderError::InvalidMesh {
                index: 1,
                vertex_count: 1
            }
        ));
    }

    #[test]
    fn cube_has_four_vertices_per_face() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.vertices().len(), 24);
        assert_eq!(cube.indices().len(), 36);
        assert!(cube
            .vertices()
            .iter()
            .all(|v| v.pos.iter().all(|c| c.abs() == 1.0)));
    }

    #[test]
    fn cube_faces_wind_counter_clockwise_outward() {
        let cube = Mesh::cube(1.0);
        for tri in cube.indices().chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| {
                Vec3::from_array(cube.vertices()[i as usize].pos)
            });
            let face_normal = (b - a).cross(c - a).normalize();
            let stored = Vec3::from_array(cube.vertices()[tri[0] as usize].normal);
            assert!(face_normal.abs_diff_eq(stored, 1e-5));
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = Mesh::sphere(2.0, 8, 6);
        assert_eq!(sphere.vertices().len(), 9 * 7);
        assert_eq!(sphere.indices().len(), (8 * 6 * 6) as usize);
        for vertex in sphere.vertices() {
            assert!((Vec3::from_array(vertex.pos).length() - 2.0).abs() < 1e-4);
        }
    }
}
