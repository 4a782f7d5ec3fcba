// renderer/error.rs
use std::fmt;

use crate::device::DeviceError;

#[derive(Debug)]
pub enum RenderError {
    Device(DeviceError),
    /// The device exposes fewer than the two sampler slots batching needs.
    TextureSlots { available: u32 },
    /// A batch capacity setting the renderer cannot allocate or address.
    Capacity {
        setting: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    /// A single mesh does not fit in an empty batch.
    MeshTooLarge {
        vertices: usize,
        indices: usize,
        max_vertices: u32,
        max_indices: u32,
    },
    InvalidMesh { index: u32, vertex_count: usize },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Device(err) => write!(f, "graphics device error: {err}"),
            RenderError::TextureSlots { available } => write!(
                f,
                "batching needs at least 2 texture slots, device offers {available}"
            ),
            RenderError::Capacity {
                setting,
                value,
                min,
                max,
            } => write!(f, "{setting} = {value} is outside the supported range {min}..={max}"),
            RenderError::MeshTooLarge {
                vertices,
                indices,
                max_vertices,
                max_indices,
            } => write!(
                f,
                "mesh with {vertices} vertices and {indices} indices exceeds batch capacity \
                 of {max_vertices} vertices and {max_indices} indices"
            ),
            RenderError::InvalidMesh {
                index,
                vertex_count,
            } => write!(
                f,
                "mesh index {index} is out of range for {vertex_count} vertices"
            ),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        RenderError::Device(err)
    }
}
