// renderer/uniforms.rs
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::device::{BufferId, GraphicsDevice};

use super::camera::Camera;

/// Camera state shared by every draw of one scene.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct SceneUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub _padding: f32,
}

impl SceneUniform {
    pub fn new() -> Self {
        Self {
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            camera_position: [0.0; 3],
            _padding: 0.0,
        }
    }

    pub fn from_camera<C: Camera + ?Sized>(camera: &C) -> Self {
        Self {
            projection: camera.projection().to_cols_array_2d(),
            view: camera.view().to_cols_array_2d(),
            camera_position: camera.position().to_array(),
            _padding: 0.0,
        }
    }

    pub fn upload<D: GraphicsDevice + ?Sized>(&self, device: &mut D, buffer: BufferId) {
        device.write_buffer(buffer, bytemuck::bytes_of(self));
    }
}

impl Default for SceneUniform {
    fn default() -> Self {
        Self::new()
    }
}
