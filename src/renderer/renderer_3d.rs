// renderer/renderer_3d.rs
//! Batched mesh renderer.
//!
//! Meshes are transformed on the CPU at submit time so one draw can mix any
//! number of them. Batching follows the quad renderer: fixed vertex and index
//! budgets, the same texture slot table, and a flush whenever either runs
//! out.

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::device::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, ShaderDescriptor, Texture,
    TextureDescriptor, TextureFilter,
};
use crate::settings::RendererSettings;

use super::batcher::Batcher;
use super::camera::Camera;
use super::error::RenderError;
use super::mesh::Mesh;
use super::mesh_batch::MeshBatch;
use super::shader;
use super::stats::RendererStats;
use super::texture_slots::TextureSlots;
use super::uniforms::SceneUniform;
use super::vertex::MeshVertex;

pub struct Renderer3D {
    batcher: Batcher<MeshBatch>,
    uniform_buffer: BufferId,
    scene_open: bool,
}

impl Renderer3D {
    pub fn new<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        settings: &RendererSettings,
    ) -> Result<Self, RenderError> {
        let max_slots = settings
            .max_texture_slots
            .min(device.limits().max_texture_slots);
        if max_slots < 2 {
            return Err(RenderError::TextureSlots {
                available: max_slots,
            });
        }

        let batch = MeshBatch::new(settings.max_mesh_vertices, settings.max_mesh_indices)?;
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: "Renderer3D Vertices",
            size: batch.max_vertices() as u64 * std::mem::size_of::<MeshVertex>() as u64,
            usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
        });
        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: "Renderer3D Indices",
            size: batch.max_indices() as u64 * std::mem::size_of::<u32>() as u64,
            usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
        });
        let uniform_buffer = device.create_buffer(&BufferDescriptor {
            label: "Renderer3D Scene",
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        });

        let white = device.create_texture(
            &TextureDescriptor {
                label: "White",
                width: 1,
                height: 1,
            },
            &[255, 255, 255, 255],
        )?;

        let layout = MeshVertex::layout();
        let source = shader::compose(shader::MESH_WGSL, max_slots);
        let shader = device.create_shader(&ShaderDescriptor {
            label: "Renderer3D Shader",
            source: &source,
            layout: &layout,
            uniform_buffer,
            texture_slots: max_slots,
            filter: TextureFilter::Linear,
            depth_test: true,
            alpha_blend: false,
        })?;

        log::info!(
            "Renderer3D ready: {} vertices, {} indices per batch, {} texture slots",
            batch.max_vertices(),
            batch.max_indices(),
            max_slots
        );

        Ok(Self {
            batcher: Batcher::new(
                "Renderer3D",
                batch,
                TextureSlots::new(white, max_slots),
                vertex_buffer,
                index_buffer,
                shader,
            ),
            uniform_buffer,
            scene_open: false,
        })
    }

    /// Uploads the camera and opens a scene.
    ///
    /// Panics if a previous scene guard was leaked without ending.
    pub fn begin_scene<'a, D, C>(&'a mut self, device: &'a mut D, camera: &C) -> Scene3D<'a, D>
    where
        D: GraphicsDevice + ?Sized,
        C: Camera + ?Sized,
    {
        assert!(
            !self.scene_open,
            "Renderer3D::begin_scene called while another scene is still open"
        );
        self.scene_open = true;
        self.batcher.stats_mut().reset();

        SceneUniform::from_camera(camera).upload(device, self.uniform_buffer);
        self.batcher.start_batch();

        Scene3D {
            renderer: self,
            device,
            ended: false,
        }
    }

    pub fn stats(&self) -> RendererStats {
        self.batcher.stats()
    }

    pub fn white_texture(&self) -> Texture {
        self.batcher.slots().white()
    }

    fn submit_mesh<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        mesh: &Mesh,
        transform: &Mat4,
        texture: Option<&Texture>,
        color: Vec4,
    ) -> Result<(), RenderError> {
        let (vertex_count, index_count) = (mesh.vertices().len(), mesh.indices().len());
        let batch = self.batcher.batch();
        if !batch.fits_at_all(vertex_count, index_count) {
            return Err(RenderError::MeshTooLarge {
                vertices: vertex_count,
                indices: index_count,
                max_vertices: batch.max_vertices(),
                max_indices: batch.max_indices(),
            });
        }
        if index_count == 0 {
            return Ok(());
        }

        if !self.batcher.batch().has_room_for(vertex_count, index_count) {
            self.batcher.force_flush(device, "mesh budget");
        }

        let slot = match texture {
            Some(texture) => self.batcher.resolve_slot(device, texture),
            None => 0,
        };

        let normal_matrix = Mat3::from_mat4(*transform).inverse().transpose();
        let color = color.to_array();
        let vertices = mesh.vertices().iter().map(|v| MeshVertex {
            position: transform
                .transform_point3(Vec3::from_array(v.pos))
                .to_array(),
            normal: (normal_matrix * Vec3::from_array(v.normal))
                .normalize_or_zero()
                .to_array(),
            tex_coord: v.uv,
            color,
            tex_index: slot as f32,
        });
        self.batcher.batch_mut().push_mesh(vertices, mesh.indices());

        let stats = self.batcher.stats_mut();
        stats.mesh_count += 1;
        stats.vertex_count += vertex_count as u32;
        stats.index_count += index_count as u32;
        Ok(())
    }
}

/// An open 3D scene; ending or dropping it flushes what is left.
pub struct Scene3D<'a, D: GraphicsDevice + ?Sized> {
    renderer: &'a mut Renderer3D,
    device: &'a mut D,
    ended: bool,
}

impl<'a, D: GraphicsDevice + ?Sized> Scene3D<'a, D> {
    /// Queues `mesh` placed by `transform`. Meshes larger than a whole batch
    /// are refused with [`RenderError::MeshTooLarge`].
    pub fn submit_mesh(
        &mut self,
        mesh: &Mesh,
        transform: &Mat4,
        texture: Option<&Texture>,
        color: Vec4,
    ) -> Result<(), RenderError> {
        self.renderer
            .submit_mesh(self.device, mesh, transform, texture, color)
    }

    /// Resets the batch without drawing it.
    pub fn start_batch(&mut self) {
        self.renderer.batcher.start_batch();
    }

    pub fn flush(&mut self) {
        self.renderer.batcher.flush(self.device);
    }

    /// Same as [`Self::flush`]; a flush already starts the next batch.
    pub fn next_batch(&mut self) {
        self.flush();
    }

    pub fn stats(&self) -> RendererStats {
        self.renderer.batcher.stats()
    }

    pub fn pending_indices(&self) -> u32 {
        self.renderer.batcher.batch().index_count()
    }

    pub fn end_scene(mut self) -> RendererStats {
        self.finish();
        self.renderer.batcher.stats()
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.renderer.batcher.flush(self.device);
        self.renderer.scene_open = false;
    }
}

impl<D: GraphicsDevice + ?Sized> Drop for Scene3D<'_, D> {
    fn drop(&mut self) {
        self.finish();
    }
}
