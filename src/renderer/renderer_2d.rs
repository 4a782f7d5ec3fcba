// renderer/renderer_2d.rs
//! Batched quad renderer.
//!
//! Quads accumulate in a fixed-size scratch and go out in as few indexed
//! draws as the index budget and the sampler slots allow. A batch is flushed
//! early when the next quad would not fit or when its texture would need a
//! slot the table no longer has; the caller never sees the split.
//!
//! ```ignore
//! let mut scene = renderer.begin_scene(&mut device, &camera);
//! scene.render_quad(Vec2::new(10.0, 10.0), Vec2::splat(32.0), Vec4::ONE);
//! scene.render_sprite(&texture, Vec2::new(50.0, 10.0), Vec2::splat(64.0), Vec4::ONE);
//! scene.end_scene();
//! ```

use glam::{Mat4, Vec2, Vec4};

use crate::device::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, ShaderDescriptor, Texture,
    TextureDescriptor, TextureFilter,
};
use crate::settings::RendererSettings;

use super::batch::{quad_indices, QuadBatch, FULL_TEXTURE_UVS, UNIT_QUAD};
use super::batcher::Batcher;
use super::camera::Camera;
use super::error::RenderError;
use super::font::Font;
use super::shader;
use super::stats::RendererStats;
use super::texture_slots::TextureSlots;
use super::transform::{transform_corner, Rect, Transform2D};
use super::uniforms::SceneUniform;
use super::vertex::QuadVertex;

/// Something that knows how to draw itself into an open 2D scene.
pub trait Renderable2D {
    fn render<D: GraphicsDevice + ?Sized>(&self, scene: &mut Scene2D<'_, D>);
}

pub struct Renderer2D {
    batcher: Batcher<QuadBatch>,
    uniform_buffer: BufferId,
    scene_open: bool,
}

impl Renderer2D {
    pub fn new<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        settings: &RendererSettings,
    ) -> Result<Self, RenderError> {
        let max_quads = settings.max_sprites;
        let max_slots = settings
            .max_texture_slots
            .min(device.limits().max_texture_slots);
        if max_slots < 2 {
            return Err(RenderError::TextureSlots {
                available: max_slots,
            });
        }

        let batch = QuadBatch::new(max_quads)?;
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: "Renderer2D Vertices",
            size: batch.max_vertices() as u64 * std::mem::size_of::<QuadVertex>() as u64,
            usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
        });

        let indices = quad_indices(max_quads);
        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: "Renderer2D Indices",
            size: (indices.len() * std::mem::size_of::<u32>()) as u64,
            usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
        });
        device.write_buffer(index_buffer, bytemuck::cast_slice(&indices));

        let uniform_buffer = device.create_buffer(&BufferDescriptor {
            label: "Renderer2D Scene",
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

        let layout = QuadVertex::layout();
        let source = shader::compose(shader::QUAD_WGSL, max_slots);
        let shader = device.create_shader(&ShaderDescriptor {
            label: "Renderer2D Shader",
            source: &source,
            layout: &layout,
            uniform_buffer,
            texture_slots: max_slots,
            filter: TextureFilter::Linear,
            depth_test: false,
            alpha_blend: true,
        })?;

        log::info!(
            "Renderer2D ready: {} quads ({} vertices, {} indices) per batch, {} texture slots",
            max_quads,
            batch.max_vertices(),
            batch.max_indices(),
            max_slots
        );

        Ok(Self {
            batcher: Batcher::new(
                "Renderer2D",
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
    pub fn begin_scene<'a, D, C>(&'a mut self, device: &'a mut D, camera: &C) -> Scene2D<'a, D>
    where
        D: GraphicsDevice + ?Sized,
        C: Camera + ?Sized,
    {
        assert!(
            !self.scene_open,
            "Renderer2D::begin_scene called while another scene is still open"
        );
        self.scene_open = true;
        self.batcher.stats_mut().reset();

        SceneUniform::from_camera(camera).upload(device, self.uniform_buffer);
        self.batcher.start_batch();

        Scene2D {
            renderer: self,
            device,
            ended: false,
        }
    }

    /// Stats of the current or most recent scene.
    pub fn stats(&self) -> RendererStats {
        self.batcher.stats()
    }

    pub fn white_texture(&self) -> Texture {
        self.batcher.slots().white()
    }

    pub fn max_quads(&self) -> u32 {
        self.batcher.batch().max_quads()
    }

    pub fn max_texture_slots(&self) -> u32 {
        self.batcher.slots().max_slots()
    }

    fn submit_quad<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        transform: &Mat4,
        texture: Option<&Texture>,
        uvs: &[Vec2; 4],
        color: Vec4,
    ) {
        if !self.batcher.batch().has_room_for_quad() {
            self.batcher.force_flush(device, "index budget");
        }

        let slot = match texture {
            Some(texture) => self.batcher.resolve_slot(device, texture),
            None => 0,
        };

        let corners = [0, 1, 2, 3]
            .map(|i| QuadVertex::new(transform_corner(transform, UNIT_QUAD[i]), uvs[i], color, slot));
        self.batcher.batch_mut().push_quad(corners);

        let stats = self.batcher.stats_mut();
        stats.quad_count += 1;
        stats.vertex_count += 4;
        stats.index_count += 6;
    }
}

/// An open 2D scene. Every submit goes through this guard; ending it, or
/// dropping it, flushes what is left.
pub struct Scene2D<'a, D: GraphicsDevice + ?Sized> {
    renderer: &'a mut Renderer2D,
    device: &'a mut D,
    ended: bool,
}

impl<'a, D: GraphicsDevice + ?Sized> Scene2D<'a, D> {
    pub fn render_quad(&mut self, position: Vec2, size: Vec2, color: Vec4) {
        self.render_quad_transformed(&Transform2D::new(position, size), color);
    }

    pub fn render_quad_rotated(&mut self, position: Vec2, size: Vec2, rotation: f32, color: Vec4) {
        let transform = Transform2D::new(position, size).with_rotation(rotation);
        self.render_quad_transformed(&transform, color);
    }

    pub fn render_quad_transformed(&mut self, transform: &Transform2D, color: Vec4) {
        self.render_quad_matrix(&transform.matrix(), color);
    }

    /// Untextured quad; samples the white texture in slot 0.
    pub fn render_quad_matrix(&mut self, transform: &Mat4, color: Vec4) {
        self.renderer
            .submit_quad(self.device, transform, None, &FULL_TEXTURE_UVS, color);
    }

    pub fn render_sprite(&mut self, texture: &Texture, position: Vec2, size: Vec2, tint: Vec4) {
        self.render_sprite_matrix(
            texture,
            &Transform2D::new(position, size).matrix(),
            None,
            tint,
        );
    }

    /// Draws the `region` of `texture`, in texture pixels.
    pub fn render_sprite_region(
        &mut self,
        texture: &Texture,
        position: Vec2,
        size: Vec2,
        region: Rect,
        tint: Vec4,
    ) {
        self.render_sprite_matrix(
            texture,
            &Transform2D::new(position, size).matrix(),
            Some(region),
            tint,
        );
    }

    pub fn render_sprite_transformed(
        &mut self,
        texture: &Texture,
        transform: &Transform2D,
        region: Option<Rect>,
        tint: Vec4,
    ) {
        self.render_sprite_matrix(texture, &transform.matrix(), region, tint);
    }

    pub fn render_sprite_matrix(
        &mut self,
        texture: &Texture,
        transform: &Mat4,
        region: Option<Rect>,
        tint: Vec4,
    ) {
        let uvs = match region {
            Some(region) => region.uvs(texture.size()),
            None => FULL_TEXTURE_UVS,
        };
        self.renderer
            .submit_quad(self.device, transform, Some(texture), &uvs, tint);
    }

    /// Draws `text` at the font's native size with its baseline at
    /// `position.y`.
    pub fn render_text(&mut self, text: &str, font: &Font, position: Vec2, color: Vec4) {
        let size = Vec2::splat(font.character_size());
        self.render_text_sized(text, font, position, size, color);
    }

    /// Draws `text` with glyph metrics scaled to `size` pixels. Blank glyphs
    /// advance the pen without emitting a quad; `'\n'` starts a new line.
    pub fn render_text_sized(
        &mut self,
        text: &str,
        font: &Font,
        position: Vec2,
        size: Vec2,
        color: Vec4,
    ) {
        let scale = size / font.character_size();
        let mut pen = position;

        for c in text.chars() {
            if c == '\n' {
                pen.x = position.x;
                pen.y += font.line_height() * scale.y;
                continue;
            }

            let Some(glyph) = font.glyph(c) else {
                log::debug!("No glyph for {:?}, skipped", c);
                continue;
            };

            let top_left = Vec2::new(
                pen.x + glyph.bearing.x * scale.x,
                pen.y - glyph.bearing.y * scale.y,
            );
            let glyph_size = glyph.size * scale;
            pen += glyph.advance * scale;

            if glyph.is_blank() {
                continue;
            }

            let transform = Transform2D::new(top_left, glyph_size).matrix();
            let uvs = font.glyph_uvs(glyph);
            self.renderer
                .submit_quad(self.device, &transform, Some(font.atlas()), &uvs, color);
        }
    }

    pub fn render<R: Renderable2D + ?Sized>(&mut self, renderable: &R) {
        renderable.render(self);
    }

    /// Resets the batch without drawing it.
    pub fn start_batch(&mut self) {
        self.renderer.batcher.start_batch();
    }

    /// Draws the pending batch and starts a new one.
    pub fn flush(&mut self) {
        self.renderer.batcher.flush(self.device);
    }

    /// Splits the batch here. A flush already starts the next batch, so
    /// this is [`Self::flush`] under the name callers reach for.
    pub fn next_batch(&mut self) {
        self.flush();
    }

    pub fn stats(&self) -> RendererStats {
        self.renderer.batcher.stats()
    }

    /// Quads queued since the last flush.
    pub fn pending_quads(&self) -> u32 {
        self.renderer.batcher.batch().quad_count()
    }

    /// Slots in use by the pending batch, the white slot included.
    pub fn slots_in_use(&self) -> u32 {
        self.renderer.batcher.slots().len()
    }

    pub fn device(&mut self) -> &mut D {
        &mut *self.device
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

impl<D: GraphicsDevice + ?Sized> Drop for Scene2D<'_, D> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceLimits, RecordingDevice};
    use crate::renderer::camera::OrthographicCamera;

    fn setup(max_sprites: u32, slots: u32) -> (RecordingDevice, Renderer2D) {
        let mut device = RecordingDevice::new();
        let settings = RendererSettings {
            max_sprites,
            max_texture_slots: slots,
            ..RendererSettings::default()
        };
        let renderer = Renderer2D::new(&mut device, &settings).unwrap();
        device.clear_log();
        (device, renderer)
    }

    fn camera() -> OrthographicCamera {
        OrthographicCamera::screen(640.0, 480.0)
    }

    #[test]
    fn slot_count_is_capped_by_device_limits() {
        let mut device = RecordingDevice::with_limits(DeviceLimits {
            max_texture_slots: 8,
        });
        let renderer = Renderer2D::new(&mut device, &RendererSettings::default()).unwrap();
        assert_eq!(renderer.max_texture_slots(), 8);
    }

    #[test]
    fn single_slot_device_is_rejected() {
        let mut device = RecordingDevice::with_limits(DeviceLimits {
            max_texture_slots: 1,
        });
        let err = Renderer2D::new(&mut device, &RendererSettings::default()).err();
        assert!(matches!(err, Some(RenderError::TextureSlots { available: 1 })));
    }

    #[test]
    fn zero_sprite_budget_is_rejected() {
        let settings = RendererSettings {
            max_sprites: 0,
            ..RendererSettings::default()
        };
        let err = Renderer2D::new(&mut RecordingDevice::new(), &settings).err();
        assert!(matches!(
            err,
            Some(RenderError::Capacity {
                setting: "max_sprites",
                value: 0,
                ..
            })
        ));
    }

    #[test]
    fn sprite_budget_past_u32_indices_is_rejected() {
        let settings = RendererSettings {
            max_sprites: 1_100_000_000,
            ..RendererSettings::default()
        };
        let mut device = RecordingDevice::new();
        let err = Renderer2D::new(&mut device, &settings).err();
        assert!(matches!(err, Some(RenderError::Capacity { .. })));
        // nothing was allocated before the check
        assert_eq!(device.commands().len(), 0);
    }

    #[test]
    fn buffers_are_sized_from_the_sprite_budget() {
        let (device, renderer) = setup(25, 4);
        assert_eq!(
            device.buffer_size(renderer.batcher.vertex_buffer()),
            Some(25 * 4 * std::mem::size_of::<QuadVertex>() as u64)
        );
        assert_eq!(
            device.buffer_size(renderer.batcher.index_buffer()),
            Some(25 * 6 * 4)
        );
    }

    #[test]
    fn index_buffer_is_uploaded_once_at_init() {
        let mut device = RecordingDevice::new();
        let settings = RendererSettings {
            max_sprites: 10,
            ..RendererSettings::default()
        };
        let renderer = Renderer2D::new(&mut device, &settings).unwrap();
        let indices = crate::device::recording::decode::<u32>(
            device.last_write(renderer.batcher.index_buffer()).unwrap(),
        );
        assert_eq!(indices, quad_indices(10));
    }

    #[test]
    fn empty_scene_draws_nothing() {
        let (mut device, mut renderer) = setup(10, 4);
        let stats = renderer.begin_scene(&mut device, &camera()).end_scene();
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(device.draw_count(), 0);
    }

    #[test]
    fn dropping_the_scene_flushes() {
        let (mut device, mut renderer) = setup(10, 4);
        {
            let mut scene = renderer.begin_scene(&mut device, &camera());
            scene.render_quad(Vec2::ZERO, Vec2::ONE, Vec4::ONE);
        }
        assert_eq!(device.draw_count(), 1);

        // and the renderer accepts a new scene afterwards
        renderer.begin_scene(&mut device, &camera()).end_scene();
    }

    #[test]
    #[should_panic(expected = "still open")]
    fn leaked_scene_blocks_the_next_one() {
        let (mut device, mut renderer) = setup(10, 4);
        std::mem::forget(renderer.begin_scene(&mut device, &camera()));
        let _ = renderer.begin_scene(&mut device, &camera());
    }

    #[test]
    fn stats_reset_on_begin_scene() {
        let (mut device, mut renderer) = setup(10, 4);
        let mut scene = renderer.begin_scene(&mut device, &camera());
        scene.render_quad(Vec2::ZERO, Vec2::ONE, Vec4::ONE);
        let first = scene.end_scene();
        assert_eq!(first.quad_count, 1);

        let second = renderer.begin_scene(&mut device, &camera()).end_scene();
        assert_eq!(second, RendererStats::default());
    }

    #[test]
    fn flush_uploads_only_the_used_range() {
        let (mut device, mut renderer) = setup(100, 4);
        let mut scene = renderer.begin_scene(&mut device, &camera());
        scene.render_quad(Vec2::ZERO, Vec2::ONE, Vec4::ONE);
        scene.render_quad(Vec2::ONE, Vec2::ONE, Vec4::ONE);
        scene.end_scene();

        let draw = &device.draws()[0];
        assert_eq!(draw.index_count, 12);
        assert_eq!(draw.vertices::<QuadVertex>().len(), 8);
    }

    #[test]
    fn sprite_region_maps_to_normalised_uvs() {
        let (mut device, mut renderer) = setup(10, 4);
        let sheet = device.solid_texture(64, 32, [255; 4]).unwrap();

        let mut scene = renderer.begin_scene(&mut device, &camera());
        scene.render_sprite_region(
            &sheet,
            Vec2::ZERO,
            Vec2::splat(16.0),
            Rect::new(16.0, 8.0, 16.0, 8.0),
            Vec4::ONE,
        );
        scene.end_scene();

        let vertices = device.draws()[0].vertices::<QuadVertex>();
        assert_eq!(vertices[0].tex_coord, [0.25, 0.25]);
        assert_eq!(vertices[2].tex_coord, [0.5, 0.5]);
        assert_eq!(vertices[0].tex_index, 1.0);
    }

    #[test]
    fn text_skips_blank_and_unknown_glyphs() {
        let (mut device, mut renderer) = setup(10, 4);
        let atlas = device.solid_texture(64, 16, [255; 4]).unwrap();
        let font = Font::monospace_strip(atlas, Vec2::splat(16.0), "AB C");

        let mut scene = renderer.begin_scene(&mut device, &camera());
        scene.render_text("A B?C", &font, Vec2::new(0.0, 16.0), Vec4::ONE);
        let stats = scene.end_scene();

        assert_eq!(stats.quad_count, 3);
        let vertices = device.draws()[0].vertices::<QuadVertex>();
        // A at x 0, B after one space cell, C after the unknown '?'
        assert_eq!(vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(vertices[4].position, [32.0, 0.0, 0.0]);
        assert_eq!(vertices[8].position, [48.0, 0.0, 0.0]);
    }

    #[test]
    fn newline_returns_pen_and_moves_down() {
        let (mut device, mut renderer) = setup(10, 4);
        let atlas = device.solid_texture(32, 16, [255; 4]).unwrap();
        let font = Font::monospace_strip(atlas, Vec2::splat(16.0), "AB");

        let mut scene = renderer.begin_scene(&mut device, &camera());
        scene.render_text_sized("A\nB", &font, Vec2::new(4.0, 16.0), Vec2::splat(32.0), Vec4::ONE);
        scene.end_scene();

        let vertices = device.draws()[0].vertices::<QuadVertex>();
        // scale 2: first glyph top at 16 - 32, second line 32 lower
        assert_eq!(vertices[0].position, [4.0, -16.0, 0.0]);
        assert_eq!(vertices[2].position, [36.0, 16.0, 0.0]);
        assert_eq!(vertices[4].position, [4.0, 16.0, 0.0]);
    }

    struct Checkerboard {
        cells: u32,
    }

    impl Renderable2D for Checkerboard {
        fn render<D: GraphicsDevice + ?Sized>(&self, scene: &mut Scene2D<'_, D>) {
            for i in 0..self.cells {
                scene.render_quad(Vec2::new(i as f32, 0.0), Vec2::ONE, Vec4::ONE);
            }
        }
    }

    #[test]
    fn renderables_submit_through_the_scene() {
        let (mut device, mut renderer) = setup(10, 4);
        let mut scene = renderer.begin_scene(&mut device, &camera());
        scene.render(&Checkerboard { cells: 5 });
        assert_eq!(scene.pending_quads(), 5);
        scene.end_scene();
        assert_eq!(device.draw_count(), 1);
    }
}
