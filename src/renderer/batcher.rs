// renderer/batcher.rs
//! Flush and slot policy shared by the quad and mesh renderers.
//!
//! A [`Batcher`] owns one CPU scratch, the texture slot table and the GPU
//! buffers the scratch is drawn from. Renderers decide what goes into the
//! scratch; the batcher decides when it goes out.

use crate::device::{BufferId, DrawIndexed, GraphicsDevice, ShaderId, Texture};

use super::stats::RendererStats;
use super::texture_slots::{SlotResolution, TextureSlots};

/// CPU-side scratch a [`Batcher`] can draw.
pub(crate) trait BatchStorage {
    fn is_empty(&self) -> bool;
    fn vertex_count(&self) -> u32;
    fn index_count(&self) -> u32;
    fn reset(&mut self);
    /// Writes the used range of the scratch into the draw buffers.
    fn upload<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
    );
}

#[derive(Debug)]
pub(crate) struct Batcher<B> {
    label: &'static str,
    batch: B,
    slots: TextureSlots,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    shader: ShaderId,
    stats: RendererStats,
}

impl<B: BatchStorage> Batcher<B> {
    pub fn new(
        label: &'static str,
        batch: B,
        slots: TextureSlots,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        shader: ShaderId,
    ) -> Self {
        Self {
            label,
            batch,
            slots,
            vertex_buffer,
            index_buffer,
            shader,
            stats: RendererStats::default(),
        }
    }

    pub fn batch(&self) -> &B {
        &self.batch
    }

    pub fn batch_mut(&mut self) -> &mut B {
        &mut self.batch
    }

    pub fn slots(&self) -> &TextureSlots {
        &self.slots
    }

    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    pub fn stats_mut(&mut self) -> &mut RendererStats {
        &mut self.stats
    }

    #[cfg(test)]
    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    #[cfg(test)]
    pub fn index_buffer(&self) -> BufferId {
        self.index_buffer
    }

    /// Empties the scratch and reseeds the slot table with white only.
    pub fn start_batch(&mut self) {
        self.batch.reset();
        self.slots.reset();
    }

    /// Draws whatever the batch holds, then starts a new one. Empty batches
    /// issue nothing.
    pub fn flush<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        if !self.batch.is_empty() {
            self.batch
                .upload(device, self.vertex_buffer, self.index_buffer);
            device.bind_shader(self.shader);
            for (slot, texture) in self.slots.iter() {
                device.bind_texture(texture.id(), slot);
            }
            device.draw_indexed(&DrawIndexed {
                vertex_buffer: self.vertex_buffer,
                index_buffer: self.index_buffer,
                index_count: self.batch.index_count(),
            });

            self.stats.draw_calls += 1;
            log::debug!(
                "{} flush: {} vertices, {} indices, {} texture slots",
                self.label,
                self.batch.vertex_count(),
                self.batch.index_count(),
                self.slots.len()
            );
        }

        self.start_batch();
    }

    /// Flushes mid-scene because a budget ran out.
    pub fn force_flush<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, budget: &str) {
        log::trace!("{} {} exhausted, flushing", self.label, budget);
        self.stats.forced_flushes += 1;
        self.flush(device);
    }

    /// Slot for `texture` in the current batch, flushing first when the
    /// table has no slot left for it.
    pub fn resolve_slot<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        texture: &Texture,
    ) -> u32 {
        match self.slots.resolve(texture) {
            SlotResolution::Existing(slot) | SlotResolution::Inserted(slot) => slot,
            SlotResolution::Full => {
                self.force_flush(device, "texture slots");
                self.slots.insert_fresh(texture)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{
        BufferDescriptor, BufferUsage, RecordingDevice, ShaderDescriptor, TextureFilter,
    };
    use crate::renderer::batch::{QuadBatch, UNIT_QUAD};
    use crate::renderer::vertex::QuadVertex;
    use glam::Vec4;

    fn batcher(device: &mut RecordingDevice, max_slots: u32) -> Batcher<QuadBatch> {
        let white = device.solid_texture(1, 1, [255; 4]).unwrap();
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: "vb",
            size: 4096,
            usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
        });
        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: "ib",
            size: 4096,
            usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
        });
        let layout = QuadVertex::layout();
        let shader = device
            .create_shader(&ShaderDescriptor {
                label: "test",
                source: "",
                layout: &layout,
                uniform_buffer: vertex_buffer,
                texture_slots: max_slots,
                filter: TextureFilter::Linear,
                depth_test: false,
                alpha_blend: true,
            })
            .unwrap();
        Batcher::new(
            "Test",
            QuadBatch::new(8).unwrap(),
            TextureSlots::new(white, max_slots),
            vertex_buffer,
            index_buffer,
            shader,
        )
    }

    fn push(batcher: &mut Batcher<QuadBatch>, slot: u32) {
        let corners = UNIT_QUAD.map(|c| QuadVertex::new(c.extend(0.0), c, Vec4::ONE, slot));
        batcher.batch_mut().push_quad(corners);
    }

    #[test]
    fn flush_on_empty_batch_still_resets_slots() {
        let mut device = RecordingDevice::new();
        let mut batcher = batcher(&mut device, 4);
        let texture = device.solid_texture(1, 1, [0; 4]).unwrap();
        device.clear_log();

        batcher.resolve_slot(&mut device, &texture);
        assert_eq!(batcher.slots().len(), 2);

        batcher.flush(&mut device);
        assert_eq!(device.draw_count(), 0);
        assert_eq!(batcher.slots().len(), 1);
    }

    #[test]
    fn full_slot_table_forces_one_flush() {
        let mut device = RecordingDevice::new();
        let mut batcher = batcher(&mut device, 2);
        let a = device.solid_texture(1, 1, [1; 4]).unwrap();
        let b = device.solid_texture(1, 1, [2; 4]).unwrap();
        device.clear_log();

        let slot = batcher.resolve_slot(&mut device, &a);
        push(&mut batcher, slot);
        assert_eq!(batcher.resolve_slot(&mut device, &b), 1);

        assert_eq!(device.draw_count(), 1);
        assert_eq!(batcher.stats().forced_flushes, 1);
        assert_eq!(batcher.stats().draw_calls, 1);
        assert!(batcher.batch().is_empty());
        assert_eq!(device.draws()[0].bound_textures()[1], a.id());
    }
}
