// renderer/texture_slots.rs
//! Per-batch assignment of textures to sampler slots.
//!
//! Slot 0 always holds the renderer's 1x1 white texture so untextured quads
//! never take a slot of their own. Every other texture gets the first free
//! slot the first time a batch sees it, and keeps it until the batch is
//! reset.

use crate::device::Texture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResolution {
    /// Already bound in this batch.
    Existing(u32),
    /// Newly assigned to this slot.
    Inserted(u32),
    /// Not bound and no slot left; the batch has to be flushed first.
    Full,
}

impl SlotResolution {
    pub fn slot(self) -> Option<u32> {
        match self {
            SlotResolution::Existing(slot) | SlotResolution::Inserted(slot) => Some(slot),
            SlotResolution::Full => None,
        }
    }
}

#[derive(Debug)]
pub struct TextureSlots {
    slots: Vec<Texture>,
    max_slots: u32,
}

impl TextureSlots {
    pub fn new(white: Texture, max_slots: u32) -> Self {
        assert!(
            max_slots >= 2,
            "texture slot table needs room for the white texture and one more, got {max_slots}"
        );
        let mut slots = Vec::with_capacity(max_slots as usize);
        slots.push(white);
        Self { slots, max_slots }
    }

    pub fn white(&self) -> Texture {
        self.slots[0]
    }

    pub fn max_slots(&self) -> u32 {
        self.max_slots
    }

    /// Slots in use, the white slot included.
    pub fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.max_slots
    }

    /// Drops every texture but the white one.
    pub fn reset(&mut self) {
        self.slots.truncate(1);
    }

    pub fn resolve(&mut self, texture: &Texture) -> SlotResolution {
        if *texture == self.slots[0] {
            return SlotResolution::Existing(0);
        }

        if let Some(slot) = self.slots[1..].iter().position(|bound| bound == texture) {
            return SlotResolution::Existing(slot as u32 + 1);
        }

        if self.is_full() {
            return SlotResolution::Full;
        }

        self.slots.push(*texture);
        SlotResolution::Inserted(self.len() - 1)
    }

    /// Resolves `texture` in a table that was just reset.
    pub fn insert_fresh(&mut self, texture: &Texture) -> u32 {
        let max_slots = self.max_slots;
        self.resolve(texture).slot().unwrap_or_else(|| {
            panic!("texture slot table full right after a reset ({max_slots} slots)")
        })
    }

    /// `(slot, texture)` for every slot in use, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Texture)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(slot, texture)| (slot as u32, texture))
    }
}
