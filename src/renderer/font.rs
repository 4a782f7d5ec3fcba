// renderer/font.rs
//! Glyph metrics for text drawn through the quad batch.
//!
//! Atlases are a single row of glyph bitmaps. A glyph's texture rectangle is
//! `tex_offset .. tex_offset + size.x / atlas_width` horizontally and
//! `0 .. size.y / atlas_height` vertically.

use std::collections::HashMap;

use glam::Vec2;

use crate::device::Texture;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    /// Bitmap size in atlas pixels; zero for glyphs with nothing to draw.
    pub size: Vec2,
    /// Offset from the pen to the bitmap's left edge (x) and from the
    /// baseline up to its top edge (y).
    pub bearing: Vec2,
    /// Pen movement after the glyph.
    pub advance: Vec2,
    /// Left edge of the bitmap as a normalised atlas coordinate.
    pub tex_offset: f32,
}

impl Glyph {
    pub fn is_blank(&self) -> bool {
        self.size.x == 0.0 || self.size.y == 0.0
    }
}

#[derive(Debug, Clone)]
pub struct Font {
    atlas: Texture,
    glyphs: HashMap<char, Glyph>,
    character_size: f32,
    line_height: f32,
}

impl Font {
    /// An empty font; `character_size` is the pixel height glyph metrics
    /// were authored at.
    pub fn new(atlas: Texture, character_size: f32) -> Self {
        Self {
            atlas,
            glyphs: HashMap::new(),
            character_size,
            line_height: character_size,
        }
    }

    /// Builds a fixed-width font from an atlas holding one `cell`-sized
    /// bitmap per character of `characters`, left to right. Whitespace
    /// characters keep their cell but draw nothing.
    pub fn monospace_strip(atlas: Texture, cell: Vec2, characters: &str) -> Self {
        let mut font = Self::new(atlas, cell.y);
        let atlas_width = atlas.size().x;

        for (index, c) in characters.chars().enumerate() {
            let glyph = if c.is_whitespace() {
                Glyph {
                    size: Vec2::ZERO,
                    bearing: Vec2::ZERO,
                    advance: Vec2::new(cell.x, 0.0),
                    tex_offset: 0.0,
                }
            } else {
                Glyph {
                    size: cell,
                    bearing: Vec2::new(0.0, cell.y),
                    advance: Vec2::new(cell.x, 0.0),
                    tex_offset: index as f32 * cell.x / atlas_width,
                }
            };
            font.insert_glyph(c, glyph);
        }

        log::info!(
            "Built monospace font: {} glyphs, {}x{} cells",
            font.glyphs.len(),
            cell.x,
            cell.y
        );
        font
    }

    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height;
        self
    }

    pub fn insert_glyph(&mut self, c: char, glyph: Glyph) {
        self.glyphs.insert(c, glyph);
    }

    pub fn glyph(&self, c: char) -> Option<&Glyph> {
        self.glyphs.get(&c)
    }

    pub fn atlas(&self) -> &Texture {
        &self.atlas
    }

    pub fn atlas_size(&self) -> Vec2 {
        self.atlas.size()
    }

    pub fn character_size(&self) -> f32 {
        self.character_size
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// UVs of `glyph` in unit-quad corner order.
    pub fn glyph_uvs(&self, glyph: &Glyph) -> [Vec2; 4] {
        let atlas = self.atlas_size();
        let x1 = glyph.tex_offset;
        let x2 = glyph.tex_offset + glyph.size.x / atlas.x;
        let y1 = 0.0;
        let y2 = glyph.size.y / atlas.y;
        [
            Vec2::new(x1, y1),
            Vec2::new(x2, y1),
            Vec2::new(x2, y2),
            Vec2::new(x1, y2),
        ]
    }

    /// Width of the widest line of `text` drawn at `size` pixels.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let scale = size / self.character_size;
        text.split('\n')
            .map(|line| {
                line.chars()
                    .filter_map(|c| self.glyph(c))
                    .map(|g| g.advance.x * scale)
                    .sum::<f32>()
            })
            .fold(0.0, f32::max)
    }
}
