// renderer/transform.rs
use glam::{Mat4, Vec2, Vec3};

/// Placement of a 2D quad: the unit quad is scaled to `size`, rotated about
/// `origin` and moved to `position`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    pub position: Vec2,
    pub size: Vec2,
    /// Degrees, counter-clockwise in a Y-up world.
    pub rotation: f32,
    /// Pivot relative to `position`, in world units.
    pub origin: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            size: Vec2::ONE,
            rotation: 0.0,
            origin: Vec2::ZERO,
        }
    }
}

impl Transform2D {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// Rotates about the centre of the quad.
    pub fn centered(self) -> Self {
        let size = self.size;
        self.with_origin(size * 0.5)
    }

    pub fn matrix(&self) -> Mat4 {
        let origin = self.origin.extend(0.0);
        Mat4::from_translation(self.position.extend(0.0))
            * Mat4::from_translation(origin)
            * Mat4::from_rotation_z(self.rotation.to_radians())
            * Mat4::from_translation(-origin)
            * Mat4::from_scale(self.size.extend(1.0))
    }
}

/// Sub-rectangle of a texture in pixels, top-left anchored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    /// Corner UVs in unit-quad order, normalised by `texture_size`.
    pub fn uvs(&self, texture_size: Vec2) -> [Vec2; 4] {
        let min = self.min() / texture_size;
        let max = (self.min() + self.size()) / texture_size;
        [
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, max.y),
        ]
    }
}

pub(crate) fn transform_corner(transform: &Mat4, corner: Vec2) -> Vec3 {
    transform.transform_point3(corner.extend(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        assert!(Transform2D::default()
            .matrix()
            .abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn scale_then_translate() {
        let m = Transform2D::new(Vec2::new(10.0, 20.0), Vec2::new(4.0, 2.0)).matrix();
        let p = transform_corner(&m, Vec2::new(1.0, 1.0));
        assert!(p.abs_diff_eq(Vec3::new(14.0, 22.0, 0.0), 1e-6));
    }

    #[test]
    fn rotation_pivots_about_origin() {
        let t = Transform2D::new(Vec2::ZERO, Vec2::new(2.0, 2.0))
            .with_rotation(180.0)
            .centered();
        let m = t.matrix();
        // the centre stays put, opposite corners swap
        assert!(transform_corner(&m, Vec2::splat(0.5)).abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        assert!(transform_corner(&m, Vec2::ZERO).abs_diff_eq(Vec3::new(2.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn rect_uvs_normalise_by_texture_size() {
        let uvs = Rect::new(32.0, 0.0, 32.0, 16.0).uvs(Vec2::new(128.0, 64.0));
        assert_eq!(uvs[0], Vec2::new(0.25, 0.0));
        assert_eq!(uvs[1], Vec2::new(0.5, 0.0));
        assert_eq!(uvs[2], Vec2::new(0.5, 0.25));
        assert_eq!(uvs[3], Vec2::new(0.25, 0.25));
    }
}
