// renderer/camera.rs
use glam::{Mat4, Quat, Vec2, Vec3};

/// Anything a scene can be viewed through.
pub trait Camera {
    fn projection(&self) -> Mat4;

    fn view(&self) -> Mat4;

    fn position(&self) -> Vec3 {
        self.view().inverse().w_axis.truncate()
    }

    fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// 2D camera over an axis-aligned world rectangle.
#[derive(Clone, Copy, Debug)]
pub struct OrthographicCamera {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub position: Vec3,
    /// Degrees, counter-clockwise around +Z.
    pub rotation: f32,
}

impl OrthographicCamera {
    pub fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
            position: Vec3::ZERO,
            rotation: 0.0,
        }
    }

    /// Pixel coordinates with the origin top-left and Y growing downward.
    pub fn screen(width: f32, height: f32) -> Self {
        Self::new(0.0, width, height, 0.0)
    }

    pub fn set_bounds(&mut self, left: f32, right: f32, bottom: f32, top: f32) {
        self.left = left;
        self.right = right;
        self.bottom = bottom;
        self.top = top;
    }
}

impl Camera for OrthographicCamera {
    fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(self.left, self.right, self.bottom, self.top, -1.0, 1.0)
    }

    fn view(&self) -> Mat4 {
        let transform = Mat4::from_translation(self.position)
            * Mat4::from_rotation_z(self.rotation.to_radians());
        transform.inverse()
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PerspectiveCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_radians: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera for PerspectiveCamera {
    fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, self.aspect, self.near, self.far)
    }

    fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    fn position(&self) -> Vec3 {
        self.eye
    }
}

/// Orbit camera circling a focal point.
#[derive(Clone, Copy, Debug)]
pub struct EditorCamera {
    pub focal_point: Vec3,
    pub distance: f32,
    /// Radians around world Y.
    pub yaw: f32,
    /// Radians around the camera's right axis.
    pub pitch: f32,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for EditorCamera {
    fn default() -> Self {
        Self {
            focal_point: Vec3::ZERO,
            distance: 10.0,
            yaw: 0.0,
            pitch: 0.0,
            fov_y_radians: 45f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl EditorCamera {
    const MIN_DISTANCE: f32 = 0.1;

    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(-self.yaw) * Quat::from_rotation_x(-self.pitch)
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.orientation() * Vec3::Y
    }

    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-limit, limit);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta).max(Self::MIN_DISTANCE);
    }

    /// Moves the focal point in the view plane, scaled by distance.
    pub fn pan(&mut self, delta: Vec2) {
        let scale = self.distance * 0.1;
        self.focal_point += (-self.right() * delta.x + self.up() * delta.y) * scale;
    }
}

impl Camera for EditorCamera {
    fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, self.aspect, self.near, self.far)
    }

    fn view(&self) -> Mat4 {
        let transform = Mat4::from_rotation_translation(self.orientation(), self.position());
        transform.inverse()
    }

    fn position(&self) -> Vec3 {
        self.focal_point - self.forward() * self.distance
    }
}

/// A projection viewed from wherever an object's transform puts it.
#[derive(Clone, Copy, Debug)]
pub struct TransformCamera {
    pub projection: Mat4,
    pub transform: Mat4,
}

impl TransformCamera {
    pub fn new(projection: Mat4, transform: Mat4) -> Self {
        Self {
            projection,
            transform,
        }
    }
}

impl Camera for TransformCamera {
    fn projection(&self) -> Mat4 {
        self.projection
    }

    fn view(&self) -> Mat4 {
        self.transform.inverse()
    }

    fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }
}
