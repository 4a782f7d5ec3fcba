// device/mod.rs
//! The seam between the batching renderers and a graphics backend.
//!
//! Renderers only ever talk to a [`GraphicsDevice`]: they create a handful of
//! buffers, one shader and some textures up front, then every flush is a
//! buffer write, a shader bind, one texture bind per slot in use and a single
//! indexed draw. Resources are referred to by small integer ids that compare
//! by value, so slot resolution never depends on how a backend owns them.
//!
//! Binding convention every backend follows:
//! - group 0, binding 0: the uniform buffer passed in [`ShaderDescriptor`]
//! - group 1, binding 0: the shader's sampler
//! - group 1, binding `1 + n`: the texture bound to slot `n`

pub mod layout;
pub mod recording;
pub mod texture_file;
pub mod wgpu_backend;

use std::fmt;

use bitflags::bitflags;

pub use layout::{BufferElement, BufferLayout, VertexFormat};
pub use recording::{DeviceCommand, DrawRecord, RecordingDevice};
pub use texture_file::{load_texture, texture_from_memory};
pub use wgpu_backend::WgpuDevice;

/// Hard upper bound on sampler slots any backend exposes.
pub const MAX_SUPPORTED_TEXTURE_SLOTS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub(crate) u32);

impl BufferId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TextureId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ShaderId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const COPY_DST = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
}

/// A texture as the renderers see it: an identity plus the dimensions used
/// to normalise sub-rectangles into UVs.
///
/// Two textures are equal when they name the same device resource, whatever
/// their dimensions claim.
#[derive(Debug, Clone, Copy)]
pub struct Texture {
    id: TextureId,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new(id: TextureId, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> glam::Vec2 {
        glam::Vec2::new(self.width as f32, self.height as f32)
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Texture {}

impl std::hash::Hash for Texture {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone)]
pub struct ShaderDescriptor<'a> {
    pub label: &'a str,
    /// WGSL source, including the texture slot prelude.
    pub source: &'a str,
    pub layout: &'a BufferLayout,
    pub uniform_buffer: BufferId,
    pub texture_slots: u32,
    pub filter: TextureFilter,
    pub depth_test: bool,
    pub alpha_blend: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexed {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub index_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_texture_slots: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_texture_slots: 16,
        }
    }
}

pub trait GraphicsDevice {
    fn limits(&self) -> DeviceLimits;

    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> BufferId;

    /// Writes `data` at offset zero. Only the given range is uploaded.
    fn write_buffer(&mut self, buffer: BufferId, data: &[u8]);

    /// Creates a texture from tightly packed RGBA8 pixels.
    fn create_texture(
        &mut self,
        desc: &TextureDescriptor<'_>,
        rgba: &[u8],
    ) -> Result<Texture, DeviceError>;

    fn create_shader(&mut self, desc: &ShaderDescriptor<'_>) -> Result<ShaderId, DeviceError>;

    fn bind_shader(&mut self, shader: ShaderId);

    fn bind_texture(&mut self, texture: TextureId, slot: u32);

    /// Issues one indexed draw with the bound shader and texture slots.
    fn draw_indexed(&mut self, draw: &DrawIndexed);
}

/// Checks the descriptor and pixel payload every backend accepts.
pub(crate) fn validate_texture_data(
    desc: &TextureDescriptor<'_>,
    rgba: &[u8],
) -> Result<(), DeviceError> {
    if desc.width == 0 || desc.height == 0 {
        return Err(DeviceError::InvalidTextureSize {
            width: desc.width,
            height: desc.height,
        });
    }

    let expected = desc.width as usize * desc.height as usize * 4;
    if rgba.len() != expected {
        return Err(DeviceError::TextureDataSize {
            expected,
            actual: rgba.len(),
        });
    }

    Ok(())
}

#[derive(Debug)]
pub enum DeviceError {
    AdapterUnavailable,
    DeviceRequest(String),
    Surface(String),
    TextureLoad { path: String, reason: String },
    InvalidTextureSize { width: u32, height: u32 },
    TextureDataSize { expected: usize, actual: usize },
    InvalidShader(String),
    UnknownResource(&'static str),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::AdapterUnavailable => write!(f, "no suitable graphics adapter found"),
            DeviceError::DeviceRequest(reason) => {
                write!(f, "failed to create graphics device: {reason}")
            }
            DeviceError::Surface(reason) => write!(f, "surface error: {reason}"),
            DeviceError::TextureLoad { path, reason } => {
                write!(f, "failed to load texture {path:?}: {reason}")
            }
            DeviceError::InvalidTextureSize { width, height } => {
                write!(f, "invalid texture size {width}x{height}")
            }
            DeviceError::TextureDataSize { expected, actual } => write!(
                f,
                "texture data has {actual} bytes, expected {expected} (RGBA8)"
            ),
            DeviceError::InvalidShader(reason) => write!(f, "invalid shader: {reason}"),
            DeviceError::UnknownResource(kind) => write!(f, "unknown {kind} handle"),
        }
    }
}

impl std::error::Error for DeviceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_equality_is_identity_only() {
        let a = Texture::new(TextureId(3), 16, 16);
        let b = Texture::new(TextureId(3), 32, 8);
        let c = Texture::new(TextureId(4), 16, 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn texture_data_must_match_dimensions() {
        let desc = TextureDescriptor {
            label: "t",
            width: 2,
            height: 2,
        };
        assert!(validate_texture_data(&desc, &[0; 16]).is_ok());
        assert!(matches!(
            validate_texture_data(&desc, &[0; 15]),
            Err(DeviceError::TextureDataSize {
                expected: 16,
                actual: 15
            })
        ));

        let empty = TextureDescriptor {
            label: "t",
            width: 0,
            height: 4,
        };
        assert!(matches!(
            validate_texture_data(&empty, &[]),
            Err(DeviceError::InvalidTextureSize { .. })
        ));
    }
}
