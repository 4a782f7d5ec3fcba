// device/texture_file.rs

use std::path::Path;

use super::{DeviceError, GraphicsDevice, Texture, TextureDescriptor};

/// Decodes an image file into RGBA8 and uploads it through `device`.
pub fn load_texture<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    path: impl AsRef<Path>,
) -> Result<Texture, DeviceError> {
    let path = path.as_ref();
    log::info!("Loading texture: {:?}", path);

    let img = image::open(path).map_err(|err| DeviceError::TextureLoad {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let label = path.to_string_lossy();

    device.create_texture(
        &TextureDescriptor {
            label: &label,
            width,
            height,
        },
        &rgba,
    )
}

/// Uploads an in-memory encoded image (PNG, JPEG, ...) through `device`.
pub fn texture_from_memory<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    label: &str,
    bytes: &[u8],
) -> Result<Texture, DeviceError> {
    let img = image::load_from_memory(bytes).map_err(|err| DeviceError::TextureLoad {
        path: label.to_string(),
        reason: err.to_string(),
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    device.create_texture(
        &TextureDescriptor {
            label,
            width,
            height,
        },
        &rgba,
    )
}
