// device/recording.rs
//! A headless device that records what a renderer asks of it.
//!
//! Nothing is rasterised. Buffer contents are kept so the bytes a flush
//! uploaded can be decoded back into vertices, and every draw carries a
//! snapshot of the texture binds issued since the previous draw.

use bytemuck::Pod;

use super::{
    validate_texture_data, BufferDescriptor, BufferId, BufferUsage, DeviceError, DeviceLimits,
    DrawIndexed, GraphicsDevice, ShaderDescriptor, ShaderId, Texture, TextureDescriptor,
    TextureId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateBuffer {
        buffer: BufferId,
        size: u64,
        usage: BufferUsage,
    },
    WriteBuffer {
        buffer: BufferId,
        len: usize,
    },
    CreateTexture {
        texture: TextureId,
        width: u32,
        height: u32,
    },
    CreateShader {
        shader: ShaderId,
        texture_slots: u32,
    },
    BindShader(ShaderId),
    BindTexture {
        texture: TextureId,
        slot: u32,
    },
    DrawIndexed(DrawIndexed),
}

/// One draw call as the device saw it.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub shader: Option<ShaderId>,
    pub index_count: u32,
    /// `(slot, texture)` binds issued since the previous draw, in order.
    pub texture_binds: Vec<(u32, TextureId)>,
    /// The bytes of the vertex buffer's last write.
    pub vertex_bytes: Vec<u8>,
    /// The bytes of the index buffer's last write.
    pub index_bytes: Vec<u8>,
}

impl DrawRecord {
    pub fn vertices<T: Pod>(&self) -> Vec<T> {
        decode(&self.vertex_bytes)
    }

    pub fn indices(&self) -> Vec<u32> {
        decode(&self.index_bytes)
    }

    pub fn bound_textures(&self) -> Vec<TextureId> {
        self.texture_binds.iter().map(|&(_, texture)| texture).collect()
    }
}

/// Decodes a byte run into `T`s without assuming any alignment.
pub fn decode<T: Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

#[derive(Debug)]
struct RecordedBuffer {
    size: u64,
    last_write: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    limits: DeviceLimits,
    commands: Vec<DeviceCommand>,
    draws: Vec<DrawRecord>,
    buffers: Vec<RecordedBuffer>,
    textures: Vec<(u32, u32)>,
    shader_count: u32,
    bound_shader: Option<ShaderId>,
    pending_binds: Vec<(u32, TextureId)>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    pub fn buffer_size(&self, buffer: BufferId) -> Option<u64> {
        self.buffers.get(buffer.index()).map(|b| b.size)
    }

    pub fn last_write(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers
            .get(buffer.index())
            .map(|b| b.last_write.as_slice())
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Forgets recorded commands and draws, keeping every resource alive.
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
        self.pending_binds.clear();
    }

    /// Creates a solid-colour texture; handy for feeding renderers in tests.
    pub fn solid_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: [u8; 4],
    ) -> Result<Texture, DeviceError> {
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        self.create_texture(
            &TextureDescriptor {
                label: "solid",
                width,
                height,
            },
            &pixels,
        )
    }
}

impl GraphicsDevice for RecordingDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> BufferId {
        let buffer = BufferId(self.buffers.len() as u32);
        self.buffers.push(RecordedBuffer {
            size: desc.size,
            last_write: Vec::new(),
        });
        self.commands.push(DeviceCommand::CreateBuffer {
            buffer,
            size: desc.size,
            usage: desc.usage,
        });
        buffer
    }

    fn write_buffer(&mut self, buffer: BufferId, data: &[u8]) {
        let Some(recorded) = self.buffers.get_mut(buffer.index()) else {
            log::warn!("write to unknown buffer {:?} ignored", buffer);
            return;
        };
        assert!(
            data.len() as u64 <= recorded.size,
            "write of {} bytes overflows buffer {:?} of {} bytes",
            data.len(),
            buffer,
            recorded.size
        );
        recorded.last_write.clear();
        recorded.last_write.extend_from_slice(data);
        self.commands.push(DeviceCommand::WriteBuffer {
            buffer,
            len: data.len(),
        });
    }

    fn create_texture(
        &mut self,
        desc: &TextureDescriptor<'_>,
        rgba: &[u8],
    ) -> Result<Texture, DeviceError> {
        validate_texture_data(desc, rgba)?;

        let texture = TextureId(self.textures.len() as u32);
        self.textures.push((desc.width, desc.height));
        self.commands.push(DeviceCommand::CreateTexture {
            texture,
            width: desc.width,
            height: desc.height,
        });
        Ok(Texture::new(texture, desc.width, desc.height))
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor<'_>) -> Result<ShaderId, DeviceError> {
        if desc.texture_slots == 0 || desc.texture_slots > self.limits.max_texture_slots {
            return Err(DeviceError::InvalidShader(format!(
                "{} texture slots requested, device supports {}",
                desc.texture_slots, self.limits.max_texture_slots
            )));
        }
        if self.buffers.get(desc.uniform_buffer.index()).is_none() {
            return Err(DeviceError::UnknownResource("buffer"));
        }

        let shader = ShaderId(self.shader_count);
        self.shader_count += 1;
        self.commands.push(DeviceCommand::CreateShader {
            shader,
            texture_slots: desc.texture_slots,
        });
        Ok(shader)
    }

    fn bind_shader(&mut self, shader: ShaderId) {
        self.bound_shader = Some(shader);
        self.commands.push(DeviceCommand::BindShader(shader));
    }

    fn bind_texture(&mut self, texture: TextureId, slot: u32) {
        self.pending_binds.push((slot, texture));
        self.commands
            .push(DeviceCommand::BindTexture { texture, slot });
    }

    fn draw_indexed(&mut self, draw: &DrawIndexed) {
        let texture_binds = std::mem::take(&mut self.pending_binds);
        let bytes_of = |buffer: BufferId| {
            self.buffers
                .get(buffer.index())
                .map(|b| b.last_write.clone())
                .unwrap_or_default()
        };

        let record = DrawRecord {
            shader: self.bound_shader,
            index_count: draw.index_count,
            texture_binds,
            vertex_bytes: bytes_of(draw.vertex_buffer),
            index_bytes: bytes_of(draw.index_buffer),
        };
        self.draws.push(record);
        self.commands.push(DeviceCommand::DrawIndexed(*draw));
    }
}
