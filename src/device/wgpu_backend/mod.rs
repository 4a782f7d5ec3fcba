// device/wgpu_backend/mod.rs
//! [`GraphicsDevice`] on top of wgpu.
//!
//! wgpu has no global bind state, so this backend keeps the GL-style model
//! the renderers expect: `bind_shader`/`bind_texture` only remember what is
//! bound, and each `draw_indexed` records one render pass that loads the
//! current frame target, draws, and is submitted immediately. Buffer writes
//! queued before a draw are therefore visible to exactly that draw.

mod context;
mod pipeline_builder;

use std::collections::HashMap;
use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{
    validate_texture_data, BufferDescriptor, BufferId, BufferLayout, BufferUsage, DeviceError,
    DeviceLimits, DrawIndexed, GraphicsDevice, ShaderDescriptor, ShaderId, Texture,
    TextureDescriptor, TextureFilter, TextureId, VertexFormat, MAX_SUPPORTED_TEXTURE_SLOTS,
};
use crate::settings::RendererSettings;

use context::{GpuContext, Target, DEPTH_FORMAT};
use pipeline_builder::PipelineBuilder;

const MAX_CACHED_BIND_GROUPS: usize = 256;

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct GpuShader {
    pipeline: wgpu::RenderPipeline,
    uniform_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    texture_slots: u32,
    depth_test: bool,
}

struct Frame {
    surface_texture: Option<wgpu::SurfaceTexture>,
    view: wgpu::TextureView,
}

type BindGroupKey = (ShaderId, Vec<Option<TextureId>>);

pub struct WgpuDevice {
    context: GpuContext,
    buffers: Vec<wgpu::Buffer>,
    textures: Vec<GpuTexture>,
    fallback_texture: GpuTexture,
    shaders: Vec<GpuShader>,
    bound_shader: Option<ShaderId>,
    bound_textures: [Option<TextureId>; MAX_SUPPORTED_TEXTURE_SLOTS as usize],
    bind_groups: HashMap<BindGroupKey, wgpu::BindGroup>,
    frame: Option<Frame>,
}

impl WgpuDevice {
    pub async fn new(
        window: Arc<Window>,
        settings: &RendererSettings,
    ) -> Result<Self, DeviceError> {
        let context = GpuContext::for_window(window, settings).await?;
        Ok(Self::from_context(context))
    }

    /// A device rendering into an off-screen colour target.
    pub async fn headless(
        width: u32,
        height: u32,
        settings: &RendererSettings,
    ) -> Result<Self, DeviceError> {
        let context = GpuContext::headless(PhysicalSize::new(width, height), settings).await?;
        Ok(Self::from_context(context))
    }

    fn from_context(context: GpuContext) -> Self {
        log::info!(
            "wgpu device ready: {}x{} {:?}, {} texture slots",
            context.size.width,
            context.size.height,
            context.format,
            context.max_texture_slots
        );

        let fallback_texture = upload_rgba(
            &context.device,
            &context.queue,
            "FallbackTexture",
            1,
            1,
            &[255, 255, 255, 255],
        );

        Self {
            context,
            buffers: Vec::new(),
            textures: Vec::new(),
            fallback_texture,
            shaders: Vec::new(),
            bound_shader: None,
            bound_textures: [None; MAX_SUPPORTED_TEXTURE_SLOTS as usize],
            bind_groups: HashMap::new(),
            frame: None,
        }
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.context.size.width as f32 / self.context.size.height.max(1) as f32
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    /// Acquires the target the following draws render into.
    pub fn begin_frame(&mut self) -> Result<(), DeviceError> {
        let frame = match &self.context.target {
            Target::Surface { surface, config } => match surface.get_current_texture() {
                Ok(surface_texture) => {
                    let view = surface_texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Frame {
                        surface_texture: Some(surface_texture),
                        view,
                    }
                }
                Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                    log::warn!("Surface {}; reconfiguring", err);
                    surface.configure(&self.context.device, config);
                    return Err(DeviceError::Surface(err.to_string()));
                }
                Err(err) => return Err(DeviceError::Surface(err.to_string())),
            },
            Target::Offscreen { view, .. } => Frame {
                surface_texture: None,
                view: view.clone(),
            },
        };

        self.frame = Some(frame);
        Ok(())
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        let Some(frame) = &self.frame else {
            log::warn!("clear() outside begin_frame()/present() ignored");
            return;
        };

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("ClearEncoder"),
                });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ClearPass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: color[0] as f64,
                            g: color[1] as f64,
                            b: color[2] as f64,
                            a: color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.context.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.context.queue.submit(Some(encoder.finish()));
    }

    pub fn present(&mut self) {
        if let Some(frame) = self.frame.take() {
            if let Some(surface_texture) = frame.surface_texture {
                surface_texture.present();
            }
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }

    fn texture_view(&self, texture: Option<TextureId>) -> &wgpu::TextureView {
        texture
            .and_then(|id| self.textures.get(id.index()))
            .map(|t| &t.view)
            .unwrap_or(&self.fallback_texture.view)
    }

    fn ensure_bind_group(&mut self, shader_id: ShaderId) -> Option<BindGroupKey> {
        let shader = self.shaders.get(shader_id.index())?;
        let slots = shader.texture_slots as usize;

        // Unbound slots sample whatever sits in slot 0.
        let slot_zero = self.bound_textures[0];
        let textures: Vec<Option<TextureId>> = self.bound_textures[..slots]
            .iter()
            .map(|bound| bound.or(slot_zero))
            .collect();
        let key = (shader_id, textures);

        if !self.bind_groups.contains_key(&key) {
            if self.bind_groups.len() >= MAX_CACHED_BIND_GROUPS {
                self.bind_groups.clear();
            }

            let mut entries = Vec::with_capacity(slots + 1);
            entries.push(wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(&shader.sampler),
            });
            for (slot, texture) in key.1.iter().enumerate() {
                entries.push(wgpu::BindGroupEntry {
                    binding: slot as u32 + 1,
                    resource: wgpu::BindingResource::TextureView(self.texture_view(*texture)),
                });
            }

            let group = self
                .context
                .device
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("TextureSlotsBindGroup"),
                    layout: &shader.texture_layout,
                    entries: &entries,
                });
            self.bind_groups.insert(key.clone(), group);
        }

        Some(key)
    }
}

impl GraphicsDevice for WgpuDevice {
    fn limits(&self) -> DeviceLimits {
        DeviceLimits {
            max_texture_slots: self.context.max_texture_slots,
        }
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> BufferId {
        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size,
            usage: to_wgpu_usage(desc.usage),
            mapped_at_creation: false,
        });
        log::info!("Created buffer {:?} ({} bytes)", desc.label, desc.size);

        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(buffer);
        id
    }

    fn write_buffer(&mut self, buffer: BufferId, data: &[u8]) {
        let Some(target) = self.buffers.get(buffer.index()) else {
            log::warn!("write to unknown buffer {:?} ignored", buffer);
            return;
        };
        self.context.queue.write_buffer(target, 0, data);
    }

    fn create_texture(
        &mut self,
        desc: &TextureDescriptor<'_>,
        rgba: &[u8],
    ) -> Result<Texture, DeviceError> {
        validate_texture_data(desc, rgba)?;

        let texture = upload_rgba(
            &self.context.device,
            &self.context.queue,
            desc.label,
            desc.width,
            desc.height,
            rgba,
        );
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture);
        Ok(Texture::new(id, desc.width, desc.height))
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor<'_>) -> Result<ShaderId, DeviceError> {
        if desc.texture_slots == 0 || desc.texture_slots > self.context.max_texture_slots {
            return Err(DeviceError::InvalidShader(format!(
                "{} texture slots requested, device supports {}",
                desc.texture_slots, self.context.max_texture_slots
            )));
        }
        let uniform_buffer = self
            .buffers
            .get(desc.uniform_buffer.index())
            .ok_or(DeviceError::UnknownResource("buffer"))?;

        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SceneUniformLayout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SceneUniformBindGroup"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let mut texture_entries = Vec::with_capacity(desc.texture_slots as usize + 1);
        texture_entries.push(wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        for slot in 0..desc.texture_slots {
            texture_entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("TextureSlotsLayout"),
            entries: &texture_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("BatchPipelineLayout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let attributes = vertex_attributes(desc.layout);
        let blend = if desc.alpha_blend {
            Some(wgpu::BlendState::ALPHA_BLENDING)
        } else {
            Some(wgpu::BlendState::REPLACE)
        };

        let mut builder = PipelineBuilder::new(device, &pipeline_layout, &module)
            .with_label(desc.label)
            .with_vertex_buffer(wgpu::VertexBufferLayout {
                array_stride: desc.layout.stride(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            })
            .with_color_target(self.context.format, blend);
        if desc.depth_test {
            builder = builder.with_depth_stencil(DEPTH_FORMAT, true, wgpu::CompareFunction::LessEqual);
        }
        let pipeline = builder.build();

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(DeviceError::InvalidShader(err.to_string()));
        }

        let filter = match desc.filter {
            TextureFilter::Linear => wgpu::FilterMode::Linear,
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("TextureSlotsSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        log::info!(
            "Created shader {:?} ({} texture slots, depth test {})",
            desc.label,
            desc.texture_slots,
            desc.depth_test
        );

        let id = ShaderId(self.shaders.len() as u32);
        self.shaders.push(GpuShader {
            pipeline,
            uniform_group,
            texture_layout,
            sampler,
            texture_slots: desc.texture_slots,
            depth_test: desc.depth_test,
        });
        Ok(id)
    }

    fn bind_shader(&mut self, shader: ShaderId) {
        self.bound_shader = Some(shader);
    }

    fn bind_texture(&mut self, texture: TextureId, slot: u32) {
        match self.bound_textures.get_mut(slot as usize) {
            Some(bound) => *bound = Some(texture),
            None => log::warn!("texture slot {} out of range ignored", slot),
        }
    }

    fn draw_indexed(&mut self, draw: &DrawIndexed) {
        let Some(shader_id) = self.bound_shader else {
            log::warn!("draw_indexed without a bound shader ignored");
            return;
        };
        let Some(key) = self.ensure_bind_group(shader_id) else {
            log::warn!("draw_indexed with unknown shader {:?} ignored", shader_id);
            return;
        };
        let Some(frame) = &self.frame else {
            log::warn!("draw_indexed outside begin_frame()/present() ignored");
            return;
        };
        let (Some(vertex_buffer), Some(index_buffer)) = (
            self.buffers.get(draw.vertex_buffer.index()),
            self.buffers.get(draw.index_buffer.index()),
        ) else {
            log::warn!("draw_indexed with unknown buffers ignored");
            return;
        };

        let shader = &self.shaders[shader_id.index()];
        let texture_group = &self.bind_groups[&key];

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("BatchEncoder"),
                });
        {
            let depth_stencil_attachment =
                shader
                    .depth_test
                    .then(|| wgpu::RenderPassDepthStencilAttachment {
                        view: &self.context.depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("BatchPass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&shader.pipeline);
            pass.set_bind_group(0, &shader.uniform_group, &[]);
            pass.set_bind_group(1, texture_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));
    }
}

fn to_wgpu_usage(usage: BufferUsage) -> wgpu::BufferUsages {
    let mut out = wgpu::BufferUsages::empty();
    if usage.contains(BufferUsage::VERTEX) {
        out |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsage::INDEX) {
        out |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        out |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        out |= wgpu::BufferUsages::COPY_DST;
    }
    out
}

fn vertex_attributes(layout: &BufferLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .elements()
        .iter()
        .enumerate()
        .map(|(location, element)| wgpu::VertexAttribute {
            format: match element.format {
                VertexFormat::Float => wgpu::VertexFormat::Float32,
                VertexFormat::Float2 => wgpu::VertexFormat::Float32x2,
                VertexFormat::Float3 => wgpu::VertexFormat::Float32x3,
                VertexFormat::Float4 => wgpu::VertexFormat::Float32x4,
            },
            offset: element.offset,
            shader_location: location as u32,
        })
        .collect()
}

fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        _texture: texture,
        view,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_flags_map_one_to_one() {
        let usage = to_wgpu_usage(BufferUsage::VERTEX | BufferUsage::COPY_DST);
        assert_eq!(
            usage,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST
        );
        assert_eq!(to_wgpu_usage(BufferUsage::empty()), wgpu::BufferUsages::empty());
    }

    #[test]
    fn attributes_follow_layout_order() {
        let layout = BufferLayout::new(&[
            ("position", VertexFormat::Float3),
            ("tex_index", VertexFormat::Float),
        ]);
        let attrs = vertex_attributes(&layout);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[1].shader_location, 1);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[1].format, wgpu::VertexFormat::Float32);
    }
}
