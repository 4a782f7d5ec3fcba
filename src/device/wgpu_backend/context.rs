use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{DeviceError, MAX_SUPPORTED_TEXTURE_SLOTS};
use crate::settings::RendererSettings;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;
const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub(crate) struct Depth {
    pub(crate) view: wgpu::TextureView,
}

impl Depth {
    pub(crate) fn new(device: &wgpu::Device, size: PhysicalSize<u32>) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { view }
    }
}

/// Where frames end up: a window surface or an off-screen colour texture.
pub(crate) enum Target {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

pub(crate) struct GpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) target: Target,
    pub(crate) format: wgpu::TextureFormat,
    pub(crate) size: PhysicalSize<u32>,
    pub(crate) depth: Depth,
    pub(crate) max_texture_slots: u32,
}

impl GpuContext {
    pub(crate) async fn for_window(
        window: Arc<Window>,
        settings: &RendererSettings,
    ) -> Result<Self, DeviceError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|err| DeviceError::Surface(err.to_string()))?;

        log::info!("Surface created successfully!");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| DeviceError::AdapterUnavailable)?;

        let (device, queue, max_texture_slots) = request_device(&adapter, settings).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| DeviceError::Surface("surface reports no formats".into()))?;

        let present_mode = settings.present_mode(&surface_caps.present_modes);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth = Depth::new(&device, size);

        Ok(Self {
            device,
            queue,
            target: Target::Surface { surface, config },
            format,
            size,
            depth,
            max_texture_slots,
        })
    }

    pub(crate) async fn headless(
        size: PhysicalSize<u32>,
        settings: &RendererSettings,
    ) -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| DeviceError::AdapterUnavailable)?;

        let (device, queue, max_texture_slots) = request_device(&adapter, settings).await?;
        let (texture, view) = offscreen_target(&device, size);
        let depth = Depth::new(&device, size);

        Ok(Self {
            device,
            queue,
            target: Target::Offscreen { texture, view },
            format: HEADLESS_FORMAT,
            size,
            depth,
            max_texture_slots,
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        match &mut self.target {
            Target::Surface { surface, config } => {
                config.width = new_size.width;
                config.height = new_size.height;
                surface.configure(&self.device, config);
            }
            Target::Offscreen { texture, view } => {
                let (new_texture, new_view) = offscreen_target(&self.device, new_size);
                *texture = new_texture;
                *view = new_view;
            }
        }
        self.depth = Depth::new(&self.device, new_size);
    }
}

async fn request_device(
    adapter: &wgpu::Adapter,
    settings: &RendererSettings,
) -> Result<(wgpu::Device, wgpu::Queue, u32), DeviceError> {
    log::info!("Using adapter: {:?}", adapter.get_info());
    log::info!("Using backend: {:?}", adapter.get_info().backend);

    let adapter_limits = adapter.limits();
    let wanted = settings
        .max_texture_slots
        .min(MAX_SUPPORTED_TEXTURE_SLOTS);
    let max_texture_slots = wanted.min(adapter_limits.max_sampled_textures_per_shader_stage);
    if max_texture_slots < wanted {
        log::warn!(
            "Adapter supports {} sampled textures per stage, requested {}",
            max_texture_slots,
            wanted
        );
    }

    let mut limits = wgpu::Limits::default();
    limits.max_sampled_textures_per_shader_stage = limits
        .max_sampled_textures_per_shader_stage
        .max(max_texture_slots);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|err| DeviceError::DeviceRequest(err.to_string()))?;

    Ok((device, queue, max_texture_slots))
}

fn offscreen_target(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("OffscreenTarget"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HEADLESS_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
