// app.rs
//! Windowed demo: a grid of coloured quads under a field of spinning
//! textured sprites, all drawn through one `Renderer2D`.

use std::sync::Arc;
use std::time::Instant;

use glam::{Vec2, Vec4};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::*,
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::device::{load_texture, DeviceError, GraphicsDevice, Texture, TextureDescriptor, WgpuDevice};
use crate::renderer::{OrthographicCamera, RenderError, Renderer2D, Transform2D};
use crate::settings::RendererSettings;

const GRID_CELL: f32 = 24.0;
const SPRITE_COUNT: usize = 2500;
const STATS_INTERVAL_SECS: f32 = 1.0;

struct Sprite {
    position: Vec2,
    velocity: Vec2,
    rotation: f32,
    spin: f32,
    texture: usize,
    tint: Vec4,
}

struct Demo {
    window: Arc<Window>,
    device: WgpuDevice,
    renderer: Renderer2D,
    textures: Vec<Texture>,
    sprites: Vec<Sprite>,
    last_frame: Instant,
    last_stats: Instant,
    frames: u32,
}

pub struct App {
    settings: RendererSettings,
    texture_path: Option<String>,
    demo: Option<Demo>,
}

impl App {
    pub fn new(settings: RendererSettings, texture_path: Option<String>) -> Self {
        Self {
            settings,
            texture_path,
            demo: None,
        }
    }

    fn create_demo(&self, window: Arc<Window>) -> Result<Demo, RenderError> {
        let mut device = pollster::block_on(WgpuDevice::new(window.clone(), &self.settings))?;
        let renderer = Renderer2D::new(&mut device, &self.settings)?;

        let mut textures = vec![
            checkerboard(&mut device, 16, [230, 80, 60, 255], [250, 200, 80, 255])?,
            checkerboard(&mut device, 8, [60, 120, 230, 255], [140, 220, 250, 255])?,
            checkerboard(&mut device, 4, [70, 200, 110, 255], [20, 60, 30, 255])?,
        ];
        if let Some(path) = &self.texture_path {
            match load_texture(&mut device, path) {
                Ok(texture) => textures.push(texture),
                Err(err) => log::warn!("{}", err),
            }
        }

        let size = window.inner_size();
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let sprites = (0..SPRITE_COUNT)
            .map(|_| Sprite {
                position: Vec2::new(
                    rng.gen_range(0.0..size.width.max(1) as f32),
                    rng.gen_range(0.0..size.height.max(1) as f32),
                ),
                velocity: Vec2::new(rng.gen_range(-60.0..60.0), rng.gen_range(-60.0..60.0)),
                rotation: rng.gen_range(0.0..360.0),
                spin: rng.gen_range(-90.0..90.0),
                texture: rng.gen_range(0..textures.len()),
                tint: Vec4::new(1.0, 1.0, 1.0, rng.gen_range(0.6..1.0)),
            })
            .collect();

        Ok(Demo {
            window,
            device,
            renderer,
            textures,
            sprites,
            last_frame: Instant::now(),
            last_stats: Instant::now(),
            frames: 0,
        })
    }
}

impl Demo {
    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.device.resize(size);
    }

    fn update(&mut self, dt: f32) {
        let bounds = self.device.size();
        let (w, h) = (bounds.width as f32, bounds.height as f32);
        for sprite in &mut self.sprites {
            sprite.position += sprite.velocity * dt;
            sprite.rotation += sprite.spin * dt;
            if sprite.position.x < 0.0 || sprite.position.x > w {
                sprite.velocity.x = -sprite.velocity.x;
            }
            if sprite.position.y < 0.0 || sprite.position.y > h {
                sprite.velocity.y = -sprite.velocity.y;
            }
        }
    }

    fn render(&mut self, clear_color: [f32; 4]) {
        if let Err(err) = self.device.begin_frame() {
            log::warn!("Skipping frame: {}", err);
            return;
        }
        self.device.clear(clear_color);

        let size = self.device.size();
        let camera = OrthographicCamera::screen(size.width as f32, size.height as f32);
        let columns = (size.width as f32 / GRID_CELL) as u32 + 1;
        let rows = (size.height as f32 / GRID_CELL) as u32 + 1;

        let mut scene = self.renderer.begin_scene(&mut self.device, &camera);
        for row in 0..rows {
            for column in 0..columns {
                let shade = if (row + column) % 2 == 0 { 0.18 } else { 0.14 };
                scene.render_quad(
                    Vec2::new(column as f32 * GRID_CELL, row as f32 * GRID_CELL),
                    Vec2::splat(GRID_CELL),
                    Vec4::new(shade, shade, shade + 0.02, 1.0),
                );
            }
        }
        for sprite in &self.sprites {
            let transform = Transform2D::new(sprite.position, Vec2::splat(32.0))
                .with_rotation(sprite.rotation)
                .centered();
            scene.render_sprite_transformed(
                &self.textures[sprite.texture],
                &transform,
                None,
                sprite.tint,
            );
        }
        let stats = scene.end_scene();

        self.device.present();

        self.frames += 1;
        let elapsed = self.last_stats.elapsed().as_secs_f32();
        if elapsed >= STATS_INTERVAL_SECS {
            log::info!(
                "{:.1} fps, {} draw calls, {} quads, {} forced flushes",
                self.frames as f32 / elapsed,
                stats.draw_calls,
                stats.quad_count,
                stats.forced_flushes
            );
            self.frames = 0;
            self.last_stats = Instant::now();
        }
    }
}

fn checkerboard<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    size: u32,
    a: [u8; 4],
    b: [u8; 4],
) -> Result<Texture, DeviceError> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let color = if (x / 2 + y / 2) % 2 == 0 { a } else { b };
            pixels.extend_from_slice(&color);
        }
    }
    device.create_texture(
        &TextureDescriptor {
            label: "Checkerboard",
            width: size,
            height: size,
        },
        &pixels,
    )
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.demo.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("quadbatch")
            .with_inner_size(PhysicalSize::new(
                self.settings.resolution.width,
                self.settings.resolution.height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        match self.create_demo(window) {
            Ok(demo) => {
                demo.window.request_redraw();
                self.demo = Some(demo);
            }
            Err(err) => {
                log::error!("Failed to start renderer: {}", err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let clear_color = self.settings.clear_color;
        let Some(demo) = self.demo.as_mut() else {
            return;
        };
        if id != demo.window.id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                demo.resize(size);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = demo.window.inner_size();
                demo.resize(size);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - demo.last_frame).as_secs_f32();
                demo.last_frame = now;

                demo.update(dt);
                demo.render(clear_color);
                demo.window.request_redraw();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                event_loop.exit();
            }
            _ => {}
        }
    }
}
