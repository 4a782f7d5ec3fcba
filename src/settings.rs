use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::device::MAX_SUPPORTED_TEXTURE_SLOTS;
use crate::renderer::batch::MAX_BATCH_QUADS;
use crate::renderer::mesh_batch::{MAX_BATCH_MESH_INDICES, MAX_BATCH_MESH_VERTICES};

/// Capacities and window options shared by the batching renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererSettings {
    /// Quads per 2D batch, at most [`MAX_BATCH_QUADS`]; the vertex scratch
    /// holds four times as many.
    #[serde(default = "RendererSettings::default_max_sprites")]
    pub max_sprites: u32,
    /// Sampler slots per draw call, slot 0 included.
    #[serde(default = "RendererSettings::default_max_texture_slots")]
    pub max_texture_slots: u32,
    #[serde(default = "RendererSettings::default_max_mesh_vertices")]
    pub max_mesh_vertices: u32,
    #[serde(default = "RendererSettings::default_max_mesh_indices")]
    pub max_mesh_indices: u32,
    #[serde(default = "RendererSettings::default_clear_color")]
    pub clear_color: [f32; 4],
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub present_mode: PresentModeSetting,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            max_sprites: Self::default_max_sprites(),
            max_texture_slots: Self::default_max_texture_slots(),
            max_mesh_vertices: Self::default_max_mesh_vertices(),
            max_mesh_indices: Self::default_max_mesh_indices(),
            clear_color: Self::default_clear_color(),
            resolution: Resolution::default(),
            present_mode: PresentModeSetting::default(),
        }
    }
}

impl RendererSettings {
    pub fn load() -> Self {
        Self::load_from_path("renderer.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                warn!(
                    "Failed to parse {:?} ({}). Falling back to default renderer settings.",
                    path, err
                );
                RendererSettings::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Renderer settings file {:?} not found. Using default settings.",
                    path
                );
                RendererSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default renderer settings.",
                    path, err
                );
                RendererSettings::default()
            }
        }
    }

    /// Parses and validates a settings document.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let settings = serde_json::from_str::<RendererSettings>(contents)?;
        info!("Loaded renderer settings");
        Ok(settings.validate())
    }

    pub fn validate(mut self) -> Self {
        if self.max_sprites == 0 {
            warn!("max_sprites must be greater than zero. Using default value.");
            self.max_sprites = Self::default_max_sprites();
        } else if self.max_sprites > MAX_BATCH_QUADS {
            warn!(
                "max_sprites {} exceeds {}. Clamping.",
                self.max_sprites, MAX_BATCH_QUADS
            );
            self.max_sprites = MAX_BATCH_QUADS;
        }

        if self.max_texture_slots < 2 || self.max_texture_slots > MAX_SUPPORTED_TEXTURE_SLOTS {
            let clamped = self.max_texture_slots.clamp(2, MAX_SUPPORTED_TEXTURE_SLOTS);
            warn!(
                "max_texture_slots must be within 2..={}. Using {} instead of {}.",
                MAX_SUPPORTED_TEXTURE_SLOTS, clamped, self.max_texture_slots
            );
            self.max_texture_slots = clamped;
        }

        if self.max_mesh_vertices == 0 {
            warn!("max_mesh_vertices must be greater than zero. Using default value.");
            self.max_mesh_vertices = Self::default_max_mesh_vertices();
        } else if self.max_mesh_vertices > MAX_BATCH_MESH_VERTICES {
            warn!(
                "max_mesh_vertices {} exceeds {}. Clamping.",
                self.max_mesh_vertices, MAX_BATCH_MESH_VERTICES
            );
            self.max_mesh_vertices = MAX_BATCH_MESH_VERTICES;
        }

        if self.max_mesh_indices < 3 {
            warn!("max_mesh_indices must hold at least one triangle. Using default value.");
            self.max_mesh_indices = Self::default_max_mesh_indices();
        } else if self.max_mesh_indices > MAX_BATCH_MESH_INDICES {
            warn!(
                "max_mesh_indices {} exceeds {}. Clamping.",
                self.max_mesh_indices, MAX_BATCH_MESH_INDICES
            );
            self.max_mesh_indices = MAX_BATCH_MESH_INDICES;
        }

        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        self
    }

    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let desired = self.present_mode.to_wgpu();
        if available.contains(&desired) {
            return desired;
        }

        warn!(
            "Requested present mode {:?} is not supported. Falling back to FIFO.",
            desired
        );

        if available.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            available
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        }
    }

    const fn default_max_sprites() -> u32 {
        1000
    }

    const fn default_max_texture_slots() -> u32 {
        16
    }

    const fn default_max_mesh_vertices() -> u32 {
        65_536
    }

    const fn default_max_mesh_indices() -> u32 {
        196_608
    }

    const fn default_clear_color() -> [f32; 4] {
        [0.1, 0.1, 0.12, 1.0]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeSetting {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
    AutoVsync,
    AutoNoVsync,
}

impl PresentModeSetting {
    fn to_wgpu(self) -> wgpu::PresentMode {
        match self {
            PresentModeSetting::Fifo => wgpu::PresentMode::Fifo,
            PresentModeSetting::FifoRelaxed => wgpu::PresentMode::FifoRelaxed,
            PresentModeSetting::Immediate => wgpu::PresentMode::Immediate,
            PresentModeSetting::Mailbox => wgpu::PresentMode::Mailbox,
            PresentModeSetting::AutoVsync => wgpu::PresentMode::AutoVsync,
            PresentModeSetting::AutoNoVsync => wgpu::PresentMode::AutoNoVsync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let invalid = RendererSettings {
            max_sprites: 0,
            max_texture_slots: 0,
            max_mesh_vertices: 0,
            max_mesh_indices: 2,
            resolution: Resolution {
                width: 0,
                height: 0,
            },
            ..RendererSettings::default()
        };

        let validated = invalid.validate();
        let defaults = RendererSettings::default();

        assert_eq!(validated.max_sprites, defaults.max_sprites);
        assert_eq!(validated.max_texture_slots, 2);
        assert_eq!(validated.max_mesh_vertices, defaults.max_mesh_vertices);
        assert_eq!(validated.max_mesh_indices, defaults.max_mesh_indices);
        assert_eq!(validated.resolution.width, Resolution::default().width);
    }

    #[test]
    fn texture_slots_are_clamped_to_supported_range() {
        let settings = RendererSettings {
            max_texture_slots: 64,
            ..RendererSettings::default()
        }
        .validate();
        assert_eq!(settings.max_texture_slots, MAX_SUPPORTED_TEXTURE_SLOTS);
    }

    #[test]
    fn oversized_batch_budgets_are_clamped() {
        let settings = RendererSettings {
            max_sprites: 1_100_000_000,
            max_mesh_vertices: u32::MAX,
            max_mesh_indices: u32::MAX,
            ..RendererSettings::default()
        }
        .validate();

        assert_eq!(settings.max_sprites, MAX_BATCH_QUADS);
        assert!(settings.max_sprites.checked_mul(6).is_some());
        assert_eq!(settings.max_mesh_vertices, MAX_BATCH_MESH_VERTICES);
        assert_eq!(settings.max_mesh_indices, MAX_BATCH_MESH_INDICES);
    }

    #[test]
    fn json_sprite_budget_is_clamped_on_load() {
        let settings = RendererSettings::from_json(r#"{ "max_sprites": 4000000000 }"#).unwrap();
        assert_eq!(settings.max_sprites, MAX_BATCH_QUADS);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let settings =
            RendererSettings::from_json(r#"{ "max_sprites": 250, "present_mode": "mailbox" }"#)
                .unwrap();

        assert_eq!(settings.max_sprites, 250);
        assert_eq!(settings.present_mode, PresentModeSetting::Mailbox);
        assert_eq!(settings.max_texture_slots, 16);
        assert_eq!(settings.max_mesh_indices, 196_608);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RendererSettings::from_json("{ max_sprites: }").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = RendererSettings::load_from_path("no/such/renderer.json");
        assert_eq!(settings.max_sprites, 1000);
    }

    #[test]
    fn present_mode_returns_desired_when_available() {
        let settings = RendererSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RendererSettings::default()
        };

        let available = [
            wgpu::PresentMode::Fifo,
            wgpu::PresentMode::Mailbox,
            wgpu::PresentMode::Immediate,
        ];

        assert_eq!(
            settings.present_mode(&available),
            wgpu::PresentMode::Mailbox
        );
    }

    #[test]
    fn present_mode_falls_back_to_fifo_then_first_available() {
        let settings = RendererSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RendererSettings::default()
        };

        assert_eq!(
            settings.present_mode(&[wgpu::PresentMode::Fifo, wgpu::PresentMode::Immediate]),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            settings.present_mode(&[wgpu::PresentMode::Immediate]),
            wgpu::PresentMode::Immediate
        );
    }
}
