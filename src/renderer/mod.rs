pub mod batch;
mod batcher;
pub mod camera;
pub mod error;
pub mod font;
pub mod mesh;
pub mod mesh_batch;
pub mod renderer_2d;
pub mod renderer_3d;
pub mod shader;
pub mod stats;
pub mod texture_slots;
pub mod transform;
pub mod uniforms;
pub mod vertex;

pub use batch::{quad_indices, QuadBatch, MAX_BATCH_QUADS, QUAD_INDEX_PATTERN, UNIT_QUAD};
pub use camera::{Camera, EditorCamera, OrthographicCamera, PerspectiveCamera, TransformCamera};
pub use error::RenderError;
pub use font::{Font, Glyph};
pub use mesh::{Mesh, Vertex};
pub use mesh_batch::{MeshBatch, MAX_BATCH_MESH_INDICES, MAX_BATCH_MESH_VERTICES};
pub use renderer_2d::{Renderable2D, Renderer2D, Scene2D};
pub use renderer_3d::{Renderer3D, Scene3D};
pub use stats::RendererStats;
pub use texture_slots::{SlotResolution, TextureSlots};
pub use transform::{Rect, Transform2D};
pub use uniforms::SceneUniform;
pub use vertex::{MeshVertex, QuadVertex};
