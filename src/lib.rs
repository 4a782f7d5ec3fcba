pub mod app;
pub mod device;
pub mod renderer;
pub mod settings;

pub use device::{
    load_texture, DeviceError, GraphicsDevice, RecordingDevice, Texture, TextureId, WgpuDevice,
};
pub use renderer::{
    Camera, EditorCamera, Font, Glyph, Mesh, OrthographicCamera, PerspectiveCamera, Rect,
    RenderError, Renderable2D, Renderer2D, Renderer3D, RendererStats, Scene2D, Scene3D,
    Transform2D, TransformCamera,
};
pub use settings::RendererSettings;

use app::App;
use winit::event_loop::EventLoop;

/// Installs `env_logger` at `Info` unless `RUST_LOG` says otherwise. Safe to
/// call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Runs the windowed demo until the window closes.
pub fn run(texture_path: Option<String>) -> Result<(), winit::error::EventLoopError> {
    init_logging();

    log::info!("Starting quadbatch demo");

    let settings = RendererSettings::load();
    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings, texture_path);

    let result = event_loop.run_app(&mut app);

    if let Err(ref err) = result {
        log::error!("Application error: {}", err);
    }

    log::info!("Application shutdown complete");

    result
}
