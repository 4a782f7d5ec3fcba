use glam::{Mat4, Vec3, Vec4};
use quadbatch::renderer::MeshVertex;
use quadbatch::{
    EditorCamera, Mesh, RecordingDevice, RenderError, Renderer3D, RendererSettings, Texture,
};

fn setup(settings: RendererSettings) -> (RecordingDevice, Renderer3D) {
    let mut device = RecordingDevice::new();
    let renderer = Renderer3D::new(&mut device, &settings).unwrap();
    device.clear_log();
    (device, renderer)
}

fn textures(device: &mut RecordingDevice, count: usize) -> Vec<Texture> {
    (0..count)
        .map(|i| device.solid_texture(2, 2, [0, i as u8, 0, 255]).unwrap())
        .collect()
}

#[test]
fn many_small_meshes_share_one_draw() {
    let (mut device, mut renderer) = setup(RendererSettings::default());
    let cube = Mesh::cube(1.0);

    let mut scene = renderer.begin_scene(&mut device, &EditorCamera::default());
    for i in 0..100 {
        let transform = Mat4::from_translation(Vec3::new(i as f32 * 2.0, 0.0, 0.0));
        scene.submit_mesh(&cube, &transform, None, Vec4::ONE).unwrap();
    }
    let stats = scene.end_scene();

    assert_eq!(device.draw_count(), 1);
    assert_eq!(stats.mesh_count, 100);
    assert_eq!(stats.vertex_count, 2400);
    assert_eq!(stats.index_count, 3600);
    assert_eq!(stats.triangle_count(), 1200);
}

#[test]
fn texture_slot_exhaustion_splits_meshes() {
    let (mut device, mut renderer) = setup(RendererSettings {
        max_texture_slots: 3,
        ..RendererSettings::default()
    });
    let distinct = textures(&mut device, 5);
    let quad = Mesh::quad();

    let mut scene = renderer.begin_scene(&mut device, &EditorCamera::default());
    for texture in &distinct {
        scene
            .submit_mesh(&quad, &Mat4::IDENTITY, Some(texture), Vec4::ONE)
            .unwrap();
    }
    let stats = scene.end_scene();

    // two usable slots per draw
    assert_eq!(device.draw_count(), 3);
    assert_eq!(stats.forced_flushes, 2);
    let last = device.draws().last().unwrap();
    assert_eq!(last.bound_textures()[1], distinct[4].id());
    assert!(last
        .vertices::<MeshVertex>()
        .iter()
        .all(|v| v.tex_index == 1.0));
}

#[test]
fn rejected_mesh_leaves_the_batch_intact() {
    let (mut device, mut renderer) = setup(RendererSettings {
        max_mesh_vertices: 30,
        max_mesh_indices: 40,
        ..RendererSettings::default()
    });

    let mut scene = renderer.begin_scene(&mut device, &EditorCamera::default());
    scene
        .submit_mesh(&Mesh::quad(), &Mat4::IDENTITY, None, Vec4::ONE)
        .unwrap();
    let err = scene.submit_mesh(&Mesh::sphere(1.0, 8, 8), &Mat4::IDENTITY, None, Vec4::ONE);
    assert!(matches!(err, Err(RenderError::MeshTooLarge { .. })));
    assert_eq!(scene.pending_indices(), 6);
    scene.end_scene();

    assert_eq!(device.draw_count(), 1);
    assert_eq!(device.draws()[0].index_count, 6);
}

#[test]
fn empty_mesh_is_ignored() {
    let (mut device, mut renderer) = setup(RendererSettings::default());
    let empty = Mesh::new(Vec::new(), Vec::new()).unwrap();

    let mut scene = renderer.begin_scene(&mut device, &EditorCamera::default());
    scene
        .submit_mesh(&empty, &Mat4::IDENTITY, None, Vec4::ONE)
        .unwrap();
    let stats = scene.end_scene();

    assert_eq!(device.draw_count(), 0);
    assert_eq!(stats.mesh_count, 0);
}

#[test]
fn mesh_colour_is_attached_to_every_vertex() {
    let (mut device, mut renderer) = setup(RendererSettings::default());
    let tint = Vec4::new(0.2, 0.4, 0.6, 1.0);

    let mut scene = renderer.begin_scene(&mut device, &EditorCamera::default());
    scene
        .submit_mesh(&Mesh::cube(1.0), &Mat4::IDENTITY, None, tint)
        .unwrap();
    scene.end_scene();

    assert!(device.draws()[0]
        .vertices::<MeshVertex>()
        .iter()
        .all(|v| v.color == tint.to_array() && v.tex_index == 0.0));
}
