// renderer/shader.rs
//! WGSL assembly for the batch pipelines.
//!
//! Sampler slots are separate `texture_2d` bindings so any backend texture
//! can sit in any slot. `sample_slot` picks one by the per-vertex slot index
//! with explicit gradients, which keeps sampling valid inside the switch.

use std::fmt::Write;

const SCENE_WGSL: &str = include_str!("../shader/scene.wgsl");
pub(crate) const QUAD_WGSL: &str = include_str!("../shader/quad.wgsl");
pub(crate) const MESH_WGSL: &str = include_str!("../shader/mesh.wgsl");

/// Bindings and the `sample_slot` helper for `slots` sampler slots.
pub fn texture_slot_prelude(slots: u32) -> String {
    let mut src = String::from("@group(1) @binding(0) var t_sampler: sampler;\n");
    for slot in 0..slots {
        let _ = writeln!(
            src,
            "@group(1) @binding({}) var t_slot{}: texture_2d<f32>;",
            slot + 1,
            slot
        );
    }

    src.push_str(
        "\nfn sample_slot(slot: u32, uv: vec2<f32>, ddx: vec2<f32>, ddy: vec2<f32>) -> vec4<f32> {\n    switch slot {\n",
    );
    for slot in 1..slots {
        let _ = writeln!(
            src,
            "        case {slot}u: {{ return textureSampleGrad(t_slot{slot}, t_sampler, uv, ddx, ddy); }}"
        );
    }
    src.push_str(
        "        default: { return textureSampleGrad(t_slot0, t_sampler, uv, ddx, ddy); }\n    }\n}\n",
    );
    src
}

/// Scene uniform, slot prelude and `body` as one module.
pub fn compose(body: &str, slots: u32) -> String {
    format!(
        "{}\n{}\n{}",
        SCENE_WGSL,
        texture_slot_prelude(slots),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_declares_one_binding_per_slot() {
        let src = texture_slot_prelude(4);
        assert!(src.contains("@group(1) @binding(0) var t_sampler: sampler;"));
        assert!(src.contains("@group(1) @binding(4) var t_slot3: texture_2d<f32>;"));
        assert!(!src.contains("t_slot4"));
    }

    #[test]
    fn slot_zero_is_the_default_arm() {
        let src = texture_slot_prelude(3);
        assert!(src.contains("case 1u:"));
        assert!(src.contains("case 2u:"));
        assert!(!src.contains("case 0u:"));
        assert!(src.contains("default: { return textureSampleGrad(t_slot0"));
    }

    #[test]
    fn composed_source_has_entry_points_and_scene() {
        let src = compose(QUAD_WGSL, 16);
        assert!(src.contains("var<uniform> scene: SceneUniform"));
        assert!(src.contains("fn vs_main"));
        assert!(src.contains("fn fs_main"));
        assert!(src.contains("fn sample_slot"));
    }
}
