// renderer/stats.rs

/// Counters for the current scene; reset by every `begin_scene`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub draw_calls: u32,
    /// Flushes forced mid-scene by vertex, index or slot exhaustion.
    pub forced_flushes: u32,
    pub quad_count: u32,
    pub mesh_count: u32,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl RendererStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_every_counter() {
        let mut stats = RendererStats {
            draw_calls: 3,
            forced_flushes: 2,
            quad_count: 10,
            mesh_count: 1,
            vertex_count: 40,
            index_count: 60,
        };
        assert_eq!(stats.triangle_count(), 20);
        stats.reset();
        assert_eq!(stats, RendererStats::default());
    }
}
