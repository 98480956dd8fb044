use bevy_ecs::prelude::Resource;

/// Simulation clock advanced once per host tick.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct WorldTime {
    /// Scaled seconds since the world started.
    pub elapsed: f32,
    /// Scaled seconds covered by the current tick.
    pub delta: f32,
    pub time_scale: f32,
    /// Ticks run so far.
    pub ticks: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            ticks: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }
}
