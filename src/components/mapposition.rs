use bevy_ecs::prelude::Component;

/// Pixel position of an entity's top-left corner on the map, plus its
/// elevation in map distance units.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct MapPosition {
    pub x: f32,
    pub y: f32,
    pub elevation: f32,
}

impl MapPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            elevation: 0.0,
        }
    }

    pub fn with_elevation(mut self, elevation: f32) -> Self {
        self.elevation = elevation;
        self
    }
}
