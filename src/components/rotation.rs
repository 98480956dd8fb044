use bevy_ecs::prelude::Component;

use crate::components::direction::Direction;

/// Facing angle in degrees, 0 = down, 90 = left, 180 = up, 270 = right.
///
/// Sprite-sheet entities never render this as a mesh rotation; it only
/// selects which directional sequence is shown.
#[derive(Component, Clone, Debug, Copy, Default, PartialEq)]
pub struct Rotation {
    pub degrees: f32,
}

impl Rotation {
    pub fn facing(direction: Direction) -> Self {
        Self {
            degrees: direction.to_angle(),
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::from_angle(self.degrees)
    }
}
