//! Z-index component for render ordering.
//!
//! Sprite-sheet entities sort by the grid row they stand on, so tokens lower
//! on the map draw over tokens behind them.

use bevy_ecs::prelude::Component;

/// Rendering order hint. Higher values are drawn later (on top).
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZIndex(pub i32);

impl ZIndex {
    /// Sort order for an entity whose top edge is at pixel row `y`.
    pub fn for_row(y: f32, cell_height: f32) -> Self {
        if cell_height <= 0.0 {
            return ZIndex(0);
        }
        ZIndex((y / cell_height).floor() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_row() {
        assert_eq!(ZIndex::for_row(0.0, 100.0), ZIndex(0));
        assert_eq!(ZIndex::for_row(250.0, 100.0), ZIndex(2));
        assert_eq!(ZIndex::for_row(-50.0, 100.0), ZIndex(-1));
        assert_eq!(ZIndex::for_row(250.0, 0.0), ZIndex(0));
    }
}
