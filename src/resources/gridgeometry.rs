//! Grid geometry supplied by the host scene.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

/// Cell size in pixels and the map distance one cell spans.
///
/// `distance` doubles as the elevation step: an entity at elevation `e`
/// stands on layer `floor(e / distance)`.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub cell_width: f32,
    pub cell_height: f32,
    pub distance: f32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            cell_width: 100.0,
            cell_height: 100.0,
            distance: 5.0,
        }
    }
}

impl GridGeometry {
    pub fn new(cell_width: f32, cell_height: f32, distance: f32) -> Self {
        Self {
            cell_width,
            cell_height,
            distance,
        }
    }

    /// `(col, row)` of the cell containing pixel `(x, y)`.
    pub fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_width).floor() as i32,
            (y / self.cell_height).floor() as i32,
        )
    }

    /// Top-left pixel of cell `(col, row)`.
    pub fn cell_origin(&self, col: i32, row: i32) -> (f32, f32) {
        (col as f32 * self.cell_width, row as f32 * self.cell_height)
    }

    /// Elevation layer for an elevation in map distance units.
    pub fn layer(&self, elevation: f32) -> i32 {
        if self.distance <= 0.0 {
            return 0;
        }
        (elevation / self.distance + 1e-8).floor() as i32
    }

    /// Pixel delta expressed in grid cells along each axis.
    pub fn cells(&self, dx: f32, dy: f32) -> (f32, f32) {
        (dx / self.cell_width, dy / self.cell_height)
    }
}
