//! Grid occupants that can block other entities' paths.

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

/// Attitude of an occupant. Occupants sharing a disposition are allies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Friendly,
    #[default]
    Neutral,
    Hostile,
}

/// An entity that takes up grid cells.
///
/// The footprint is `width x height` cells starting at the cell holding the
/// entity's [`MapPosition`](super::mapposition::MapPosition).
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occupant {
    pub disposition: Disposition,
    pub hidden: bool,
    /// Footprint in grid cells.
    pub width: u32,
    pub height: u32,
}

impl Occupant {
    pub fn new(disposition: Disposition) -> Self {
        Self {
            disposition,
            hidden: false,
            width: 1,
            height: 1,
        }
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn is_allied_with(&self, other: &Occupant) -> bool {
        self.disposition == other.disposition
    }
}
