//! Grid occupancy index.
//!
//! [`OccupancyMap`] is rebuilt every tick from entities carrying an
//! [`Occupant`] and answers "who stands on this cell" for the path solver.
//! [`OccupancyMap::view`] binds the map to one mover and the collision
//! settings, producing a [`PathHost`] for
//! [`constrain_path`](crate::pathing::constrain_path).

use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::components::occupant::Occupant;
use crate::pathing::{ConstrainOptions, GridOffset, PathHost};
use crate::resources::animationconfig::AnimationConfig;
use crate::resources::gridgeometry::GridGeometry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupantEntry {
    pub entity: Entity,
    pub occupant: Occupant,
}

#[derive(Resource, Debug, Default)]
pub struct OccupancyMap {
    cells: FxHashMap<GridOffset, SmallVec<[OccupantEntry; 2]>>,
}

impl OccupancyMap {
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Record `occupant` on every cell of its footprint, starting at
    /// `origin`.
    pub fn insert(&mut self, entity: Entity, occupant: Occupant, origin: GridOffset) {
        for r in 0..occupant.height.max(1) as i32 {
            for c in 0..occupant.width.max(1) as i32 {
                let cell = GridOffset::new(origin.col + c, origin.row + r, origin.layer);
                self.cells
                    .entry(cell)
                    .or_default()
                    .push(OccupantEntry { entity, occupant });
            }
        }
    }

    pub fn occupants(&self, cell: GridOffset) -> &[OccupantEntry] {
        self.cells.get(&cell).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Path host for `mover`.
    pub fn view<'a>(
        &'a self,
        mover: Entity,
        mover_occupant: Option<Occupant>,
        grid: GridGeometry,
        config: &'a AnimationConfig,
    ) -> OccupancyView<'a> {
        OccupancyView {
            map: self,
            mover,
            mover_occupant,
            grid,
            config,
        }
    }
}

/// Whether `other` blocks `mover` under the given collision settings.
///
/// Allies only block with allied collisions on; hidden occupants only block
/// with hidden collisions on, and never for a preview.
pub fn occupant_blocks(
    mover: Option<&Occupant>,
    other: &Occupant,
    config: &AnimationConfig,
    options: &ConstrainOptions,
) -> bool {
    let allied = mover.is_some_and(|m| m.is_allied_with(other));
    let hostile_enough = !allied || config.token_collision_allied;
    let visible_enough = !other.hidden || (config.token_collision_hidden && !options.preview);
    hostile_enough && visible_enough
}

/// [`OccupancyMap`] seen from one mover.
pub struct OccupancyView<'a> {
    map: &'a OccupancyMap,
    mover: Entity,
    mover_occupant: Option<Occupant>,
    grid: GridGeometry,
    config: &'a AnimationConfig,
}

impl PathHost for OccupancyView<'_> {
    fn grid(&self) -> GridGeometry {
        self.grid
    }

    fn token_collision(&self) -> bool {
        self.config.token_collision
    }

    fn is_blocking(&self, cell: GridOffset, options: &ConstrainOptions) -> bool {
        self.map.occupants(cell).iter().any(|entry| {
            entry.entity != self.mover
                && occupant_blocks(
                    self.mover_occupant.as_ref(),
                    &entry.occupant,
                    self.config,
                    options,
                )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::occupant::Disposition;

    fn opts(preview: bool) -> ConstrainOptions {
        ConstrainOptions {
            preview,
            ignore_occupants: false,
        }
    }

    #[test]
    fn test_allies_block_only_when_enabled() {
        let mut config = AnimationConfig::default();
        let me = Occupant::new(Disposition::Friendly);
        let ally = Occupant::new(Disposition::Friendly);
        let foe = Occupant::new(Disposition::Hostile);
        assert!(!occupant_blocks(Some(&me), &ally, &config, &opts(false)));
        assert!(occupant_blocks(Some(&me), &foe, &config, &opts(false)));
        config.token_collision_allied = true;
        assert!(occupant_blocks(Some(&me), &ally, &config, &opts(false)));
    }

    #[test]
    fn test_hidden_occupants() {
        let mut config = AnimationConfig::default();
        let me = Occupant::new(Disposition::Friendly);
        let lurker = Occupant::new(Disposition::Hostile).hidden(true);
        assert!(!occupant_blocks(Some(&me), &lurker, &config, &opts(false)));
        config.token_collision_hidden = true;
        assert!(occupant_blocks(Some(&me), &lurker, &config, &opts(false)));
        assert!(!occupant_blocks(Some(&me), &lurker, &config, &opts(true)));
    }

    #[test]
    fn test_view_ignores_the_mover() {
        let mut world = World::new();
        let mover = world.spawn_empty().id();
        let other = world.spawn_empty().id();
        let config = AnimationConfig::default();
        let mut map = OccupancyMap::default();
        let occ = Occupant::new(Disposition::Neutral);
        map.insert(mover, occ, GridOffset::new(0, 0, 0));
        map.insert(other, occ.with_size(2, 1), GridOffset::new(3, 0, 0));
        assert_eq!(map.len(), 3);

        let view = map.view(
            mover,
            Some(Occupant::new(Disposition::Hostile)),
            GridGeometry::default(),
            &config,
        );
        assert!(!view.is_blocking(GridOffset::new(0, 0, 0), &opts(false)));
        assert!(view.is_blocking(GridOffset::new(4, 0, 0), &opts(false)));
        assert!(!view.is_blocking(GridOffset::new(4, 0, 1), &opts(false)));
    }
}
