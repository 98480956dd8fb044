//! Rebuild the [`OccupancyMap`] from entity positions.

use bevy_ecs::prelude::*;

use crate::components::mapposition::MapPosition;
use crate::components::occupant::Occupant;
use crate::pathing::GridOffset;
use crate::resources::gridgeometry::GridGeometry;
use crate::resources::occupancy::OccupancyMap;

/// Index every [`Occupant`] by the cells its footprint covers.
pub fn update_occupancy_map(
    grid: Res<GridGeometry>,
    mut map: ResMut<OccupancyMap>,
    query: Query<(Entity, &MapPosition, &Occupant)>,
) {
    map.clear();
    for (entity, pos, occupant) in query.iter() {
        let (col, row) = grid.cell_of(pos.x, pos.y);
        let origin = GridOffset::new(col, row, grid.layer(pos.elevation));
        map.insert(entity, *occupant, origin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::occupant::Disposition;

    #[test]
    fn test_rebuild_tracks_positions() {
        let mut world = World::new();
        world.insert_resource(GridGeometry::default());
        world.insert_resource(OccupancyMap::default());
        let e = world
            .spawn((
                MapPosition::new(150.0, 20.0),
                Occupant::new(Disposition::Hostile),
            ))
            .id();
        world.spawn(MapPosition::new(0.0, 0.0));

        let mut schedule = Schedule::default();
        schedule.add_systems(update_occupancy_map);
        schedule.run(&mut world);
        {
            let map = world.resource::<OccupancyMap>();
            assert_eq!(map.len(), 1);
            assert_eq!(map.occupants(GridOffset::new(1, 0, 0))[0].entity, e);
        }

        world.get_mut::<MapPosition>(e).unwrap().x = 420.0;
        schedule.run(&mut world);
        let map = world.resource::<OccupancyMap>();
        assert!(map.occupants(GridOffset::new(1, 0, 0)).is_empty());
        assert_eq!(map.occupants(GridOffset::new(4, 0, 0)).len(), 1);
    }
}
