//! World and schedule assembly.
//!
//! Hosts embed the engine by building a world with [`build_world`], a
//! schedule with [`build_schedule`], and calling [`tick`] once per frame
//! with the frame's delta time. Movement is requested by triggering
//! [`MoveRequested`](crate::events::movement::MoveRequested) on the world;
//! the resolved [`SpriteFrame`](crate::components::animation::SpriteFrame)
//! of each entity is ready to draw after every tick.

use bevy_ecs::observer::Observer;
use bevy_ecs::prelude::*;

use crate::events::atlas::observe_atlas_evicted;
use crate::events::movement::observe_move_requested;
use crate::resources::animationconfig::AnimationConfig;
use crate::resources::atlascache::AtlasCache;
use crate::resources::gridgeometry::GridGeometry;
use crate::resources::occupancy::OccupancyMap;
use crate::resources::texturestore::TextureStore;
use crate::resources::worldtime::WorldTime;
use crate::systems::atlas::{evict_stale_atlases, release_removed_owners, sheet_atlas_system};
use crate::systems::occupancy::update_occupancy_map;
use crate::systems::playback::{idle_scheduler_system, resolve_frame_system, snap_rotation_system};
use crate::systems::textureload::apply_texture_loads;
use crate::systems::time::update_world_time;
use crate::systems::tween::{idle_animation_system, move_animation_system};

/// World with every resource and observer the schedule expects.
///
/// The texture loader thread is optional; start it with
/// [`setup_texture_loader`](crate::resources::texturestore::setup_texture_loader)
/// when textures are decoded asynchronously.
pub fn build_world(config: AnimationConfig, grid: GridGeometry) -> World {
    let mut world = World::new();
    world.insert_resource(WorldTime::default());
    world.insert_resource(config);
    world.insert_resource(grid);
    world.insert_resource(TextureStore::default());
    world.insert_resource(AtlasCache::new());
    world.insert_resource(OccupancyMap::default());

    world.spawn(Observer::new(observe_move_requested));
    world.spawn(Observer::new(observe_atlas_evicted));
    // Observers must exist before the first request is triggered.
    world.flush();
    world
}

/// The per-tick schedule.
///
/// Atlases are settled first so that playback sees this tick's frames,
/// occupancy is rebuilt after movement so path queries between ticks see
/// final positions, and frame resolution runs last.
pub fn build_schedule() -> Schedule {
    let mut update = Schedule::default();
    update.add_systems(
        (
            apply_texture_loads,
            evict_stale_atlases,
            sheet_atlas_system,
            release_removed_owners,
        )
            .chain(),
    );
    update.add_systems(snap_rotation_system.after(sheet_atlas_system));
    update.add_systems(move_animation_system.after(snap_rotation_system));
    update.add_systems(idle_animation_system.after(snap_rotation_system));
    update.add_systems(
        idle_scheduler_system
            .after(move_animation_system)
            .after(idle_animation_system),
    );
    update.add_systems(update_occupancy_map.after(move_animation_system));
    update.add_systems(resolve_frame_system.after(idle_scheduler_system));
    update
}

/// Advance the world by `dt` seconds.
pub fn tick(world: &mut World, schedule: &mut Schedule, dt: f32) {
    update_world_time(world, dt);
    schedule.run(world);
    world.clear_trackers();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_advances_time() {
        let mut world = build_world(AnimationConfig::default(), GridGeometry::default());
        let mut schedule = build_schedule();
        tick(&mut world, &mut schedule, 0.5);
        tick(&mut world, &mut schedule, 0.25);
        let time = world.resource::<WorldTime>();
        assert_eq!(time.ticks, 2);
        assert_eq!(time.elapsed, 0.75);
    }
}
