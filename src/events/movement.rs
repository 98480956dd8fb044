//! Movement requests.
//!
//! Hosts move sprite-sheet entities by triggering [`MoveRequested`] instead
//! of writing [`MapPosition`] directly. The observer picks walk or run,
//! turns the entity toward the target, and starts (or chains) its
//! [`MoveAnimation`]; the tween systems take it from there.
//!
//! ```ignore
//! world.trigger(MoveRequested::to(hero, 300.0, 100.0));
//! world.trigger(MoveRequested::teleport(hero, 0.0, 0.0));
//! ```

use bevy_ecs::prelude::*;
use log::{debug, warn};

use crate::components::animation::{AnimationState, PendingIdle, Sliding};
use crate::components::mapposition::MapPosition;
use crate::components::rotation::Rotation;
use crate::components::tween::{IdleAnimation, MoveAnimation, MoveSegment};
use crate::components::zindex::ZIndex;
use crate::resources::animationconfig::AnimationConfig;
use crate::resources::gridgeometry::GridGeometry;
use crate::systems::playback::{
    FrameSignal, MovementUpdate, apply_movement_update, pre_update, select_movement_speed,
};

/// Request to move `entity` so its top-left corner lands on `(x, y)`.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct MoveRequested {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    /// Target elevation; `None` keeps the current one.
    pub elevation: Option<f32>,
    /// Jump straight to the target without animating.
    pub teleport: bool,
    /// Scales the chosen walk or run speed.
    pub speed_multiplier: f32,
}

impl MoveRequested {
    pub fn to(entity: Entity, x: f32, y: f32) -> Self {
        Self {
            entity,
            x,
            y,
            elevation: None,
            teleport: false,
            speed_multiplier: 1.0,
        }
    }

    pub fn teleport(entity: Entity, x: f32, y: f32) -> Self {
        Self {
            teleport: true,
            ..Self::to(entity, x, y)
        }
    }

    pub fn with_elevation(mut self, elevation: f32) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_speed_multiplier(mut self, multiplier: f32) -> Self {
        self.speed_multiplier = multiplier;
        self
    }
}

/// Seconds needed to cover `(dx, dy)` pixels at `speed` grid cells per
/// second.
pub fn move_duration(dx: f32, dy: f32, speed: f32, grid: &GridGeometry) -> f32 {
    if speed <= 0.0 {
        return 0.0;
    }
    let (cx, cy) = grid.cells(dx, dy);
    (cx * cx + cy * cy).sqrt() / speed
}

/// Start, chain, or apply a requested movement.
#[allow(clippy::type_complexity)]
pub fn observe_move_requested(
    trigger: On<MoveRequested>,
    mut commands: Commands,
    grid: Res<GridGeometry>,
    config: Res<AnimationConfig>,
    mut query: Query<(
        &mut MapPosition,
        Option<&mut MoveAnimation>,
        Option<&mut AnimationState>,
        Option<&mut Rotation>,
        Option<&mut ZIndex>,
        Has<Sliding>,
    )>,
) {
    let request = *trigger.event();
    let Ok((mut pos, moving, mut state, mut rotation, mut zindex, sliding)) =
        query.get_mut(request.entity)
    else {
        warn!("Move requested for missing entity {:?}", request.entity);
        return;
    };

    if request.teleport {
        pos.x = request.x;
        pos.y = request.y;
        pos.elevation = request.elevation.unwrap_or(pos.elevation);
        if let Some(zindex) = zindex.as_mut() {
            **zindex = ZIndex::for_row(request.y, grid.cell_height);
        }
        if let Some(state) = state.as_mut() {
            let rest = MovementUpdate {
                dx: 0.0,
                dy: 0.0,
                signal: FrameSignal::Travelled(0),
                rotation: None,
            };
            let degrees = rotation.as_ref().map(|r| r.degrees);
            apply_movement_update(state, &rest, degrees, false, sliding);
        }
        commands
            .entity(request.entity)
            .remove::<(MoveAnimation, IdleAnimation)>()
            .insert(PendingIdle);
        debug!("{:?} teleported to ({}, {})", request.entity, request.x, request.y);
        return;
    }

    let start = match moving.as_ref() {
        Some(mv) => mv.final_target(),
        None => (pos.x, pos.y, pos.elevation),
    };
    let dx = request.x - start.0;
    let dy = request.y - start.1;
    let selection =
        select_movement_speed(dx, dy, sliding, request.speed_multiplier, &grid, &config);
    let segment = MoveSegment {
        to_x: request.x,
        to_y: request.y,
        to_elevation: request.elevation.unwrap_or(start.2),
        duration: move_duration(dx, dy, selection.speed, &grid),
        run: selection.run,
    };

    if let Some(mut mv) = moving {
        mv.chain(segment);
        debug!(
            "{:?} chained move to ({}, {}), {} leg(s) queued",
            request.entity,
            request.x,
            request.y,
            mv.queued.len()
        );
        return;
    }

    if let Some((angle, z)) = pre_update(dx, dy, request.y, &grid) {
        if let Some(rotation) = rotation.as_mut() {
            rotation.degrees = angle;
        }
        if let Some(zindex) = zindex.as_mut() {
            **zindex = z;
        }
    }
    if let Some(state) = state.as_mut() {
        state.idle = false;
        if let Some(run) = selection.run {
            state.run = run;
        }
    }
    commands
        .entity(request.entity)
        .remove::<(IdleAnimation, PendingIdle)>()
        .insert(MoveAnimation::new(start, segment));
    debug!(
        "{:?} moves to ({}, {}) at {} cells/s over {:.3}s",
        request.entity, request.x, request.y, selection.speed, segment.duration
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_world() -> World {
        let mut world = World::new();
        world.insert_resource(GridGeometry::default());
        world.insert_resource(AnimationConfig::default());
        world.add_observer(observe_move_requested);
        world.flush();
        world
    }

    #[test]
    fn test_move_duration() {
        let grid = GridGeometry::default();
        assert!((move_duration(300.0, 400.0, 5.0, &grid) - 1.0).abs() < 1e-6);
        assert_eq!(move_duration(100.0, 0.0, 0.0, &grid), 0.0);
    }

    #[test]
    fn test_request_starts_animation_and_faces_target() {
        let mut world = make_world();
        let e = world
            .spawn((
                MapPosition::new(0.0, 0.0),
                AnimationState::new(crate::components::direction::Direction::Down),
                Rotation::default(),
                ZIndex::default(),
                IdleAnimation::new(4, 0.6),
            ))
            .id();
        world.trigger(MoveRequested::to(e, 0.0, 300.0));
        world.flush();

        let mv = world.get::<MoveAnimation>(e).unwrap();
        assert_eq!(mv.current.run, Some(false));
        assert!((mv.current.duration - 0.75).abs() < 1e-6);
        assert!(world.get::<IdleAnimation>(e).is_none());
        assert_eq!(world.get::<Rotation>(e).unwrap().degrees, 0.0);
        assert_eq!(*world.get::<ZIndex>(e).unwrap(), ZIndex(3));
        assert!(!world.get::<AnimationState>(e).unwrap().idle);
    }

    #[test]
    fn test_request_while_moving_is_chained() {
        let mut world = make_world();
        let e = world.spawn(MapPosition::new(0.0, 0.0)).id();
        world.trigger(MoveRequested::to(e, 100.0, 0.0));
        world.flush();
        world.trigger(MoveRequested::to(e, 100.0, 800.0));
        world.flush();

        let mv = world.get::<MoveAnimation>(e).unwrap();
        assert_eq!(mv.queued.len(), 1);
        assert_eq!(mv.queued[0].run, Some(true));
        assert_eq!(mv.final_target(), (100.0, 800.0, 0.0));
    }

    #[test]
    fn test_teleport_jumps_and_rests() {
        let mut world = make_world();
        let mut state = AnimationState::new(crate::components::direction::Direction::Down);
        state.idle = false;
        state.frame_index = 3;
        let e = world
            .spawn((
                MapPosition::new(0.0, 0.0),
                state,
                Rotation { degrees: 90.0 },
            ))
            .id();
        world.trigger(MoveRequested::to(e, 500.0, 0.0));
        world.flush();
        world.trigger(MoveRequested::teleport(e, 200.0, 200.0).with_elevation(10.0));
        world.flush();

        let pos = world.get::<MapPosition>(e).unwrap();
        assert_eq!((pos.x, pos.y, pos.elevation), (200.0, 200.0, 10.0));
        assert!(world.get::<MoveAnimation>(e).is_none());
        assert!(world.get::<PendingIdle>(e).is_some());
        let state = world.get::<AnimationState>(e).unwrap();
        assert!(state.idle);
        assert_eq!(state.frame_index, 0);
        // facing was turned right by the first request
        assert_eq!(
            state.direction,
            crate::components::direction::Direction::Right
        );
    }
}
