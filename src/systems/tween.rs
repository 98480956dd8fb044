//! Tween animation systems.
//!
//! - [`move_animation_system`] – moves entities along their
//!   [`MoveAnimation`] and feeds the travelled distance to the playback
//!   state machine
//! - [`idle_animation_system`] – plays frame-only [`IdleAnimation`] loops
//!
//! Both read delta time from [`WorldTime`]. Movement is linear in time.

use bevy_ecs::prelude::*;
use log::trace;

use crate::components::animation::{AnimationState, PendingIdle, Sliding, Spinning};
use crate::components::mapposition::MapPosition;
use crate::components::rotation::Rotation;
use crate::components::tween::{IdleAnimation, LoopMode, MoveAnimation};
use crate::components::zindex::ZIndex;
use crate::resources::animationconfig::AnimationConfig;
use crate::resources::gridgeometry::GridGeometry;
use crate::resources::worldtime::WorldTime;
use crate::systems::playback::{
    FrameSignal, MovementUpdate, apply_movement_update, movement_frame, pre_update,
};

/// Linearly interpolate between two floats.
pub(crate) fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Advance tween time by `dt`. Returns whether the tween is still playing.
///
/// A finished `Once` tween holds its end; a `Loop` tween carries the
/// overshoot into the next pass.
pub(crate) fn advance(time: &mut f32, duration: f32, mode: LoopMode, dt: f32) -> bool {
    *time += dt;
    if *time < duration {
        return true;
    }
    match mode {
        LoopMode::Once => {
            *time = duration.max(0.0);
            false
        }
        LoopMode::Loop if duration > 0.0 => {
            *time %= duration;
            true
        }
        LoopMode::Loop => {
            *time = 0.0;
            true
        }
    }
}

/// Normalized progress of `time` through `duration`; zero-length tweens are
/// complete immediately.
fn progress(time: f32, duration: f32) -> f32 {
    if duration > 0.0 {
        time / duration
    } else {
        1.0
    }
}

/// Advance positional animations.
///
/// Each tick moves the entity, derives the walk-cycle frame from distance
/// travelled in the current segment and applies it to [`AnimationState`].
/// A finished segment starts the next chained one (facing and sort order
/// follow the new leg). The last segment brings the entity to rest at
/// frame 0 and flags it for idle scheduling.
#[allow(clippy::type_complexity)]
pub fn move_animation_system(
    mut commands: Commands,
    world_time: Res<WorldTime>,
    grid: Res<GridGeometry>,
    config: Res<AnimationConfig>,
    mut query: Query<(
        Entity,
        &mut MapPosition,
        &mut MoveAnimation,
        Option<&mut AnimationState>,
        Option<&mut Rotation>,
        Option<&mut ZIndex>,
        Has<Spinning>,
        Has<Sliding>,
    )>,
) {
    let dt = world_time.delta.max(0.0);
    for (entity, mut pos, mut mv, mut state, mut rotation, mut zindex, spinning, sliding) in
        query.iter_mut()
    {
        let duration = mv.current.duration;
        let mut t = mv.time;
        let playing = mv.playing && advance(&mut t, duration, LoopMode::Once, dt);
        mv.time = t;
        mv.playing = playing;

        let p = progress(t, duration);
        pos.x = lerp_f32(mv.from_x, mv.current.to_x, p);
        pos.y = lerp_f32(mv.from_y, mv.current.to_y, p);
        pos.elevation = lerp_f32(mv.from_elevation, mv.current.to_elevation, p);

        // between chained legs the walk cycle carries on into the next one
        let resting = !playing && mv.queued.is_empty();
        if let Some(state) = state.as_mut().filter(|_| playing || resting) {
            let travelled = movement_frame(pos.x - mv.from_x, pos.y - mv.from_y, &grid, &config);
            let update = MovementUpdate {
                dx: mv.current.to_x - pos.x,
                dy: mv.current.to_y - pos.y,
                signal: FrameSignal::Travelled(travelled),
                rotation: None,
            };
            let degrees = rotation.as_ref().map(|r| r.degrees);
            apply_movement_update(state, &update, degrees, spinning, sliding);
        }

        if playing {
            continue;
        }

        if mv.advance_segment() {
            let leg = mv.current;
            if let Some((angle, z)) =
                pre_update(leg.to_x - mv.from_x, leg.to_y - mv.from_y, leg.to_y, &grid)
            {
                if let Some(rotation) = rotation.as_mut() {
                    rotation.degrees = angle;
                }
                if let Some(zindex) = zindex.as_mut() {
                    **zindex = z;
                }
            }
            if let (Some(state), Some(run)) = (state.as_mut(), leg.run) {
                state.run = run;
            }
            trace!("{:?} starts chained leg to ({}, {})", entity, leg.to_x, leg.to_y);
        } else {
            if let Some(state) = state.as_mut() {
                state.idle = true;
                state.frame_index = 0;
            }
            commands
                .entity(entity)
                .remove::<MoveAnimation>()
                .insert(PendingIdle);
        }
    }
}

/// Advance frame-only idle loops.
///
/// A loop that was configured to play once hands the entity back to the
/// idle scheduler when it ends, which restarts it.
pub fn idle_animation_system(
    mut commands: Commands,
    world_time: Res<WorldTime>,
    mut query: Query<(Entity, &mut IdleAnimation, &mut AnimationState, Has<Sliding>)>,
) {
    let dt = world_time.delta.max(0.0);
    for (entity, mut idle, mut state, sliding) in query.iter_mut() {
        if !idle.playing {
            continue;
        }
        let duration = idle.duration();
        let loop_mode = idle.loop_mode;
        let mut t = idle.time;
        let playing = advance(&mut t, duration, loop_mode, dt);
        idle.time = t;
        idle.playing = playing;

        let frame = (lerp_f32(0.0, idle.frames as f32, progress(t, duration)).floor() as usize)
            .min(idle.frames.saturating_sub(1));
        let update = MovementUpdate {
            dx: 0.0,
            dy: 0.0,
            signal: FrameSignal::Explicit(frame),
            rotation: None,
        };
        apply_movement_update(&mut state, &update, None, false, sliding);

        if !playing {
            commands
                .entity(entity)
                .remove::<IdleAnimation>()
                .insert(PendingIdle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_lerp_f32() {
        assert!(approx_eq(lerp_f32(0.0, 10.0, 0.5), 5.0));
        assert!(approx_eq(lerp_f32(-10.0, 10.0, 0.25), -5.0));
        assert!(approx_eq(lerp_f32(0.0, 10.0, 1.5), 15.0));
    }

    #[test]
    fn test_advance_once_stops_at_end() {
        let mut t = 0.0;
        assert!(!advance(&mut t, 1.0, LoopMode::Once, 1.5));
        assert!(approx_eq(t, 1.0));
    }

    #[test]
    fn test_advance_loop_wraps_overshoot() {
        let mut t = 0.9;
        assert!(advance(&mut t, 1.0, LoopMode::Loop, 0.2));
        assert!(approx_eq(t, 0.1));
        assert!(advance(&mut t, 1.0, LoopMode::Loop, 0.3));
        assert!(approx_eq(t, 0.4));
    }

    #[test]
    fn test_zero_duration_is_complete() {
        assert_eq!(progress(0.0, 0.0), 1.0);
        let mut t = 0.0;
        assert!(!advance(&mut t, 0.0, LoopMode::Once, 0.0));
        assert!(advance(&mut t, 0.0, LoopMode::Loop, 0.1));
        assert_eq!(t, 0.0);
    }
}
