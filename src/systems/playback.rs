//! Playback state machine.
//!
//! Turns continuous movement into the discrete `(direction, mode, frame)`
//! state held in [`AnimationState`], and resolves that state against an
//! [`Atlas`] into the frame the host draws.
//!
//! The transitions are plain functions so hosts can drive them without the
//! ECS; the systems at the bottom of this module wire them into the tick:
//!
//! - [`snap_rotation_system`] – a rotation change snaps the facing and
//!   restarts the cycle; rotation is never interpolated
//! - [`idle_scheduler_system`] – starts idle loops for entities that came to
//!   rest
//! - [`resolve_frame_system`] – writes [`SpriteFrame`] for the renderer

use bevy_ecs::prelude::*;
use log::trace;

use crate::components::animation::{
    AnimationState, PendingIdle, SheetAtlas, SpriteFrame, SpriteSheet,
};
use crate::components::direction::{Direction, vector_to_direction};
use crate::components::rotation::Rotation;
use crate::components::tween::{IdleAnimation, MoveAnimation, TweenRotation};
use crate::components::zindex::ZIndex;
use crate::resources::animationconfig::AnimationConfig;
use crate::resources::atlas::{Atlas, Family, FrameId, animation_key};
use crate::resources::gridgeometry::GridGeometry;

/// Speed and mode chosen for a movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSelection {
    /// Grid spaces per second.
    pub speed: f32,
    /// New run flag; `None` leaves the current mode alone.
    pub run: Option<bool>,
}

/// Pick walk or run for a move of `(dx, dy)` pixels.
///
/// The Manhattan distance in grid cells decides: zero leaves the mode as it
/// is, below `run_distance` walks, anything else runs. Sliding entities
/// always walk. `multiplier` scales the result (follower speed modifiers).
pub fn select_movement_speed(
    dx: f32,
    dy: f32,
    sliding: bool,
    multiplier: f32,
    grid: &GridGeometry,
    config: &AnimationConfig,
) -> SpeedSelection {
    let (speed, run) = if sliding {
        (config.walk_speed, Some(false))
    } else {
        let (cx, cy) = grid.cells(dx, dy);
        let manhattan = cx.abs() + cy.abs();
        if manhattan == 0.0 {
            (config.walk_speed, None)
        } else if manhattan < config.run_distance {
            (config.walk_speed, Some(false))
        } else {
            (config.run_speed, Some(true))
        }
    };
    SpeedSelection {
        speed: speed * multiplier,
        run,
    }
}

/// Walk-cycle frame for `(tx, ty)` pixels travelled since the move began.
///
/// Diagonal travel is credited less than the sum of its axes: the shorter
/// axis is discounted by `diagonal_discount`.
pub fn movement_frame(tx: f32, ty: f32, grid: &GridGeometry, config: &AnimationConfig) -> usize {
    let (cx, cy) = grid.cells(tx, ty);
    let gdx = cx.abs() * config.frames_per_square;
    let gdy = cy.abs() * config.frames_per_square;
    let frame = gdx + gdy - gdx.min(gdy) * config.diagonal_discount;
    if frame.is_finite() && frame > 0.0 {
        frame.floor() as usize
    } else {
        0
    }
}

/// Facing angle and sort order for a move of `(dx, dy)` pixels ending with
/// its top edge at `to_y`. `None` for a zero move.
pub fn pre_update(dx: f32, dy: f32, to_y: f32, grid: &GridGeometry) -> Option<(f32, ZIndex)> {
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    let angle = vector_to_direction(dx, dy).to_angle();
    Some((angle, ZIndex::for_row(to_y, grid.cell_height)))
}

/// Where a frame number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSignal {
    /// Frame set directly by a frame-only animation (idle loop).
    Explicit(usize),
    /// Frame derived from distance travelled.
    Travelled(usize),
}

/// One animation tick's worth of movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementUpdate {
    /// Displacement still ahead of the entity, in pixels.
    pub dx: f32,
    pub dy: f32,
    pub signal: FrameSignal,
    /// Rotation override in degrees; `None` uses the entity's rotation.
    pub rotation: Option<f32>,
}

/// Apply a movement tick to `state`.
///
/// Facing follows the update's rotation override, then the entity's
/// `rotation`. Without either, a moving entity faces its remaining delta and
/// a resting one keeps its direction.
pub fn apply_movement_update(
    state: &mut AnimationState,
    update: &MovementUpdate,
    rotation: Option<f32>,
    spinning: bool,
    sliding: bool,
) {
    let moving = update.dx != 0.0 || update.dy != 0.0;
    let facing = match update.rotation.or(rotation) {
        Some(degrees) => Direction::from_angle(degrees),
        None if moving => vector_to_direction(update.dx, update.dy),
        None => state.direction,
    };
    match update.signal {
        FrameSignal::Explicit(frame) => {
            state.idle = true;
            if let Some(r) = update.rotation {
                state.direction = Direction::from_angle(r);
            } else if moving {
                state.direction = vector_to_direction(update.dx, update.dy);
                state.idle = false;
            }
            state.frame_index = frame;
        }
        FrameSignal::Travelled(frame) if spinning && moving => {
            const SPIN: [Direction; 4] = [
                Direction::Down,
                Direction::Right,
                Direction::Up,
                Direction::Left,
            ];
            state.idle = false;
            state.frame_index = 0;
            state.direction = SPIN[frame % SPIN.len()];
        }
        FrameSignal::Travelled(frame) if moving => {
            state.idle = false;
            state.direction = facing;
            state.frame_index = frame;
        }
        FrameSignal::Travelled(_) => {
            state.idle = true;
            state.direction = facing;
            state.frame_index = 0;
        }
    }
    if sliding {
        state.frame_index = 1;
    }
}

/// Animation key the state shows on `atlas`.
///
/// Idle entities prefer `idle<facing>` (unless the sheet keeps a separate
/// idle pose), running entities prefer `run<facing>`, and everything else
/// falls back to the walking sequence `<facing>`.
pub fn resolve_animation_key(atlas: &Atlas, state: &AnimationState, sheet: &SpriteSheet) -> String {
    let facing = if sheet.isometric {
        state.direction.rotate_clockwise()
    } else {
        state.direction
    };
    let idle = animation_key(Family::Idle, facing);
    if state.idle && !sheet.separate_idle && atlas.has_sequence(&idle) {
        return idle;
    }
    let run = animation_key(Family::Run, facing);
    if state.run && atlas.has_sequence(&run) {
        return run;
    }
    animation_key(Family::Walk, facing)
}

/// Index into a sequence of `len` frames for `state`.
///
/// With a separate idle pose, an idle entity shows frame 0 and walking
/// cycles over `[offset, len)`.
pub fn sequence_index(
    len: usize,
    state: &AnimationState,
    separate_idle: bool,
    offset: usize,
) -> usize {
    if len == 0 {
        return 0;
    }
    if state.idle && separate_idle {
        return 0;
    }
    let offset = if separate_idle && offset < len { offset } else { 0 };
    offset + state.frame_index % (len - offset)
}

/// Frame the state shows on `atlas`, with the animation key it came from.
pub fn resolve_frame(
    atlas: &Atlas,
    state: &AnimationState,
    sheet: &SpriteSheet,
    config: &AnimationConfig,
) -> Option<(String, FrameId)> {
    let mut key = resolve_animation_key(atlas, state, sheet);
    if !atlas.has_sequence(&key) {
        key = Direction::Down.name().to_string();
    }
    let sequence = atlas.sequence(&key)?;
    let index = sequence_index(
        sequence.len(),
        state,
        sheet.separate_idle,
        config.separate_idle_offset,
    );
    let id = sequence.get(index)?.clone();
    Some((key, id))
}

/// Whether idle loops play for this sheet at all.
pub fn idle_enabled(sheet: &SpriteSheet, config: &AnimationConfig) -> bool {
    !sheet.separate_idle && config.play_idle_animations && !sheet.no_idle
}

/// Bring `state` to rest and build its idle loop, if it gets one.
///
/// The loop exists only when the sequence shown at rest has more than one
/// frame, idle frames have a positive duration and idle playback is enabled
/// for the sheet.
pub fn start_idle(
    state: &mut AnimationState,
    atlas: &Atlas,
    sheet: &SpriteSheet,
    config: &AnimationConfig,
) -> Option<IdleAnimation> {
    state.idle = true;
    let key = resolve_animation_key(atlas, state, sheet);
    let frames = atlas.sequence(&key).map_or(0, <[FrameId]>::len);
    if frames <= 1 || config.idle_anim_time_ms == 0 || !idle_enabled(sheet, config) {
        return None;
    }
    Some(IdleAnimation::new(frames, config.idle_frame_seconds()))
}

/// Snap facing to rotation changes and restart the cycle.
///
/// Sprite-sheet entities never interpolate rotation, so any rotation tween
/// on them is dropped.
pub fn snap_rotation_system(
    mut commands: Commands,
    mut query: Query<
        (Entity, &Rotation, &mut AnimationState, Has<TweenRotation>),
        Changed<Rotation>,
    >,
) {
    for (entity, rotation, mut state, tweening) in query.iter_mut() {
        if tweening {
            commands.entity(entity).remove::<TweenRotation>();
        }
        state.direction = rotation.direction();
        state.frame_index = 0;
    }
}

/// Start idle loops for entities flagged with [`PendingIdle`].
///
/// The flag stays until the entity has an atlas and is not moving, so an
/// entity waiting on a texture load gets its idle loop once the atlas
/// arrives.
pub fn idle_scheduler_system(
    mut commands: Commands,
    config: Res<AnimationConfig>,
    mut query: Query<
        (Entity, &mut AnimationState, &SpriteSheet, &SheetAtlas),
        (With<PendingIdle>, Without<MoveAnimation>),
    >,
) {
    for (entity, mut state, sheet, sheet_atlas) in query.iter_mut() {
        let mut entity_commands = commands.entity(entity);
        entity_commands.remove::<PendingIdle>();
        if let Some(idle) = start_idle(&mut state, &sheet_atlas.atlas, sheet, &config) {
            trace!("Idle loop of {} frames for {:?}", idle.frames, entity);
            entity_commands.insert(idle);
        }
    }
}

/// Resolve the visible frame of every sprite-sheet entity.
pub fn resolve_frame_system(
    mut commands: Commands,
    config: Res<AnimationConfig>,
    mut query: Query<(
        Entity,
        &AnimationState,
        &SpriteSheet,
        &SheetAtlas,
        Option<&mut SpriteFrame>,
    )>,
) {
    for (entity, state, sheet, sheet_atlas, current) in query.iter_mut() {
        let atlas = &sheet_atlas.atlas;
        let Some((animation, frame_id)) = resolve_frame(atlas, state, sheet, &config) else {
            continue;
        };
        let Some(rect) = atlas.frame(&frame_id).copied() else {
            continue;
        };
        let frame = SpriteFrame {
            frame_id,
            animation,
            rect,
            texture_id: sheet_atlas.texture_id,
        };
        match current {
            Some(mut current) => {
                if *current != frame {
                    *current = frame;
                }
            }
            None => {
                commands.entity(entity).insert(frame);
            }
        }
    }
}
