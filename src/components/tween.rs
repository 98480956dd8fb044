//! Tween components for animated interpolation.
//!
//! - [`MoveAnimation`] – positional animation of
//!   [`MapPosition`](super::mapposition::MapPosition), with chained segments
//! - [`IdleAnimation`] – frame-only idle loop; carries no position, so a new
//!   movement can cancel it without touching positional animations
//! - [`TweenRotation`] – marks a host rotation interpolation in flight;
//!   sprite-sheet entities snap instead, so the playback systems drop it
//!
//! See [`crate::systems::tween`] for the update systems.

use std::collections::VecDeque;

use bevy_ecs::prelude::Component;

/// What a tween does when it reaches its end.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopMode {
    /// Play once and stop.
    Once,
    /// Restart from the beginning.
    Loop,
}

/// One leg of a movement, queued behind the leg in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveSegment {
    pub to_x: f32,
    pub to_y: f32,
    pub to_elevation: f32,
    /// Duration in seconds.
    pub duration: f32,
    /// Run flag chosen for this leg; `None` leaves the current one.
    pub run: Option<bool>,
}

/// Animates an entity's position along one or more chained segments.
#[derive(Component, Clone, Debug)]
pub struct MoveAnimation {
    pub from_x: f32,
    pub from_y: f32,
    pub from_elevation: f32,
    /// Segment in flight.
    pub current: MoveSegment,
    /// Segments chained behind the current one.
    pub queued: VecDeque<MoveSegment>,
    /// Current time within the segment in flight.
    pub time: f32,
    pub playing: bool,
}

impl MoveAnimation {
    pub fn new(from: (f32, f32, f32), segment: MoveSegment) -> Self {
        Self {
            from_x: from.0,
            from_y: from.1,
            from_elevation: from.2,
            current: segment,
            queued: VecDeque::new(),
            time: 0.0,
            playing: true,
        }
    }

    /// Queue a segment behind the last one.
    pub fn chain(&mut self, segment: MoveSegment) {
        self.queued.push_back(segment);
    }

    /// Where the last queued segment ends.
    pub fn final_target(&self) -> (f32, f32, f32) {
        let last = self.queued.back().unwrap_or(&self.current);
        (last.to_x, last.to_y, last.to_elevation)
    }

    /// Start the next queued segment from the end of the current one.
    /// Returns `false` when nothing is queued.
    pub fn advance_segment(&mut self) -> bool {
        match self.queued.pop_front() {
            Some(next) => {
                self.from_x = self.current.to_x;
                self.from_y = self.current.to_y;
                self.from_elevation = self.current.to_elevation;
                self.current = next;
                self.time = 0.0;
                self.playing = true;
                true
            }
            None => false,
        }
    }
}

/// Frame-only idle loop: plays frames `0..frames` over
/// `frames * frame_seconds` and repeats.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct IdleAnimation {
    pub frames: usize,
    pub frame_seconds: f32,
    pub loop_mode: LoopMode,
    pub time: f32,
    pub playing: bool,
}

impl IdleAnimation {
    pub fn new(frames: usize, frame_seconds: f32) -> Self {
        Self {
            frames,
            frame_seconds,
            loop_mode: LoopMode::Loop,
            time: 0.0,
            playing: true,
        }
    }

    pub fn duration(&self) -> f32 {
        self.frames as f32 * self.frame_seconds
    }
}

/// A rotation interpolation the host started on an entity.
///
/// Sprite-sheet entities never interpolate their
/// [`Rotation`](super::rotation::Rotation): when it changes,
/// [`snap_rotation_system`](crate::systems::playback::snap_rotation_system)
/// snaps the facing and removes this marker.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TweenRotation;
