//! Directional sprite-sheet playback components.
//!
//! - [`SpriteSheet`] is the per-entity sheet configuration supplied by the
//!   host: image source, layout, frame count and the idle flags.
//! - [`AnimationState`] is the playback state the state machine mutates.
//! - [`SheetAtlas`] is the atlas the entity currently renders from.
//! - [`SpriteFrame`] is the resolved output the host draws each tick.
//!
//! See [`crate::systems::playback`] for the transitions.

use std::sync::Arc;

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

use crate::components::direction::Direction;
use crate::resources::atlas::{Atlas, AtlasKey, FrameId, FrameRect};
use crate::resources::sheetlayout::LayoutId;

/// Which family of sequences an entity is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationMode {
    Idle,
    Walk,
    Run,
}

/// Per-entity playback state.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationState {
    pub direction: Direction,
    /// Raw frame counter; wrapped against the active sequence on resolve.
    pub frame_index: usize,
    pub idle: bool,
    pub run: bool,
}

impl AnimationState {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            frame_index: 0,
            idle: true,
            run: false,
        }
    }

    pub fn mode(&self) -> AnimationMode {
        if self.idle {
            AnimationMode::Idle
        } else if self.run {
            AnimationMode::Run
        } else {
            AnimationMode::Walk
        }
    }
}

/// Sheet configuration for an entity.
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteSheet {
    pub source: Arc<str>,
    pub layout: LayoutId,
    pub frame_count: u32,
    /// Frame 0 of each walking sequence is a dedicated idle pose.
    pub separate_idle: bool,
    /// Never play idle loops for this entity.
    pub no_idle: bool,
    /// The map is drawn isometrically; facings are shifted one step.
    pub isometric: bool,
}

impl SpriteSheet {
    /// Sheet with a layout looked up by name; unknown names use the
    /// default layout.
    pub fn new(source: &str, layout: &str, frame_count: u32) -> Self {
        Self::with_layout(source, LayoutId::resolve(layout), frame_count)
    }

    pub fn with_layout(source: &str, layout: LayoutId, frame_count: u32) -> Self {
        Self {
            source: Arc::from(source),
            layout,
            frame_count,
            separate_idle: false,
            no_idle: false,
            isometric: false,
        }
    }

    pub fn with_separate_idle(mut self, separate_idle: bool) -> Self {
        self.separate_idle = separate_idle;
        self
    }

    pub fn with_no_idle(mut self, no_idle: bool) -> Self {
        self.no_idle = no_idle;
        self
    }

    pub fn with_isometric(mut self, isometric: bool) -> Self {
        self.isometric = isometric;
        self
    }

    pub fn key(&self) -> AtlasKey {
        AtlasKey::for_layout(&self.source, self.layout, self.frame_count)
    }
}

/// Atlas the entity renders from.
///
/// The entity keeps this `Arc` until it is refreshed, so an eviction in the
/// cache never pulls frames out from under a frame already being drawn.
#[derive(Component, Debug, Clone)]
pub struct SheetAtlas {
    pub atlas: Arc<Atlas>,
    pub texture_id: u64,
    /// The cache evicted this atlas; refresh on the next atlas pass.
    pub stale: bool,
}

impl SheetAtlas {
    pub fn new(atlas: Arc<Atlas>, texture_id: u64) -> Self {
        Self {
            atlas,
            texture_id,
            stale: false,
        }
    }

    pub fn key(&self) -> &AtlasKey {
        self.atlas.key()
    }
}

/// Resolved frame for the host renderer.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct SpriteFrame {
    pub frame_id: FrameId,
    /// Animation key the frame was taken from.
    pub animation: String,
    pub rect: FrameRect,
    pub texture_id: u64,
}

/// Marker: the entity slides with one leg out; always walks, frame 1.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Sliding;

/// Marker: the entity spins through the cardinal facings while moving.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Spinning;

/// Marker: idle playback should be (re)considered on the next tick.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PendingIdle;
