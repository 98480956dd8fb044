//! Engine systems.
//!
//! Submodules overview
//! - [`atlas`] – attach, refresh and evict sprite-sheet atlases
//! - [`occupancy`] – rebuild the occupancy index from positions
//! - [`playback`] – the playback state machine, idle scheduling and frame resolution
//! - [`textureload`] – loader thread loop and folding finished loads into the cache
//! - [`time`] – update simulation time and delta
//! - [`tween`] – advance movement, idle and rotation animations

pub mod atlas;
pub mod occupancy;
pub mod playback;
pub mod textureload;
pub mod time;
pub mod tween;
