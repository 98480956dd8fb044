//! ECS components for entities.
//!
//! Submodules overview:
//! - [`animation`] – sheet configuration, playback state and the resolved frame
//! - [`direction`] – compass directions and vector/angle bucketing
//! - [`mapposition`] – pixel position and elevation on the map
//! - [`occupant`] – grid footprint that can block other movers
//! - [`rotation`] – facing angle in degrees
//! - [`tween`] – positional, idle and rotation animations
//! - [`zindex`] – rendering order hint for 2D drawing

pub mod animation;
pub mod direction;
pub mod mapposition;
pub mod occupant;
pub mod rotation;
pub mod tween;
pub mod zindex;
