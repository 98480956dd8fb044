//! Event types and observers.
//!
//! Submodules:
//! - [`atlas`] – notification that cached atlases were evicted
//! - [`movement`] – movement requests and the observer that starts them
//! - [`textureload`] – commands and messages for the texture loader thread
pub mod atlas;
pub mod movement;
pub mod textureload;
