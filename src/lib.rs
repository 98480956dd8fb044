//! sheetwalk library.
//!
//! Directional sprite-sheet animation for grid-based maps: slicing sheets
//! into atlases, turning token movement into walk, run and idle playback,
//! and constraining movement paths around occupied cells. Everything is
//! exposed as ECS components, resources, systems and events so hosts and
//! integration tests can assemble the world themselves or use [`runtime`].

pub mod components;
pub mod events;
pub mod pathing;
pub mod resources;
pub mod runtime;
pub mod systems;
