//! ECS resources made available to systems.
//!
//! Overview
//! - `animationconfig` – movement, idle and collision settings (INI backed)
//! - `atlas` – sliced atlas types and animation keys
//! - `atlascache` – memoized atlases, pending loads and the frame registry
//! - `gridgeometry` – cell size and elevation step of the map
//! - `occupancy` – per-cell index of occupants for path queries
//! - `sheetlayout` – layout registry and the slicer
//! - `texturestore` – decoded textures and the loader thread bridge
//! - `worldtime` – simulation time and delta
pub mod animationconfig;
pub mod atlas;
pub mod atlascache;
pub mod gridgeometry;
pub mod occupancy;
pub mod sheetlayout;
pub mod texturestore;
pub mod worldtime;
