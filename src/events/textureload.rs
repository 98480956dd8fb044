//! Messages exchanged with the texture loader thread.
//!
//! See [`crate::resources::texturestore::setup_texture_loader`] for the
//! bridge and [`crate::systems::textureload`] for the thread loop.

use std::sync::Arc;

use crate::resources::texturestore::TextureHandle;

/// Commands sent *to* the loader thread.
#[derive(Debug)]
pub enum TextureCmd {
    Load { source: Arc<str> },
    Shutdown,
}

/// Messages sent *back* from the loader thread.
#[derive(Debug, Clone)]
pub enum TextureMessage {
    /// `texture` is the decoded image, or the loader's placeholder when
    /// decoding failed.
    Loaded {
        source: Arc<str>,
        texture: TextureHandle,
    },
}
