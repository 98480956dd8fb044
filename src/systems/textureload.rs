//! Texture loading: the background loader thread and the per-tick system
//! that folds finished loads into the atlas cache.
//!
//! - [`texture_loader_thread`] runs on its own OS thread, owns the host's
//!   [`TextureLoader`], and answers [`TextureCmd::Load`] requests.
//! - [`apply_texture_loads`] drains finished loads without blocking, stores
//!   the textures, and resolves every atlas that was waiting on them.

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};

use crate::events::textureload::{TextureCmd, TextureMessage};
use crate::resources::atlascache::AtlasCache;
use crate::resources::texturestore::{TextureLoadBridge, TextureLoader, TextureStore};

/// Loader thread loop. Exits on [`TextureCmd::Shutdown`] or when the ECS
/// side of the bridge is dropped.
pub fn texture_loader_thread(
    mut loader: impl TextureLoader,
    rx_cmd: Receiver<TextureCmd>,
    tx_msg: Sender<TextureMessage>,
) {
    while let Ok(cmd) = rx_cmd.recv() {
        match cmd {
            TextureCmd::Load { source } => {
                let texture = match loader.load_texture(&source) {
                    Some(texture) => texture,
                    None => {
                        warn!("Failed to load texture '{}', using placeholder", source);
                        loader.placeholder(&source)
                    }
                };
                if tx_msg.send(TextureMessage::Loaded { source, texture }).is_err() {
                    break;
                }
            }
            TextureCmd::Shutdown => break,
        }
    }
    debug!("Texture loader thread stopped");
}

/// Drain finished loads into [`TextureStore`] and [`AtlasCache`].
pub fn apply_texture_loads(
    bridge: Option<Res<TextureLoadBridge>>,
    mut store: ResMut<TextureStore>,
    mut cache: ResMut<AtlasCache>,
) {
    let Some(bridge) = bridge else {
        return;
    };
    for msg in bridge.rx_msg.try_iter() {
        match msg {
            TextureMessage::Loaded { source, texture } => {
                let resolved = cache.complete_load(&source, &texture);
                debug!("Texture '{}' loaded, resolved {} atlas(es)", source, resolved.len());
                if !texture.is_placeholder() {
                    store.insert(texture);
                }
            }
        }
    }
}
