//! Texture handles and the bridge to the background texture loader.
//!
//! Decoding image bytes is the host's job. The host plugs a
//! [`TextureLoader`] in through [`setup_texture_loader`]; it runs on its own
//! thread and answers [`TextureCmd::Load`] requests with
//! [`TextureMessage::Loaded`]. A failed load answers with the loader's
//! placeholder image so the entity still has something to show.
//!
//! Call [`shutdown_texture_loader`] during teardown to stop and join the
//! thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender, unbounded};
use rustc_hash::FxHashMap;

use crate::events::textureload::{TextureCmd, TextureMessage};
use crate::systems::textureload::texture_loader_thread;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Shared reference to a decoded texture owned by the host.
///
/// Clones share one validity flag: once the host unloads the texture every
/// clone reports [`TextureHandle::is_valid`] as `false`.
#[derive(Debug, Clone)]
pub struct TextureHandle {
    id: u64,
    source: Arc<str>,
    width: u32,
    height: u32,
    placeholder: bool,
    valid: Arc<AtomicBool>,
}

impl TextureHandle {
    pub fn new(source: &str, width: u32, height: u32) -> Self {
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            source: Arc::from(source),
            width,
            height,
            placeholder: false,
            valid: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Fallback image shown when `source` could not be loaded.
    pub fn placeholder(source: &str, width: u32, height: u32) -> Self {
        Self {
            placeholder: true,
            ..Self::new(source, width, height)
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Mark the underlying texture as unloaded.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

/// Host-side image decoder.
pub trait TextureLoader: Send + 'static {
    /// Decode `source`; `None` means the image could not be loaded.
    fn load_texture(&mut self, source: &str) -> Option<TextureHandle>;

    /// Image to show instead of `source` when loading it failed.
    fn placeholder(&mut self, source: &str) -> TextureHandle {
        TextureHandle::placeholder(source, 1, 1)
    }
}

/// Decoded textures keyed by image source.
#[derive(Resource, Default)]
pub struct TextureStore {
    pub map: FxHashMap<Arc<str>, TextureHandle>,
}

impl TextureStore {
    pub fn get(&self, source: &str) -> Option<&TextureHandle> {
        self.map.get(source)
    }

    pub fn insert(&mut self, texture: TextureHandle) {
        self.map.insert(texture.source().clone(), texture);
    }

    /// Drop a texture and invalidate every handle that still points at it.
    pub fn unload(&mut self, source: &str) -> bool {
        match self.map.remove(source) {
            Some(texture) => {
                texture.invalidate();
                true
            }
            None => false,
        }
    }
}

/// Channels between the ECS world and the loader thread.
#[derive(Resource)]
pub struct TextureLoadBridge {
    /// Sender for [`TextureCmd`] messages (ECS -> loader thread).
    pub tx_cmd: Sender<TextureCmd>,
    /// Receiver for [`TextureMessage`] messages (loader thread -> ECS).
    pub rx_msg: Receiver<TextureMessage>,
    /// Join handle for the loader thread.
    pub handle: std::thread::JoinHandle<()>,
}

/// Spawn the loader thread and insert [`TextureLoadBridge`].
pub fn setup_texture_loader(world: &mut World, loader: impl TextureLoader) {
    let (tx_cmd, rx_cmd) = unbounded::<TextureCmd>();
    let (tx_msg, rx_msg) = unbounded::<TextureMessage>();

    let handle = std::thread::spawn(move || texture_loader_thread(loader, rx_cmd, tx_msg));

    world.insert_resource(TextureLoadBridge {
        tx_cmd,
        rx_msg,
        handle,
    });
}

/// Ask the loader thread to stop and join it.
pub fn shutdown_texture_loader(world: &mut World) {
    if let Some(bridge) = world.remove_resource::<TextureLoadBridge>() {
        let _ = bridge.tx_cmd.send(TextureCmd::Shutdown);
        let _ = bridge.handle.join();
    }
}
