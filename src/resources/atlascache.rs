//! Atlas cache.
//!
//! Slicing a sheet is cheap but not free, and many entities usually share one
//! sheet, so atlases are memoized per [`AtlasKey`]. The cache also keeps the
//! shared [`FrameRegistry`] that maps generated frame identifiers to texture
//! regions, and the set of entities that registered as owners of each atlas.
//!
//! Two ways in:
//! - [`AtlasCache::get`] when the caller already holds the decoded texture.
//! - [`AtlasCache::request`] when the texture still has to be decoded by the
//!   loader thread. The first request for a key records it as pending and
//!   sends one load command; every later request for the same key reports
//!   [`AtlasRequest::Pending`] until [`AtlasCache::complete_load`] resolves
//!   it, after which all of them observe the same `Arc<Atlas>`.
//!
//! Atlases whose texture has been unloaded are evicted: their frame
//! identifiers are purged from the registry and the entry is rebuilt on the
//! next access. Owners keep whatever `Arc<Atlas>` they already hold until
//! they refresh.

use std::sync::Arc;

use bevy_ecs::prelude::*;
use crossbeam_channel::Sender;
use log::{debug, trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::events::textureload::TextureCmd;
use crate::resources::atlas::{Atlas, AtlasKey, FrameId, FrameRect};
use crate::resources::texturestore::TextureHandle;

/// A frame resolved against the texture it was sliced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    pub texture_id: u64,
    pub rect: FrameRect,
}

/// Shared frame-identifier registry.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    regions: FxHashMap<FrameId, TextureRegion>,
}

impl FrameRegistry {
    fn register(&mut self, atlas: &Atlas, texture: &TextureHandle) {
        for (id, rect) in atlas.frames() {
            self.regions.insert(
                id.clone(),
                TextureRegion {
                    texture_id: texture.id(),
                    rect: *rect,
                },
            );
        }
    }

    fn purge(&mut self, atlas: &Atlas) {
        for id in atlas.frame_ids() {
            self.regions.remove(id);
        }
    }

    pub fn resolve(&self, id: &str) -> Option<&TextureRegion> {
        self.regions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.regions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

struct ReadyAtlas {
    atlas: Arc<Atlas>,
    texture: TextureHandle,
    owners: FxHashSet<Entity>,
}

enum CacheEntry {
    /// Waiting for the loader thread; owners registered early are kept.
    Pending { owners: FxHashSet<Entity> },
    Ready(ReadyAtlas),
}

/// Outcome of [`AtlasCache::request`].
#[derive(Debug, Clone)]
pub enum AtlasRequest {
    Ready(Arc<Atlas>),
    Pending,
}

/// Atlas evicted from the cache along with the owners that referenced it.
#[derive(Debug, Clone)]
pub struct Eviction {
    pub key: AtlasKey,
    pub owners: Vec<Entity>,
}

#[derive(Resource, Default)]
pub struct AtlasCache {
    entries: FxHashMap<AtlasKey, CacheEntry>,
    /// Sources with a load command in flight.
    loading: FxHashSet<Arc<str>>,
    registry: FrameRegistry,
}

impl AtlasCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atlas for `(source, layout, frame_count)` sliced from `texture`.
    ///
    /// Hits return the cached instance. A cached atlas whose texture is no
    /// longer valid is purged and rebuilt from `texture`. A pending entry is
    /// resolved with `texture` right away.
    pub fn get(
        &mut self,
        source: &str,
        layout: &str,
        frame_count: u32,
        texture: &TextureHandle,
    ) -> Arc<Atlas> {
        let key = AtlasKey::new(source, layout, frame_count);
        self.get_key(&key, texture)
    }

    pub fn get_key(&mut self, key: &AtlasKey, texture: &TextureHandle) -> Arc<Atlas> {
        if let Some(atlas) = self.ready(key) {
            trace!("Atlas cache hit for {}", key);
            return atlas;
        }
        self.evict_if_invalid(key);
        let owners = match self.entries.remove(key) {
            Some(CacheEntry::Pending { owners }) => owners,
            _ => FxHashSet::default(),
        };
        self.build(key.clone(), texture, owners)
    }

    /// Non-blocking lookup that asks the loader thread for the texture on a
    /// miss. Only one load command is issued per source while it is in flight.
    pub fn request(&mut self, key: &AtlasKey, loader: &Sender<TextureCmd>) -> AtlasRequest {
        if let Some(atlas) = self.ready(key) {
            return AtlasRequest::Ready(atlas);
        }
        self.evict_if_invalid(key);
        if self.entries.contains_key(key) {
            return AtlasRequest::Pending;
        }
        if !self.loading.contains(&key.source) {
            let cmd = TextureCmd::Load {
                source: key.source.clone(),
            };
            if loader.send(cmd).is_err() {
                warn!("Texture loader is not running; cannot load '{}'", key.source);
                return AtlasRequest::Pending;
            }
            self.loading.insert(key.source.clone());
        }
        debug!("Atlas {} pending on texture load", key);
        self.entries.insert(
            key.clone(),
            CacheEntry::Pending {
                owners: FxHashSet::default(),
            },
        );
        AtlasRequest::Pending
    }

    /// Resolve every pending atlas sliced from `source`. Returns the keys
    /// that became ready.
    pub fn complete_load(&mut self, source: &str, texture: &TextureHandle) -> Vec<AtlasKey> {
        self.loading.remove(source);
        let keys: Vec<AtlasKey> = self
            .entries
            .iter()
            .filter(|(k, e)| &*k.source == source && matches!(e, CacheEntry::Pending { .. }))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            let owners = match self.entries.remove(key) {
                Some(CacheEntry::Pending { owners }) => owners,
                _ => FxHashSet::default(),
            };
            self.build(key.clone(), texture, owners);
        }
        keys
    }

    /// Cached atlas for `key` if it is built and its texture is still valid.
    pub fn poll(&self, key: &AtlasKey) -> Option<Arc<Atlas>> {
        self.ready(key)
    }

    /// Identifier of the texture a ready atlas was sliced from.
    pub fn texture_id(&self, key: &AtlasKey) -> Option<u64> {
        match self.entries.get(key) {
            Some(CacheEntry::Ready(ready)) if ready.texture.is_valid() => Some(ready.texture.id()),
            _ => None,
        }
    }

    /// Animation name to frame identifiers for a sheet, building the atlas
    /// from `texture` if needed.
    pub fn animation_sequences(
        &mut self,
        source: &str,
        layout: &str,
        frame_count: u32,
        texture: &TextureHandle,
    ) -> FxHashMap<String, Vec<FrameId>> {
        self.get(source, layout, frame_count, texture)
            .sequences()
            .clone()
    }

    pub fn is_pending(&self, key: &AtlasKey) -> bool {
        matches!(self.entries.get(key), Some(CacheEntry::Pending { .. }))
    }

    pub fn contains(&self, key: &AtlasKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Record `owner` as a user of the atlas for `key`. Returns `false` when
    /// the key is not cached.
    pub fn register_owner(&mut self, key: &AtlasKey, owner: Entity) -> bool {
        match self.entries.get_mut(key) {
            Some(CacheEntry::Pending { owners }) => {
                owners.insert(owner);
                true
            }
            Some(CacheEntry::Ready(ready)) => {
                ready.owners.insert(owner);
                true
            }
            None => false,
        }
    }

    pub fn release_owner(&mut self, key: &AtlasKey, owner: Entity) {
        match self.entries.get_mut(key) {
            Some(CacheEntry::Pending { owners }) => {
                owners.remove(&owner);
            }
            Some(CacheEntry::Ready(ready)) => {
                ready.owners.remove(&owner);
            }
            None => {}
        }
    }

    /// Drop `owner` from every entry, e.g. after it was despawned.
    pub fn forget_owner(&mut self, owner: Entity) {
        for entry in self.entries.values_mut() {
            match entry {
                CacheEntry::Pending { owners } => owners.remove(&owner),
                CacheEntry::Ready(ready) => ready.owners.remove(&owner),
            };
        }
    }

    pub fn owners(&self, key: &AtlasKey) -> Vec<Entity> {
        match self.entries.get(key) {
            Some(CacheEntry::Pending { owners }) => owners.iter().copied().collect(),
            Some(CacheEntry::Ready(ready)) => ready.owners.iter().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Drop a built atlas and purge its frame identifiers.
    pub fn evict(&mut self, key: &AtlasKey) -> Option<Eviction> {
        match self.entries.remove(key) {
            Some(CacheEntry::Ready(ready)) => {
                self.registry.purge(&ready.atlas);
                debug!("Evicted atlas {}", key);
                Some(Eviction {
                    key: key.clone(),
                    owners: ready.owners.into_iter().collect(),
                })
            }
            Some(pending) => {
                self.entries.insert(key.clone(), pending);
                None
            }
            None => None,
        }
    }

    /// Evict every atlas whose backing texture has been unloaded.
    pub fn evict_invalid(&mut self) -> Vec<Eviction> {
        let stale: Vec<AtlasKey> = self
            .entries
            .iter()
            .filter_map(|(k, e)| match e {
                CacheEntry::Ready(ready) if !ready.texture.is_valid() => Some(k.clone()),
                _ => None,
            })
            .collect();
        stale.iter().filter_map(|k| self.evict(k)).collect()
    }

    pub fn registry(&self) -> &FrameRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ready(&self, key: &AtlasKey) -> Option<Arc<Atlas>> {
        match self.entries.get(key) {
            Some(CacheEntry::Ready(ready)) if ready.texture.is_valid() => {
                Some(ready.atlas.clone())
            }
            _ => None,
        }
    }

    fn evict_if_invalid(&mut self, key: &AtlasKey) {
        if let Some(CacheEntry::Ready(ready)) = self.entries.get(key) {
            if !ready.texture.is_valid() {
                warn!("Texture for atlas {} was unloaded, rebuilding", key);
                self.evict(key);
            }
        }
    }

    fn build(
        &mut self,
        key: AtlasKey,
        texture: &TextureHandle,
        owners: FxHashSet<Entity>,
    ) -> Arc<Atlas> {
        let atlas = if texture.is_placeholder() {
            Atlas::static_image(key.clone(), texture.width(), texture.height())
        } else {
            key.layout
                .layout()
                .slice(&key, texture.width(), texture.height())
        };
        let atlas = Arc::new(atlas);
        self.registry.register(&atlas, texture);
        debug!("Built atlas {} ({} frames)", key, atlas.frames().len());
        self.entries.insert(
            key,
            CacheEntry::Ready(ReadyAtlas {
                atlas: atlas.clone(),
                texture: texture.clone(),
                owners,
            }),
        );
        atlas
    }
}
