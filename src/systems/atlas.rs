//! Attach atlases to sprite-sheet entities.
//!
//! - [`sheet_atlas_system`] gives every [`SpriteSheet`] entity a
//!   [`SheetAtlas`], building it synchronously when the texture is already
//!   decoded and asking the loader thread otherwise
//! - [`evict_stale_atlases`] drops atlases whose texture was unloaded and
//!   flags their owners for a refresh
//! - [`release_removed_owners`] keeps the cache's owner sets free of
//!   entities that lost their atlas

use bevy_ecs::prelude::*;
use log::{debug, trace};

use crate::components::animation::{PendingIdle, SheetAtlas, SpriteSheet};
use crate::events::atlas::AtlasEvicted;
use crate::resources::atlascache::{AtlasCache, AtlasRequest};
use crate::resources::texturestore::{TextureLoadBridge, TextureStore};

/// Attach or refresh [`SheetAtlas`] components.
///
/// An entity needs an atlas when it has none, when its sheet now maps to a
/// different key, or when the cache flagged its atlas stale. Entities
/// waiting on a load are registered as owners of the pending entry and
/// retried every tick until the atlas is ready. A first attach schedules
/// idle playback.
pub fn sheet_atlas_system(
    mut commands: Commands,
    mut cache: ResMut<AtlasCache>,
    store: Res<TextureStore>,
    bridge: Option<Res<TextureLoadBridge>>,
    query: Query<(Entity, &SpriteSheet, Option<&SheetAtlas>)>,
) {
    for (entity, sheet, current) in query.iter() {
        let key = sheet.key();
        if current.is_some_and(|c| !c.stale && *c.key() == key) {
            continue;
        }

        let decoded = store.get(&sheet.source).filter(|t| t.is_valid());
        let (atlas, texture_id) = match (decoded, bridge.as_ref()) {
            (Some(texture), _) => (cache.get_key(&key, texture), texture.id()),
            (None, Some(bridge)) => match cache.request(&key, &bridge.tx_cmd) {
                AtlasRequest::Ready(atlas) => {
                    let Some(texture_id) = cache.texture_id(&key) else {
                        continue;
                    };
                    (atlas, texture_id)
                }
                AtlasRequest::Pending => {
                    cache.register_owner(&key, entity);
                    continue;
                }
            },
            (None, None) => {
                trace!("No texture or loader for '{}'", sheet.source);
                continue;
            }
        };

        cache.register_owner(&key, entity);
        let mut entity_commands = commands.entity(entity);
        match current {
            Some(old) => {
                if *old.key() != key {
                    cache.release_owner(old.key(), entity);
                }
                debug!("Refreshed atlas {} for {:?}", key, entity);
            }
            None => {
                entity_commands.insert(PendingIdle);
            }
        }
        entity_commands.insert(SheetAtlas::new(atlas, texture_id));
    }
}

/// Evict atlases backed by unloaded textures and notify observers.
pub fn evict_stale_atlases(
    mut commands: Commands,
    mut cache: ResMut<AtlasCache>,
    mut query: Query<&mut SheetAtlas>,
) {
    for eviction in cache.evict_invalid() {
        for owner in &eviction.owners {
            if let Ok(mut sheet_atlas) = query.get_mut(*owner) {
                sheet_atlas.stale = true;
            }
        }
        commands.trigger(AtlasEvicted {
            key: eviction.key,
            owners: eviction.owners,
        });
    }
}

/// Forget owners whose [`SheetAtlas`] was removed or despawned.
pub fn release_removed_owners(
    mut removed: RemovedComponents<SheetAtlas>,
    mut cache: ResMut<AtlasCache>,
) {
    for entity in removed.read() {
        cache.forget_owner(entity);
    }
}
