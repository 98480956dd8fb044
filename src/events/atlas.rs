//! Atlas lifecycle events.
//!
//! [`AtlasEvicted`] is triggered when the cache drops an atlas because the
//! texture behind it was unloaded. The listed owners have been flagged
//! stale and pick up a rebuilt atlas on the next atlas pass; hosts can
//! observe the event to drop GPU-side state keyed on the old frames.

use bevy_ecs::prelude::*;
use log::info;

use crate::resources::atlas::AtlasKey;

#[derive(Event, Debug, Clone)]
pub struct AtlasEvicted {
    pub key: AtlasKey,
    pub owners: Vec<Entity>,
}

/// Log evictions.
pub fn observe_atlas_evicted(trigger: On<AtlasEvicted>) {
    let event = trigger.event();
    info!(
        "Atlas {} evicted, {} owner(s) will refresh",
        event.key,
        event.owners.len()
    );
}
