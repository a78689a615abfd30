use foundation::ids::{LayerId, RenderableId};

use crate::category::LayerCategory;
use crate::config::FeatureMode;
use crate::counters::CountersSnapshot;

/// Channel names other subsystems key on. These are a wire-level contract:
/// renaming one is a breaking change for every subscriber.
pub mod channels {
    pub const LAYER_ADDED: &str = "LAYER_ADDED";
    pub const LAYER_REMOVED: &str = "LAYER_REMOVED";
    pub const LAYER_LOADED: &str = "LAYER_LOADED";
    pub const LAYER_UPDATING: &str = "LAYER_UPDATING";
    pub const LAYER_UPDATED: &str = "LAYER_UPDATED";
    pub const LAYER_ERROR: &str = "LAYER_ERROR";
    pub const REMOVE_LAYER: &str = "REMOVE_LAYER";
    pub const RELOAD_LAYER: &str = "RELOAD_LAYER";

    // Raw lifecycle notifications from the render surface, keyed by
    // renderable so a late event for an evicted renderable cannot be
    // mistaken for its replacement.
    pub const SURFACE_LOADED: &str = "SURFACE_LOADED";
    pub const SURFACE_ERROR: &str = "SURFACE_ERROR";
    pub const SURFACE_UPDATE_STARTED: &str = "SURFACE_UPDATE_STARTED";
    pub const SURFACE_UPDATE_FINISHED: &str = "SURFACE_UPDATE_FINISHED";
}

/// Identity summary carried on add/remove events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub category: LayerCategory,
    pub title: String,
}

/// Message type flowing over the event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Added {
        layer: LayerInfo,
        counters: CountersSnapshot,
    },
    Removed {
        layer: LayerInfo,
        counters: CountersSnapshot,
    },
    Loaded {
        layer: LayerId,
    },
    Updating {
        layer: LayerId,
    },
    Updated {
        layer: LayerId,
    },
    Error {
        layer: LayerId,
        error: String,
    },
    RemoveLayer {
        layer: LayerId,
    },
    ReloadLayer {
        layer: LayerId,
        mode: Option<FeatureMode>,
    },
    SurfaceLoaded {
        render: RenderableId,
    },
    SurfaceError {
        render: RenderableId,
        error: String,
    },
    SurfaceUpdateStarted {
        render: RenderableId,
    },
    SurfaceUpdateFinished {
        render: RenderableId,
    },
}

impl LayerEvent {
    /// The channel this event is published on.
    pub fn channel(&self) -> &'static str {
        match self {
            LayerEvent::Added { .. } => channels::LAYER_ADDED,
            LayerEvent::Removed { .. } => channels::LAYER_REMOVED,
            LayerEvent::Loaded { .. } => channels::LAYER_LOADED,
            LayerEvent::Updating { .. } => channels::LAYER_UPDATING,
            LayerEvent::Updated { .. } => channels::LAYER_UPDATED,
            LayerEvent::Error { .. } => channels::LAYER_ERROR,
            LayerEvent::RemoveLayer { .. } => channels::REMOVE_LAYER,
            LayerEvent::ReloadLayer { .. } => channels::RELOAD_LAYER,
            LayerEvent::SurfaceLoaded { .. } => channels::SURFACE_LOADED,
            LayerEvent::SurfaceError { .. } => channels::SURFACE_ERROR,
            LayerEvent::SurfaceUpdateStarted { .. } => channels::SURFACE_UPDATE_STARTED,
            LayerEvent::SurfaceUpdateFinished { .. } => channels::SURFACE_UPDATE_FINISHED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LayerEvent, channels};
    use foundation::ids::LayerId;

    #[test]
    fn channel_names_are_stable() {
        assert_eq!(channels::LAYER_ADDED, "LAYER_ADDED");
        assert_eq!(channels::LAYER_REMOVED, "LAYER_REMOVED");
        assert_eq!(channels::LAYER_LOADED, "LAYER_LOADED");
        assert_eq!(channels::LAYER_UPDATING, "LAYER_UPDATING");
        assert_eq!(channels::LAYER_UPDATED, "LAYER_UPDATED");
        assert_eq!(channels::LAYER_ERROR, "LAYER_ERROR");
        assert_eq!(channels::REMOVE_LAYER, "REMOVE_LAYER");
        assert_eq!(channels::RELOAD_LAYER, "RELOAD_LAYER");
    }

    #[test]
    fn events_route_to_their_channel() {
        let ev = LayerEvent::Loaded {
            layer: LayerId::new("a"),
        };
        assert_eq!(ev.channel(), channels::LAYER_LOADED);
        let ev = LayerEvent::RemoveLayer {
            layer: LayerId::new("a"),
        };
        assert_eq!(ev.channel(), channels::REMOVE_LAYER);
    }
}
