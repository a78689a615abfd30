use foundation::ids::{LayerId, RenderableId};
use layers::category::LayerCategory;
use layers::events::LayerEvent;
use layers::state::{LoadEvent, LoadState, next_state};

use crate::composer::{Composer, Inner, entry_is_counted, entry_rank, physical_index};
use crate::legend::{LegendOptions, LegendState};
use crate::stack::StackEntry;

/// Surface notification handling.
///
/// Every handler first resolves the renderable through the registry; a
/// notification for a renderable that is no longer registered (removed
/// mid-load, or evicted by an earlier error) is an expected race and is
/// dropped without side effects. Transitions then go through the state
/// table, which has no row out of `Error` — that is the abort-if-error
/// guard, applied before any UI write.
impl Composer {
    pub(crate) fn on_surface_loaded(&self, render: RenderableId) {
        let mut events = Vec::new();
        {
            let inner = &mut *self.inner.borrow_mut();
            let Some(id) = advance(inner, render, LoadEvent::LoadSucceeded) else {
                return;
            };
            project(inner, &id);
            replay_highlights(inner, &id);
            ensure_companion(inner, &id);
            events.push(LayerEvent::Loaded { layer: id });
        }
        self.emit(events);
    }

    pub(crate) fn on_surface_error(&self, render: RenderableId, message: String) {
        let mut events = Vec::new();
        {
            let inner = &mut *self.inner.borrow_mut();
            let Some(handle) = inner.registry.get_mut_by_render(render) else {
                inner.metrics.incr("stale_surface_notifications");
                return;
            };
            if next_state(handle.state, LoadEvent::LoadFailed).is_none() {
                inner.metrics.incr("ignored_notifications");
                return;
            }
            let id = handle.id.clone();
            enter_error(inner, &id, message, &mut events);
        }
        self.emit(events);
    }

    pub(crate) fn on_update_started(&self, render: RenderableId) {
        let mut events = Vec::new();
        {
            let inner = &mut *self.inner.borrow_mut();
            let Some(id) = advance(inner, render, LoadEvent::UpdateStarted) else {
                return;
            };
            project(inner, &id);
            events.push(LayerEvent::Updating { layer: id });
        }
        self.emit(events);
    }

    pub(crate) fn on_update_finished(&self, render: RenderableId) {
        let mut events = Vec::new();
        {
            let inner = &mut *self.inner.borrow_mut();
            let Some(id) = advance(inner, render, LoadEvent::UpdateFinished) else {
                return;
            };
            project(inner, &id);
            replay_highlights(inner, &id);
            ensure_companion(inner, &id);
            events.push(LayerEvent::Updated { layer: id });
        }
        self.emit(events);
    }

    /// Re-evaluate every layer's scale visibility against the new map
    /// scale. Off-scale layers keep their substantive state; only the UI
    /// projection changes. A scale of zero disables the sweep.
    pub fn set_scale(&self, scale: f64) {
        let inner = &mut *self.inner.borrow_mut();
        inner.scale = scale;
        for id in inner.registry.ids() {
            let changed = {
                let Some(handle) = inner.registry.get_mut(&id) else {
                    continue;
                };
                let off = scale > 0.0 && !handle.config.scale_range().contains(scale);
                if off == handle.off_scale {
                    false
                } else {
                    handle.off_scale = off;
                    true
                }
            };
            if changed {
                project(inner, &id);
            }
        }
    }
}

/// Validate `render` against the registry and run `event` through the
/// transition table. Returns the layer id when the state advanced.
fn advance(inner: &mut Inner, render: RenderableId, event: LoadEvent) -> Option<LayerId> {
    let Some(handle) = inner.registry.get_mut_by_render(render) else {
        inner.metrics.incr("stale_surface_notifications");
        return None;
    };
    let Some(next) = next_state(handle.state, event) else {
        inner.metrics.incr("ignored_notifications");
        return None;
    };
    handle.state = next;
    Some(handle.id.clone())
}

/// Project a handle's current state into the legend. Errors win over
/// off-scale; both carry a displayable notice.
pub(crate) fn project(inner: &mut Inner, id: &LayerId) {
    let Some(handle) = inner.registry.get(id) else {
        return;
    };
    let (state, options) = match handle.state {
        LoadState::Error => (
            LegendState::Error,
            LegendOptions {
                notice: handle.error.clone(),
            },
        ),
        _ if handle.off_scale => (
            LegendState::OffScale,
            LegendOptions::notice("out of visible scale range"),
        ),
        LoadState::Loading => (LegendState::Loading, LegendOptions::default()),
        LoadState::Loaded => (LegendState::Loaded, LegendOptions::default()),
        LoadState::Updating => (LegendState::Updating, LegendOptions::default()),
    };
    inner.legend.set_state(id, state, options);
}

/// Move a handle into `Error`: evict its render-surface footprint (the map
/// must not keep showing a broken layer) while the registry entry, its
/// stack slot, and the legend entry stay behind for the retry affordance.
pub(crate) fn enter_error(
    inner: &mut Inner,
    id: &LayerId,
    message: String,
    events: &mut Vec<LayerEvent>,
) {
    let (render, was_counted, category) = {
        let Some(handle) = inner.registry.get_mut(id) else {
            return;
        };
        handle.state = LoadState::Error;
        handle.error = Some(message.clone());
        let render = handle.render.take();
        let was_counted = std::mem::replace(&mut handle.counted, false);
        (render, was_counted, handle.category)
    };
    if let Some(render) = render {
        inner.surface.remove(render);
    }
    if was_counted {
        inner.counters.decrement(category);
    }
    remove_companion(inner, id);
    project(inner, id);
    events.push(LayerEvent::Error {
        layer: id.clone(),
        error: message,
    });
}

/// Re-issue recorded highlight requests now that the layer has data.
/// Requests whose feature has disappeared are dropped without complaint.
pub(crate) fn replay_highlights(inner: &mut Inner, id: &LayerId) {
    let Some(pending) = inner.highlights.remove(id) else {
        return;
    };
    let Some(render) = inner.registry.get(id).and_then(|h| h.render) else {
        return;
    };
    for feature in pending {
        if inner.surface.locate_feature(render, &feature) {
            inner.surface.highlight(render, &feature);
        } else {
            inner.metrics.incr("highlights_dropped");
        }
    }
}

/// Lazily create the extent companion for a loaded feature layer that has
/// one requested. Geometry comes from configuration when its spatial
/// reference matches the map, through the reprojector when it does not,
/// or from the surface's own knowledge of the loaded data.
pub(crate) fn ensure_companion(inner: &mut Inner, id: &LayerId) {
    let (render, configured_extent, owner_visible) = {
        let Some(handle) = inner.registry.get(id) else {
            return;
        };
        if handle.category != LayerCategory::Feature
            || !handle.extent_visible
            || handle.state != LoadState::Loaded
            || inner.companions.contains_key(id)
        {
            return;
        }
        (handle.render, handle.config.extent, handle.visible)
    };

    let extent = configured_extent
        .map(|e| e.to_extent())
        .or_else(|| render.and_then(|r| inner.surface.data_extent(r)));
    let Some(extent) = extent else {
        return;
    };
    let extent = if extent.srid == inner.map_srid {
        extent
    } else {
        match inner.reprojector.transform(&extent, inner.map_srid) {
            Some(e) => e,
            None => {
                inner.metrics.incr("reprojections_failed");
                return;
            }
        }
    };

    let outline = match inner.surface.create_outline(&extent) {
        Ok(r) => r,
        Err(_) => {
            inner.metrics.incr("construction_errors");
            return;
        }
    };
    let operational = inner.counters.index_for(LayerCategory::BoundingBox);
    let physical = physical_index(&inner.counters, LayerCategory::BoundingBox, operational);
    if inner.surface.insert(outline, physical).is_err() {
        inner.metrics.incr("construction_errors");
        return;
    }
    let slot = {
        let registry = &inner.registry;
        let companions = &inner.companions;
        inner.stack.slot_for_physical(
            physical,
            LayerCategory::BoundingBox.stack_rank(),
            |e| entry_is_counted(e, registry, companions),
            |e| entry_rank(e, registry),
        )
    };
    inner.stack.insert(slot, StackEntry::Extent(id.clone()));
    inner.counters.increment(LayerCategory::BoundingBox);
    inner.companions.insert(id.clone(), outline);
    if !owner_visible {
        inner.surface.set_visible(outline, false);
    }
}

/// Tear down a layer's extent companion, if it has one.
pub(crate) fn remove_companion(inner: &mut Inner, owner: &LayerId) {
    let Some(outline) = inner.companions.remove(owner) else {
        return;
    };
    inner.surface.remove(outline);
    inner.counters.decrement(LayerCategory::BoundingBox);
    inner.stack.remove_extent(owner);
}
