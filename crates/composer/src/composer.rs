use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use foundation::bounds::SpatialRef;
use foundation::ids::{GENERATED_ID_PREFIX, IdAllocator, LayerId, RenderableId};
use layers::category::LayerCategory;
use layers::config::{FeatureMode, LayerConfig};
use layers::counters::{CategoryCounters, CountersSnapshot};
use layers::events::{LayerEvent, LayerInfo, channels};
use layers::handle::LayerHandle;
use layers::state::LoadState;
use runtime::event_bus::EventBus;
use runtime::metrics::Metrics;

use crate::error::ConstructionError;
use crate::legend::{LegendProjection, LegendState};
use crate::lifecycle::{enter_error, project, remove_companion, replay_highlights};
use crate::registry::Registry;
use crate::reproject::Reprojector;
use crate::stack::{DrawStack, StackDirection, StackEntry};
use crate::surface::{LoadProbe, RenderSurface};

/// Event bus carrying layer lifecycle traffic.
pub type LayerBus = EventBus<LayerEvent>;

/// The mutable shared state: registry, counters, and the authoritative draw
/// order. Mutated only through [`Composer`] methods — lifecycle handlers
/// read the registry to validate ids and publish further events, nothing
/// else. That single-writer discipline is what substitutes for locking in
/// this single-threaded model.
pub(crate) struct Inner {
    pub(crate) surface: Box<dyn RenderSurface>,
    pub(crate) legend: Box<dyn LegendProjection>,
    pub(crate) reprojector: Box<dyn Reprojector>,
    pub(crate) registry: Registry,
    pub(crate) counters: CategoryCounters,
    pub(crate) stack: DrawStack,
    pub(crate) companions: BTreeMap<LayerId, RenderableId>,
    pub(crate) highlights: BTreeMap<LayerId, Vec<String>>,
    pub(crate) ids: IdAllocator,
    pub(crate) metrics: Metrics,
    pub(crate) map_srid: SpatialRef,
    pub(crate) scale: f64,
}

/// Coordinates layer loading, ordering, and recovery on top of a render
/// surface.
///
/// `load_layer`, `remove`, and `reload` return after their synchronous
/// bookkeeping; all further progress is driven by surface notifications
/// arriving on the bus. Index computation and the matching counter
/// increment never straddle a suspension point, which keeps index
/// allocation race-free without locks.
pub struct Composer {
    pub(crate) bus: Rc<LayerBus>,
    pub(crate) inner: Rc<RefCell<Inner>>,
}

impl Clone for Composer {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            inner: self.inner.clone(),
        }
    }
}

/// Non-owning reference held by bus handlers so subscriptions do not keep
/// the composer (or the bus itself) alive.
pub struct WeakComposer {
    bus: Weak<LayerBus>,
    inner: Weak<RefCell<Inner>>,
}

impl WeakComposer {
    pub fn upgrade(&self) -> Option<Composer> {
        Some(Composer {
            bus: self.bus.upgrade()?,
            inner: self.inner.upgrade()?,
        })
    }
}

impl Composer {
    /// Wire a composer to its collaborators and subscribe it to the surface
    /// lifecycle and command channels.
    pub fn attach(
        bus: Rc<LayerBus>,
        surface: Box<dyn RenderSurface>,
        legend: Box<dyn LegendProjection>,
        reprojector: Box<dyn Reprojector>,
        map_srid: SpatialRef,
    ) -> Self {
        let composer = Self {
            bus: bus.clone(),
            inner: Rc::new(RefCell::new(Inner {
                surface,
                legend,
                reprojector,
                registry: Registry::new(),
                counters: CategoryCounters::new(),
                stack: DrawStack::new(),
                companions: BTreeMap::new(),
                highlights: BTreeMap::new(),
                ids: IdAllocator::new(),
                metrics: Metrics::new(),
                map_srid,
                scale: 0.0,
            })),
        };

        let weak = composer.downgrade();
        bus.subscribe(channels::SURFACE_LOADED, move |ev| {
            if let (Some(c), LayerEvent::SurfaceLoaded { render }) = (weak.upgrade(), ev) {
                c.on_surface_loaded(*render);
            }
        });
        let weak = composer.downgrade();
        bus.subscribe(channels::SURFACE_ERROR, move |ev| {
            if let (Some(c), LayerEvent::SurfaceError { render, error }) = (weak.upgrade(), ev) {
                c.on_surface_error(*render, error.clone());
            }
        });
        let weak = composer.downgrade();
        bus.subscribe(channels::SURFACE_UPDATE_STARTED, move |ev| {
            if let (Some(c), LayerEvent::SurfaceUpdateStarted { render }) = (weak.upgrade(), ev) {
                c.on_update_started(*render);
            }
        });
        let weak = composer.downgrade();
        bus.subscribe(channels::SURFACE_UPDATE_FINISHED, move |ev| {
            if let (Some(c), LayerEvent::SurfaceUpdateFinished { render }) = (weak.upgrade(), ev) {
                c.on_update_finished(*render);
            }
        });
        let weak = composer.downgrade();
        bus.subscribe(channels::REMOVE_LAYER, move |ev| {
            if let (Some(c), LayerEvent::RemoveLayer { layer }) = (weak.upgrade(), ev) {
                c.remove(layer);
            }
        });
        let weak = composer.downgrade();
        bus.subscribe(channels::RELOAD_LAYER, move |ev| {
            if let (Some(c), LayerEvent::ReloadLayer { layer, mode }) = (weak.upgrade(), ev) {
                c.reload(layer, *mode);
            }
        });

        composer
    }

    pub fn downgrade(&self) -> WeakComposer {
        WeakComposer {
            bus: Rc::downgrade(&self.bus),
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn emit(&self, events: Vec<LayerEvent>) {
        for ev in events {
            self.bus.publish(ev.channel(), &ev);
        }
    }

    /// Construct a renderable for `config` and wrap it in an unloaded
    /// handle, allocating an id when the configuration carries none.
    pub fn build_layer(&self, config: LayerConfig) -> Result<LayerHandle, ConstructionError> {
        let inner = &mut *self.inner.borrow_mut();
        let id = match &config.id {
            Some(id) if id.starts_with(GENERATED_ID_PREFIX) => {
                return Err(ConstructionError::new(format!(
                    "external id uses the reserved prefix: {id}"
                )));
            }
            Some(id) => LayerId::new(id.clone()),
            None => inner.ids.next_id(),
        };
        if inner.registry.contains(&id) {
            return Err(ConstructionError::new(format!(
                "layer id already registered: {id}"
            )));
        }
        let render = inner.surface.create(&config, config.mode)?;
        Ok(LayerHandle::new(id, render, config))
    }

    /// Insert a constructed-but-unloaded handle into the draw stack and
    /// start tracking its lifecycle.
    ///
    /// The insertion index is derived from the category counters unless
    /// `insertion_override` is given (the reload path pins a recovered
    /// layer back into its old slot). The initial state is sampled from the
    /// surface rather than assumed: some renderable types are already
    /// loaded, or already failing, by the time they get here.
    pub fn load_layer(
        &self,
        mut handle: LayerHandle,
        insertion_override: Option<usize>,
    ) -> Result<(), ConstructionError> {
        let mut events = Vec::new();
        {
            let inner = &mut *self.inner.borrow_mut();
            if inner.registry.contains(&handle.id) {
                return Err(ConstructionError::new(format!(
                    "layer id already registered: {}",
                    handle.id
                )));
            }
            let Some(render) = handle.render else {
                return Err(ConstructionError::new(format!(
                    "handle has no renderable: {}",
                    handle.id
                )));
            };

            let category = handle.category;
            let operational =
                insertion_override.unwrap_or_else(|| inner.counters.index_for(category));
            let physical = physical_index(&inner.counters, category, operational);
            inner.surface.insert(render, physical)?;

            let slot = {
                let registry = &inner.registry;
                let companions = &inner.companions;
                inner.stack.slot_for_physical(
                    physical,
                    category.stack_rank(),
                    |e| entry_is_counted(e, registry, companions),
                    |e| entry_rank(e, registry),
                )
            };
            inner.stack.insert(slot, StackEntry::Layer(handle.id.clone()));
            inner.counters.increment(category);
            handle.counted = true;
            handle.off_scale =
                inner.scale > 0.0 && !handle.config.scale_range().contains(inner.scale);

            if !handle.visible {
                inner.surface.set_visible(render, false);
            }
            if handle.opacity < 1.0 {
                inner.surface.set_opacity(render, handle.opacity);
            }

            let probe = inner.surface.probe(render);
            let id = handle.id.clone();
            let info = info_of(&handle);
            inner.registry.insert(handle);
            inner.metrics.incr("layers_added");

            if matches!(probe, LoadProbe::Ready)
                && let Some(h) = inner.registry.get_mut(&id)
            {
                h.state = LoadState::Loaded;
            }
            project(inner, &id);
            events.push(LayerEvent::Added {
                layer: info,
                counters: inner.counters.snapshot(),
            });
            match probe {
                LoadProbe::Pending => {}
                LoadProbe::Ready => {
                    replay_highlights(inner, &id);
                    crate::lifecycle::ensure_companion(inner, &id);
                    events.push(LayerEvent::Loaded { layer: id });
                }
                LoadProbe::Failed(message) => {
                    enter_error(inner, &id, message, &mut events);
                }
            }
        }
        self.emit(events);
        Ok(())
    }

    /// Tear down a layer's whole footprint: renderable, companion, counter
    /// contribution, registry entry. Idempotent; a second call for the same
    /// id reports `false` and changes nothing.
    pub fn remove(&self, id: &LayerId) -> bool {
        let mut events = Vec::new();
        {
            let inner = &mut *self.inner.borrow_mut();
            let Some(handle) = inner.registry.remove(id) else {
                return false;
            };
            if let Some(render) = handle.render {
                inner.surface.remove(render);
            }
            if handle.counted {
                inner.counters.decrement(handle.category);
            }
            remove_companion(inner, id);
            inner.stack.remove_layer(id);
            inner.highlights.remove(id);
            inner.metrics.incr("layers_removed");
            events.push(LayerEvent::Removed {
                layer: info_of(&handle),
                counters: inner.counters.snapshot(),
            });
        }
        self.emit(events);
        true
    }

    /// Discard a layer's handle and re-create it from the same
    /// configuration, at the same logical position in its category.
    ///
    /// This is the only path out of the `Error` state, and it works by
    /// identity replacement: the old handle is fully removed and a fresh
    /// one starts over in `Loading`. The position is captured from the
    /// authoritative order against non-errored siblings, not from any
    /// stored index, since reordering and earlier failures may have
    /// invalidated one.
    pub fn reload(&self, id: &LayerId, mode: Option<FeatureMode>) -> bool {
        let (config, rank, visible, opacity, extent_visible, pending) = {
            let inner = &*self.inner.borrow();
            let Some(handle) = inner.registry.get(id) else {
                return false;
            };
            let registry = &inner.registry;
            let cat_rank = handle.category.stack_rank();
            let Some(rank) = inner.stack.rank_of_layer(id, |e| {
                matches!(e, StackEntry::Layer(other)
                    if registry.get(other).is_some_and(|h| {
                        h.category.stack_rank() == cat_rank && !h.is_error()
                    }))
            }) else {
                return false;
            };
            (
                handle.config.clone(),
                rank,
                handle.visible,
                handle.opacity,
                handle.extent_visible,
                inner.highlights.get(id).cloned().unwrap_or_default(),
            )
        };

        self.remove(id);

        let created = {
            let inner = &mut *self.inner.borrow_mut();
            inner.metrics.incr("reloads");
            inner.surface.create(&config, mode.or(config.mode))
        };

        let category = config.category;
        match created {
            Ok(render) => {
                let mut handle = LayerHandle::new(id.clone(), render, config.clone());
                handle.visible = visible;
                handle.opacity = opacity;
                handle.extent_visible = extent_visible;
                let operational = {
                    let inner = &*self.inner.borrow();
                    operational_for_rank(&inner.counters, category, rank)
                };
                match self.load_layer(handle, Some(operational)) {
                    Ok(()) => {
                        if !pending.is_empty() {
                            let inner = &mut *self.inner.borrow_mut();
                            inner.highlights.insert(id.clone(), pending);
                            if inner
                                .registry
                                .get(id)
                                .is_some_and(|h| h.state == LoadState::Loaded)
                            {
                                replay_highlights(inner, id);
                            }
                        }
                    }
                    Err(e) => self.park_in_error(id.clone(), config, rank, e.message().to_string()),
                }
            }
            Err(e) => self.park_in_error(id.clone(), config, rank, e.message().to_string()),
        }
        true
    }

    /// A reload whose construction failed re-enters the registry directly
    /// in `Error`, at its old slot, instead of throwing: the user triggered
    /// it interactively and must get a retry affordance, not a crash.
    fn park_in_error(&self, id: LayerId, config: LayerConfig, rank: usize, message: String) {
        let mut events = Vec::new();
        {
            let inner = &mut *self.inner.borrow_mut();
            let category = config.category;
            let handle = LayerHandle {
                id: id.clone(),
                category,
                render: None,
                visible: config.visible,
                opacity: config.opacity,
                extent_visible: config.show_extent,
                config,
                state: LoadState::Error,
                counted: false,
                off_scale: false,
                error: Some(message.clone()),
            };
            let info = info_of(&handle);
            let slot = {
                let registry = &inner.registry;
                let cat_rank = category.stack_rank();
                inner.stack.slot_for_category_rank(
                    rank,
                    cat_rank,
                    |e| {
                        matches!(e, StackEntry::Layer(other)
                            if registry.get(other).is_some_and(|h| {
                                h.category.stack_rank() == cat_rank && !h.is_error()
                            }))
                    },
                    |e| entry_rank(e, registry),
                )
            };
            inner.stack.insert(slot, StackEntry::Layer(id.clone()));
            inner.registry.insert(handle);
            inner.metrics.incr("construction_errors");
            project(inner, &id);
            events.push(LayerEvent::Added {
                layer: info,
                counters: inner.counters.snapshot(),
            });
            events.push(LayerEvent::Error {
                layer: id,
                error: message,
            });
        }
        self.emit(events);
    }

    pub fn set_visible(&self, id: &LayerId, visible: bool) -> bool {
        let inner = &mut *self.inner.borrow_mut();
        let Some(handle) = inner.registry.get_mut(id) else {
            return false;
        };
        handle.visible = visible;
        let render = handle.render;
        if let Some(render) = render {
            inner.surface.set_visible(render, visible);
        }
        // The extent companion follows its owner.
        if let Some(outline) = inner.companions.get(id).copied() {
            inner.surface.set_visible(outline, visible);
        }
        true
    }

    pub fn set_opacity(&self, id: &LayerId, opacity: f64) -> bool {
        let opacity = opacity.clamp(0.0, 1.0);
        let inner = &mut *self.inner.borrow_mut();
        let Some(handle) = inner.registry.get_mut(id) else {
            return false;
        };
        handle.opacity = opacity;
        let render = handle.render;
        if let Some(render) = render {
            inner.surface.set_opacity(render, opacity);
        }
        true
    }

    /// Toggle the extent companion overlay. Creation is lazy: for a layer
    /// still loading, the overlay appears once the layer reaches `Loaded`
    /// (file-derived layers may not know their extent before then).
    pub fn set_extent_visible(&self, id: &LayerId, visible: bool) -> bool {
        let inner = &mut *self.inner.borrow_mut();
        {
            let Some(handle) = inner.registry.get_mut(id) else {
                return false;
            };
            handle.extent_visible = visible;
        }
        if visible {
            crate::lifecycle::ensure_companion(inner, id);
        } else {
            remove_companion(inner, id);
        }
        true
    }

    /// Swap a layer with its neighbor within its own category. Cross-
    /// category moves are rejected; the category ordering is fixed.
    pub fn move_layer(&self, id: &LayerId, direction: StackDirection) -> bool {
        let inner = &mut *self.inner.borrow_mut();
        let Some(pos) = inner.stack.position_of_layer(id) else {
            return false;
        };
        let neighbor = match direction {
            StackDirection::Up => pos + 1,
            StackDirection::Down => match pos.checked_sub(1) {
                Some(p) => p,
                None => return false,
            },
        };
        if neighbor >= inner.stack.len() {
            return false;
        }

        let (category, counted, render) = match inner.registry.get(id) {
            Some(h) => (h.category, h.counted, h.render),
            None => return false,
        };
        let neighbor_counted = {
            let Some(StackEntry::Layer(other)) = inner.stack.entry(neighbor) else {
                return false;
            };
            match inner.registry.get(other) {
                Some(h) if h.category == category => h.counted,
                _ => return false,
            }
        };

        inner.stack.swap(pos, neighbor);
        if counted && neighbor_counted && let Some(render) = render {
            let physical = {
                let registry = &inner.registry;
                let companions = &inner.companions;
                inner
                    .stack
                    .counted_before(neighbor, |e| entry_is_counted(e, registry, companions))
            };
            inner.surface.reorder(render, physical);
        }
        true
    }

    /// Record a highlight request against a layer. Replayed when the layer
    /// reaches `Loaded`; requests whose feature can no longer be located
    /// are silently dropped.
    pub fn queue_highlight(&self, id: &LayerId, feature: impl Into<String>) -> bool {
        let inner = &mut *self.inner.borrow_mut();
        if !inner.registry.contains(id) {
            return false;
        }
        inner
            .highlights
            .entry(id.clone())
            .or_default()
            .push(feature.into());
        if inner
            .registry
            .get(id)
            .is_some_and(|h| h.state == LoadState::Loaded)
        {
            replay_highlights(inner, id);
        }
        true
    }

    pub fn state_of(&self, id: &LayerId) -> Option<LoadState> {
        self.inner.borrow().registry.get(id).map(|h| h.state)
    }

    pub fn handle_of(&self, id: &LayerId) -> Option<LayerHandle> {
        self.inner.borrow().registry.get(id).cloned()
    }

    pub fn legend_state(&self, id: &LayerId) -> Option<LegendState> {
        self.inner.borrow().legend.get_state(id)
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.inner.borrow().counters.snapshot()
    }

    /// Registry layers in draw order, bottom first. Errored layers keep
    /// their slot here even though the surface no longer draws them.
    pub fn draw_order(&self) -> Vec<LayerId> {
        self.inner.borrow().stack.layer_ids()
    }

    pub fn has_companion(&self, id: &LayerId) -> bool {
        self.inner.borrow().companions.contains_key(id)
    }

    /// Whether every layer inside its visible scale range has finished
    /// loading. Errored and still-updating layers count against this;
    /// off-scale layers are excluded.
    pub fn all_loaded(&self) -> bool {
        self.inner
            .borrow()
            .registry
            .iter()
            .filter(|h| !h.off_scale)
            .all(|h| h.state == LoadState::Loaded)
    }

    pub fn layer_count(&self) -> usize {
        self.inner.borrow().registry.len()
    }

    pub fn scale(&self) -> f64 {
        self.inner.borrow().scale
    }

    pub fn metrics(&self) -> Vec<(String, u64)> {
        self.inner.borrow().metrics.snapshot()
    }
}

pub(crate) fn info_of(handle: &LayerHandle) -> LayerInfo {
    LayerInfo {
        id: handle.id.clone(),
        category: handle.category,
        title: handle.config.title.clone(),
    }
}

pub(crate) fn entry_is_counted(
    entry: &StackEntry,
    registry: &Registry,
    companions: &BTreeMap<LayerId, RenderableId>,
) -> bool {
    match entry {
        StackEntry::Layer(id) => registry.get(id).is_some_and(|h| h.counted),
        StackEntry::Extent(owner) => companions.contains_key(owner),
    }
}

pub(crate) fn entry_rank(entry: &StackEntry, registry: &Registry) -> Option<usize> {
    match entry {
        StackEntry::Layer(id) => registry.get(id).map(|h| h.category.stack_rank()),
        StackEntry::Extent(_) => Some(LayerCategory::BoundingBox.stack_rank()),
    }
}

/// Translate an operational index into the surface's child list, which has
/// the basemap plane at its bottom.
pub(crate) fn physical_index(
    counters: &CategoryCounters,
    category: LayerCategory,
    operational: usize,
) -> usize {
    if category == LayerCategory::Basemap {
        operational
    } else {
        operational + counters.count(LayerCategory::Basemap)
    }
}

/// Operational index that puts a layer back at `rank` within its category.
pub(crate) fn operational_for_rank(
    counters: &CategoryCounters,
    category: LayerCategory,
    rank: usize,
) -> usize {
    if category == LayerCategory::Basemap {
        return rank;
    }
    LayerCategory::STACKING
        .iter()
        .filter(|c| **c != LayerCategory::Basemap && c.stack_rank() < category.stack_rank())
        .map(|c| counters.count(*c))
        .sum::<usize>()
        + rank
}
