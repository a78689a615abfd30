use std::collections::BTreeMap;

use foundation::ids::{LayerId, RenderableId};
use layers::handle::LayerHandle;

/// Single authority mapping layer id to its handle.
///
/// No other component may hold a second source of truth for a handle's
/// existence; state is projected outward through events and the legend.
/// Only the composer writes here — lifecycle handlers validate membership
/// before acting so late notifications for removed layers fall out as
/// no-ops.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<LayerId, LayerHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: LayerHandle) {
        self.entries.insert(handle.id.clone(), handle);
    }

    pub fn remove(&mut self, id: &LayerId) -> Option<LayerHandle> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &LayerId) -> Option<&LayerHandle> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &LayerId) -> Option<&mut LayerHandle> {
        self.entries.get_mut(id)
    }

    /// Resolve a live renderable back to its layer. Evicted renderables
    /// resolve to nothing, which is how stale surface notifications are
    /// told apart from current ones.
    pub fn id_for_render(&self, render: RenderableId) -> Option<LayerId> {
        self.entries
            .values()
            .find(|h| h.render == Some(render))
            .map(|h| h.id.clone())
    }

    pub fn get_mut_by_render(&mut self, render: RenderableId) -> Option<&mut LayerHandle> {
        self.entries.values_mut().find(|h| h.render == Some(render))
    }

    pub fn ids(&self) -> Vec<LayerId> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerHandle> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use foundation::ids::{LayerId, RenderableId};
    use layers::category::LayerCategory;
    use layers::config::LayerConfig;
    use layers::handle::LayerHandle;

    fn handle(id: &str, render: u64) -> LayerHandle {
        LayerHandle::new(
            LayerId::new(id),
            RenderableId(render),
            LayerConfig::new(id, LayerCategory::Feature),
        )
    }

    #[test]
    fn render_resolution_ignores_evicted_handles() {
        let mut reg = Registry::new();
        reg.insert(handle("a", 1));
        assert_eq!(reg.id_for_render(RenderableId(1)), Some(LayerId::new("a")));

        reg.get_mut(&LayerId::new("a")).expect("entry").render = None;
        assert_eq!(reg.id_for_render(RenderableId(1)), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut reg = Registry::new();
        reg.insert(handle("a", 1));
        assert!(reg.remove(&LayerId::new("a")).is_some());
        assert!(reg.remove(&LayerId::new("a")).is_none());
        assert!(reg.is_empty());
    }
}
