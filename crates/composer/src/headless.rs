use std::collections::BTreeMap;

use foundation::bounds::Extent;
use foundation::ids::RenderableId;
use layers::config::{FeatureMode, LayerConfig};

use crate::error::ConstructionError;
use crate::surface::{LoadProbe, RenderSurface};

/// What the headless surface remembers about one renderable.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub title: String,
    pub url: Option<String>,
    pub mode: Option<FeatureMode>,
    pub probe: LoadProbe,
    pub visible: bool,
    pub opacity: f64,
    pub features: Vec<String>,
    pub highlighted: Vec<String>,
    pub extent: Option<Extent>,
    pub outline: bool,
}

/// Deterministic in-memory render surface for tests and scenario replay.
///
/// It performs no drawing and never emits notifications on its own; the
/// driver publishes `SURFACE_*` events for whichever renderable it wants to
/// advance. Scripting knobs (`fail_next_create`, `ready_on_create`) stand
/// in for layer types that fail or resolve synchronously at construction.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    next: u64,
    children: Vec<RenderableId>,
    records: BTreeMap<RenderableId, Renderable>,
    fail_next_create: Option<String>,
    ready_on_create: bool,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `create` call fails with `message`.
    pub fn fail_next_create(&mut self, message: impl Into<String>) {
        self.fail_next_create = Some(message.into());
    }

    /// Newly created renderables probe as `Ready` immediately, like layer
    /// types that resolve synchronously.
    pub fn ready_on_create(&mut self, ready: bool) {
        self.ready_on_create = ready;
    }

    pub fn set_probe(&mut self, renderable: RenderableId, probe: LoadProbe) {
        if let Some(r) = self.records.get_mut(&renderable) {
            r.probe = probe;
        }
    }

    pub fn set_features(&mut self, renderable: RenderableId, features: Vec<String>) {
        if let Some(r) = self.records.get_mut(&renderable) {
            r.features = features;
        }
    }

    pub fn set_data_extent(&mut self, renderable: RenderableId, extent: Extent) {
        if let Some(r) = self.records.get_mut(&renderable) {
            r.extent = Some(extent);
        }
    }

    /// The live child list, bottom first.
    pub fn children(&self) -> &[RenderableId] {
        &self.children
    }

    pub fn contains(&self, renderable: RenderableId) -> bool {
        self.children.contains(&renderable)
    }

    pub fn record(&self, renderable: RenderableId) -> Option<&Renderable> {
        self.records.get(&renderable)
    }

    fn allocate(&mut self, renderable: Renderable) -> RenderableId {
        let id = RenderableId(self.next);
        self.next += 1;
        self.records.insert(id, renderable);
        id
    }
}

impl RenderSurface for HeadlessSurface {
    fn create(
        &mut self,
        config: &LayerConfig,
        mode: Option<FeatureMode>,
    ) -> Result<RenderableId, ConstructionError> {
        if let Some(message) = self.fail_next_create.take() {
            return Err(ConstructionError::new(message));
        }
        let probe = if self.ready_on_create {
            LoadProbe::Ready
        } else {
            LoadProbe::Pending
        };
        Ok(self.allocate(Renderable {
            title: config.title.clone(),
            url: config.url.clone(),
            mode: mode.or(config.mode),
            probe,
            visible: true,
            opacity: 1.0,
            features: Vec::new(),
            highlighted: Vec::new(),
            extent: config.extent.map(|e| e.to_extent()),
            outline: false,
        }))
    }

    fn create_outline(&mut self, extent: &Extent) -> Result<RenderableId, ConstructionError> {
        Ok(self.allocate(Renderable {
            title: String::new(),
            url: None,
            mode: None,
            probe: LoadProbe::Ready,
            visible: true,
            opacity: 1.0,
            features: Vec::new(),
            highlighted: Vec::new(),
            extent: Some(*extent),
            outline: true,
        }))
    }

    fn insert(&mut self, renderable: RenderableId, index: usize) -> Result<(), ConstructionError> {
        if !self.records.contains_key(&renderable) {
            return Err(ConstructionError::new(format!(
                "unknown renderable: {renderable:?}"
            )));
        }
        if index > self.children.len() {
            return Err(ConstructionError::new(format!(
                "insertion index {index} out of range ({} children)",
                self.children.len()
            )));
        }
        self.children.insert(index, renderable);
        Ok(())
    }

    fn remove(&mut self, renderable: RenderableId) {
        self.children.retain(|c| *c != renderable);
    }

    fn reorder(&mut self, renderable: RenderableId, index: usize) {
        if let Some(pos) = self.children.iter().position(|c| *c == renderable) {
            self.children.remove(pos);
            self.children.insert(index.min(self.children.len()), renderable);
        }
    }

    fn probe(&self, renderable: RenderableId) -> LoadProbe {
        self.records
            .get(&renderable)
            .map(|r| r.probe.clone())
            .unwrap_or(LoadProbe::Pending)
    }

    fn data_extent(&self, renderable: RenderableId) -> Option<Extent> {
        self.records.get(&renderable).and_then(|r| r.extent)
    }

    fn set_visible(&mut self, renderable: RenderableId, visible: bool) {
        if let Some(r) = self.records.get_mut(&renderable) {
            r.visible = visible;
        }
    }

    fn set_opacity(&mut self, renderable: RenderableId, opacity: f64) {
        if let Some(r) = self.records.get_mut(&renderable) {
            r.opacity = opacity;
        }
    }

    fn locate_feature(&self, renderable: RenderableId, feature: &str) -> bool {
        self.records
            .get(&renderable)
            .is_some_and(|r| r.features.iter().any(|f| f == feature))
    }

    fn highlight(&mut self, renderable: RenderableId, feature: &str) {
        if let Some(r) = self.records.get_mut(&renderable) {
            r.highlighted.push(feature.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HeadlessSurface;
    use crate::surface::{LoadProbe, RenderSurface};
    use layers::category::LayerCategory;
    use layers::config::LayerConfig;

    #[test]
    fn insert_rejects_out_of_range_indices() {
        let mut s = HeadlessSurface::new();
        let r = s
            .create(&LayerConfig::new("a", LayerCategory::Feature), None)
            .expect("create");
        assert!(s.insert(r, 1).is_err());
        assert!(s.insert(r, 0).is_ok());
        assert_eq!(s.children(), [r]);
    }

    #[test]
    fn remove_tolerates_already_evicted() {
        let mut s = HeadlessSurface::new();
        let r = s
            .create(&LayerConfig::new("a", LayerCategory::Feature), None)
            .expect("create");
        s.insert(r, 0).expect("insert");
        s.remove(r);
        s.remove(r);
        assert!(s.children().is_empty());
    }

    #[test]
    fn ready_on_create_changes_the_probe() {
        let mut s = HeadlessSurface::new();
        s.ready_on_create(true);
        let r = s
            .create(&LayerConfig::new("a", LayerCategory::Basemap), None)
            .expect("create");
        assert_eq!(s.probe(r), LoadProbe::Ready);
    }
}
