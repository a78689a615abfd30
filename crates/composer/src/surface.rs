use std::cell::RefCell;
use std::rc::Rc;

use foundation::bounds::Extent;
use foundation::ids::RenderableId;
use layers::config::{FeatureMode, LayerConfig};

use crate::error::ConstructionError;

/// Result of sampling a renderable's current load flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProbe {
    Pending,
    Ready,
    Failed(String),
}

/// Contract with the component that actually draws layers.
///
/// The surface is the only source of truth for whether a layer is drawing.
/// Per inserted renderable it emits raw lifecycle notifications on the
/// `SURFACE_*` event channels, keyed by renderable id so a late event for an
/// evicted renderable cannot be mistaken for its replacement.
pub trait RenderSurface {
    /// Construct a renderable for `config` without starting to draw it.
    /// `mode` overrides the configured feature fetch mode.
    fn create(
        &mut self,
        config: &LayerConfig,
        mode: Option<FeatureMode>,
    ) -> Result<RenderableId, ConstructionError>;

    /// Construct a static outline renderable for an extent rectangle.
    fn create_outline(&mut self, extent: &Extent) -> Result<RenderableId, ConstructionError>;

    fn insert(&mut self, renderable: RenderableId, index: usize) -> Result<(), ConstructionError>;

    /// Tolerates renderables that were already evicted.
    fn remove(&mut self, renderable: RenderableId);

    fn reorder(&mut self, renderable: RenderableId, index: usize);

    /// Sample the renderable's current load flag. Some layer types resolve
    /// synchronously at construction time, so this must be consulted instead
    /// of assuming a fresh renderable is still loading.
    fn probe(&self, renderable: RenderableId) -> LoadProbe;

    /// Extent of the loaded data, when the surface knows it.
    fn data_extent(&self, renderable: RenderableId) -> Option<Extent>;

    fn set_visible(&mut self, renderable: RenderableId, visible: bool);

    fn set_opacity(&mut self, renderable: RenderableId, opacity: f64);

    /// Whether `feature` can still be located in the renderable's data.
    fn locate_feature(&self, renderable: RenderableId, feature: &str) -> bool;

    fn highlight(&mut self, renderable: RenderableId, feature: &str);
}

/// Shared-ownership adapter so a caller can keep inspecting a surface it
/// handed to the composer.
impl<S: RenderSurface> RenderSurface for Rc<RefCell<S>> {
    fn create(
        &mut self,
        config: &LayerConfig,
        mode: Option<FeatureMode>,
    ) -> Result<RenderableId, ConstructionError> {
        self.borrow_mut().create(config, mode)
    }

    fn create_outline(&mut self, extent: &Extent) -> Result<RenderableId, ConstructionError> {
        self.borrow_mut().create_outline(extent)
    }

    fn insert(&mut self, renderable: RenderableId, index: usize) -> Result<(), ConstructionError> {
        self.borrow_mut().insert(renderable, index)
    }

    fn remove(&mut self, renderable: RenderableId) {
        self.borrow_mut().remove(renderable);
    }

    fn reorder(&mut self, renderable: RenderableId, index: usize) {
        self.borrow_mut().reorder(renderable, index);
    }

    fn probe(&self, renderable: RenderableId) -> LoadProbe {
        self.borrow().probe(renderable)
    }

    fn data_extent(&self, renderable: RenderableId) -> Option<Extent> {
        self.borrow().data_extent(renderable)
    }

    fn set_visible(&mut self, renderable: RenderableId, visible: bool) {
        self.borrow_mut().set_visible(renderable, visible);
    }

    fn set_opacity(&mut self, renderable: RenderableId, opacity: f64) {
        self.borrow_mut().set_opacity(renderable, opacity);
    }

    fn locate_feature(&self, renderable: RenderableId, feature: &str) -> bool {
        self.borrow().locate_feature(renderable, feature)
    }

    fn highlight(&mut self, renderable: RenderableId, feature: &str) {
        self.borrow_mut().highlight(renderable, feature);
    }
}
