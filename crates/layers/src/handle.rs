use foundation::ids::{LayerId, RenderableId};

use crate::category::LayerCategory;
use crate::config::LayerConfig;
use crate::state::LoadState;

/// A registered layer: identity, immutable configuration, and mutable
/// lifecycle bookkeeping.
///
/// Identity and `config` never change for the lifetime of a handle; a reload
/// replaces the whole handle because most renderable types cannot be rebuilt
/// in place. `counted` records whether this handle currently contributes to
/// the category counters, which keeps increment/decrement idempotent across
/// repeated error cycles.
#[derive(Debug, Clone)]
pub struct LayerHandle {
    pub id: LayerId,
    pub category: LayerCategory,
    /// Present while the layer has a footprint on the render surface;
    /// cleared on eviction.
    pub render: Option<RenderableId>,
    pub config: LayerConfig,
    pub state: LoadState,
    pub counted: bool,
    pub off_scale: bool,
    pub visible: bool,
    pub opacity: f64,
    /// Whether the extent companion overlay is requested for this layer.
    pub extent_visible: bool,
    /// Retained displayable message once the handle enters `Error`.
    pub error: Option<String>,
}

impl LayerHandle {
    pub fn new(id: LayerId, render: RenderableId, config: LayerConfig) -> Self {
        Self {
            id,
            category: config.category,
            render: Some(render),
            visible: config.visible,
            opacity: config.opacity,
            extent_visible: config.show_extent,
            config,
            state: LoadState::Loading,
            counted: false,
            off_scale: false,
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.state == LoadState::Error
    }
}

#[cfg(test)]
mod tests {
    use super::LayerHandle;
    use crate::category::LayerCategory;
    use crate::config::LayerConfig;
    use crate::state::LoadState;
    use foundation::ids::{LayerId, RenderableId};

    #[test]
    fn new_handles_start_loading_and_uncounted() {
        let mut config = LayerConfig::new("Roads", LayerCategory::Feature);
        config.opacity = 0.5;
        let h = LayerHandle::new(LayerId::new("roads"), RenderableId(1), config);
        assert_eq!(h.state, LoadState::Loading);
        assert!(!h.counted);
        assert!(!h.off_scale);
        assert_eq!(h.opacity, 0.5);
        assert_eq!(h.render, Some(RenderableId(1)));
    }
}
