use serde::{Deserialize, Serialize};

/// Coarse layer class controlling the fixed stacking order.
///
/// The basemap plane sits beneath everything; operational layers stack above
/// it as Wms < Feature < BoundingBox < Static, bottom to top. User actions
/// may reorder layers within a category but never across categories.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerCategory {
    Basemap,
    Wms,
    Feature,
    BoundingBox,
    Static,
}

impl LayerCategory {
    /// All categories, bottom of the draw stack first.
    pub const STACKING: [LayerCategory; 5] = [
        LayerCategory::Basemap,
        LayerCategory::Wms,
        LayerCategory::Feature,
        LayerCategory::BoundingBox,
        LayerCategory::Static,
    ];

    /// Position in [`Self::STACKING`], 0 = bottom.
    pub fn stack_rank(self) -> usize {
        match self {
            LayerCategory::Basemap => 0,
            LayerCategory::Wms => 1,
            LayerCategory::Feature => 2,
            LayerCategory::BoundingBox => 3,
            LayerCategory::Static => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LayerCategory;

    #[test]
    fn stacking_and_ranks_agree() {
        for (i, cat) in LayerCategory::STACKING.iter().enumerate() {
            assert_eq!(cat.stack_rank(), i);
        }
    }

    #[test]
    fn serde_names_are_kebab_case() {
        let json = serde_json::to_string(&LayerCategory::BoundingBox).expect("serialize");
        assert_eq!(json, "\"bounding-box\"");
    }
}
