use foundation::bounds::{Extent, SpatialRef};
use foundation::scale::ScaleRange;
use serde::{Deserialize, Serialize};

use crate::category::LayerCategory;

/// Fetch mode for feature layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureMode {
    /// Features are fetched per view extent as the map moves.
    OnDemand,
    /// The full feature set is fetched once up front.
    Snapshot,
}

/// Extent as it appears in configuration documents.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtentConfig {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub srid: u32,
}

impl ExtentConfig {
    pub fn to_extent(&self) -> Extent {
        Extent::new(
            [self.xmin, self.ymin],
            [self.xmax, self.ymax],
            SpatialRef(self.srid),
        )
    }
}

/// Immutable per-layer configuration supplied by the embedding application.
///
/// A reload constructs a fresh renderable from the same configuration; the
/// orchestrator never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// External id; allocated by the orchestrator when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub category: LayerCategory,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Map-scale denominator bounds; zero means unbounded.
    #[serde(default)]
    pub min_scale: f64,
    #[serde(default)]
    pub max_scale: f64,
    #[serde(default)]
    pub extent: Option<ExtentConfig>,
    /// Show the extent rectangle as a companion overlay.
    #[serde(default)]
    pub show_extent: bool,
    #[serde(default)]
    pub mode: Option<FeatureMode>,
}

fn default_opacity() -> f64 {
    1.0
}

fn default_visible() -> bool {
    true
}

impl LayerConfig {
    pub fn new(title: impl Into<String>, category: LayerCategory) -> Self {
        Self {
            id: None,
            title: title.into(),
            category,
            url: None,
            opacity: 1.0,
            visible: true,
            min_scale: 0.0,
            max_scale: 0.0,
            extent: None,
            show_extent: false,
            mode: None,
        }
    }

    pub fn scale_range(&self) -> ScaleRange {
        ScaleRange::new(self.min_scale, self.max_scale)
    }
}
