use foundation::bounds::{Extent, SpatialRef};

/// External coordinate transformation service for extents whose spatial
/// reference differs from the map's.
pub trait Reprojector {
    /// `None` when the transformation is unavailable for this pair of
    /// references; the caller skips the derived artifact in that case.
    fn transform(&self, extent: &Extent, to: SpatialRef) -> Option<Extent>;
}

/// Passes matching-reference extents through and refuses everything else.
#[derive(Debug, Default)]
pub struct NullReprojector;

impl Reprojector for NullReprojector {
    fn transform(&self, extent: &Extent, to: SpatialRef) -> Option<Extent> {
        (extent.srid == to).then_some(*extent)
    }
}
