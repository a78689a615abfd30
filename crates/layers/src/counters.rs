use serde::Serialize;

use crate::category::LayerCategory;

/// Per-category occupancy of the draw stack.
///
/// Counts cover handles that currently contribute a renderable to the
/// surface (`counted` handles); errored layers are evicted and drop out.
/// Insertion indices are derived from the counts alone so the stack never
/// has to be scanned.
///
/// Index convention: the basemap plane sits beneath the operational stack
/// and does not shift operational indices. `index_for(Basemap)` addresses
/// the basemap plane; for any other category it addresses the operational
/// stack (Wms < Feature < BoundingBox < Static).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CategoryCounters {
    counts: [usize; LayerCategory::STACKING.len()],
}

/// Point-in-time copy of the counters, carried on add/remove events.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub basemap: usize,
    pub wms: usize,
    pub feature: usize,
    pub bounding_box: usize,
    #[serde(rename = "static")]
    pub statics: usize,
}

impl CategoryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, category: LayerCategory) {
        self.counts[category.stack_rank()] += 1;
    }

    /// Clamped at zero: decrementing an empty category is a no-op, so
    /// double-removal on error paths cannot drive a count negative.
    pub fn decrement(&mut self, category: LayerCategory) {
        let count = &mut self.counts[category.stack_rank()];
        *count = count.saturating_sub(1);
    }

    pub fn count(&self, category: LayerCategory) -> usize {
        self.counts[category.stack_rank()]
    }

    /// Draw-stack index for the next member of `category`: the sum of counts
    /// for the operational categories stacked below it, plus its own count
    /// (new members go on top of their category block).
    pub fn index_for(&self, category: LayerCategory) -> usize {
        if category == LayerCategory::Basemap {
            return self.count(LayerCategory::Basemap);
        }
        let rank = category.stack_rank();
        LayerCategory::STACKING
            .iter()
            .filter(|c| **c != LayerCategory::Basemap && c.stack_rank() < rank)
            .map(|c| self.count(*c))
            .sum::<usize>()
            + self.count(category)
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            basemap: self.count(LayerCategory::Basemap),
            wms: self.count(LayerCategory::Wms),
            feature: self.count(LayerCategory::Feature),
            bounding_box: self.count(LayerCategory::BoundingBox),
            statics: self.count(LayerCategory::Static),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CategoryCounters;
    use crate::category::LayerCategory;

    #[test]
    fn indices_follow_category_stacking_and_call_order() {
        let mut c = CategoryCounters::new();

        assert_eq!(c.index_for(LayerCategory::Basemap), 0);
        c.increment(LayerCategory::Basemap);

        // The basemap does not consume an operational slot.
        assert_eq!(c.index_for(LayerCategory::Wms), 0);
        c.increment(LayerCategory::Wms);

        assert_eq!(c.index_for(LayerCategory::Feature), 1);
        c.increment(LayerCategory::Feature);

        assert_eq!(c.index_for(LayerCategory::Feature), 2);
        c.increment(LayerCategory::Feature);

        // Removing the WMS layer leaves the feature count untouched.
        c.decrement(LayerCategory::Wms);
        assert_eq!(c.index_for(LayerCategory::Feature), 2);

        // Bounding boxes go above every feature.
        assert_eq!(c.index_for(LayerCategory::BoundingBox), 2);
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let mut c = CategoryCounters::new();
        c.decrement(LayerCategory::Feature);
        assert_eq!(c.count(LayerCategory::Feature), 0);
        c.increment(LayerCategory::Feature);
        c.decrement(LayerCategory::Feature);
        c.decrement(LayerCategory::Feature);
        assert_eq!(c.count(LayerCategory::Feature), 0);
    }

    #[test]
    fn snapshot_reflects_counts() {
        let mut c = CategoryCounters::new();
        c.increment(LayerCategory::Basemap);
        c.increment(LayerCategory::Feature);
        c.increment(LayerCategory::Feature);
        let snap = c.snapshot();
        assert_eq!(snap.basemap, 1);
        assert_eq!(snap.feature, 2);
        assert_eq!(snap.wms, 0);
    }
}
