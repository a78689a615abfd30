use foundation::ids::LayerId;

/// Direction for user-initiated reordering within a category.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StackDirection {
    /// Toward the top of the draw stack (drawn later).
    Up,
    /// Toward the bottom.
    Down,
}

/// One slot in the authoritative draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StackEntry {
    Layer(LayerId),
    /// Extent companion overlay, keyed by its owning layer.
    Extent(LayerId),
}

/// The authoritative ordered collection behind the render surface's child
/// list.
///
/// Unlike the surface, this retains entries for errored layers (which have
/// been evicted from the surface) so their logical slot survives until a
/// retry. The mapping to physical surface indices is therefore: a counted
/// entry's physical index equals the number of counted entries before it.
///
/// The stack stores order only; counted-ness and category live on the
/// registry and are supplied per query, which keeps this collection free of
/// a second copy of layer state.
#[derive(Debug, Default)]
pub(crate) struct DrawStack {
    entries: Vec<StackEntry>,
}

impl DrawStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &StackEntry> {
        self.entries.iter()
    }

    pub(crate) fn insert(&mut self, slot: usize, entry: StackEntry) {
        self.entries.insert(slot.min(self.entries.len()), entry);
    }

    pub(crate) fn remove_layer(&mut self, id: &LayerId) -> bool {
        self.remove_entry(&StackEntry::Layer(id.clone()))
    }

    pub(crate) fn remove_extent(&mut self, owner: &LayerId) -> bool {
        self.remove_entry(&StackEntry::Extent(owner.clone()))
    }

    fn remove_entry(&mut self, entry: &StackEntry) -> bool {
        match self.entries.iter().position(|e| e == entry) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn position_of_layer(&self, id: &LayerId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(e, StackEntry::Layer(other) if other == id))
    }

    pub(crate) fn entry(&self, pos: usize) -> Option<&StackEntry> {
        self.entries.get(pos)
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
    }

    /// Physical surface index of the entry at `pos`: the number of counted
    /// entries strictly before it.
    pub(crate) fn counted_before(&self, pos: usize, is_counted: impl Fn(&StackEntry) -> bool) -> usize {
        self.entries[..pos.min(self.entries.len())]
            .iter()
            .filter(|e| is_counted(e))
            .count()
    }

    /// Slot for a new entry that must land at physical index `physical`.
    ///
    /// The slot is placed after `physical` counted entries, then past any
    /// uncounted entries of the same or a lower category rank so a retained
    /// errored sibling keeps its earlier position.
    pub(crate) fn slot_for_physical(
        &self,
        physical: usize,
        cat_rank: usize,
        is_counted: impl Fn(&StackEntry) -> bool,
        rank_of: impl Fn(&StackEntry) -> Option<usize>,
    ) -> usize {
        let mut counted = 0;
        let mut i = 0;
        while i < self.entries.len() && counted < physical {
            if is_counted(&self.entries[i]) {
                counted += 1;
            }
            i += 1;
        }
        while i < self.entries.len()
            && !is_counted(&self.entries[i])
            && rank_of(&self.entries[i]).is_some_and(|r| r <= cat_rank)
        {
            i += 1;
        }
        i
    }

    /// Slot for an entry that must sit before the live sibling currently at
    /// `rank_in_category`, or at the end of its category block.
    pub(crate) fn slot_for_category_rank(
        &self,
        rank_in_category: usize,
        cat_rank: usize,
        is_live_sibling: impl Fn(&StackEntry) -> bool,
        rank_of: impl Fn(&StackEntry) -> Option<usize>,
    ) -> usize {
        let mut live = 0;
        for (i, e) in self.entries.iter().enumerate() {
            let Some(r) = rank_of(e) else { continue };
            if r > cat_rank {
                return i;
            }
            if r == cat_rank && is_live_sibling(e) {
                if live == rank_in_category {
                    return i;
                }
                live += 1;
            }
        }
        self.entries.len()
    }

    /// Rank of `id` among the entries `is_live_sibling` accepts, counting
    /// from the bottom of the stack. The target itself does not have to be
    /// accepted (an errored layer mid-reload keeps its slot in the
    /// comparison).
    pub(crate) fn rank_of_layer(
        &self,
        id: &LayerId,
        is_live_sibling: impl Fn(&StackEntry) -> bool,
    ) -> Option<usize> {
        let mut rank = 0;
        for e in &self.entries {
            if matches!(e, StackEntry::Layer(other) if other == id) {
                return Some(rank);
            }
            if is_live_sibling(e) {
                rank += 1;
            }
        }
        None
    }

    pub(crate) fn layer_ids(&self) -> Vec<LayerId> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                StackEntry::Layer(id) => Some(id.clone()),
                StackEntry::Extent(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DrawStack, StackEntry};
    use foundation::ids::LayerId;
    use std::collections::BTreeSet;

    fn layer(id: &str) -> StackEntry {
        StackEntry::Layer(LayerId::new(id))
    }

    fn counted_set(ids: &[&str]) -> BTreeSet<LayerId> {
        ids.iter().map(|id| LayerId::new(*id)).collect()
    }

    fn is_in(set: &BTreeSet<LayerId>) -> impl Fn(&StackEntry) -> bool + '_ {
        |e| match e {
            StackEntry::Layer(id) | StackEntry::Extent(id) => set.contains(id),
        }
    }

    #[test]
    fn physical_index_skips_uncounted_entries() {
        let mut stack = DrawStack::new();
        stack.insert(0, layer("a"));
        stack.insert(1, layer("errored"));
        stack.insert(2, layer("b"));

        let counted = counted_set(&["a", "b"]);
        assert_eq!(stack.counted_before(2, is_in(&counted)), 1);
        assert_eq!(stack.counted_before(3, is_in(&counted)), 2);
    }

    #[test]
    fn slot_for_physical_lands_after_retained_errored_siblings() {
        let mut stack = DrawStack::new();
        stack.insert(0, layer("a"));
        stack.insert(1, layer("errored"));

        let counted = counted_set(&["a"]);
        // Same-rank insert at physical index 1 goes after the errored
        // sibling, preserving its earlier slot.
        let slot = stack.slot_for_physical(1, 2, is_in(&counted), |_| Some(2));
        assert_eq!(slot, 2);
    }

    #[test]
    fn rank_counts_only_live_siblings() {
        let mut stack = DrawStack::new();
        stack.insert(0, layer("a"));
        stack.insert(1, layer("errored"));
        stack.insert(2, layer("b"));

        let live = counted_set(&["a", "b"]);
        let rank_of = |id: &str| {
            stack.rank_of_layer(&LayerId::new(id), |e| {
                matches!(e, StackEntry::Layer(other) if live.contains(other))
            })
        };
        assert_eq!(rank_of("a"), Some(0));
        assert_eq!(rank_of("errored"), Some(1));
        assert_eq!(rank_of("b"), Some(1));
        assert_eq!(rank_of("missing"), None);
    }

    #[test]
    fn slot_for_category_rank_stops_at_higher_categories() {
        let mut stack = DrawStack::new();
        stack.insert(0, layer("wms"));
        stack.insert(1, layer("feature"));
        stack.insert(2, layer("box"));

        let rank_of = |e: &StackEntry| {
            Some(match e {
                StackEntry::Layer(id) if id.as_str() == "wms" => 1,
                StackEntry::Layer(id) if id.as_str() == "feature" => 2,
                _ => 3,
            })
        };
        // A feature re-entering at rank 0 goes before the live feature.
        let slot = stack.slot_for_category_rank(0, 2, |e| rank_of(e) == Some(2), rank_of);
        assert_eq!(slot, 1);
        // Rank past the block's end lands before the next category.
        let slot = stack.slot_for_category_rank(5, 2, |e| rank_of(e) == Some(2), rank_of);
        assert_eq!(slot, 2);
    }
}
