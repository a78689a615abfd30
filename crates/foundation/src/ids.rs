use std::fmt;

/// Layer identity as used by the registry and the event channels.
///
/// Ids are either supplied by the embedding application or allocated by
/// [`IdAllocator`]; allocated ids carry a reserved prefix so the two spaces
/// cannot collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        LayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        LayerId::new(id)
    }
}

/// Opaque handle into the render surface's child list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderableId(pub u64);

/// Prefix reserved for allocator-generated layer ids.
pub const GENERATED_ID_PREFIX: &str = "layer:";

/// Monotonic id allocation for layers constructed without an external id.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> LayerId {
        let id = LayerId(format!("{GENERATED_ID_PREFIX}{}", self.next));
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::{GENERATED_ID_PREFIX, IdAllocator};

    #[test]
    fn allocated_ids_are_unique_and_prefixed() {
        let mut alloc = IdAllocator::new();
        let a = alloc.next_id();
        let b = alloc.next_id();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(GENERATED_ID_PREFIX));
        assert_eq!(a.as_str(), "layer:0");
        assert_eq!(b.as_str(), "layer:1");
    }
}
