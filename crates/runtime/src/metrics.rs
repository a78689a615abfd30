use std::collections::BTreeMap;

/// Deterministic counter aggregation.
///
/// Counters must not depend on wall-clock time or unordered iteration; a
/// sorted map keeps snapshots stable across runs. Used to account for
/// internally-swallowed conditions (stale notifications, clamped decrements)
/// that are deliberately not surfaced to the user.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<String, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&mut self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&mut self, name: &str, n: u64) {
        *self.counters.entry(name.to_string()).or_insert(0) += n;
    }

    pub fn value(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.counters
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub fn clear(&mut self) {
        self.counters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::Metrics;

    #[test]
    fn absent_counters_read_zero() {
        let m = Metrics::new();
        assert_eq!(m.value("nope"), 0);
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let mut m = Metrics::new();
        m.incr("b");
        m.incr("a");
        m.add("a", 2);
        let snap = m.snapshot();
        assert_eq!(snap, vec![("a".to_string(), 3), ("b".to_string(), 1)]);
    }
}
