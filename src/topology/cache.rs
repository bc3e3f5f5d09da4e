//! Topology-version keyed caching of derived mesh data.
//!
//! Derived structures (cell adjacency, metric geometry, interpolation
//! weights) are recomputed when the owning mesh's topology version moves
//! past the version they were built against. This replaces demand-driven
//! lazy singletons with an explicit recompute-on-stale contract.

/// A cached value tagged with the topology version it was computed at.
#[derive(Clone, Debug, Default)]
pub struct VersionCache<T> {
    version: u64,
    value: Option<T>,
}

impl<T> VersionCache<T> {
    pub fn new() -> Self {
        Self {
            version: 0,
            value: None,
        }
    }

    /// The cached value if it is current at `version`.
    pub fn get(&self, version: u64) -> Option<&T> {
        match &self.value {
            Some(v) if self.version == version => Some(v),
            _ => None,
        }
    }

    /// Return the cached value, rebuilding it with `f` when stale or unset.
    pub fn get_or_rebuild(&mut self, version: u64, f: impl FnOnce() -> T) -> &T {
        if self.version != version {
            self.value = None;
            self.version = version;
        }
        self.value.get_or_insert_with(f)
    }

    /// Drop the cached value so the next query recomputes.
    pub fn invalidate(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuilds_on_version_change() {
        let mut cache = VersionCache::new();
        let mut builds = 0;
        let v = *cache.get_or_rebuild(1, || {
            builds += 1;
            10
        });
        assert_eq!(v, 10);
        let _ = cache.get_or_rebuild(1, || {
            builds += 1;
            11
        });
        assert_eq!(builds, 1, "current version must not rebuild");
        let v = *cache.get_or_rebuild(2, || {
            builds += 1;
            12
        });
        assert_eq!((v, builds), (12, 2));
        assert!(cache.get(1).is_none());
        assert_eq!(cache.get(2), Some(&12));
    }
}
