// ── Ordered wrapper cache ──
//
// Insertion-ordered storage keyed by unique id, with a handle secondary
// index and push-based change notification via `watch` channels.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::model::{Handle, UniqueId};
use crate::wrapper::Wrapper;

/// Ordered collection of wrappers for a single category.
///
/// Uses `IndexMap` for O(1) unique-id lookups with stable positional
/// order, plus a handle index. Every mutation bumps a version counter
/// and rebuilds the snapshot that subscribers receive.
pub struct ObjectCache<W: Wrapper> {
    /// Primary storage: unique id -> wrapper, in enumeration order.
    entries: IndexMap<UniqueId, Arc<W>>,

    /// Secondary index: handle -> unique id.
    by_handle: HashMap<Handle, UniqueId>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Arc<Vec<Arc<W>>>>,
}

impl<W: Wrapper> ObjectCache<W> {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            entries: IndexMap::new(),
            by_handle: HashMap::new(),
            version,
            snapshot,
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn get_by_unique_id(&self, unique_id: UniqueId) -> Option<&Arc<W>> {
        self.entries.get(&unique_id)
    }

    pub fn get_by_handle(&self, handle: Handle) -> Option<&Arc<W>> {
        let unique_id = self.by_handle.get(&handle)?;
        self.entries.get(unique_id)
    }

    pub fn get_index(&self, position: usize) -> Option<&Arc<W>> {
        self.entries.get_index(position).map(|(_, w)| w)
    }

    pub fn position_of(&self, unique_id: UniqueId) -> Option<usize> {
        self.entries.get_index_of(&unique_id)
    }

    pub fn contains_handle(&self, handle: Handle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<W>> {
        self.entries.values()
    }

    /// Cached handles in cache order.
    pub fn handles(&self) -> Vec<Handle> {
        self.entries.values().map(|w| w.handle()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Insert a wrapper at `position` (clamped to the end).
    ///
    /// Both its unique id and its handle must be absent. A violation means
    /// the caller's bookkeeping is broken: it panics in debug builds and is
    /// rejected in release builds.
    pub fn insert_at(&mut self, position: usize, wrapper: Arc<W>) -> Result<(), CoreError> {
        let unique_id = wrapper.unique_id();
        let handle = wrapper.handle();

        debug_assert!(
            !self.entries.contains_key(&unique_id),
            "unique id {unique_id} inserted twice"
        );
        if self.entries.contains_key(&unique_id) {
            return Err(CoreError::DuplicateUniqueId { unique_id });
        }
        debug_assert!(
            !self.by_handle.contains_key(&handle),
            "handle {handle} inserted twice"
        );
        if self.by_handle.contains_key(&handle) {
            return Err(CoreError::HandleInUse { handle });
        }

        let position = position.min(self.entries.len());
        self.entries.shift_insert(position, unique_id, wrapper);
        self.by_handle.insert(handle, unique_id);

        self.publish();
        Ok(())
    }

    /// Append a wrapper. Same preconditions as [`insert_at`](Self::insert_at).
    pub fn push(&mut self, wrapper: Arc<W>) -> Result<(), CoreError> {
        self.insert_at(self.entries.len(), wrapper)
    }

    /// Remove by unique id. `None` means it was not cached, which is not
    /// an error: removals can race with an earlier full pass.
    pub fn remove(&mut self, unique_id: UniqueId) -> Option<Arc<W>> {
        let removed = self.entries.shift_remove(&unique_id)?;
        if self.by_handle.get(&removed.handle()) == Some(&unique_id) {
            self.by_handle.remove(&removed.handle());
        }
        self.publish();
        Some(removed)
    }

    /// Replace the whole contents, in the given order.
    ///
    /// Rejects (leaving the cache untouched) a list that repeats a unique
    /// id or a handle.
    pub fn replace_all(&mut self, wrappers: Vec<Arc<W>>) -> Result<(), CoreError> {
        let mut entries = IndexMap::with_capacity(wrappers.len());
        let mut by_handle = HashMap::with_capacity(wrappers.len());

        for wrapper in wrappers {
            let unique_id = wrapper.unique_id();
            let handle = wrapper.handle();
            let repeated_handle = by_handle.insert(handle, unique_id).is_some();
            debug_assert!(!repeated_handle, "handle {handle} repeated in replacement list");
            if repeated_handle {
                return Err(CoreError::HandleInUse { handle });
            }
            let repeated_id = entries.insert(unique_id, wrapper).is_some();
            debug_assert!(!repeated_id, "unique id {unique_id} repeated in replacement list");
            if repeated_id {
                return Err(CoreError::DuplicateUniqueId { unique_id });
            }
        }

        self.entries = entries;
        self.by_handle = by_handle;
        self.publish();
        Ok(())
    }

    /// Remove all wrappers, returning them in cache order.
    pub fn clear(&mut self) -> Vec<Arc<W>> {
        self.by_handle.clear();
        let drained = self.entries.drain(..).map(|(_, w)| w).collect();
        self.publish();
        drained
    }

    // ── Subscription ─────────────────────────────────────────────────

    /// Get the current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<W>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<W>>>> {
        self.snapshot.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Rebuild the snapshot, broadcast it, and bump the version.
    fn publish(&self) {
        let values: Vec<Arc<W>> = self.entries.values().map(Arc::clone).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}

impl<W: Wrapper> Default for ObjectCache<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::context::MidiContext;
    use crate::model::Category;

    /// Minimal wrapper for cache-level tests.
    #[derive(Debug)]
    pub(crate) struct Stub {
        pub handle: Handle,
        pub unique_id: UniqueId,
    }

    impl Wrapper for Stub {
        fn handle(&self) -> Handle {
            self.handle
        }

        fn unique_id(&self) -> UniqueId {
            self.unique_id
        }

        fn category(&self) -> Category {
            Category::Source
        }

        fn property_changed(&self, _ctx: &MidiContext, _property: &str) {}
    }

    pub(crate) fn stub(handle: u32, unique_id: i32) -> Arc<Stub> {
        Arc::new(Stub {
            handle: Handle::new(handle),
            unique_id: UniqueId::new(unique_id),
        })
    }

    fn ids(cache: &ObjectCache<Stub>) -> Vec<i32> {
        cache.iter().map(|w| w.unique_id.raw()).collect()
    }

    #[test]
    fn lookup_by_unique_id_handle_and_position() {
        let mut cache = ObjectCache::new();
        cache.push(stub(10, 1)).unwrap();
        cache.push(stub(20, 2)).unwrap();

        assert_eq!(cache.get_by_unique_id(UniqueId::new(2)).unwrap().handle, Handle::new(20));
        assert_eq!(cache.get_by_handle(Handle::new(10)).unwrap().unique_id, UniqueId::new(1));
        assert_eq!(cache.get_index(1).unwrap().unique_id, UniqueId::new(2));
        assert_eq!(cache.position_of(UniqueId::new(2)), Some(1));
        assert!(cache.get_by_handle(Handle::new(99)).is_none());
    }

    #[test]
    fn insert_at_position_shifts_later_entries() {
        let mut cache = ObjectCache::new();
        cache.push(stub(10, 1)).unwrap();
        cache.push(stub(30, 3)).unwrap();
        cache.insert_at(1, stub(20, 2)).unwrap();
        cache.insert_at(99, stub(40, 4)).unwrap();

        assert_eq!(ids(&cache), vec![1, 2, 3, 4]);
        assert_eq!(cache.handles()[1], Handle::new(20));
    }

    #[test]
    fn remove_absent_is_not_found() {
        let mut cache: ObjectCache<Stub> = ObjectCache::new();
        assert!(cache.remove(UniqueId::new(5)).is_none());
    }

    #[test]
    fn remove_cleans_up_indexes() {
        let mut cache = ObjectCache::new();
        cache.push(stub(10, 1)).unwrap();

        let removed = cache.remove(UniqueId::new(1)).unwrap();
        assert_eq!(removed.handle, Handle::new(10));
        assert!(cache.get_by_handle(Handle::new(10)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "inserted twice")]
    fn duplicate_unique_id_is_fatal_in_debug() {
        let mut cache = ObjectCache::new();
        cache.push(stub(10, 1)).unwrap();
        let _ = cache.push(stub(11, 1));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn duplicate_unique_id_is_rejected_in_release() {
        let mut cache = ObjectCache::new();
        cache.push(stub(10, 1)).unwrap();
        let err = cache.push(stub(11, 1)).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn replace_all_reorders_and_reindexes() {
        let mut cache = ObjectCache::new();
        cache.push(stub(10, 1)).unwrap();
        cache.push(stub(20, 2)).unwrap();

        cache.replace_all(vec![stub(30, 3), stub(10, 1)]).unwrap();
        assert_eq!(ids(&cache), vec![3, 1]);
        assert!(cache.get_by_handle(Handle::new(20)).is_none());
        assert_eq!(cache.get_by_handle(Handle::new(30)).unwrap().unique_id, UniqueId::new(3));
    }

    #[test]
    fn snapshot_and_version_follow_mutations() {
        let mut cache = ObjectCache::new();
        let rx = cache.subscribe();
        assert_eq!(cache.version(), 0);

        cache.push(stub(10, 1)).unwrap();
        cache.push(stub(20, 2)).unwrap();
        assert_eq!(cache.snapshot().len(), 2);
        assert_eq!(rx.borrow().len(), 2);
        assert_eq!(cache.version(), 2);

        let drained = cache.clear();
        assert_eq!(drained.len(), 2);
        assert!(cache.snapshot().is_empty());
    }
}
