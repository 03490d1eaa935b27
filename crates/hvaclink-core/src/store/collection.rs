// ── Generic reactive entity collection ──
//
// Insertion-ordered storage with push-based change notification via
// `watch` channels. Every mutation happens under one short write lock and
// publishes a fresh snapshot before the lock is released, so subscribers
// only ever see fully-applied states.

use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tokio::sync::watch;

/// A reactive, ordered collection keyed by string.
///
/// Iteration order is insertion order (backend order for snapshots).
pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    by_key: RwLock<IndexMap<String, Arc<T>>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: RwLock::new(IndexMap::new()),
            version,
            snapshot,
        }
    }

    /// Mutate the entity under `key`, creating it with `make` first when the
    /// key is absent. Returns `true` if the key was new. Existing keys keep
    /// their position; new keys go last.
    pub(crate) fn merge(
        &self,
        key: String,
        make: impl FnOnce() -> T,
        f: impl FnOnce(&mut T),
    ) -> bool {
        let mut map = self.by_key.write().unwrap_or_else(PoisonError::into_inner);
        let is_new = !map.contains_key(&key);
        let entry = map.entry(key).or_insert_with(|| Arc::new(make()));
        f(Arc::make_mut(entry));
        self.publish(&map);
        is_new
    }

    /// Mutate an existing entity in place. Returns `false` (and publishes
    /// nothing) if the key is absent.
    pub(crate) fn modify(&self, key: &str, f: impl FnOnce(&mut T)) -> bool {
        let mut map = self.by_key.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = map.get_mut(key) else {
            return false;
        };
        f(Arc::make_mut(entry));
        self.publish(&map);
        true
    }

    /// Remove an entity by key, preserving the order of the rest.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let mut map = self.by_key.write().unwrap_or_else(PoisonError::into_inner);
        let removed = map.shift_remove(key);
        if removed.is_some() {
            self.publish(&map);
        }
        removed
    }

    /// Swap the whole collection for `entries` in one step. Later duplicates
    /// of a key overwrite earlier ones in place.
    pub(crate) fn replace_all(&self, entries: impl IntoIterator<Item = (String, T)>) {
        let fresh: IndexMap<String, Arc<T>> = entries
            .into_iter()
            .map(|(k, v)| (k, Arc::new(v)))
            .collect();

        let mut map = self.by_key.write().unwrap_or_else(PoisonError::into_inner);
        *map = fresh;
        self.publish(&map);
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(Arc::clone)
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Rebuild the snapshot from `map` and bump the version. Called with the
    /// write lock held.
    fn publish(&self, map: &IndexMap<String, Arc<T>>) {
        let values: Vec<Arc<T>> = map.values().map(Arc::clone).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn merge_creates_then_updates_in_place() {
        let col: EntityCollection<String> = EntityCollection::new();
        assert!(col.merge("a".into(), || "x".into(), |s| s.push('1')));
        assert!(col.merge("b".into(), String::new, |_| {}));
        assert!(!col.merge("a".into(), || "unused".into(), |s| s.push('2')));

        assert_eq!(*col.get("a").unwrap(), "x12");
        assert_eq!(*col.snapshot()[0], "x12");
    }

    #[test]
    fn order_is_insertion_order() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.replace_all([("c".into(), "3".into()), ("a".into(), "1".into()), ("b".into(), "2".into())]);
        col.remove("a");

        let order: Vec<String> = col.snapshot().iter().map(|s| (**s).clone()).collect();
        assert_eq!(order, vec!["3".to_string(), "2".to_string()]);
    }

    #[test]
    fn replace_all_discards_absent_keys() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.merge("old".into(), || "x".into(), |_| {});
        col.replace_all([("new".into(), "y".into())]);

        assert!(col.get("old").is_none());
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn modify_missing_key_is_a_no_op() {
        let col: EntityCollection<String> = EntityCollection::new();
        let before = col.version();
        assert!(!col.modify("ghost", |s| s.push('!')));
        assert_eq!(col.version(), before);
    }

    #[test]
    fn every_mutation_bumps_version_and_snapshot() {
        let col: EntityCollection<String> = EntityCollection::new();
        let mut rx = col.subscribe();

        col.merge("a".into(), || "x".into(), |_| {});
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        col.modify("a", |s| s.push('!'));
        assert_eq!(col.version(), 2);
        assert_eq!(*col.snapshot()[0], "x!");
    }
}
