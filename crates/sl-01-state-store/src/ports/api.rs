use crate::domain::StoreError;

/// A value stored in a [`crate::VersionedCollection`].
pub trait StateEntry: Clone {
    /// Unique key of the entry within its collection.
    fn key(&self) -> &str;
}

/// Snapshot layer control shared by every layered structure.
///
/// Implementations must keep their layer depth in lock-step: a composite
/// snapshot forwards each call to all of its parts.
pub trait Layered {
    // === Layer Control ===

    /// Push a child layer; later writes land in it.
    fn create_snapshot(&mut self);

    /// Fold the top layer into its parent.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Drop the top layer and everything written in it.
    fn discard(&mut self) -> Result<(), StoreError>;

    /// Number of layers, the root included.
    fn depth(&self) -> usize;
}

/// Keyed access used by the rule modules that sit on top of the store.
pub trait KeyedStore<V: StateEntry> {
    // === Reads ===

    /// Read without marking the key updated.
    fn find(&self, key: &str) -> Option<&V>;

    fn item_exists(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    // === Writes ===

    /// Read for write: copies the entry into the top layer on first access
    /// and records the key as updated.
    fn find_and_mark_updated(&mut self, key: &str) -> Option<&mut V>;

    /// Insert a new entry. Returns `false` if the key is already visible.
    fn add(&mut self, entry: V) -> bool;

    /// Remove the entry from this layer's view. Returns `false` if absent.
    fn delete(&mut self, key: &str) -> bool;
}
