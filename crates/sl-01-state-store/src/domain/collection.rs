//! Layered copy-on-write keyed collection.

use crate::domain::StoreError;
use crate::ports::{KeyedStore, Layered, StateEntry};
use ledger_telemetry::{log_event, subsystems};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Live(usize),
    Deleted,
}

#[derive(Debug, Clone, Default)]
struct Layer {
    slots: BTreeMap<String, Slot>,
    updated: BTreeSet<String>,
    /// Arena length when the layer was pushed.
    arena_mark: usize,
}

/// Keyed entries over a stack of copy-on-write layers.
///
/// Only the top layer is ever written. Reading a key walks the layers from
/// the top down and stops at the first slot found, so a child layer shadows
/// its parents until it is committed or discarded.
#[derive(Debug, Clone)]
pub struct VersionedCollection<V> {
    name: &'static str,
    arena: Vec<V>,
    layers: Vec<Layer>,
}

impl<V: StateEntry> VersionedCollection<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            arena: Vec::new(),
            layers: vec![Layer::default()],
        }
    }

    /// Collection name used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn top_index(&self) -> usize {
        // The root layer is never popped.
        self.layers.len() - 1
    }

    fn lookup(&self, key: &str) -> Option<(usize, Slot)> {
        self.layers
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, layer)| layer.slots.get(key).map(|slot| (depth, *slot)))
    }

    fn visible_index(&self, key: &str) -> Option<usize> {
        match self.lookup(key) {
            Some((_, Slot::Live(index))) => Some(index),
            _ => None,
        }
    }

    fn visible(&self) -> BTreeMap<&str, usize> {
        let mut view = BTreeMap::new();
        for layer in &self.layers {
            for (key, slot) in &layer.slots {
                match slot {
                    Slot::Live(index) => {
                        view.insert(key.as_str(), *index);
                    }
                    Slot::Deleted => {
                        view.remove(key.as_str());
                    }
                }
            }
        }
        view
    }

    pub fn find(&self, key: &str) -> Option<&V> {
        self.visible_index(key).and_then(|index| self.arena.get(index))
    }

    pub fn find_and_mark_updated(&mut self, key: &str) -> Option<&mut V> {
        let top = self.top_index();
        let index = match self.lookup(key)? {
            (_, Slot::Deleted) => return None,
            (depth, Slot::Live(index)) if depth == top => index,
            (_, Slot::Live(index)) => {
                let copy = self.arena.get(index)?.clone();
                self.arena.push(copy);
                let fresh = self.arena.len() - 1;
                self.layers[top]
                    .slots
                    .insert(key.to_string(), Slot::Live(fresh));
                fresh
            }
        };
        self.layers[top].updated.insert(key.to_string());
        self.arena.get_mut(index)
    }

    pub fn add(&mut self, entry: V) -> bool {
        if self.visible_index(entry.key()).is_some() {
            return false;
        }
        let key = entry.key().to_string();
        self.arena.push(entry);
        let index = self.arena.len() - 1;
        let top = self.top_index();
        let layer = &mut self.layers[top];
        layer.slots.insert(key.clone(), Slot::Live(index));
        layer.updated.insert(key);
        true
    }

    pub fn delete(&mut self, key: &str) -> bool {
        if self.visible_index(key).is_none() {
            return false;
        }
        let top = self.top_index();
        let layer = &mut self.layers[top];
        if top == 0 {
            layer.slots.remove(key);
        } else {
            layer.slots.insert(key.to_string(), Slot::Deleted);
        }
        layer.updated.insert(key.to_string());
        true
    }

    pub fn item_exists(&self, key: &str) -> bool {
        self.visible_index(key).is_some()
    }

    /// Visible entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &V> + '_ {
        self.visible()
            .into_values()
            .filter_map(move |index| self.arena.get(index))
    }

    pub fn keys(&self) -> Vec<String> {
        self.visible().into_keys().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.visible().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys written in the top layer (added, deleted or marked updated).
    pub fn updated_keys(&self) -> Vec<String> {
        self.layers[self.top_index()].updated.iter().cloned().collect()
    }

    /// Drain the root layer's updated set for persistence.
    ///
    /// Returns nothing while child layers are open.
    pub fn take_updated(&mut self) -> BTreeSet<String> {
        if self.layers.len() != 1 {
            return BTreeSet::new();
        }
        std::mem::take(&mut self.layers[0].updated)
    }

    /// Rebuild the arena so it holds exactly the root layer's live entries.
    fn compact(&mut self) {
        if self.layers.len() != 1 || self.arena.len() == self.layers[0].slots.len() {
            return;
        }
        let mut old: Vec<Option<V>> = std::mem::take(&mut self.arena)
            .into_iter()
            .map(Some)
            .collect();
        let root = &mut self.layers[0];
        root.slots.retain(|_, slot| match slot {
            Slot::Live(index) => match old.get_mut(*index).and_then(Option::take) {
                Some(entry) => {
                    self.arena.push(entry);
                    *index = self.arena.len() - 1;
                    true
                }
                None => false,
            },
            Slot::Deleted => false,
        });
    }

    /// Arena size, including entries shadowed by later layers.
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }
}

impl<V: StateEntry> Layered for VersionedCollection<V> {
    fn create_snapshot(&mut self) {
        let mark = self.arena.len();
        self.layers.push(Layer {
            arena_mark: mark,
            ..Layer::default()
        });
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.layers.len() < 2 {
            return Err(StoreError::NoParentLayer {
                collection: self.name,
                operation: "commit",
            });
        }
        let top = self.layers.pop().ok_or(StoreError::NoParentLayer {
            collection: self.name,
            operation: "commit",
        })?;
        let to_root = self.layers.len() == 1;
        let parent_index = self.top_index();
        let parent = &mut self.layers[parent_index];
        for (key, slot) in top.slots {
            match slot {
                Slot::Deleted if to_root => {
                    parent.slots.remove(&key);
                }
                _ => {
                    parent.slots.insert(key, slot);
                }
            }
        }
        parent.updated.extend(top.updated);

        if to_root {
            self.compact();
        }
        log_event!(
            trace,
            subsystems::STATE_STORE,
            "Layer committed",
            collection = self.name,
            depth = self.layers.len()
        );
        Ok(())
    }

    fn discard(&mut self) -> Result<(), StoreError> {
        if self.layers.len() < 2 {
            return Err(StoreError::NoParentLayer {
                collection: self.name,
                operation: "discard",
            });
        }
        if let Some(top) = self.layers.pop() {
            self.arena.truncate(top.arena_mark);
        }
        log_event!(
            trace,
            subsystems::STATE_STORE,
            "Layer discarded",
            collection = self.name,
            depth = self.layers.len()
        );
        Ok(())
    }

    fn depth(&self) -> usize {
        self.layers.len()
    }
}

impl<V: StateEntry> KeyedStore<V> for VersionedCollection<V> {
    fn find(&self, key: &str) -> Option<&V> {
        VersionedCollection::find(self, key)
    }

    fn find_and_mark_updated(&mut self, key: &str) -> Option<&mut V> {
        VersionedCollection::find_and_mark_updated(self, key)
    }

    fn add(&mut self, entry: V) -> bool {
        VersionedCollection::add(self, entry)
    }

    fn delete(&mut self, key: &str) -> bool {
        VersionedCollection::delete(self, key)
    }
}
