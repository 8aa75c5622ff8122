//! Layered append-only buffer.

use crate::domain::StoreError;
use crate::ports::Layered;

/// Events buffered alongside a snapshot.
///
/// Events recorded in a child layer are dropped with it on discard and
/// appended to the parent's buffer on commit, so notifications follow exactly
/// the state changes that survive.
#[derive(Debug, Clone)]
pub struct VersionedLog<E> {
    name: &'static str,
    layers: Vec<Vec<E>>,
}

impl<E> VersionedLog<E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            layers: vec![Vec::new()],
        }
    }

    pub fn push(&mut self, event: E) {
        if let Some(top) = self.layers.last_mut() {
            top.push(event);
        }
    }

    /// All buffered events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.layers.iter().flatten()
    }

    /// Events recorded in the top layer only.
    pub fn pending(&self) -> &[E] {
        self.layers.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the events that reached the root layer.
    pub fn drain_committed(&mut self) -> Vec<E> {
        std::mem::take(&mut self.layers[0])
    }
}

impl<E> Layered for VersionedLog<E> {
    fn create_snapshot(&mut self) {
        self.layers.push(Vec::new());
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.layers.len() < 2 {
            return Err(StoreError::NoParentLayer {
                collection: self.name,
                operation: "commit",
            });
        }
        if let Some(top) = self.layers.pop() {
            if let Some(parent) = self.layers.last_mut() {
                parent.extend(top);
            }
        }
        Ok(())
    }

    fn discard(&mut self) -> Result<(), StoreError> {
        if self.layers.len() < 2 {
            return Err(StoreError::NoParentLayer {
                collection: self.name,
                operation: "discard",
            });
        }
        self.layers.pop();
        Ok(())
    }

    fn depth(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_appends_to_parent() {
        let mut log = VersionedLog::new("events");
        log.push(1);
        log.create_snapshot();
        log.push(2);
        assert_eq!(log.pending(), &[2]);
        log.commit().unwrap();

        assert_eq!(log.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(log.drain_committed(), vec![1, 2]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_discard_drops_child_events() {
        let mut log = VersionedLog::new("events");
        log.create_snapshot();
        log.push("lost");
        log.discard().unwrap();
        assert!(log.is_empty());
        assert!(log.discard().is_err());
    }

    #[test]
    fn test_drain_keeps_open_layers() {
        let mut log = VersionedLog::new("events");
        log.push(1);
        log.create_snapshot();
        log.push(2);
        assert_eq!(log.drain_committed(), vec![1]);
        assert_eq!(log.len(), 1);
    }
}
