//! Per-story lock registry
//!
//! Every operation that mutates a story's chapter numbering acquires the
//! story's lock first, so the sibling set is only ever rewritten by one
//! request at a time. Locks are process-wide; single-node deployment is
//! assumed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Registry handing out one async mutex per story
#[derive(Default)]
pub struct LockRegistry {
    locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a story
    pub fn for_story(&self, story_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        locks
            .entry(story_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry for a deleted story
    ///
    /// An in-flight holder keeps its Arc alive; only the registry entry
    /// goes away.
    pub fn retire(&self, story_id: Uuid) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        locks.remove(&story_id);
    }

    /// Number of registered locks (for tests and diagnostics)
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_story_same_lock() {
        let registry = LockRegistry::new();
        let story = Uuid::new_v4();

        let a = registry.for_story(story);
        let b = registry.for_story(story);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_different_stories_independent() {
        let registry = LockRegistry::new();
        let a = registry.for_story(Uuid::new_v4());
        let b = registry.for_story(Uuid::new_v4());
        assert!(!Arc::ptr_eq(&a, &b));

        // Holding one story's lock must not block the other
        let _guard = a.try_lock().unwrap();
        assert!(b.try_lock().is_ok());
    }

    #[test]
    fn test_lock_excludes_second_holder() {
        tokio_test::block_on(async {
            let registry = LockRegistry::new();
            let story = Uuid::new_v4();

            let lock = registry.for_story(story);
            let guard = lock.lock().await;

            let second = registry.for_story(story);
            assert!(second.try_lock().is_err());

            drop(guard);
            assert!(second.try_lock().is_ok());
        });
    }

    #[test]
    fn test_retire_removes_entry() {
        let registry = LockRegistry::new();
        let story = Uuid::new_v4();

        registry.for_story(story);
        assert_eq!(registry.len(), 1);

        registry.retire(story);
        assert!(registry.is_empty());
    }
}
