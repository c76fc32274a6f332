//! Per-type load locks.
//!
//! Concurrent first touches of the same type block on that type's lock instead of racing
//! each other through the loader. Locks are re-entrant so a unit whose load-time code
//! calls back into its own type (or requires a unit that requires it) does not deadlock
//! on its own thread.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::runner::ds::type_name::TypeName;

#[derive(Default)]
pub struct LoadGuards {
    locks: Mutex<HashMap<TypeName, Arc<ReentrantMutex<()>>>>,
}

impl LoadGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `unit`, created on first request. Hand it back with
    /// [`LoadGuards::release`] once done with it.
    pub fn lock_for(&self, unit: &TypeName) -> Arc<ReentrantMutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(unit.clone())
                .or_insert_with(|| Arc::new(ReentrantMutex::new(()))),
        )
    }

    /// Give back a lock taken with [`LoadGuards::lock_for`]. The entry is dropped when
    /// nobody else holds or waits on it, so names that never load do not pile up.
    pub fn release(&self, unit: &TypeName, lock: Arc<ReentrantMutex<()>>) {
        let mut locks = self.locks.lock();
        // One reference in the map, one here.
        let idle = Arc::strong_count(&lock) == 2;
        if idle && locks.get(unit).map_or(false, |l| Arc::ptr_eq(l, &lock)) {
            locks.remove(unit);
        }
    }

    /// Number of types with a lock currently handed out.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_type_shares_a_lock() {
        let guards = LoadGuards::new();
        let a = TypeName::parse("A").unwrap();
        let b = TypeName::parse("B").unwrap();
        assert!(Arc::ptr_eq(&guards.lock_for(&a), &guards.lock_for(&a)));
        assert!(!Arc::ptr_eq(&guards.lock_for(&a), &guards.lock_for(&b)));
    }

    #[test]
    fn test_lock_is_reentrant() {
        let guards = LoadGuards::new();
        let a = TypeName::parse("A").unwrap();
        let lock = guards.lock_for(&a);
        let _outer = lock.lock();
        let inner = guards.lock_for(&a);
        let _again = inner.lock();
    }

    #[test]
    fn test_release_drops_idle_entries() {
        let guards = LoadGuards::new();
        let a = TypeName::parse("A").unwrap();
        let first = guards.lock_for(&a);
        let second = guards.lock_for(&a);

        guards.release(&a, first);
        assert_eq!(guards.len(), 1);
        guards.release(&a, second);
        assert!(guards.is_empty());
    }
}
