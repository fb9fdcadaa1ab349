//! Per-file lock registry for fact store writers.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lock objects keyed by store file path.
///
/// Clones share the same registry, so every handle to a store serializes
/// writers on the same file while different files proceed in parallel.
#[derive(Debug, Clone, Default)]
pub struct StoreLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl StoreLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock object for `path`, created on first use.
    ///
    /// Creating a lock also drops entries no caller still holds a handle to,
    /// so the registry tracks active files rather than every file ever seen.
    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock();
        if let Some(lock) = locks.get(path) {
            return Arc::clone(lock);
        }
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(path.to_path_buf(), Arc::clone(&lock));
        lock
    }

    /// Number of files with a registered lock.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::StoreLocks;
    use std::path::Path;
    use std::sync::Arc;

    #[test]
    fn same_path_shares_one_lock() {
        let locks = StoreLocks::new();
        let clone = locks.clone();
        let a = locks.lock_for(Path::new("memories/discord_1.json"));
        let b = clone.lock_for(Path::new("memories/discord_1.json"));
        let c = locks.lock_for(Path::new("memories/discord_2.json"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);

        let _held = a.lock();
        assert!(b.try_lock().is_none());
        assert!(c.try_lock().is_some());
    }

    #[test]
    fn unused_locks_are_dropped_on_next_registration() {
        let locks = StoreLocks::new();
        let held = locks.lock_for(Path::new("memories/discord_1.json"));
        drop(locks.lock_for(Path::new("memories/discord_2.json")));
        assert_eq!(locks.len(), 2);

        let _third = locks.lock_for(Path::new("memories/discord_3.json"));
        assert_eq!(locks.len(), 2);
        assert!(Arc::ptr_eq(
            &held,
            &locks.lock_for(Path::new("memories/discord_1.json"))
        ));
    }
}
