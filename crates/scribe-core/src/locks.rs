//! Per-project mutual exclusion
//!
//! Every read-mutate-write of a project document runs under that project's
//! lock, so concurrent writers to one project are serialized while different
//! projects proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Registry of one lock per project name
#[derive(Debug, Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for a project, created on first use
    pub fn handle(&self, project: &str) -> Arc<Mutex<()>> {
        let mut locks = lock_ignoring_poison(&self.locks);
        Arc::clone(locks.entry(project.to_string()).or_default())
    }

    /// Run `f` while holding the project's lock
    pub fn with_lock<T>(&self, project: &str, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(project);
        let _guard = lock_ignoring_poison(&handle);
        f()
    }

    /// Number of projects that have been locked at least once
    pub fn len(&self) -> usize {
        lock_ignoring_poison(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Neither the registry map nor the `()` guards can be left half-updated by a panic.
fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_project_shares_lock() {
        let locks = ProjectLocks::new();
        let a = locks.handle("ignite");
        let b = locks.handle("ignite");
        let c = locks.handle("other");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_with_lock_serializes_callers() {
        let locks = Arc::new(ProjectLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    locks.with_lock("ignite", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let locks = Arc::new(ProjectLocks::new());
        let cloned = Arc::clone(&locks);
        let _ = thread::spawn(move || {
            cloned.with_lock("ignite", || panic!("boom"));
        })
        .join();

        assert_eq!(locks.with_lock("ignite", || 7), 7);
    }
}
