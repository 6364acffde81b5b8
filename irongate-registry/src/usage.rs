//! Advisory exclusive-use lock over service names.
//!
//! [`UsageLock::acquire`] blocks the calling thread until every requested
//! name is free and then marks all of them at once. Names are normalized
//! into sorted, de-duplicated order, and acquisition is all-or-nothing under
//! one mutex, so overlapping requests cannot deadlock.

use crate::error::{RegistryError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often a blocked caller re-checks its cancellation token.
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Set of names currently in use plus a condition variable for waiters.
#[derive(Debug, Default)]
pub struct UsageLock {
    used: Mutex<BTreeSet<String>>,
    released: Condvar,
}

fn normalize<S: AsRef<str>>(names: &[S]) -> BTreeSet<String> {
    names.iter().map(|n| n.as_ref().to_string()).collect()
}

impl UsageLock {
    /// Creates an empty lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until all `names` are free, then marks them used.
    ///
    /// # Errors
    /// Returns [`RegistryError::Cancelled`] if `cancel` fires while waiting;
    /// nothing is marked in that case.
    pub fn acquire<S: AsRef<str>>(&self, names: &[S], cancel: &CancellationToken) -> Result<()> {
        let wanted = normalize(names);
        let mut used = self.used.lock();
        loop {
            if cancel.is_cancelled() {
                tracing::debug!(names = ?wanted, "usage wait cancelled");
                return Err(RegistryError::Cancelled);
            }
            if used.is_disjoint(&wanted) {
                used.extend(wanted);
                return Ok(());
            }
            self.released.wait_for(&mut used, CANCEL_POLL);
        }
    }

    /// Marks `names` used only if all are free right now.
    pub fn try_acquire<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let wanted = normalize(names);
        let mut used = self.used.lock();
        if used.is_disjoint(&wanted) {
            used.extend(wanted);
            true
        } else {
            false
        }
    }

    /// Frees `names` and wakes waiters. Names not in use are ignored.
    pub fn release<S: AsRef<str>>(&self, names: &[S]) {
        {
            let mut used = self.used.lock();
            for name in names {
                used.remove(name.as_ref());
            }
        }
        self.released.notify_all();
    }

    /// Returns true if `name` is marked used.
    #[must_use]
    pub fn is_used(&self, name: &str) -> bool {
        self.used.lock().contains(name)
    }

    /// Names currently in use, sorted.
    #[must_use]
    pub fn used_names(&self) -> Vec<String> {
        self.used.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_overlapping_request_blocks_until_release() {
        let lock = Arc::new(UsageLock::new());
        let cancel = CancellationToken::new();
        lock.acquire(&["B", "A"], &cancel).unwrap();
        assert_eq!(lock.used_names(), vec!["A", "B"]);

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let lock = lock.clone();
            let cancel = cancel.clone();
            thread::spawn(move || {
                lock.acquire(&["B"], &cancel).unwrap();
                tx.send(Instant::now()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        let released_at = Instant::now();
        lock.release(&["A", "B"]);

        let acquired_at = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(acquired_at.duration_since(released_at) < Duration::from_secs(1));
        waiter.join().unwrap();
        assert_eq!(lock.used_names(), vec!["B"]);
    }

    #[test]
    fn test_disjoint_requests_do_not_block() {
        let lock = UsageLock::new();
        let cancel = CancellationToken::new();
        lock.acquire(&["A"], &cancel).unwrap();
        lock.acquire(&["C", "D"], &cancel).unwrap();
        assert!(!lock.try_acquire(&["D", "E"]));
        assert!(!lock.is_used("E"));
        assert!(lock.try_acquire(&["E"]));
    }

    #[test]
    fn test_cancelled_wait() {
        let lock = Arc::new(UsageLock::new());
        let cancel = CancellationToken::new();
        lock.acquire(&["A"], &cancel).unwrap();

        let waiter_cancel = CancellationToken::new();
        let waiter = {
            let lock = lock.clone();
            let cancel = waiter_cancel.clone();
            thread::spawn(move || lock.acquire(&["A", "Z"], &cancel))
        };
        thread::sleep(Duration::from_millis(50));
        waiter_cancel.cancel();

        assert!(matches!(waiter.join().unwrap(), Err(RegistryError::Cancelled)));
        assert!(!lock.is_used("Z"));
    }

    #[test]
    fn test_crossing_requests_do_not_deadlock() {
        let lock = Arc::new(UsageLock::new());
        let workers: Vec<_> = (0..4)
            .map(|i| {
                let lock = lock.clone();
                thread::spawn(move || {
                    let names: &[&str] = if i % 2 == 0 { &["A", "B"] } else { &["B", "A"] };
                    for _ in 0..50 {
                        lock.acquire(names, &CancellationToken::new()).unwrap();
                        lock.release(names);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert!(lock.used_names().is_empty());
    }
}
