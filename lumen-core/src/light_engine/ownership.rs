//! Single owner thread discipline for the light engine.
//!
//! The engine is meant to be driven by one thread, the one that created it.
//! That thread receives an [`OwnerToken`]. Other threads may still get in,
//! but if they find the engine busy the access is reported before they block,
//! which makes protocol violations visible without failing the caller.
//!
//! The lock also remembers which thread holds it. A thread that comes back
//! while it still holds the lock, for example from a render callback fired in
//! the middle of a pass, is told so instead of deadlocking on itself.

use std::{
    marker::PhantomData,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU64, Ordering},
    thread::{self, ThreadId},
};

use parking_lot::{Mutex, MutexGuard};

/// Capability proving the holder runs on the thread that owns an engine.
///
/// The token can neither be sent nor shared across threads.
#[derive(Debug)]
pub struct OwnerToken {
    owner: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl OwnerToken {
    /// The thread this token belongs to.
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.owner
    }
}

/// A mutex that knows which thread owns the data behind it.
#[derive(Debug)]
pub struct OwnershipGuard<T> {
    inner: Mutex<T>,
    /// Thread currently holding `inner`, set right after it is acquired.
    holder: Mutex<Option<ThreadId>>,
    owner: ThreadId,
    warn_on_foreign_access: bool,
    foreign_accesses: AtomicU64,
    reentrant_accesses: AtomicU64,
}

/// Outcome of [`OwnershipGuard::lock`].
#[derive(Debug)]
pub enum Access<'a, T> {
    /// The lock was acquired.
    Locked(HeldGuard<'a, T>),
    /// The calling thread already holds the lock further up its stack.
    Reentrant,
}

/// Exclusive access to the data of an [`OwnershipGuard`].
///
/// Clears the recorded holder before the lock is released.
#[derive(Debug)]
pub struct HeldGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    holder: &'a Mutex<Option<ThreadId>>,
}

impl<T> Deref for HeldGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for HeldGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for HeldGuard<'_, T> {
    fn drop(&mut self) {
        *self.holder.lock() = None;
    }
}

impl<T> OwnershipGuard<T> {
    /// Wraps `value`, making the calling thread its owner.
    #[must_use]
    pub fn new(value: T, warn_on_foreign_access: bool) -> (Self, OwnerToken) {
        let owner = thread::current().id();
        let guard = Self {
            inner: Mutex::new(value),
            holder: Mutex::new(None),
            owner,
            warn_on_foreign_access,
            foreign_accesses: AtomicU64::new(0),
            reentrant_accesses: AtomicU64::new(0),
        };
        let token = OwnerToken {
            owner,
            _not_send: PhantomData,
        };
        (guard, token)
    }

    /// Locks the data, blocking until it is free.
    ///
    /// An uncontended lock is taken straight away. If the calling thread
    /// already holds the lock, [`Access::Reentrant`] is returned without
    /// blocking. Otherwise, when the lock is busy and the caller did not pass
    /// the owner's token, the access is counted and a warning naming both
    /// threads is logged before blocking.
    pub fn lock(&self, token: Option<&OwnerToken>) -> Access<'_, T> {
        let current = thread::current().id();
        if let Some(guard) = self.inner.try_lock() {
            return Access::Locked(self.hold(guard, current));
        }

        if *self.holder.lock() == Some(current) {
            self.reentrant_accesses.fetch_add(1, Ordering::Relaxed);
            log::debug!("Thread {current:?} re-entered the light engine while holding it");
            return Access::Reentrant;
        }

        if token.is_some_and(|token| token.owner == self.owner) {
            log::trace!("Owner thread {current:?} waiting for the light engine");
        } else {
            self.foreign_accesses.fetch_add(1, Ordering::Relaxed);
            if self.warn_on_foreign_access {
                log::warn!(
                    "Thread {current:?} accessed the light engine owned by thread {:?} while it was busy, blocking until it is free",
                    self.owner
                );
            }
        }

        let guard = self.inner.lock();
        Access::Locked(self.hold(guard, current))
    }

    fn hold<'a>(&'a self, guard: MutexGuard<'a, T>, current: ThreadId) -> HeldGuard<'a, T> {
        *self.holder.lock() = Some(current);
        HeldGuard {
            guard,
            holder: &self.holder,
        }
    }

    /// How many times a caller without the owner's token found the lock busy.
    #[must_use]
    pub fn foreign_accesses(&self) -> u64 {
        self.foreign_accesses.load(Ordering::Relaxed)
    }

    /// How many times a thread asked for the lock while already holding it.
    #[must_use]
    pub fn reentrant_accesses(&self) -> u64 {
        self.reentrant_accesses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, mpsc},
        thread,
        time::Duration,
    };

    use super::*;

    fn locked<T>(access: Access<'_, T>) -> HeldGuard<'_, T> {
        match access {
            Access::Locked(guard) => guard,
            Access::Reentrant => panic!("lock was unexpectedly re-entered"),
        }
    }

    #[test]
    fn test_uncontended_lock() {
        let (guard, token) = OwnershipGuard::new(5u32, true);
        assert_eq!(token.thread_id(), thread::current().id());

        *locked(guard.lock(Some(&token))) += 1;
        *locked(guard.lock(None)) += 1;
        assert_eq!(*locked(guard.lock(Some(&token))), 7);
        assert_eq!(guard.foreign_accesses(), 0);
        assert_eq!(guard.reentrant_accesses(), 0);
    }

    #[test]
    fn test_relock_on_holding_thread_does_not_block() {
        let (guard, token) = OwnershipGuard::new(0u32, true);

        let mut held = locked(guard.lock(Some(&token)));
        assert!(matches!(guard.lock(Some(&token)), Access::Reentrant));
        assert!(matches!(guard.lock(None), Access::Reentrant));
        *held += 1;
        drop(held);

        assert_eq!(*locked(guard.lock(Some(&token))), 1);
        assert_eq!(guard.reentrant_accesses(), 2);
        assert_eq!(guard.foreign_accesses(), 0);
    }

    #[test]
    fn test_foreign_contention_is_counted_then_served() {
        let (guard, token) = OwnershipGuard::new(Vec::<u32>::new(), true);
        let guard = Arc::new(guard);

        let held = locked(guard.lock(Some(&token)));
        let worker = {
            let guard = Arc::clone(&guard);
            thread::spawn(move || {
                locked(guard.lock(None)).push(1);
            })
        };

        while guard.foreign_accesses() == 0 {
            thread::yield_now();
        }
        drop(held);
        worker.join().expect("worker thread panicked");

        assert_eq!(guard.foreign_accesses(), 1);
        assert_eq!(guard.reentrant_accesses(), 0);
        assert_eq!(*locked(guard.lock(Some(&token))), vec![1]);
    }

    /// Runs `contend` on this thread while a worker holds the lock. The worker
    /// lets go once `release_when` returns.
    fn contend_with_worker(
        guard: &Arc<OwnershipGuard<u32>>,
        release_when: impl FnOnce() + Send + 'static,
        contend: impl FnOnce(),
    ) {
        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let worker = {
            let guard = Arc::clone(guard);
            thread::spawn(move || {
                let mut held = locked(guard.lock(None));
                *held += 1;
                locked_tx.send(()).expect("owner thread gone");
                release_rx.recv().expect("owner thread gone");
            })
        };

        locked_rx.recv().expect("worker thread gone");
        let releaser = thread::spawn(move || {
            release_when();
            release_tx.send(()).expect("worker thread gone");
        });
        contend();
        releaser.join().expect("releaser thread panicked");
        worker.join().expect("worker thread panicked");
    }

    #[test]
    fn test_owner_token_contention_is_not_a_violation() {
        let (guard, token) = OwnershipGuard::new(0u32, true);
        let guard = Arc::new(guard);

        contend_with_worker(
            &guard,
            || thread::sleep(Duration::from_millis(20)),
            || *locked(guard.lock(Some(&token))) += 1,
        );

        assert_eq!(*locked(guard.lock(Some(&token))), 2);
        assert_eq!(guard.foreign_accesses(), 0);
    }

    #[test]
    fn test_owner_thread_without_token_is_counted() {
        let (guard, token) = OwnershipGuard::new(0u32, false);
        let guard = Arc::new(guard);

        let watched = Arc::clone(&guard);
        contend_with_worker(
            &guard,
            move || {
                while watched.foreign_accesses() == 0 {
                    thread::yield_now();
                }
            },
            || *locked(guard.lock(None)) += 1,
        );

        assert_eq!(*locked(guard.lock(Some(&token))), 2);
        assert_eq!(guard.foreign_accesses(), 1);
    }
}
