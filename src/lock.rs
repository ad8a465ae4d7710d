//! Per-account exclusive locks and the multi-acquire protocol guarding a
//! transfer's critical section.
//!
//! Locks are created lazily, one per account id, and never removed. Taking
//! several of them uses a release-on-contention loop instead of a global
//! lock order: a thread only ever blocks while holding nothing else, so two
//! transfers can never wait on each other in a cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use lock_api::ArcReentrantMutexGuard;
use parking_lot::{RawMutex, RawThreadId, ReentrantMutex};
use tracing::trace;

use crate::domain::AccountId;

type AccountLock = ReentrantMutex<()>;
type AccountLockGuard = ArcReentrantMutexGuard<RawMutex, RawThreadId, ()>;

/// Locks held for one critical section. Dropping it releases them all.
#[must_use = "the locks are released as soon as the set is dropped"]
pub struct LockSet {
    guards: Vec<AccountLockGuard>,
}

impl LockSet {
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl core::fmt::Debug for LockSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockSet")
            .field("held", &self.guards.len())
            .finish()
    }
}

#[derive(Default)]
pub struct LockCoordinator {
    locks: DashMap<AccountId, Arc<AccountLock>>,
    contended_waits: AtomicU64,
}

impl core::fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("locks", &self.len())
            .field("contended_waits", &self.contention_count())
            .finish()
    }
}

impl LockCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `account_id`, creating it on first reference.
    ///
    /// `entry` holds the shard write lock across the check and the insert, so
    /// racing first touches all observe the same lock.
    fn lock_for(&self, account_id: &AccountId) -> Arc<AccountLock> {
        if let Some(lock) = self.locks.get(account_id) {
            return Arc::clone(lock.value());
        }
        Arc::clone(
            self.locks
                .entry(account_id.clone())
                .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
                .value(),
        )
    }

    /// Blocks until the calling thread holds the lock of every id in
    /// `account_ids`.
    ///
    /// Each pass walks the ids in order with non-blocking attempts. On the
    /// first failure everything taken so far is released and the thread
    /// waits on that contested lock alone, then starts a new pass already
    /// holding it. Never fails; under heavy contention it may retry.
    pub fn acquire_all(&self, account_ids: &[AccountId]) -> LockSet {
        let locks: Vec<Arc<AccountLock>> = account_ids.iter().map(|id| self.lock_for(id)).collect();

        let mut held: Vec<AccountLockGuard> = Vec::with_capacity(locks.len());
        // Index into `locks` of the lock won by the last blocking wait.
        let mut contested: Option<(usize, AccountLockGuard)> = None;

        while held.len() != locks.len() {
            for (idx, lock) in locks.iter().enumerate() {
                match contested.take() {
                    Some((contested_idx, guard)) if contested_idx == idx => {
                        held.push(guard);
                        continue;
                    }
                    other => contested = other,
                }

                if let Some(guard) = lock.try_lock_arc() {
                    held.push(guard);
                    continue;
                }

                held.clear();
                drop(contested.take());
                self.contended_waits.fetch_add(1, Ordering::Relaxed);
                trace!(account_id = %account_ids[idx], "lock contested, waiting with nothing held");

                contested = Some((idx, lock.lock_arc()));
                break;
            }
        }

        LockSet { guards: held }
    }

    /// Whether any thread currently holds the lock for `account_id`.
    pub fn is_locked(&self, account_id: &AccountId) -> bool {
        self.locks
            .get(account_id)
            .is_some_and(|lock| lock.value().is_locked())
    }

    /// Number of account locks created so far.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// How many times a caller had to back off and wait on a contested lock.
    pub fn contention_count(&self) -> u64 {
        self.contended_waits.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn ids(raw: &[&str]) -> Vec<AccountId> {
        raw.iter().map(|id| AccountId::from(*id)).collect()
    }

    #[test]
    fn acquires_every_requested_lock() {
        let coordinator = LockCoordinator::new();
        let accounts = ids(&["a", "b", "c"]);

        let set = coordinator.acquire_all(&accounts);
        assert_eq!(set.len(), 3);
        for id in &accounts {
            assert!(coordinator.is_locked(id));
        }

        drop(set);
        for id in &accounts {
            assert!(!coordinator.is_locked(id));
        }
        assert_eq!(coordinator.contention_count(), 0);
    }

    #[test]
    fn held_locks_exclude_other_threads() {
        let coordinator = Arc::new(LockCoordinator::new());
        let set = coordinator.acquire_all(&ids(&["a", "b"]));

        let other = Arc::clone(&coordinator);
        let probe = thread::spawn(move || other.lock_for(&"a".into()).try_lock_arc().is_some());
        assert!(!probe.join().unwrap());

        drop(set);
        let other = Arc::clone(&coordinator);
        let probe = thread::spawn(move || other.lock_for(&"a".into()).try_lock_arc().is_some());
        assert!(probe.join().unwrap());
    }

    #[test]
    fn concurrent_first_touch_creates_a_single_lock() {
        const THREADS: usize = 16;
        let coordinator = Arc::new(LockCoordinator::new());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    coordinator.lock_for(&"fresh".into())
                })
            })
            .collect();

        let locks: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(coordinator.len(), 1);
        assert!(locks.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn waits_on_contested_lock_holding_nothing() {
        let coordinator = Arc::new(LockCoordinator::new());
        let blocker = coordinator.acquire_all(&ids(&["b"]));

        let (done_tx, done_rx) = mpsc::channel();
        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let set = coordinator.acquire_all(&ids(&["a", "b"]));
                done_tx.send(set.len()).unwrap();
            })
        };

        // The waiter took "a", failed on "b", released "a" and is now parked.
        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(!coordinator.is_locked(&"a".into()));

        drop(blocker);
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 2);
        waiter.join().unwrap();
        assert!(coordinator.contention_count() >= 1);
    }

    #[test]
    fn opposite_orders_do_not_deadlock() {
        const ROUNDS: usize = 2_000;
        let coordinator = Arc::new(LockCoordinator::new());
        let barrier = Arc::new(Barrier::new(4));
        let orders = [
            ids(&["a", "b"]),
            ids(&["b", "a"]),
            ids(&["b", "c", "a"]),
            ids(&["c", "a", "b"]),
        ];

        let (done_tx, done_rx) = mpsc::channel();
        for order in orders {
            let coordinator = Arc::clone(&coordinator);
            let barrier = Arc::clone(&barrier);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    let set = coordinator.acquire_all(&order);
                    assert_eq!(set.len(), order.len());
                }
                done_tx.send(()).unwrap();
            });
        }

        for _ in 0..4 {
            done_rx
                .recv_timeout(Duration::from_secs(30))
                .expect("lock acquisition deadlocked");
        }
    }

    #[test]
    fn reentrant_for_the_owning_thread() {
        let coordinator = LockCoordinator::new();
        let outer = coordinator.acquire_all(&ids(&["a", "b"]));
        let inner = coordinator.acquire_all(&ids(&["b", "a"]));
        assert_eq!(inner.len(), 2);
        drop(inner);
        assert!(coordinator.is_locked(&"a".into()));
        drop(outer);
        assert!(!coordinator.is_locked(&"a".into()));
    }
}
