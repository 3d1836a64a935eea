//! Optional thread-safe wrapper around [`MemoryManager`] (`sync` feature).
//!
//! The manager itself performs no internal synchronization; this is a thin
//! `lock_api`-based mutex wrapper for callers who need to share one across
//! threads.

use crate::manager::MemoryManager;

/// A [`MemoryManager`] behind a `lock_api`-based mutex.
#[derive(Debug)]
pub struct Locked<R: lock_api::RawMutex> {
    mutex: lock_api::Mutex<R, MemoryManager>,
}

impl<R: lock_api::RawMutex> Locked<R> {
    pub const fn new(manager: MemoryManager) -> Self {
        Self { mutex: lock_api::Mutex::new(manager) }
    }

    /// Locks the mutex, blocking until it is available.
    pub fn lock(&self) -> lock_api::MutexGuard<'_, R, MemoryManager> {
        self.mutex.lock()
    }

    /// Attempts to lock the mutex without blocking.
    pub fn try_lock(&self) -> Option<lock_api::MutexGuard<'_, R, MemoryManager>> {
        self.mutex.try_lock()
    }

    /// Consumes the wrapper, returning the inner manager.
    pub fn into_inner(self) -> MemoryManager {
        self.mutex.into_inner()
    }
}

impl MemoryManager {
    /// Wraps `self` in a [`Locked`] mutex, for sharing across threads.
    pub fn lock<R: lock_api::RawMutex>(self) -> Locked<R> {
        Locked::new(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::policy::PlacementPolicy;

    #[test]
    fn lock_grants_exclusive_access() {
        let manager = MemoryManager::new(8, PlacementPolicy::BestFit);
        let locked: Locked<spin::Mutex<()>> = manager.lock();

        {
            let mut guard = locked.lock();
            guard.initialize(10);
            assert!(guard.is_initialized());
        }

        assert!(locked.lock().is_initialized());
    }

    #[test]
    fn try_lock_fails_while_held() {
        let manager = MemoryManager::new(8, PlacementPolicy::BestFit);
        let locked: Locked<spin::Mutex<()>> = manager.lock();

        let _guard = locked.lock();
        assert!(locked.try_lock().is_none());
    }
}
