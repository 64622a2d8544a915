// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! A versioned spinlock: a single atomic word packing a held-flag (bit 0)
//! and a version counter (bits 1..64). Packing both into one word lets a
//! reader take a consistent pre/post snapshot with a single atomic load
//! on each side, which is the crux of TL2's invisible reads.

use std::sync::atomic::{AtomicU64, Ordering};

const LOCK_BIT: u64 = 1;

/// Raw snapshot of a [`VersionedLock`]: flag + version packed as the
/// algorithm observed them at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockSnapshot(u64);

impl LockSnapshot {
    #[inline]
    pub fn is_locked(self) -> bool {
        self.0 & LOCK_BIT == LOCK_BIT
    }

    #[inline]
    pub fn version(self) -> u64 {
        self.0 >> 1
    }
}

#[derive(Debug, Default)]
pub struct VersionedLock(AtomicU64);

impl VersionedLock {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Non-blocking try-lock. Succeeds iff the flag bit was clear, in
    /// which case it is set while the version is preserved. Uses CAS on
    /// the whole word so a concurrent `install_version` can never be
    /// raced into a torn update.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current & LOCK_BIT == LOCK_BIT {
                return false;
            }
            match self.0.compare_exchange_weak(
                current,
                current | LOCK_BIT,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Clears the flag bit without touching the version. Used only on
    /// the abort path, when a transaction releases locks it acquired
    /// during Phase 1 without ever reaching a write-back. Deliberately
    /// `fetch_and`, not `fetch_sub`: a `fetch_sub(1)` here would corrupt
    /// the version field if called against a lock that is concurrently
    /// being snapshotted mid-version-install.
    pub fn release(&self) {
        self.0.fetch_and(!LOCK_BIT, Ordering::Release);
    }

    /// Installs a new version and releases the lock in the same atomic
    /// store: `v << 1` both clears bit 0 and publishes the version.
    /// Precondition: caller holds the lock.
    pub fn install_version(&self, version: u64) {
        self.0.store(version << 1, Ordering::Release);
    }

    /// Atomic snapshot of the raw cell.
    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot(self.0.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unlocked_at_version_zero() {
        let lock = VersionedLock::new();
        let snap = lock.snapshot();
        assert!(!snap.is_locked());
        assert_eq!(snap.version(), 0);
    }

    #[test]
    fn try_acquire_is_exclusive() {
        let lock = VersionedLock::new();
        assert!(lock.try_acquire());
        assert!(!lock.try_acquire(), "second acquire must fail while held");
    }

    #[test]
    fn release_clears_flag_and_preserves_version() {
        let lock = VersionedLock::new();
        lock.install_version(7);
        assert!(lock.try_acquire());
        lock.release();
        let snap = lock.snapshot();
        assert!(!snap.is_locked());
        assert_eq!(snap.version(), 7);
    }

    #[test]
    fn install_version_releases_and_publishes() {
        let lock = VersionedLock::new();
        assert!(lock.try_acquire());
        lock.install_version(42);
        let snap = lock.snapshot();
        assert!(!snap.is_locked());
        assert_eq!(snap.version(), 42);
    }

    #[test]
    fn versions_strictly_increase_across_installs() {
        let lock = VersionedLock::new();
        let mut last = 0;
        for v in [1u64, 5, 9, 100] {
            assert!(lock.try_acquire());
            lock.install_version(v);
            let observed = lock.snapshot().version();
            assert!(observed > last);
            last = observed;
        }
    }
}
