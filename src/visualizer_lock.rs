//! Scoped access to the system-wide exclusive visualizer capture.
//!
//! Acquiring the lock only keeps other consumers off the stream; the pulse
//! works without it. A failed acquire is logged and the guard is handed out
//! anyway; only a guard that actually acquired releases on drop, so a
//! losing contender never frees another holder's lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::PulseError;

pub trait VisualizerLock: Send + Sync {
    fn acquire(&self) -> Result<(), PulseError>;

    /// Only called after a successful `acquire`
    fn release(&self) -> Result<(), PulseError>;
}

/// Releases the lock when dropped, if it was acquired
pub struct VisualizerLockGuard {
    lock: Arc<dyn VisualizerLock>,
    acquired: bool,
}

impl VisualizerLockGuard {
    /// Best-effort acquire. Never fails.
    pub fn acquire(lock: Arc<dyn VisualizerLock>) -> Self {
        let acquired = match lock.acquire() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("[Pulse] Visualizer lock not acquired, continuing unlocked: {}", e);
                false
            }
        };
        Self { lock, acquired }
    }

    /// Whether the underlying acquire succeeded
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }
}

impl Drop for VisualizerLockGuard {
    fn drop(&mut self) {
        if !self.acquired {
            return;
        }
        if let Err(e) = self.lock.release() {
            tracing::debug!("[Pulse] Visualizer lock release ignored: {}", e);
        }
    }
}

/// In-process exclusive flag for hosts without a platform lock service
#[derive(Default)]
pub struct ExclusiveFlagLock {
    held: AtomicBool,
}

impl ExclusiveFlagLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl VisualizerLock for ExclusiveFlagLock {
    fn acquire(&self) -> Result<(), PulseError> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| PulseError::LockUnavailable("visualizer already captured".to_string()))
    }

    fn release(&self) -> Result<(), PulseError> {
        self.held.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = Arc::new(ExclusiveFlagLock::new());

        let guard = VisualizerLockGuard::acquire(lock.clone());
        assert!(guard.is_acquired());
        assert!(lock.is_held());

        drop(guard);
        assert!(!lock.is_held());
    }

    #[test]
    fn test_second_acquire_fails_but_still_hands_out_guard() {
        let lock = Arc::new(ExclusiveFlagLock::new());
        let first = VisualizerLockGuard::acquire(lock.clone());
        let second = VisualizerLockGuard::acquire(lock.clone());

        assert!(first.is_acquired());
        assert!(!second.is_acquired());

        drop(first);
        drop(second);
        assert!(!lock.is_held());
    }

    #[test]
    fn test_failed_guard_drop_keeps_holder_exclusive() {
        let lock = Arc::new(ExclusiveFlagLock::new());
        let first = VisualizerLockGuard::acquire(lock.clone());
        let second = VisualizerLockGuard::acquire(lock.clone());

        drop(second);
        assert!(lock.is_held(), "failed guard released the holder's lock");

        // Still exclusive: a third contender is turned away too
        let third = VisualizerLockGuard::acquire(lock.clone());
        assert!(!third.is_acquired());
        drop(third);
        assert!(lock.is_held());

        drop(first);
        assert!(!lock.is_held());
    }
}
