//! Media playback monitoring.
//!
//! A monitor runs on its own thread and reports whether anything is
//! playing as `PulseEvent::MediaPlaying`, only when that changes.

use crossbeam_channel::Sender;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::event::PulseEvent;

/// Trait for monitoring media state (Events)
pub trait MediaMonitor {
    /// Starts the background listener thread. It exits once `shutdown`
    /// is set or the receiving side hangs up.
    fn start(&self, tx: Sender<PulseEvent>, shutdown: Arc<AtomicBool>);
}

/// Collapses repeated playback polls into edges
#[derive(Debug, Default)]
pub struct PlaybackTracker {
    last: Option<bool>,
}

impl PlaybackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(playing)` when the state differs from the previous poll
    pub fn update(&mut self, playing: bool) -> Option<bool> {
        if self.last == Some(playing) {
            return None;
        }
        self.last = Some(playing);
        Some(playing)
    }
}

// ==============================================================
// OS SELECTION FACTORY
// ==============================================================

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub type PlatformMedia = linux::LinuxMediaMonitor;

mod dummy;
pub use dummy::DummyMediaMonitor;

#[cfg(not(target_os = "linux"))]
pub type PlatformMedia = dummy::DummyMediaMonitor;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_reports_first_poll() {
        let mut tracker = PlaybackTracker::new();
        assert_eq!(tracker.update(false), Some(false));
    }

    #[test]
    fn test_tracker_only_reports_changes() {
        let mut tracker = PlaybackTracker::new();
        assert_eq!(tracker.update(true), Some(true));
        assert_eq!(tracker.update(true), None);
        assert_eq!(tracker.update(true), None);
        assert_eq!(tracker.update(false), Some(false));
        assert_eq!(tracker.update(false), None);
        assert_eq!(tracker.update(true), Some(true));
    }
}
