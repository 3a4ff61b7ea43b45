use crossbeam_channel::Sender;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::MediaMonitor;
use crate::event::PulseEvent;

/// Reports a fixed playback state once.
///
/// Used where no platform monitor exists, or to force the pulse on.
pub struct DummyMediaMonitor {
    assume_playing: bool,
}

impl DummyMediaMonitor {
    pub fn new(assume_playing: bool) -> Self {
        Self { assume_playing }
    }
}

impl Default for DummyMediaMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl MediaMonitor for DummyMediaMonitor {
    fn start(&self, tx: Sender<PulseEvent>, _shutdown: Arc<AtomicBool>) {
        tracing::info!("[Media] No playback monitor; assuming playing = {}", self.assume_playing);
        let _ = tx.send(PulseEvent::MediaPlaying(self.assume_playing));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_dummy_sends_fixed_state() {
        let (tx, rx) = unbounded();
        DummyMediaMonitor::new(true).start(tx, Arc::new(AtomicBool::new(false)));
        assert_eq!(rx.try_recv().ok(), Some(PulseEvent::MediaPlaying(true)));
        assert!(rx.try_recv().is_err());
    }
}
