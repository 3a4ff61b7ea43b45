use crossbeam_channel::Sender;
use mpris::{PlaybackStatus, PlayerFinder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{MediaMonitor, PlaybackTracker};
use crate::event::PulseEvent;

const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Polls the active MPRIS player over D-Bus
pub struct LinuxMediaMonitor;

impl LinuxMediaMonitor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinuxMediaMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaMonitor for LinuxMediaMonitor {
    fn start(&self, tx: Sender<PulseEvent>, shutdown: Arc<AtomicBool>) {
        std::thread::spawn(move || {
            let finder = match PlayerFinder::new() {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!("[Media/Linux] Failed to create PlayerFinder: {}", e);
                    return;
                }
            };

            tracing::info!("[Media/Linux] Monitor started");
            let mut tracker = PlaybackTracker::new();

            while !shutdown.load(Ordering::Relaxed) {
                // No active player counts as not playing
                let playing = finder
                    .find_active()
                    .ok()
                    .and_then(|player| player.get_playback_status().ok())
                    == Some(PlaybackStatus::Playing);

                if let Some(playing) = tracker.update(playing) {
                    tracing::debug!("[Media/Linux] Playing: {}", playing);
                    if tx.send(PulseEvent::MediaPlaying(playing)).is_err() {
                        break;
                    }
                }

                // Polling interval
                std::thread::sleep(POLL_INTERVAL);
            }

            tracing::info!("[Media/Linux] Monitor stopped");
        });
    }
}
