use std::time::Instant;

use crate::color::Color32;

/// Everything a host can push into the controller thread.
///
/// Producer threads (media monitor, audio source, tick timer) send these
/// over a channel; the single owner thread hands them to
/// `PulseController::handle_event`.
#[derive(Clone, Debug, PartialEq)]
pub enum PulseEvent {
    KeyguardShowing(bool),
    ScreenOn(bool),
    PulseEnabled(bool),
    PowerSave(bool),
    MediaPlaying(bool),

    LavaLamp(bool),
    LavaLampSpeed(u64),
    UserColor(Color32),

    /// One raw FFT window from the linked stream
    StreamFrame(Vec<i8>),

    /// Color animation frame
    AnimationTick(Instant),

    /// Host finished its start-pulse transition
    TurnOnPulse,

    Refresh,
    Shutdown,
}
