//! Pulse linkage state machine.
//!
//! The controller owns the decision of when the audio visualization stream
//! is linked to the drawing surface. Every signal input replaces the
//! `SignalSnapshot` and re-evaluates the transition rule once.
//!
//! Threading: everything here runs on the host's single UI/event thread.
//! There is no internal locking; producers on other threads must funnel
//! through a channel (see `PulseEvent`).

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::color::Color32;
use crate::color_animator::{ColorAnimator, DEFAULT_FROM_COLOR, DEFAULT_TO_COLOR};
use crate::config::PulseConfig;
use crate::error::PulseError;
use crate::event::PulseEvent;
use crate::renderer::{LineSegment, Paint, Rect, Renderer};
use crate::stream_validator::ValidityState;
use crate::visualizer_lock::{VisualizerLock, VisualizerLockGuard};

/// Session id of the global output mix
pub const OUTPUT_MIX_SESSION: i32 = 0;

/// The drawing surface side of the host
pub trait PulseHost {
    fn drawable_width(&self) -> f32;
    fn drawable_height(&self) -> f32;

    /// Request a redraw
    fn invalidate(&mut self);

    /// Return true to run an entry transition first. The host must then call
    /// `PulseController::turn_on_pulse` itself when done.
    fn on_start_pulse(&mut self, transition: &PulseTransition) -> bool;

    fn on_stop_pulse(&mut self, transition: &PulseTransition);
}

/// Source of the raw FFT stream. Frames are delivered through
/// `PulseController::on_stream_frame` while linked.
pub trait AudioStreamSource {
    fn link_stream(&mut self, session_id: i32) -> Result<(), PulseError>;
    fn unlink_stream(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    Start,
    Stop,
}

/// Handed to the host so it can animate pulse entry/exit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseTransition {
    pub kind: TransitionKind,
    pub duration: Duration,
}

impl PulseTransition {
    pub fn start(duration: Duration) -> Self {
        Self { kind: TransitionKind::Start, duration }
    }

    pub fn stop(duration: Duration) -> Self {
        Self { kind: TransitionKind::Stop, duration }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Unlinked,
    Linked,
}

/// Latest value of every external signal. Replaced wholesale on each input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalSnapshot {
    pub keyguard_showing: bool,
    pub screen_on: bool,
    pub pulse_enabled: bool,
    pub power_save_enabled: bool,
    pub media_playing: bool,
}

impl Default for SignalSnapshot {
    fn default() -> Self {
        Self {
            keyguard_showing: false,
            screen_on: true,
            pulse_enabled: false,
            power_save_enabled: false,
            media_playing: false,
        }
    }
}

impl SignalSnapshot {
    pub fn must_unlink(&self) -> bool {
        self.keyguard_showing || !self.screen_on || !self.pulse_enabled || self.power_save_enabled
    }

    pub fn can_link(&self, state: LinkState) -> bool {
        self.pulse_enabled
            && self.screen_on
            && self.media_playing
            && state == LinkState::Unlinked
            && !self.power_save_enabled
            && !self.keyguard_showing
    }
}

/// How an unlink is carried out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnlinkKind {
    /// Release everything, stop the lava lamp, run the host's stop transition
    Notify,

    /// Release the stream and lock only. Used when the stream goes invalid
    /// while everything else is still eligible, so the host sees no flicker.
    Silent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Link,
    Unlink(UnlinkKind),
}

/// What the host should draw right now
pub struct Frame<'a> {
    pub segments: &'a [LineSegment],
    pub paint: &'a Paint,
}

/// Everything that lives exactly as long as an attached drawing surface
struct Surface<H> {
    host: H,
    renderer: Renderer,
    animator: ColorAnimator,
}

pub struct PulseController<H: PulseHost, S: AudioStreamSource> {
    config: PulseConfig,
    snapshot: SignalSnapshot,
    link_state: LinkState,
    session_id: i32,

    // Per-user render settings
    lava_lamp_enabled: bool,
    lava_lamp_speed_ms: u64,
    user_color: Color32,

    stream: S,
    lock: Arc<dyn VisualizerLock>,
    lock_guard: Option<VisualizerLockGuard>,

    surface: Option<Surface<H>>,

    /// Frames go to the host only after `turn_on_pulse`
    drawing: bool,
    disposed: bool,
}

impl<H: PulseHost, S: AudioStreamSource> PulseController<H, S> {
    pub fn new(config: PulseConfig, stream: S, lock: Arc<dyn VisualizerLock>) -> Self {
        let snapshot = SignalSnapshot {
            pulse_enabled: config.settings.pulse_enabled,
            ..SignalSnapshot::default()
        };

        Self {
            snapshot,
            link_state: LinkState::Unlinked,
            session_id: OUTPUT_MIX_SESSION,
            lava_lamp_enabled: config.settings.lava_lamp_enabled,
            lava_lamp_speed_ms: config.settings.lava_lamp_speed_ms.max(1),
            user_color: config.initial_color(),
            stream,
            lock,
            lock_guard: None,
            surface: None,
            drawing: false,
            disposed: false,
            config,
        }
    }

    pub fn with_session_id(mut self, session_id: i32) -> Self {
        self.session_id = session_id;
        self
    }

    // ====================================================================
    // SIGNAL INPUTS
    // ====================================================================

    pub fn keyguard_showing_changed(&mut self, showing: bool) {
        self.apply_snapshot(SignalSnapshot { keyguard_showing: showing, ..self.snapshot });
    }

    pub fn screen_on_changed(&mut self, on: bool) {
        self.apply_snapshot(SignalSnapshot { screen_on: on, ..self.snapshot });
    }

    pub fn pulse_enabled_changed(&mut self, enabled: bool) {
        self.apply_snapshot(SignalSnapshot { pulse_enabled: enabled, ..self.snapshot });
    }

    pub fn power_save_mode_changed(&mut self, enabled: bool) {
        self.apply_snapshot(SignalSnapshot { power_save_enabled: enabled, ..self.snapshot });
    }

    pub fn media_playing_changed(&mut self, playing: bool) {
        self.apply_snapshot(SignalSnapshot { media_playing: playing, ..self.snapshot });
    }

    /// Re-run the transition rule without a signal change
    pub fn refresh(&mut self) {
        if self.disposed {
            return;
        }
        self.evaluate();
    }

    fn apply_snapshot(&mut self, next: SignalSnapshot) {
        if self.disposed {
            tracing::debug!("[Pulse] Ignoring signal after dispose: {:?}", next);
            return;
        }
        if next != self.snapshot {
            tracing::debug!("[Pulse] Signals: {:?}", next);
        }
        self.snapshot = next;
        self.evaluate();
    }

    // ====================================================================
    // PER-USER RENDER SETTINGS
    // ====================================================================

    pub fn lava_lamp_changed(&mut self, enabled: bool) {
        self.lava_lamp_enabled = enabled;
        let linked = self.link_state == LinkState::Linked;
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        if enabled {
            if linked && !surface.animator.is_running() {
                surface.animator.start(Instant::now(), &mut surface.renderer);
            }
        } else {
            surface.animator.stop(&mut surface.renderer);
        }

        if self.drawing {
            surface.host.invalidate();
        }
    }

    pub fn lava_lamp_speed_changed(&mut self, millis: u64) {
        self.lava_lamp_speed_ms = millis.max(1);
        if let Some(surface) = self.surface.as_mut() {
            surface
                .animator
                .set_animation_time(self.lava_lamp_speed_ms, Instant::now(), &mut surface.renderer);
        }
    }

    pub fn user_color_changed(&mut self, color: Color32) {
        self.user_color = color;
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        surface.renderer.set_color(color, false);
        if surface.animator.is_running() {
            // Keep showing the lava lamp; the user color comes back on stop
            surface.renderer.set_color(surface.animator.current_color(), true);
        }
        if self.drawing {
            surface.host.invalidate();
        }
    }

    // ====================================================================
    // SURFACE LIFECYCLE
    // ====================================================================

    /// A drawing surface appeared. Builds the renderer and animator for it.
    pub fn attach_surface(&mut self, host: H) {
        if self.disposed {
            tracing::warn!("[Pulse] attach_surface after dispose ignored");
            return;
        }
        if self.surface.is_some() {
            self.detach_surface();
        }

        let renderer = Renderer::new(
            self.config.render.clone(),
            self.config.validator.clone(),
            self.user_color,
        );
        let animator = ColorAnimator::new(DEFAULT_FROM_COLOR, DEFAULT_TO_COLOR, self.lava_lamp_speed_ms);

        self.surface = Some(Surface { host, renderer, animator });
        tracing::info!("[Pulse] Surface attached");
        self.evaluate();
    }

    /// The surface is going away: release the stream and hand the host back.
    /// No stop transition runs since there is nothing left to animate on.
    pub fn detach_surface(&mut self) -> Option<H> {
        if self.link_state == LinkState::Linked {
            self.stream.unlink_stream();
            self.lock_guard = None;
            self.link_state = LinkState::Unlinked;
        }
        self.drawing = false;

        let mut surface = self.surface.take()?;
        surface.animator.stop(&mut surface.renderer);
        tracing::info!("[Pulse] Surface detached");
        Some(surface.host)
    }

    /// Host teardown: force a full unlink and stop reacting to signals
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if self.link_state == LinkState::Linked {
            self.unlink(UnlinkKind::Notify);
        }
        self.detach_surface();
        self.disposed = true;
        tracing::info!("[Pulse] Disposed");
    }

    // ====================================================================
    // STREAM & ANIMATION TICKS
    // ====================================================================

    /// One raw FFT window from the linked stream
    pub fn on_stream_frame(&mut self, samples: &[i8]) {
        if self.link_state != LinkState::Linked {
            return;
        }
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        let rect = Rect::from_size(surface.host.drawable_width(), surface.host.drawable_height());
        let outcome = surface.renderer.render(samples, rect);

        match outcome.stream_edge {
            Some(true) => self.start_pulse(),
            // Still eligible otherwise, so this ends in a silent unlink
            Some(false) => self.evaluate(),
            None => {
                if self.drawing {
                    surface.host.invalidate();
                }
            }
        }
    }

    pub fn on_animation_tick(&mut self, now: Instant) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if surface.animator.tick(now, &mut surface.renderer).is_some() && self.drawing {
            surface.host.invalidate();
        }
    }

    /// Completion step after the host's entry transition. Only starts
    /// drawing if the pulse is still enabled, linked and valid.
    pub fn turn_on_pulse(&mut self) {
        if !self.snapshot.pulse_enabled || !self.should_draw() {
            tracing::debug!("[Pulse] turn_on_pulse skipped (no longer eligible)");
            return;
        }
        self.drawing = true;
        if let Some(surface) = self.surface.as_mut() {
            surface.host.invalidate();
        }
    }

    /// Dispatch one host event. Returns false once `Shutdown` was handled.
    pub fn handle_event(&mut self, event: PulseEvent) -> bool {
        match event {
            PulseEvent::KeyguardShowing(showing) => self.keyguard_showing_changed(showing),
            PulseEvent::ScreenOn(on) => self.screen_on_changed(on),
            PulseEvent::PulseEnabled(enabled) => self.pulse_enabled_changed(enabled),
            PulseEvent::PowerSave(enabled) => self.power_save_mode_changed(enabled),
            PulseEvent::MediaPlaying(playing) => self.media_playing_changed(playing),
            PulseEvent::LavaLamp(enabled) => self.lava_lamp_changed(enabled),
            PulseEvent::LavaLampSpeed(millis) => self.lava_lamp_speed_changed(millis),
            PulseEvent::UserColor(color) => self.user_color_changed(color),
            PulseEvent::StreamFrame(samples) => self.on_stream_frame(&samples),
            PulseEvent::AnimationTick(now) => self.on_animation_tick(now),
            PulseEvent::TurnOnPulse => self.turn_on_pulse(),
            PulseEvent::Refresh => self.refresh(),
            PulseEvent::Shutdown => {
                self.dispose();
                return false;
            }
        }
        true
    }

    // ====================================================================
    // OBSERVERS
    // ====================================================================

    pub fn link_state(&self) -> LinkState {
        self.link_state
    }

    pub fn snapshot(&self) -> SignalSnapshot {
        self.snapshot
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn stream_validity(&self) -> ValidityState {
        self.surface
            .as_ref()
            .map(|s| s.renderer.stream_validity())
            .unwrap_or_default()
    }

    pub fn is_lava_lamp_running(&self) -> bool {
        self.surface.as_ref().is_some_and(|s| s.animator.is_running())
    }

    /// Segments and paint for the host's draw pass, while drawing
    pub fn frame(&self) -> Option<Frame<'_>> {
        if !self.drawing {
            return None;
        }
        self.surface.as_ref().map(|s| Frame {
            segments: s.renderer.segments(),
            paint: s.renderer.paint(),
        })
    }

    pub fn host(&self) -> Option<&H> {
        self.surface.as_ref().map(|s| &s.host)
    }

    pub fn host_mut(&mut self) -> Option<&mut H> {
        self.surface.as_mut().map(|s| &mut s.host)
    }

    pub fn stream_source(&self) -> &S {
        &self.stream
    }

    // ====================================================================
    // TRANSITIONS
    // ====================================================================

    /// The transition rule, in priority order. Exactly one action per call.
    fn next_transition(&self) -> Transition {
        let snapshot = self.snapshot;
        let linked = self.link_state == LinkState::Linked;

        if snapshot.must_unlink() {
            return if linked {
                Transition::Unlink(UnlinkKind::Notify)
            } else {
                Transition::Stay
            };
        }

        if snapshot.can_link(self.link_state) {
            return if self.surface.is_some() {
                Transition::Link
            } else {
                Transition::Stay
            };
        }

        if !linked {
            return Transition::Stay;
        }

        // Linked, not forced off, but no longer linkable
        if !snapshot.media_playing {
            Transition::Unlink(UnlinkKind::Notify)
        } else if self.stream_validity() == ValidityState::Invalid {
            Transition::Unlink(UnlinkKind::Silent)
        } else {
            Transition::Stay
        }
    }

    fn evaluate(&mut self) {
        match self.next_transition() {
            Transition::Stay => {}
            Transition::Link => self.link(),
            Transition::Unlink(kind) => self.unlink(kind),
        }
    }

    fn link(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        let guard = VisualizerLockGuard::acquire(Arc::clone(&self.lock));
        surface.renderer.reset();
        self.drawing = false;

        if let Err(e) = self.stream.link_stream(self.session_id) {
            // Guard drops here and releases the lock
            tracing::warn!("[Pulse] Link failed, staying unlinked: {}", e);
            return;
        }

        self.lock_guard = Some(guard);
        self.link_state = LinkState::Linked;
        tracing::info!("[Pulse] Linked (session {})", self.session_id);

        // A lava lamp that survived a silent unlink keeps its position
        if self.lava_lamp_enabled && !surface.animator.is_running() {
            surface.animator.start(Instant::now(), &mut surface.renderer);
        }
    }

    fn unlink(&mut self, kind: UnlinkKind) {
        self.stream.unlink_stream();
        self.lock_guard = None;
        self.link_state = LinkState::Unlinked;
        self.drawing = false;
        tracing::info!("[Pulse] Unlinked ({:?})", kind);

        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.renderer.reset();

        if kind == UnlinkKind::Notify {
            surface.animator.stop(&mut surface.renderer);
            surface.host.invalidate();
            surface
                .host
                .on_stop_pulse(&PulseTransition::stop(self.config.render.transition_duration()));
        }
    }

    fn start_pulse(&mut self) {
        let transition = PulseTransition::start(self.config.render.transition_duration());
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        let deferred = surface.host.on_start_pulse(&transition);
        if !deferred {
            self.turn_on_pulse();
        }
    }

    fn should_draw(&self) -> bool {
        self.link_state == LinkState::Linked
            && self.surface.as_ref().is_some_and(|s| s.renderer.is_valid_stream())
    }
}

impl<H: PulseHost, S: AudioStreamSource> Drop for PulseController<H, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
