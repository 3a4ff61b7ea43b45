use std::time::{Duration, Instant};

use crate::color::Color32;
use crate::config::DEFAULT_LAVA_LAMP_SPEED_MS;

/// Lava lamp endpoints
pub const DEFAULT_FROM_COLOR: Color32 = Color32::from_argb(0xFFFF8080);
pub const DEFAULT_TO_COLOR: Color32 = Color32::from_argb(0xFF8080FF);

/// Receives animation frames and start/stop notifications
pub trait ColorAnimationListener {
    fn on_color_changed(&mut self, color: Color32);

    fn on_start_animation(&mut self) {}

    fn on_stop_animation(&mut self, _last_color: Color32) {}
}

/// Endless, reversing HSV sweep between two colors.
///
/// The animator owns no timer. The host multiplexes `tick()` onto its UI
/// thread and passes the frame time in.
pub struct ColorAnimator {
    from: Color32,
    to: Color32,
    current: Color32,

    /// Length of one half-cycle (from -> to)
    duration: Duration,

    /// Set while running
    started_at: Option<Instant>,
}

impl Default for ColorAnimator {
    fn default() -> Self {
        Self::new(DEFAULT_FROM_COLOR, DEFAULT_TO_COLOR, DEFAULT_LAVA_LAMP_SPEED_MS)
    }
}

impl ColorAnimator {
    pub fn new(from: Color32, to: Color32, duration_ms: u64) -> Self {
        Self {
            from,
            to,
            current: from,
            duration: Duration::from_millis(duration_ms.max(1)),
            started_at: None,
        }
    }

    /// Begin a fresh 0 -> 1 sweep, restarting if already running
    pub fn start(&mut self, now: Instant, listener: &mut dyn ColorAnimationListener) {
        self.started_at = Some(now);
        self.current = self.from;
        listener.on_start_animation();
        listener.on_color_changed(self.current);
    }

    /// Halt and freeze `current_color()` at the last emitted value
    pub fn stop(&mut self, listener: &mut dyn ColorAnimationListener) {
        if self.started_at.take().is_some() {
            listener.on_stop_animation(self.current);
        }
    }

    /// Advance to `now`. Returns the new color while running.
    pub fn tick(
        &mut self,
        now: Instant,
        listener: &mut dyn ColorAnimationListener,
    ) -> Option<Color32> {
        let fraction = self.fraction_at(now)?;
        self.current = self.from.lerp_hsv(self.to, fraction);
        listener.on_color_changed(self.current);
        Some(self.current)
    }

    /// Change the half-cycle length. A running animation restarts from
    /// `from`; the in-flight position is dropped.
    pub fn set_animation_time(
        &mut self,
        millis: u64,
        now: Instant,
        listener: &mut dyn ColorAnimationListener,
    ) {
        self.duration = Duration::from_millis(millis.max(1));
        if self.is_running() {
            self.start(now, listener);
        }
    }

    /// Replace the endpoints, restarting a running animation
    pub fn set_colors(
        &mut self,
        from: Color32,
        to: Color32,
        now: Instant,
        listener: &mut dyn ColorAnimationListener,
    ) {
        self.from = from;
        self.to = to;
        if self.is_running() {
            self.start(now, listener);
        } else {
            self.current = from;
        }
    }

    pub fn current_color(&self) -> Color32 {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn animation_time(&self) -> Duration {
        self.duration
    }

    /// Position on the from -> to path: rises 0 -> 1 over the first
    /// half-cycle, falls back over the second, and so on.
    fn fraction_at(&self, now: Instant) -> Option<f32> {
        let started_at = self.started_at?;
        let elapsed = now.saturating_duration_since(started_at).as_secs_f64();
        let half_cycle = self.duration.as_secs_f64();

        let cycles = elapsed / half_cycle;
        let half_index = cycles.floor();
        let within = (cycles - half_index) as f32;

        if half_index as u64 % 2 == 0 {
            Some(within)
        } else {
            Some(1.0 - within)
        }
    }
}
