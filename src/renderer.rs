//! Turns validated FFT byte windows into vertical line segments.

use crate::color::Color32;
use crate::color_animator::ColorAnimationListener;
use crate::config::{DashPattern, RenderConfig, ValidatorConfig};
use crate::stream_validator::{StreamValidator, ValidityState};

/// Paint alpha, applied regardless of the supplied color's own alpha
pub const PULSE_ALPHA: u8 = 124;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// One bar: (x0, y0) on the bottom edge up to (x1, y1)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    pub color: Color32,
    pub stroke_width: f32,
    pub dash: Option<DashPattern>,
}

/// What a `render()` call did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Validity edge caused by this window, if any
    pub stream_edge: Option<bool>,

    /// Number of segments produced (0 when the stream isn't valid)
    pub segments: usize,
}

pub struct Renderer {
    config: RenderConfig,
    validator: StreamValidator,
    paint: Paint,

    /// Color picked by the user, restored when the lava lamp stops
    user_color: Color32,

    // Reused between frames
    segments: Vec<LineSegment>,
}

impl Renderer {
    pub fn new(config: RenderConfig, validator: ValidatorConfig, color: Color32) -> Self {
        let paint = Paint {
            color: color.with_alpha(PULSE_ALPHA),
            stroke_width: config.stroke_width,
            dash: config.dash,
        };

        Self {
            config,
            validator: StreamValidator::new(validator),
            paint,
            user_color: color,
            segments: Vec::new(),
        }
    }

    /// Validate `samples`, then map every `divisions`-th bin to a bar in `rect`.
    pub fn render(&mut self, samples: &[i8], rect: Rect) -> RenderOutcome {
        let stream_edge = self.validator.analyze(samples);
        self.segments.clear();

        if !self.validator.is_valid_stream() {
            return RenderOutcome { stream_edge, segments: 0 };
        }

        let divisions = self.config.divisions.max(1);
        let count = samples.len() / divisions;
        if count == 0 {
            return RenderOutcome { stream_edge, segments: 0 };
        }
        let spacing = rect.width() / count as f32;

        for i in 0..count {
            let base = divisions * i;
            let (Some(&re), Some(&im)) = (samples.get(base), samples.get(base + 1)) else {
                break;
            };

            let db = db_value(re, im);
            let x = rect.left + i as f32 * spacing;
            self.segments.push(LineSegment {
                x0: x,
                y0: rect.bottom,
                x1: x,
                y1: bar_top(db, rect, &self.config),
            });
        }

        RenderOutcome {
            stream_edge,
            segments: self.segments.len(),
        }
    }

    /// Segments from the last `render()` call
    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    pub fn paint(&self) -> &Paint {
        &self.paint
    }

    /// Set the paint color. Colors not coming from the animator also become
    /// the user color.
    pub fn set_color(&mut self, color: Color32, from_animator: bool) {
        if !from_animator {
            self.user_color = color;
        }
        self.paint.color = color.with_alpha(PULSE_ALPHA);
    }

    pub fn user_color(&self) -> Color32 {
        self.user_color
    }

    pub fn stream_validity(&self) -> ValidityState {
        self.validator.state()
    }

    pub fn is_valid_stream(&self) -> bool {
        self.validator.is_valid_stream()
    }

    /// Drop the stale frame and the validator's history
    pub fn reset(&mut self) {
        self.segments.clear();
        self.validator.reset();
    }
}

impl ColorAnimationListener for Renderer {
    fn on_color_changed(&mut self, color: Color32) {
        self.set_color(color, true);
    }

    fn on_stop_animation(&mut self, _last_color: Color32) {
        let user_color = self.user_color;
        self.set_color(user_color, true);
    }
}

/// Power of one bin in whole decibels; 0 for an empty bin
pub fn db_value(re: i8, im: i8) -> i32 {
    let re = re as f32;
    let im = im as f32;
    let magnitude = re * re + im * im;
    if magnitude > 0.0 {
        (10.0 * magnitude.log10()) as i32
    } else {
        0
    }
}

/// y coordinate of a bar's tip
pub fn bar_top(db: i32, rect: Rect, config: &RenderConfig) -> f32 {
    rect.top + rect.height() - (db as f32 * config.db_fuzz_factor + config.db_fuzz)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_validator() -> ValidatorConfig {
        ValidatorConfig {
            energy_threshold: 16,
            valid_frames: 1,
            invalid_frames: 2,
        }
    }

    fn renderer() -> Renderer {
        let config = RenderConfig {
            divisions: 4,
            ..RenderConfig::default()
        };
        Renderer::new(config, quick_validator(), Color32::WHITE)
    }

    /// 64 bytes with energy in a non-DC bin
    fn loud() -> Vec<i8> {
        let mut window = vec![0i8; 64];
        window[8] = 100;
        window[9] = 0;
        window
    }

    #[test]
    fn test_db_value() {
        assert_eq!(db_value(0, 0), 0);
        assert_eq!(db_value(10, 0), 20);
        assert_eq!(db_value(0, -10), 20);
        assert_eq!(db_value(100, 0), 40);
        // 10*log10(2) = 3.01 truncates to 3
        assert_eq!(db_value(1, 1), 3);
    }

    #[test]
    fn test_zero_magnitude_maps_to_height_minus_fuzz() {
        let config = RenderConfig::default();
        let rect = Rect::from_size(200.0, 48.0);
        assert_eq!(bar_top(0, rect, &config), 48.0 - config.db_fuzz);
    }

    #[test]
    fn test_render_valid_stream() {
        let mut renderer = renderer();
        let rect = Rect::from_size(160.0, 48.0);

        let outcome = renderer.render(&loud(), rect);
        assert_eq!(outcome.stream_edge, Some(true));
        assert_eq!(outcome.segments, 16);

        let segments = renderer.segments();
        // Evenly spaced across the width, anchored on the bottom edge
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.x0, i as f32 * 10.0);
            assert_eq!(seg.x0, seg.x1);
            assert_eq!(seg.y0, 48.0);
        }

        // Bin at byte 8 is segment 2: 40 dB -> 48 - (40*2 - 10)
        assert_eq!(segments[2].y1, 48.0 - 70.0);
        // Silent bins all sit at the same height
        assert_eq!(segments[1].y1, 58.0);
        assert_eq!(segments[3].y1, 58.0);
    }

    #[test]
    fn test_render_respects_rect_offset() {
        let mut renderer = renderer();
        let rect = Rect {
            left: 20.0,
            top: 100.0,
            right: 180.0,
            bottom: 148.0,
        };
        renderer.render(&loud(), rect);

        let first = renderer.segments()[0];
        assert_eq!(first.x0, 20.0);
        assert_eq!(first.y0, 148.0);
        assert_eq!(first.y1, 158.0);
    }

    #[test]
    fn test_invalid_stream_renders_nothing() {
        let mut renderer = renderer();
        let rect = Rect::from_size(160.0, 48.0);
        renderer.render(&loud(), rect);
        assert!(!renderer.segments().is_empty());

        let silent = vec![0i8; 64];
        let first = renderer.render(&silent, rect);
        // One silent window isn't enough to invalidate; still drawing
        assert_eq!(first.stream_edge, None);
        assert_eq!(first.segments, 16);

        let second = renderer.render(&silent, rect);
        assert_eq!(second.stream_edge, Some(false));
        assert_eq!(second.segments, 0);
        assert!(renderer.segments().is_empty());
    }

    #[test]
    fn test_identical_bins_identical_heights() {
        let mut renderer = renderer();
        let rect = Rect::from_size(160.0, 48.0);

        // Every sampled bin carries the same (re, im)
        let mut window = vec![0i8; 64];
        for i in 0..16 {
            window[i * 4] = 12;
            window[i * 4 + 1] = 5;
        }
        renderer.render(&window, rect);

        let heights: Vec<f32> = renderer.segments().iter().map(|s| s.y1).collect();
        assert!(heights.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_paint_alpha_is_fixed() {
        let mut renderer = renderer();
        assert_eq!(renderer.paint().color.a, PULSE_ALPHA);

        renderer.set_color(Color32::from_rgba(10, 20, 30, 255), false);
        assert_eq!(renderer.paint().color, Color32::from_rgba(10, 20, 30, PULSE_ALPHA));

        renderer.set_color(Color32::from_rgba(1, 2, 3, 0), true);
        assert_eq!(renderer.paint().color.a, PULSE_ALPHA);
    }

    #[test]
    fn test_animator_colors_do_not_replace_user_color() {
        let mut renderer = renderer();
        renderer.set_color(Color32::RED, false);

        renderer.on_color_changed(Color32::BLUE);
        assert_eq!(renderer.paint().color, Color32::BLUE.with_alpha(PULSE_ALPHA));
        assert_eq!(renderer.user_color(), Color32::RED);

        renderer.on_stop_animation(Color32::BLUE);
        assert_eq!(renderer.paint().color, Color32::RED.with_alpha(PULSE_ALPHA));
    }

    #[test]
    fn test_reset_clears_frame_and_validity() {
        let mut renderer = renderer();
        renderer.render(&loud(), Rect::from_size(160.0, 48.0));
        assert!(renderer.is_valid_stream());

        renderer.reset();
        assert!(renderer.segments().is_empty());
        assert_eq!(renderer.stream_validity(), ValidityState::Unknown);
    }
}
