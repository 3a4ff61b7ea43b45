//! Navigation-bar audio pulse.
//!
//! `PulseController` decides when the visualizer stream is linked to a
//! drawing surface, `Renderer` turns FFT windows into bar segments and
//! `ColorAnimator` drives the optional lava lamp color cycle.

pub mod color;
pub mod color_animator;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod logging;
pub mod media;
pub mod renderer;
pub mod stream;
pub mod stream_validator;
pub mod visualizer_lock;

pub use color::Color32;
pub use color_animator::{ColorAnimationListener, ColorAnimator};
pub use config::PulseConfig;
pub use controller::{
    AudioStreamSource, LinkState, PulseController, PulseHost, PulseTransition, SignalSnapshot,
};
pub use error::{ConfigError, PulseError, StreamError};
pub use event::PulseEvent;
pub use renderer::{LineSegment, Rect, Renderer};
pub use stream_validator::{StreamValidator, ValidityState};
pub use visualizer_lock::{ExclusiveFlagLock, VisualizerLock, VisualizerLockGuard};
