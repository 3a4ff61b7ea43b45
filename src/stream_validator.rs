//! Decides whether a linked FFT stream actually carries audible signal.
//!
//! A media session that reports "playing" is not proof of sound (silent
//! tracks, stalled streams). The validator watches the byte windows and only
//! declares the stream valid after a run of energetic windows.

use crate::config::ValidatorConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidityState {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

pub type StreamAnalyzedCallback = Box<dyn FnMut(bool) + Send>;

pub struct StreamValidator {
    config: ValidatorConfig,
    state: ValidityState,

    // Run lengths of the current streak; only one is ever non-zero
    energetic_run: u32,
    silent_run: u32,

    on_stream_analyzed: Option<StreamAnalyzedCallback>,
}

impl StreamValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            state: ValidityState::Unknown,
            energetic_run: 0,
            silent_run: 0,
            on_stream_analyzed: None,
        }
    }

    /// Register the edge-triggered validity callback
    pub fn set_on_stream_analyzed(&mut self, callback: impl FnMut(bool) + Send + 'static) {
        self.on_stream_analyzed = Some(Box::new(callback));
    }

    /// Feed one window of interleaved (re, im) signed byte bins.
    ///
    /// Returns `Some(valid)` when the decided state changed with this window,
    /// `None` otherwise.
    pub fn analyze(&mut self, samples: &[i8]) -> Option<bool> {
        if Self::window_energy(samples) > self.config.energy_threshold {
            self.energetic_run = self.energetic_run.saturating_add(1);
            self.silent_run = 0;
        } else {
            self.silent_run = self.silent_run.saturating_add(1);
            self.energetic_run = 0;
        }

        let decided = if self.energetic_run >= self.config.valid_frames {
            ValidityState::Valid
        } else if self.silent_run >= self.config.invalid_frames {
            ValidityState::Invalid
        } else {
            return None;
        };

        if decided == self.state {
            return None;
        }

        tracing::debug!("[Stream] Validity {:?} -> {:?}", self.state, decided);
        self.state = decided;

        let valid = decided == ValidityState::Valid;
        if let Some(callback) = self.on_stream_analyzed.as_mut() {
            callback(valid);
        }
        Some(valid)
    }

    pub fn is_valid_stream(&self) -> bool {
        self.state == ValidityState::Valid
    }

    pub fn state(&self) -> ValidityState {
        self.state
    }

    /// Forget everything seen so far
    pub fn reset(&mut self) {
        self.state = ValidityState::Unknown;
        self.energetic_run = 0;
        self.silent_run = 0;
    }

    /// Summed squared magnitude of every bin except the first pair,
    /// which carries the DC and Nyquist real parts.
    fn window_energy(samples: &[i8]) -> u64 {
        samples
            .chunks_exact(2)
            .skip(1)
            .map(|bin| {
                let re = bin[0] as i64;
                let im = bin[1] as i64;
                (re * re + im * im) as u64
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn loud() -> Vec<i8> {
        let mut window = vec![0i8; 64];
        window[4] = 40;
        window[5] = -30;
        window
    }

    fn silent() -> Vec<i8> {
        vec![0i8; 64]
    }

    fn config() -> ValidatorConfig {
        ValidatorConfig {
            energy_threshold: 16,
            valid_frames: 2,
            invalid_frames: 3,
        }
    }

    #[test]
    fn test_starts_unknown() {
        let validator = StreamValidator::new(config());
        assert_eq!(validator.state(), ValidityState::Unknown);
        assert!(!validator.is_valid_stream());
    }

    #[test]
    fn test_becomes_valid_after_consecutive_energy() {
        let mut validator = StreamValidator::new(config());

        assert_eq!(validator.analyze(&loud()), None);
        assert_eq!(validator.analyze(&loud()), Some(true));
        assert!(validator.is_valid_stream());

        // Stable input: no further edges
        for _ in 0..10 {
            assert_eq!(validator.analyze(&loud()), None);
        }
    }

    #[test]
    fn test_dc_only_window_is_silent() {
        let mut validator = StreamValidator::new(config());
        let mut dc = silent();
        dc[0] = 127;
        dc[1] = 127;

        for _ in 0..5 {
            validator.analyze(&dc);
        }
        assert_eq!(validator.state(), ValidityState::Invalid);
    }

    #[test]
    fn test_short_silence_does_not_invalidate() {
        let mut validator = StreamValidator::new(config());
        validator.analyze(&loud());
        validator.analyze(&loud());

        // Two silent windows (< invalid_frames) then sound again
        assert_eq!(validator.analyze(&silent()), None);
        assert_eq!(validator.analyze(&silent()), None);
        assert_eq!(validator.analyze(&loud()), None);
        assert!(validator.is_valid_stream());
    }

    #[test]
    fn test_callback_fires_once_per_edge() {
        let edges = Arc::new(Mutex::new(Vec::new()));
        let sink = edges.clone();

        let mut validator = StreamValidator::new(config());
        validator.set_on_stream_analyzed(move |valid| sink.lock().unwrap().push(valid));

        for _ in 0..5 {
            validator.analyze(&loud());
        }
        for _ in 0..10 {
            validator.analyze(&silent());
        }
        for _ in 0..5 {
            validator.analyze(&loud());
        }

        assert_eq!(*edges.lock().unwrap(), vec![true, false, true]);
    }

    #[test]
    fn test_unknown_to_invalid_edge() {
        let mut validator = StreamValidator::new(config());
        assert_eq!(validator.analyze(&silent()), None);
        assert_eq!(validator.analyze(&silent()), None);
        assert_eq!(validator.analyze(&silent()), Some(false));
        assert_eq!(validator.analyze(&silent()), None);
    }

    #[test]
    fn test_reset_returns_to_unknown() {
        let mut validator = StreamValidator::new(config());
        validator.analyze(&loud());
        validator.analyze(&loud());
        assert!(validator.is_valid_stream());

        validator.reset();
        assert_eq!(validator.state(), ValidityState::Unknown);

        // Needs a full run again, and the re-validation is an edge
        assert_eq!(validator.analyze(&loud()), None);
        assert_eq!(validator.analyze(&loud()), Some(true));
    }

    #[test]
    fn test_empty_window_counts_as_silence() {
        let mut validator = StreamValidator::new(config());
        for _ in 0..3 {
            validator.analyze(&[]);
        }
        assert_eq!(validator.state(), ValidityState::Invalid);
    }
}
