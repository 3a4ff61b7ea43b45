//! Desktop stand-in for the platform visualizer stream.
//!
//! PCM frames are windowed, run through a real FFT and packed into the
//! signed-byte layout the pulse core consumes:
//!   [0] = Re(DC), [1] = Re(Nyquist), [2k] = Re(k), [2k+1] = Im(k)

use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::controller::AudioStreamSource;
use crate::error::{PulseError, StreamError};

pub const DEFAULT_CAPTURE_SIZE: usize = 1024;

/// Raw interleaved PCM plus metadata
#[derive(Clone, Debug)]
pub struct PcmFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFrame {
    /// Average all channels down to mono
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }

    /// Duration of the frame in seconds
    pub fn duration_secs(&self) -> f32 {
        let channels = self.channels.max(1) as usize;
        let num_samples = self.samples.len() / channels;
        num_samples as f32 / self.sample_rate as f32
    }
}

/// PCM window -> visualizer FFT bytes
pub struct FftByteEncoder {
    capture_size: usize,

    // FFT State (reusable, no per-frame allocation)
    fft: Arc<dyn RealToComplex<f32>>,
    input_buffer: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch_buffer: Vec<Complex<f32>>,
    output: Vec<i8>,

    // Hann Window (precomputed, never changes)
    hann_window: Vec<f32>,
}

impl FftByteEncoder {
    pub fn new(capture_size: usize) -> Result<Self, StreamError> {
        if capture_size < 64 || !capture_size.is_power_of_two() {
            return Err(StreamError::CaptureSize(capture_size));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(capture_size);

        let input_buffer = vec![0.0; capture_size];
        let spectrum = fft.make_output_vec();
        let scratch_buffer = fft.make_scratch_vec();

        Ok(Self {
            capture_size,
            fft,
            input_buffer,
            spectrum,
            scratch_buffer,
            output: vec![0; capture_size],
            hann_window: Self::compute_hann_window(capture_size),
        })
    }

    pub fn capture_size(&self) -> usize {
        self.capture_size
    }

    /// Encode one mono window. Shorter input is zero-padded.
    pub fn encode(&mut self, mono: &[f32]) -> Result<&[i8], StreamError> {
        if mono.len() > self.capture_size {
            return Err(StreamError::WindowSize {
                expected: self.capture_size,
                actual: mono.len(),
            });
        }

        self.apply_window(mono);

        self.fft
            .process_with_scratch(&mut self.input_buffer, &mut self.spectrum, &mut self.scratch_buffer)
            .map_err(|e| StreamError::Fft(e.to_string()))?;

        // Full-scale sine under a Hann window peaks near n/4
        let scale = 4.0 * i8::MAX as f32 / self.capture_size as f32;
        let quantize = |v: f32| (v * scale).round().clamp(i8::MIN as f32, i8::MAX as f32) as i8;

        let half = self.capture_size / 2;
        self.output[0] = quantize(self.spectrum[0].re);
        self.output[1] = quantize(self.spectrum[half].re);
        for k in 1..half {
            self.output[2 * k] = quantize(self.spectrum[k].re);
            self.output[2 * k + 1] = quantize(self.spectrum[k].im);
        }

        Ok(&self.output)
    }

    fn compute_hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let angle = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - angle.cos())
            })
            .collect()
    }

    fn apply_window(&mut self, samples: &[f32]) {
        let len = samples.len().min(self.capture_size);

        for i in 0..len {
            self.input_buffer[i] = samples[i] * self.hann_window[i];
        }

        // zero-pad
        for i in len..self.capture_size {
            self.input_buffer[i] = 0.0;
        }
    }
}

/// Stream source whose "subscription" is a shared gate flag.
///
/// The producer thread checks the gate and only sends frames while linked.
#[derive(Default)]
pub struct GatedStreamSource {
    gate: Arc<AtomicBool>,
    session_id: Option<i32>,
}

impl GatedStreamSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the producer side
    pub fn gate(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.gate)
    }

    pub fn is_linked(&self) -> bool {
        self.gate.load(Ordering::Acquire)
    }

    pub fn session_id(&self) -> Option<i32> {
        self.session_id
    }
}

impl AudioStreamSource for GatedStreamSource {
    fn link_stream(&mut self, session_id: i32) -> Result<(), PulseError> {
        self.session_id = Some(session_id);
        self.gate.store(true, Ordering::Release);
        tracing::debug!("[Stream] Gate open for session {}", session_id);
        Ok(())
    }

    fn unlink_stream(&mut self) {
        self.session_id = None;
        self.gate.store(false, Ordering::Release);
        tracing::debug!("[Stream] Gate closed");
    }
}

/// Sine source with optional on/off bursts, for driving the demo hosts
pub struct ToneGenerator {
    sample_rate: f32,
    frequency: f32,
    amplitude: f32,
    phase: f32,

    /// (audible, silent) run lengths in samples; `None` plays continuously
    pattern: Option<(usize, usize)>,
    position: usize,
}

impl ToneGenerator {
    pub fn new(sample_rate: u32, frequency: f32, amplitude: f32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            frequency,
            amplitude,
            phase: 0.0,
            pattern: None,
            position: 0,
        }
    }

    /// Alternate `audible_ms` of tone with `silent_ms` of silence
    pub fn with_bursts(mut self, audible_ms: u32, silent_ms: u32) -> Self {
        let to_samples = |ms: u32| (self.sample_rate * ms as f32 / 1000.0) as usize;
        self.pattern = Some((to_samples(audible_ms).max(1), to_samples(silent_ms)));
        self
    }

    pub fn next_frame(&mut self, len: usize) -> PcmFrame {
        let step = 2.0 * std::f32::consts::PI * self.frequency / self.sample_rate;
        let mut samples = Vec::with_capacity(len);

        for _ in 0..len {
            let audible = match self.pattern {
                Some((on, off)) => self.position % (on + off) < on,
                None => true,
            };
            samples.push(if audible { self.amplitude * self.phase.sin() } else { 0.0 });

            self.phase = (self.phase + step) % (2.0 * std::f32::consts::PI);
            self.position = self.position.wrapping_add(1);
        }

        PcmFrame {
            samples,
            sample_rate: self.sample_rate as u32,
            channels: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_conversion() {
        let frame = PcmFrame {
            samples: vec![0.5, 0.3, 0.7, 0.1],
            sample_rate: 48000,
            channels: 2,
        };

        let mono = frame.to_mono();
        assert_eq!(mono.len(), 2);
        assert_eq!(mono[0], (0.5 + 0.3) / 2.0);
        assert_eq!(mono[1], (0.7 + 0.1) / 2.0);
        assert_eq!(frame.duration_secs(), 2.0 / 48000.0);
    }

    #[test]
    fn test_hann_window() {
        let window = FftByteEncoder::compute_hann_window(1024);
        let epsilon = 1e-5;

        assert!(window[0].abs() < epsilon, "Window start was {}", window[0]);
        assert!(window[1023].abs() < epsilon, "Window end was {}", window[1023]);
        assert!((window[512] - 1.0).abs() < 1e-3, "Window peak was {}", window[512]);
    }

    #[test]
    fn test_rejects_bad_capture_size() {
        assert!(matches!(FftByteEncoder::new(1000), Err(StreamError::CaptureSize(1000))));
        assert!(matches!(FftByteEncoder::new(32), Err(StreamError::CaptureSize(32))));
        assert!(FftByteEncoder::new(256).is_ok());
    }

    #[test]
    fn test_silence_encodes_to_zero() {
        let mut encoder = FftByteEncoder::new(256).unwrap();
        let bytes = encoder.encode(&[0.0; 256]).unwrap();
        assert_eq!(bytes.len(), 256);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_tone_lands_in_its_bin() {
        let n = 256;
        let sample_rate = 48000;
        let bin = 8;
        let frequency = bin as f32 * sample_rate as f32 / n as f32;

        let mut tone = ToneGenerator::new(sample_rate, frequency, 0.8);
        let pcm = tone.next_frame(n);

        let mut encoder = FftByteEncoder::new(n).unwrap();
        let bytes = encoder.encode(&pcm.samples).unwrap();

        let power = |k: usize| {
            let re = bytes[2 * k] as i32;
            let im = bytes[2 * k + 1] as i32;
            re * re + im * im
        };
        let loudest = (1..n / 2).max_by_key(|&k| power(k)).unwrap();
        assert_eq!(loudest, bin);
        assert!(power(bin) > 100);
    }

    #[test]
    fn test_oversized_window_rejected() {
        let mut encoder = FftByteEncoder::new(64).unwrap();
        let err = encoder.encode(&[0.0; 65]).unwrap_err();
        assert!(matches!(err, StreamError::WindowSize { expected: 64, actual: 65 }));
    }

    #[test]
    fn test_burst_pattern_goes_quiet() {
        // 10 ms on, 10 ms off at 1 kHz sample rate = 10 samples each
        let mut tone = ToneGenerator::new(1000, 50.0, 1.0).with_bursts(10, 10);
        let frame = tone.next_frame(20);
        assert!(frame.samples[..10].iter().any(|s| s.abs() > 0.1));
        assert!(frame.samples[10..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_gate_follows_link_state() {
        let mut source = GatedStreamSource::new();
        let gate = source.gate();
        assert!(!gate.load(Ordering::Acquire));

        source.link_stream(0).unwrap();
        assert!(gate.load(Ordering::Acquire));
        assert_eq!(source.session_id(), Some(0));

        source.unlink_stream();
        assert!(!source.is_linked());
        assert_eq!(source.session_id(), None);
    }
}
