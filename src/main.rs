use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use pulsebar::controller::{Frame, PulseHost, PulseTransition};
use pulsebar::media::{DummyMediaMonitor, MediaMonitor, PlatformMedia};
use pulsebar::stream::{FftByteEncoder, GatedStreamSource, ToneGenerator, DEFAULT_CAPTURE_SIZE};
use pulsebar::{logging, ExclusiveFlagLock, PulseConfig, PulseController, PulseEvent};

const SAMPLE_RATE: u32 = 44_100;
const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Re-check eligibility this often so a silent unlink gets retried
const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Pretend navbar size in pixels
const BAR_WIDTH: f32 = 640.0;
const BAR_HEIGHT: f32 = 48.0;

const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

struct Args {
    config: Option<PathBuf>,
    assume_playing: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = Args {
            config: None,
            assume_playing: false,
        };
        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--assume-playing" => args.assume_playing = true,
                _ => args.config = Some(PathBuf::from(arg)),
            }
        }
        args
    }
}

// ========================================================================
// TERMINAL SURFACE
// ========================================================================
//    Draws the pulse as one line of block characters

struct TerminalHost {
    dirty: bool,
    tx: Sender<PulseEvent>,
}

impl TerminalHost {
    fn new(tx: Sender<PulseEvent>) -> Self {
        Self { dirty: false, tx }
    }
}

impl PulseHost for TerminalHost {
    fn drawable_width(&self) -> f32 {
        BAR_WIDTH
    }

    fn drawable_height(&self) -> f32 {
        BAR_HEIGHT
    }

    fn invalidate(&mut self) {
        self.dirty = true;
    }

    fn on_start_pulse(&mut self, transition: &PulseTransition) -> bool {
        // Play the "fade in" on another thread, then report back
        let tx = self.tx.clone();
        let duration = transition.duration;
        thread::spawn(move || {
            thread::sleep(duration);
            let _ = tx.send(PulseEvent::TurnOnPulse);
        });
        tracing::info!("[Host] Pulse starting ({:?} transition)", duration);
        true
    }

    fn on_stop_pulse(&mut self, transition: &PulseTransition) {
        tracing::info!("[Host] Pulse stopping ({:?} transition)", transition.duration);
        print!("\r\x1b[2K");
        let _ = std::io::stdout().flush();
    }
}

fn draw_line(frame: &Frame<'_>) -> String {
    let c = frame.paint.color;
    let bars: String = frame
        .segments
        .iter()
        .map(|seg| {
            let level = ((seg.y0 - seg.y1) / BAR_HEIGHT).clamp(0.0, 1.0);
            LEVELS[(level * (LEVELS.len() - 1) as f32).round() as usize]
        })
        .collect();

    format!("\r\x1b[38;2;{};{};{}m{}\x1b[0m", c.r, c.g, c.b, bars)
}

// ========================================================================
// TONE PRODUCER THREAD
// ========================================================================
//    Stands in for the platform visualizer: only delivers while gated open

fn start_tone_producer(tx: Sender<PulseEvent>, gate: Arc<AtomicBool>, shutdown: Arc<AtomicBool>) {
    thread::spawn(move || {
        let mut encoder = match FftByteEncoder::new(DEFAULT_CAPTURE_SIZE) {
            Ok(e) => e,
            Err(e) => {
                tracing::error!("[Tone] Failed to create encoder: {}", e);
                return;
            }
        };

        // Alternate music and silence so the validator has edges to find
        let mut tone = ToneGenerator::new(SAMPLE_RATE, 440.0, 0.6).with_bursts(6000, 4000);
        let window = Duration::from_secs_f32(DEFAULT_CAPTURE_SIZE as f32 / SAMPLE_RATE as f32);

        tracing::info!("[Tone] Producer started ({:?} per window)", window);

        while !shutdown.load(Ordering::Relaxed) {
            let pcm = tone.next_frame(DEFAULT_CAPTURE_SIZE);

            if gate.load(Ordering::Acquire) {
                match encoder.encode(&pcm.to_mono()) {
                    Ok(bytes) => {
                        // Controller can't keep up, drop frame
                        let _ = tx.try_send(PulseEvent::StreamFrame(bytes.to_vec()));
                    }
                    Err(e) => tracing::warn!("[Tone] Encode failed: {}", e),
                }
            }

            thread::sleep(window);
        }

        tracing::info!("[Tone] Shutting down...");
    });
}

// ========================================================================
// ANIMATION TICK THREAD
// ========================================================================

fn start_ticker(tx: Sender<PulseEvent>, shutdown: Arc<AtomicBool>) {
    thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            let _ = tx.try_send(PulseEvent::AnimationTick(Instant::now()));
            thread::sleep(TICK_INTERVAL);
        }
    });
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = PulseConfig::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let _log_guard = logging::init(&config.log).context("Failed to initialize logging")?;
    tracing::info!("=== pulsebar v{} ===", env!("CARGO_PKG_VERSION"));

    // Shutdown signal for worker threads
    let shutdown = Arc::new(AtomicBool::new(false));

    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&shutdown))
                .with_context(|| format!("Failed to register handler for signal {}", signal))?;
        }
    }

    let (tx, rx) = bounded(64);

    let source = GatedStreamSource::new();
    start_tone_producer(tx.clone(), source.gate(), shutdown.clone());
    start_ticker(tx.clone(), shutdown.clone());

    if args.assume_playing {
        DummyMediaMonitor::new(true).start(tx.clone(), shutdown.clone());
    } else {
        PlatformMedia::default().start(tx.clone(), shutdown.clone());
    }

    let lock = Arc::new(ExclusiveFlagLock::new());
    let mut controller = PulseController::new(config, source, lock);
    controller.attach_surface(TerminalHost::new(tx.clone()));

    let mut last_refresh = Instant::now();
    let mut stdout = std::io::stdout();

    while !shutdown.load(Ordering::Relaxed) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                if !controller.handle_event(event) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("[Main] Event channel disconnected");
                break;
            }
        }

        if last_refresh.elapsed() >= REFRESH_INTERVAL {
            controller.refresh();
            last_refresh = Instant::now();
        }

        let dirty = controller
            .host_mut()
            .map(|host| std::mem::take(&mut host.dirty))
            .unwrap_or(false);
        if dirty {
            if let Some(frame) = controller.frame() {
                print!("{}", draw_line(&frame));
                let _ = stdout.flush();
            }
        }
    }

    println!();
    tracing::info!("[Main] Shutting down...");
    shutdown.store(true, Ordering::Relaxed);
    controller.dispose();

    tracing::info!("[Main] ✓ Shutdown complete");
    Ok(())
}
