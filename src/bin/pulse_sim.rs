use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use pulsebar::config::LogConfig;
use pulsebar::controller::{PulseHost, PulseTransition};
use pulsebar::stream::{FftByteEncoder, GatedStreamSource, ToneGenerator};
use pulsebar::{logging, Color32, ExclusiveFlagLock, PulseConfig, PulseController};

const CAPTURE_SIZE: usize = 1024;

/// Prints every host callback instead of drawing
struct EchoHost {
    invalidations: usize,
}

impl PulseHost for EchoHost {
    fn drawable_width(&self) -> f32 {
        640.0
    }

    fn drawable_height(&self) -> f32 {
        48.0
    }

    fn invalidate(&mut self) {
        self.invalidations += 1;
    }

    fn on_start_pulse(&mut self, transition: &PulseTransition) -> bool {
        println!("   [HOST] onStartPulse ({:?})", transition.duration);
        false
    }

    fn on_stop_pulse(&mut self, transition: &PulseTransition) {
        println!("   [HOST] onStopPulse ({:?})", transition.duration);
    }
}

type SimController = PulseController<EchoHost, GatedStreamSource>;

fn print_status(controller: &SimController) {
    let s = controller.snapshot();
    println!("\n📊 PULSE STATUS");
    println!("   Link:      {:?}", controller.link_state());
    println!("   Stream:    {:?}", controller.stream_validity());
    println!("   Drawing:   {}", controller.is_drawing());
    println!("   Lava lamp: {}", if controller.is_lava_lamp_running() { "running" } else { "off" });
    println!(
        "   Signals:   keyguard={} screen={} enabled={} power_save={} media={}",
        s.keyguard_showing, s.screen_on, s.pulse_enabled, s.power_save_enabled, s.media_playing
    );
    if let Some(host) = controller.host() {
        println!("   Redraws:   {}", host.invalidations);
    }
    if let Some(frame) = controller.frame() {
        println!("   Frame:     {} segments, color #{:08X}", frame.segments.len(), frame.paint.color.to_argb());
    }
}

fn feed(controller: &mut SimController, frames: &[Vec<i8>]) {
    for frame in frames {
        controller.on_stream_frame(frame);
    }
    println!("[CMD] Fed {} frames -> stream {:?}", frames.len(), controller.stream_validity());
}

fn main() -> Result<()> {
    let _log_guard = logging::init(&LogConfig::default()).context("Failed to initialize logging")?;

    println!("========================================");
    println!("   pulsebar State Machine Simulator     ");
    println!("========================================");
    println!("Commands:");
    println!("  [k] keyguard     Toggle keyguard showing");
    println!("  [s] screen       Toggle screen on");
    println!("  [e] enabled      Toggle pulse enabled");
    println!("  [w] power        Toggle power save");
    println!("  [m] media        Toggle media playing");
    println!("  [f] loud N       Feed N loud frames (default 5)");
    println!("  [z] silent N     Feed N silent frames (default 30)");
    println!("  [l] lava         Toggle lava lamp");
    println!("  [v] speed MS     Set lava lamp speed");
    println!("  [c] color HEX    Set user color (AARRGGBB)");
    println!("  [t] tick         Advance the color animation");
    println!("  [r] refresh      Re-evaluate linkage");
    println!("  [i] info         Show status");
    println!("  [q] quit         Exit");
    println!("----------------------------------------");

    let config = PulseConfig::load_or_default(None).context("Failed to load configuration")?;
    let mut lava_lamp = config.settings.lava_lamp_enabled;

    let mut encoder = FftByteEncoder::new(CAPTURE_SIZE).context("Failed to create encoder")?;
    let mut tone = ToneGenerator::new(44_100, 440.0, 0.6);

    let mut controller: SimController =
        PulseController::new(config, GatedStreamSource::new(), Arc::new(ExclusiveFlagLock::new()));
    controller.attach_surface(EchoHost { invalidations: 0 });

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input).context("Failed to read stdin")? == 0 {
            break;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let arg = parts.next();
        let count = |default: usize| arg.and_then(|a| a.parse().ok()).unwrap_or(default);
        let s = controller.snapshot();

        match cmd {
            "k" | "keyguard" => controller.keyguard_showing_changed(!s.keyguard_showing),
            "s" | "screen" => controller.screen_on_changed(!s.screen_on),
            "e" | "enabled" => controller.pulse_enabled_changed(!s.pulse_enabled),
            "w" | "power" => controller.power_save_mode_changed(!s.power_save_enabled),
            "m" | "media" => controller.media_playing_changed(!s.media_playing),
            "f" | "loud" => {
                let mut frames = Vec::new();
                for _ in 0..count(5) {
                    let pcm = tone.next_frame(CAPTURE_SIZE);
                    frames.push(encoder.encode(&pcm.samples).context("Encode failed")?.to_vec());
                }
                feed(&mut controller, &frames);
            }
            "z" | "silent" => {
                let frames = vec![vec![0i8; CAPTURE_SIZE]; count(30)];
                feed(&mut controller, &frames);
            }
            "l" | "lava" => {
                lava_lamp = !lava_lamp;
                controller.lava_lamp_changed(lava_lamp);
            }
            "v" | "speed" => match arg.and_then(|a| a.parse().ok()) {
                Some(ms) => controller.lava_lamp_speed_changed(ms),
                None => println!("Usage: v <milliseconds>"),
            },
            "c" | "color" => match arg.and_then(|a| u32::from_str_radix(a.trim_start_matches('#'), 16).ok()) {
                Some(argb) => controller.user_color_changed(Color32::from_argb(argb)),
                None => println!("Usage: c <AARRGGBB>"),
            },
            "t" | "tick" => controller.on_animation_tick(Instant::now()),
            "r" | "refresh" => controller.refresh(),
            "i" | "info" => print_status(&controller),
            "q" | "quit" => {
                println!("[CMD] Quitting");
                break;
            }
            "" => {} // Ignore empty enter
            _ => println!("Unknown command. Use k, s, e, w, m, f, z, l, v, c, t, r, i or q."),
        }

        if cmd != "i" && !cmd.is_empty() {
            println!("   Link: {:?}  Drawing: {}", controller.link_state(), controller.is_drawing());
        }
    }

    controller.dispose();
    Ok(())
}
