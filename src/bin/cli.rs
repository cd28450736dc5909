//! driftwave CLI — endless lo-fi playback from a mood or a descriptor.
//!
//! Usage:
//!   dw-cli [chill|study|rainy|cozy|dreamy]
//!   dw-cli --json track.json [--seconds 60] [--ambient rain=0.4]

use dw_master::{AmbientLayer, Controller, MoodPreset, TrackDescriptor};
use std::io::Write;
use std::{env, fs};

fn main() {
    let args: Vec<String> = env::args().collect();

    let descriptor = descriptor_from_args(&args);
    let seconds: u64 = flag_value(&args, "--seconds")
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    println!("Track:   {} — {}", descriptor.name, descriptor.artist);
    println!("Mood:    {}", descriptor.mood);
    println!(
        "Tempo:   {} BPM, key {} ({:?})",
        descriptor.bpm, descriptor.key, descriptor.scale_type
    );
    println!("Chords:  {}", descriptor.chord_progression.join(" "));
    println!();

    let mut ctrl = Controller::new();
    ctrl.set_track(descriptor);
    apply_ambient_flags(&mut ctrl, &args);

    if let Err(e) = ctrl.start() {
        eprintln!("Failed to start playback: {}", e);
        std::process::exit(1);
    }
    println!("Playing for {}s...", seconds);

    let ticks = seconds * 10;
    for _ in 0..ticks {
        std::thread::sleep(std::time::Duration::from_millis(100));
        let snapshot = ctrl.get_energy_snapshot();
        print!(
            "\rStep: {:3} | {}",
            ctrl.current_step(),
            energy_meter(&snapshot)
        );
        let _ = std::io::stdout().flush();
    }

    ctrl.stop();
    println!("\rDone.{}", " ".repeat(40));
}

fn descriptor_from_args(args: &[String]) -> TrackDescriptor {
    if let Some(path) = flag_value(args, "--json") {
        let json = fs::read_to_string(&path).unwrap_or_else(|e| {
            eprintln!("Failed to read {}: {}", path, e);
            std::process::exit(1);
        });
        return dw_master::parse_descriptor(&json).unwrap_or_else(|e| {
            eprintln!("Failed to parse descriptor: {}", e);
            std::process::exit(1);
        });
    }

    let preset = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .map(|word| {
            MoodPreset::from_keyword(word).unwrap_or_else(|| {
                let keywords: Vec<&str> =
                    MoodPreset::ALL.iter().map(|p| p.keyword()).collect();
                eprintln!("Unknown mood '{}'. One of: {}", word, keywords.join(", "));
                std::process::exit(1);
            })
        })
        .unwrap_or(MoodPreset::Chill);
    preset.descriptor()
}

fn apply_ambient_flags(ctrl: &mut Controller, args: &[String]) {
    for i in 0..args.len() {
        if args[i] != "--ambient" {
            continue;
        }
        let Some(spec) = args.get(i + 1) else { continue };
        let Some((name, level)) = spec.split_once('=') else {
            eprintln!("Expected --ambient layer=level, got '{}'", spec);
            continue;
        };
        match (AmbientLayer::from_name(name), level.parse::<f32>()) {
            (Some(layer), Ok(level)) => ctrl.set_ambient_volume(layer, level),
            _ => eprintln!("Unknown ambient spec '{}'", spec),
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn energy_meter(snapshot: &[u8]) -> String {
    const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    if snapshot.is_empty() {
        return String::new();
    }
    // Eight coarse bands across the spectrum, one glyph each.
    let band = snapshot.len() / 8;
    (0..8)
        .map(|b| {
            let slice = &snapshot[b * band..(b + 1) * band];
            let avg = slice.iter().map(|&v| v as usize).sum::<usize>() / band.max(1);
            BLOCKS[(avg * 8 / 256).min(7)]
        })
        .collect()
}
