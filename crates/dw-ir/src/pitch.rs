//! Pitch tables and chord-symbol root extraction.
//!
//! Frequencies are equal temperament around A4 = 440 Hz. The planner
//! resolves chord symbols to a root here; everything downstream works
//! in Hz.

/// Octave-4 frequencies indexed by semitone from C (C4..B4).
pub const NOTE_FREQS: [f32; 12] = [
    261.63, // C
    277.18, // C#
    293.66, // D
    311.13, // D#
    329.63, // E
    349.23, // F
    369.99, // F#
    391.99, // G
    415.30, // G#
    440.00, // A
    466.16, // A#
    493.88, // B
];

/// Root used when a chord symbol cannot be read.
pub const FALLBACK_ROOT_HZ: f32 = 261.0;

/// The fixed chord pad voicing: C4, E4, G4, B4. Deliberately static
/// so the pad sits in one register while bass and lead move.
pub const CHORD_VOICING: [f32; 4] = [261.63, 329.63, 392.00, 493.88];

/// Lead note pool: C major pentatonic, octave 5.
pub const LEAD_SCALE: [f32; 5] = [523.25, 587.33, 659.25, 783.99, 880.00];

/// Extract the root frequency from a chord symbol such as "Cmaj7",
/// "Am9", or "F#m7". Reads one note letter plus an optional sharp;
/// anything unreadable yields [`FALLBACK_ROOT_HZ`].
pub fn root_frequency(symbol: &str) -> f32 {
    let mut chars = symbol.trim().chars();
    let letter = match chars.next() {
        Some(c) => c.to_ascii_uppercase(),
        None => return FALLBACK_ROOT_HZ,
    };
    let base = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return FALLBACK_ROOT_HZ,
    };
    let semitone = if chars.next() == Some('#') {
        (base + 1) % 12
    } else {
        base
    };
    NOTE_FREQS[semitone]
}

/// Bass plays the chord root two octaves down.
pub fn bass_frequency(symbol: &str) -> f32 {
    root_frequency(symbol) / 4.0
}
