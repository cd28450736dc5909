//! Built-in mood presets.
//!
//! When no provider descriptor is available the stream still has to
//! play something coherent, so each mood maps to a complete built-in
//! descriptor: tempo, harmony, filter color, and lead density chosen
//! for that mood.

use dw_ir::{ScaleType, TrackDescriptor};

/// The selectable moods, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoodPreset {
    Chill,
    Study,
    Rainy,
    Cozy,
    Dreamy,
}

impl MoodPreset {
    pub const ALL: [MoodPreset; 5] = [
        MoodPreset::Chill,
        MoodPreset::Study,
        MoodPreset::Rainy,
        MoodPreset::Cozy,
        MoodPreset::Dreamy,
    ];

    /// Display label, matching the provider's mood strings.
    pub fn label(&self) -> &'static str {
        match self {
            MoodPreset::Chill => "Chill & Relaxed",
            MoodPreset::Study => "Deep Focus",
            MoodPreset::Rainy => "Rainy Evening",
            MoodPreset::Cozy => "Cozy Fireplace",
            MoodPreset::Dreamy => "Dreamy Night",
        }
    }

    /// Short keyword for CLI selection.
    pub fn keyword(&self) -> &'static str {
        match self {
            MoodPreset::Chill => "chill",
            MoodPreset::Study => "study",
            MoodPreset::Rainy => "rainy",
            MoodPreset::Cozy => "cozy",
            MoodPreset::Dreamy => "dreamy",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        let word = word.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|p| p.keyword() == word)
    }

    /// The full built-in descriptor for this mood.
    pub fn descriptor(&self) -> TrackDescriptor {
        let base = TrackDescriptor {
            artist: "driftwave".into(),
            mood: self.label().into(),
            ..TrackDescriptor::default()
        };
        match self {
            MoodPreset::Chill => TrackDescriptor {
                name: "Velvet Hours".into(),
                bpm: 78.0,
                color: "#8ecaa5".into(),
                key: "C".into(),
                scale_type: ScaleType::Major,
                chord_progression: chords(&["Cmaj7", "Am7", "Fmaj7", "G7"]),
                filter_cutoff: 1_800.0,
                reverb_wet: 0.3,
                melody_complexity: 0.3,
                ..base
            },
            MoodPreset::Study => TrackDescriptor {
                name: "Margin Notes".into(),
                bpm: 72.0,
                color: "#6f86c9".into(),
                key: "A".into(),
                scale_type: ScaleType::Minor,
                chord_progression: chords(&["Am7", "Dm7", "Em7", "Am7"]),
                filter_cutoff: 1_200.0,
                reverb_wet: 0.25,
                melody_complexity: 0.15,
                ..base
            },
            MoodPreset::Rainy => TrackDescriptor {
                name: "Window Static".into(),
                bpm: 74.0,
                color: "#5e7d8c".into(),
                key: "D".into(),
                scale_type: ScaleType::Minor,
                chord_progression: chords(&["Dm7", "G7", "Cmaj7", "Fmaj7"]),
                filter_cutoff: 1_000.0,
                reverb_wet: 0.45,
                melody_complexity: 0.25,
                ..base
            },
            MoodPreset::Cozy => TrackDescriptor {
                name: "Ember Glow".into(),
                bpm: 70.0,
                color: "#c98a5e".into(),
                key: "G".into(),
                scale_type: ScaleType::Major,
                chord_progression: chords(&["Gmaj7", "Em7", "Cmaj7", "D7"]),
                filter_cutoff: 900.0,
                reverb_wet: 0.35,
                melody_complexity: 0.2,
                ..base
            },
            MoodPreset::Dreamy => TrackDescriptor {
                name: "Half Asleep".into(),
                bpm: 80.0,
                color: "#9a7fc9".into(),
                key: "A".into(),
                scale_type: ScaleType::Pentatonic,
                chord_progression: chords(&["Am7", "Fmaj7", "Cmaj7", "G7"]),
                filter_cutoff: 1_500.0,
                reverb_wet: 0.5,
                melody_complexity: 0.5,
                ..base
            },
        }
    }
}

fn chords(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_ir::BPM_RANGE;

    #[test]
    fn every_preset_survives_sanitization_unchanged() {
        for preset in MoodPreset::ALL {
            let d = preset.descriptor();
            assert_eq!(d.clone().sanitized(), d, "{} drifted", preset.label());
        }
    }

    #[test]
    fn every_preset_is_playable() {
        for preset in MoodPreset::ALL {
            let d = preset.descriptor();
            assert!(BPM_RANGE.contains(&d.bpm));
            assert_eq!(d.chord_progression.len(), 4);
            assert!(!d.name.is_empty());
        }
    }

    #[test]
    fn keywords_round_trip() {
        for preset in MoodPreset::ALL {
            assert_eq!(MoodPreset::from_keyword(preset.keyword()), Some(preset));
        }
        assert_eq!(MoodPreset::from_keyword("CHILL"), Some(MoodPreset::Chill));
        assert_eq!(MoodPreset::from_keyword("metal"), None);
    }
}
