//! Spoken-intro payload decoding.
//!
//! The provider hands narration audio as base64 over PCM16LE, mono,
//! 24 kHz. Anything that fails to decode yields `None` and the caller
//! skips the narration; a bad payload must never interrupt the music.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use dw_ir::IntroClip;

/// Sample rate the provider records narration at.
pub const INTRO_SAMPLE_RATE: u32 = 24_000;

/// Decode a base64 narration payload into a playable clip.
///
/// Empty or malformed input returns `None`. A trailing odd byte is
/// dropped rather than treated as an error.
pub fn decode_intro(payload: &str) -> Option<IntroClip> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return None;
    }
    let bytes = STANDARD.decode(trimmed).ok()?;
    if bytes.len() < 2 {
        return None;
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32_768.0)
        .collect();
    Some(IntroClip {
        samples,
        sample_rate: INTRO_SAMPLE_RATE,
    })
}
