//! # Track & Format Probing
//!
//! Selects the audio track to convert and classifies its MIME type.

use crate::error::{ConvertError, Result};
use crate::traits::{ContainerDemuxer, MediaFormat};
use tracing::{debug, warn};

/// MIME types that identify the ADPCM family.
///
/// Classification is a case-insensitive substring match against these, plus
/// the generic markers checked in [`is_adpcm_mime`].
const ADPCM_MIME_TYPES: [&str; 6] = [
    "audio/adpcm",
    "audio/x-adpcm",
    "audio/adpcm-ima",
    "audio/adpcm-ms",
    "audio/adpcm-yamaha",
    "audio/g722",
];

/// The audio track selected by [`probe_audio_track`].
#[derive(Debug, Clone)]
pub struct ProbedTrack {
    /// Index of the track inside the container.
    pub track_index: usize,
    /// Advisory format metadata read from the container.
    pub format: MediaFormat,
}

/// Select the first track whose MIME type starts with `audio/`.
///
/// All other track types (video, subtitles, ...) are ignored entirely; this
/// is a deliberate simplification, not full stream selection. Tracks whose
/// format cannot be read are skipped rather than failing the probe.
///
/// # Errors
///
/// Returns [`ConvertError::NoAudioTrack`] if the container has no audio
/// track.
pub fn probe_audio_track(demuxer: &dyn ContainerDemuxer) -> Result<ProbedTrack> {
    for track_index in 0..demuxer.track_count() {
        let format = match demuxer.track_format(track_index) {
            Ok(format) => format,
            Err(e) => {
                warn!(track_index, "skipping track with unreadable format: {e}");
                continue;
            }
        };

        if format.is_audio() {
            debug!(
                track_index,
                mime = %format.mime_type,
                sample_rate = format.sample_rate_or_default(),
                channels = format.channel_count_or_default(),
                "selected audio track"
            );
            return Ok(ProbedTrack {
                track_index,
                format,
            });
        }
    }

    warn!("no audio track found");
    Err(ConvertError::NoAudioTrack)
}

/// Returns `true` if `mime_type` names an ADPCM-family codec.
///
/// Case-insensitive. Matches the fixed ADPCM MIME set as well as any MIME
/// containing `adpcm`, `ima`, or `g722`.
pub fn is_adpcm_mime(mime_type: &str) -> bool {
    let mime = mime_type.to_ascii_lowercase();

    if ADPCM_MIME_TYPES.iter().any(|t| mime.contains(t)) {
        return true;
    }

    mime.contains("adpcm") || mime.contains("ima") || mime.contains("g722")
}
