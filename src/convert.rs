//! # Conversion Orchestrator
//!
//! Sequences probe -> codec negotiation -> decode pump -> WAV write, with
//! unconditional resource release on every exit path. Container and decoder
//! access go through the injected [`ContainerOpener`] and [`DecoderFactory`]
//! collaborators.

use crate::config::ConvertConfig;
use crate::error::Result;
use crate::probe::{is_adpcm_mime, probe_audio_track};
use crate::pump::{run_pump, CancelFlag};
use crate::traits::{ContainerDemuxer, ContainerOpener, DecoderFactory, DecoderSession, MediaFormat};
use crate::wav::write_wav;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a conversion attempt.
///
/// Both variants mean the input file was left untouched; only `Converted`
/// means a new file exists at the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// The track was ADPCM; a WAV file was written to the output path.
    Converted,
    /// The track is not ADPCM; no conversion was attempted and no output
    /// file was produced.
    NotNeeded,
}

impl Conversion {
    /// Returns `true` if a WAV file was produced.
    pub fn converted(&self) -> bool {
        matches!(self, Conversion::Converted)
    }
}

/// Converts ADPCM-encoded audio tracks to WAV files.
///
/// One converter can serve many conversion calls; each call owns its own
/// demuxer, decoder session, and accumulator exclusively for the call's
/// duration, so sharing a converter across threads needs no coordination
/// beyond the collaborators' own.
pub struct AudioConverter {
    opener: Arc<dyn ContainerOpener>,
    factory: Arc<dyn DecoderFactory>,
    config: ConvertConfig,
}

impl AudioConverter {
    /// Create a converter over the given platform collaborators.
    pub fn new(opener: Arc<dyn ContainerOpener>, factory: Arc<dyn DecoderFactory>) -> Self {
        Self {
            opener,
            factory,
            config: ConvertConfig::default(),
        }
    }

    /// Replace the default pump configuration.
    pub fn with_config(mut self, config: ConvertConfig) -> Self {
        self.config = config;
        self
    }

    /// Convert the audio track in `input` to a WAV file at `output`, if the
    /// track is ADPCM-encoded.
    ///
    /// On any failure the partially written output file (if one exists) is
    /// deleted and the input file is left untouched.
    #[instrument(skip(self), fields(input = %input.display()))]
    pub fn convert_to_wav_if_needed(&self, input: &Path, output: &Path) -> Result<Conversion> {
        self.convert_with_cancel(input, output, &CancelFlag::default())
    }

    /// Like [`convert_to_wav_if_needed`](Self::convert_to_wav_if_needed),
    /// with a cancellation flag checked on each pump iteration.
    pub fn convert_with_cancel(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancelFlag,
    ) -> Result<Conversion> {
        let mut demuxer = self.opener.open(input)?;

        let result = self.convert_track(demuxer.as_mut(), output, cancel);

        demuxer.release();

        if result.is_err() {
            remove_partial_output(output);
        }

        result
    }

    fn convert_track(
        &self,
        demuxer: &mut dyn ContainerDemuxer,
        output: &Path,
        cancel: &CancelFlag,
    ) -> Result<Conversion> {
        let probed = probe_audio_track(demuxer)?;

        if !is_adpcm_mime(&probed.format.mime_type) {
            debug!(mime = %probed.format.mime_type, "not an ADPCM track, no conversion needed");
            return Ok(Conversion::NotNeeded);
        }

        info!(
            mime = %probed.format.mime_type,
            sample_rate = probed.format.sample_rate_or_default(),
            channels = probed.format.channel_count_or_default(),
            "converting ADPCM track to WAV"
        );

        demuxer.select_track(probed.track_index)?;

        let mut session = self.factory.create_for_mime(&probed.format.mime_type)?;

        let result =
            self.decode_and_write(demuxer, session.as_mut(), &probed.format, output, cancel);

        // The session must reach Released on every exit path. Cleanup
        // failures are logged, never escalated.
        if let Err(e) = session.stop() {
            warn!("error stopping decoder session: {e}");
        }
        session.release();

        match &result {
            Ok(_) => info!("ADPCM to WAV conversion successful"),
            Err(e) => warn!("ADPCM to WAV conversion failed: {e}"),
        }

        result
    }

    fn decode_and_write(
        &self,
        demuxer: &mut dyn ContainerDemuxer,
        session: &mut dyn DecoderSession,
        format: &MediaFormat,
        output: &Path,
        cancel: &CancelFlag,
    ) -> Result<Conversion> {
        session.configure(format)?;
        session.start()?;

        let pumped = run_pump(demuxer, session, format, &self.config, cancel)?;

        write_wav(output, &pumped.pcm, pumped.sample_rate, pumped.channel_count)?;

        info!(
            bytes = pumped.pcm.len(),
            sample_rate = pumped.sample_rate,
            channels = pumped.channel_count,
            output = %output.display(),
            "WAV file created"
        );

        Ok(Conversion::Converted)
    }
}

fn remove_partial_output(output: &Path) {
    if output.exists() {
        match fs::remove_file(output) {
            Ok(()) => debug!(output = %output.display(), "deleted partially written output file"),
            Err(e) => warn!(output = %output.display(), "failed to delete partial output: {e}"),
        }
    }
}
