//! # Collaborator Traits
//!
//! Seams between the conversion core and the platform media stack. The
//! container demuxer and the decoder session are injected trait objects,
//! so the decode pump runs against a deterministic fake in tests and a
//! concrete codec-library binding in production.
//!
//! ## Session lifecycle
//!
//! A [`DecoderSession`] moves through
//! `Created -> Configured -> Running -> Stopped -> Released` via
//! [`configure`](DecoderSession::configure), [`start`](DecoderSession::start),
//! the queue/dequeue calls, [`stop`](DecoderSession::stop), and
//! [`release`](DecoderSession::release). The orchestrator owns the session
//! exclusively for the duration of one conversion and guarantees `release`
//! on every exit path.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// Sample rate assumed when the container metadata does not carry one.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Channel count assumed when the container metadata does not carry one.
pub const DEFAULT_CHANNEL_COUNT: u16 = 1;

// ============================================================================
// Format Types
// ============================================================================

/// Format metadata for a media track.
///
/// Sample rate and channel count are *advisory*: the prober fills them from
/// container metadata (or leaves them unset), and the decode pump overwrites
/// them if the decoder reports an output format change mid-stream. The WAV
/// writer always consumes the last known values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFormat {
    /// MIME type of the track (e.g., `audio/x-adpcm`).
    pub mime_type: String,
    /// Sample rate in Hz, if the container reports one.
    pub sample_rate: Option<u32>,
    /// Number of audio channels, if the container reports one.
    pub channel_count: Option<u16>,
}

impl MediaFormat {
    /// Create a format descriptor with only a MIME type.
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            sample_rate: None,
            channel_count: None,
        }
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Set the channel count.
    pub fn with_channel_count(mut self, channel_count: u16) -> Self {
        self.channel_count = Some(channel_count);
        self
    }

    /// Sample rate, falling back to [`DEFAULT_SAMPLE_RATE`].
    pub fn sample_rate_or_default(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Channel count, falling back to [`DEFAULT_CHANNEL_COUNT`].
    pub fn channel_count_or_default(&self) -> u16 {
        self.channel_count.unwrap_or(DEFAULT_CHANNEL_COUNT)
    }

    /// Returns `true` if this track carries audio.
    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

// ============================================================================
// Decoder Output Types
// ============================================================================

/// Descriptor for one decoded output chunk held by the decoder session.
///
/// The payload lives in the session's output buffer `index`; exactly `size`
/// bytes starting at `offset` are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputChunk {
    /// Output buffer index to read from and release.
    pub index: usize,
    /// Byte offset of the payload inside the buffer.
    pub offset: usize,
    /// Payload size in bytes. May be zero (e.g., on a bare EOS marker).
    pub size: usize,
    /// Presentation timestamp of the chunk, in microseconds.
    pub pts_us: i64,
    /// Set on the final chunk of the stream.
    pub end_of_stream: bool,
}

/// Result of a bounded-wait output dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPoll {
    /// A decoded chunk is available.
    Chunk(OutputChunk),
    /// The session's output buffer set changed. Informational; no action
    /// required.
    BuffersChanged,
    /// The output format changed. Re-read it via
    /// [`DecoderSession::output_format`].
    FormatChanged,
    /// No output was produced within the timeout. Retry on the next loop
    /// iteration.
    TryAgainLater,
}

// ============================================================================
// Container Traits
// ============================================================================

/// Read access to a media container's tracks and compressed samples.
///
/// The read position ("cursor") into the selected track advances
/// monotonically via [`advance`](ContainerDemuxer::advance);
/// [`read_sample`](ContainerDemuxer::read_sample) reads the *current*
/// sample without moving the cursor.
pub trait ContainerDemuxer {
    /// Number of tracks in the container.
    fn track_count(&self) -> usize;

    /// Format metadata for the track at `index`.
    fn track_format(&self, index: usize) -> Result<MediaFormat>;

    /// Select the track subsequent sample reads come from.
    fn select_track(&mut self, index: usize) -> Result<()>;

    /// Read the current compressed sample into `buf`, replacing its
    /// contents. Returns the sample size, or `None` once the track is
    /// exhausted.
    fn read_sample(&mut self, buf: &mut Vec<u8>) -> Result<Option<usize>>;

    /// Presentation timestamp of the current sample, in microseconds.
    fn sample_time_us(&self) -> i64;

    /// Advance the cursor to the next sample. Returns `false` when no
    /// further samples exist.
    fn advance(&mut self) -> bool;

    /// Release the container handle. Must be safe to call exactly once on
    /// every exit path; failures are the implementation's to log.
    fn release(&mut self);
}

/// Opens a media container from a filesystem path.
///
/// Implementations should map "cannot open" and "unrecognized container" to
/// [`ConvertError::NoAudioTrack`](crate::error::ConvertError::NoAudioTrack).
#[cfg_attr(test, automock)]
pub trait ContainerOpener {
    /// Open the container at `path` and return a demuxer over its tracks.
    fn open(&self, path: &Path) -> Result<Box<dyn ContainerDemuxer>>;
}

// ============================================================================
// Decoder Traits
// ============================================================================

/// A stateful platform decoder bound to one MIME type.
///
/// Mirrors the queue/dequeue surface of hardware/software codec APIs:
/// compressed input is pushed into indexed input buffers, decoded output is
/// drained from indexed output buffers, and both sides carry explicit
/// end-of-stream flags.
pub trait DecoderSession {
    /// Configure the session with the probed track format.
    ///
    /// Errors map to
    /// [`ConvertError::ConfigurationFailure`](crate::error::ConvertError::ConfigurationFailure).
    fn configure(&mut self, format: &MediaFormat) -> Result<()>;

    /// Start the session. Must be called after `configure`.
    fn start(&mut self) -> Result<()>;

    /// Wait up to `timeout` for a free input buffer.
    ///
    /// Returns `Ok(None)` on timeout (non-fatal); a failing buffer fetch is
    /// an error, never a silent `None`.
    fn dequeue_input(&mut self, timeout: Duration) -> Result<Option<usize>>;

    /// Queue compressed bytes into the input buffer at `index`.
    ///
    /// `end_of_stream` must be set on exactly one (possibly empty) final
    /// buffer; no further input may be queued after it.
    fn queue_input(
        &mut self,
        index: usize,
        data: &[u8],
        pts_us: i64,
        end_of_stream: bool,
    ) -> Result<()>;

    /// Wait up to `timeout` for decoded output or a state-change signal.
    fn dequeue_output(&mut self, timeout: Duration) -> Result<OutputPoll>;

    /// Contents of the output buffer at `index`.
    fn output_buffer(&self, index: usize) -> Result<&[u8]>;

    /// Return the output buffer at `index` to the session.
    fn release_output(&mut self, index: usize) -> Result<()>;

    /// Current output format. Re-read after [`OutputPoll::FormatChanged`].
    fn output_format(&self) -> Result<MediaFormat>;

    /// Stop the session. Stopping a session that never started is allowed
    /// to fail; the orchestrator logs and ignores such failures.
    fn stop(&mut self) -> Result<()>;

    /// Release all codec resources. Must be infallible and idempotent.
    fn release(&mut self);
}

/// Creates decoder sessions by MIME type.
#[cfg_attr(test, automock)]
pub trait DecoderFactory {
    /// Create a decoder session for `mime_type`.
    ///
    /// Errors map to
    /// [`ConvertError::UnsupportedCodec`](crate::error::ConvertError::UnsupportedCodec).
    fn create_for_mime(&self, mime_type: &str) -> Result<Box<dyn DecoderSession>>;
}
