//! # Decode Pump
//!
//! Drives an external decoder session to completion: feeds compressed
//! samples from the container into the session's input queue, drains decoded
//! PCM from its output queue, and accumulates the result.
//!
//! ## Termination
//!
//! The loop is an explicit two-flag state machine. `input_exhausted` is set
//! once the single end-of-stream marker has been queued; `output_exhausted`
//! is set when the decoder flags its final output chunk. The loop runs until
//! `output_exhausted`. Both flags must settle independently, because the
//! decoder keeps draining buffered frames after the input side finishes.
//!
//! Bounded-wait dequeues that time out are skipped steps, not errors; the
//! pump tolerates arbitrarily many empty polls.

use crate::config::{ConvertConfig, PumpStats};
use crate::error::{ConvertError, Result};
use crate::traits::{ContainerDemuxer, DecoderSession, MediaFormat, OutputPoll};
use bytes::{Bytes, BytesMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation flag checked at the top of each pump iteration.
///
/// Cloning shares the underlying flag. A default-constructed flag is never
/// set, so callers that do not need cancellation pay nothing.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the pump run sharing this flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Pump Output
// ============================================================================

/// Result of a completed pump run.
#[derive(Debug, Clone)]
pub struct PumpOutput {
    /// Accumulated decoded PCM, in the decoder's output byte order.
    pub pcm: Bytes,
    /// Final negotiated sample rate: the advisory probe value unless the
    /// decoder reported a format change.
    pub sample_rate: u32,
    /// Final negotiated channel count.
    pub channel_count: u16,
    /// Counters collected while pumping.
    pub stats: PumpStats,
}

// ============================================================================
// Pump Loop
// ============================================================================

/// Drive `session` to output end-of-stream, accumulating decoded PCM.
///
/// `initial_format` supplies the advisory sample rate and channel count; a
/// mid-stream format change from the decoder overwrites them, and the
/// returned values are the last known ones.
///
/// # Errors
///
/// - [`ConvertError::DecodeIoFailure`] on any failing queue/dequeue/read
///   call, and on cancellation
/// - [`ConvertError::NoDataDecoded`] if the loop terminates with zero
///   accumulated bytes
#[instrument(skip_all, fields(mime = %initial_format.mime_type))]
pub fn run_pump(
    demuxer: &mut dyn ContainerDemuxer,
    session: &mut dyn DecoderSession,
    initial_format: &MediaFormat,
    config: &ConvertConfig,
    cancel: &CancelFlag,
) -> Result<PumpOutput> {
    let mut sample_rate = initial_format.sample_rate_or_default();
    let mut channel_count = initial_format.channel_count_or_default();

    let mut pcm = BytesMut::new();
    let mut sample_buf = Vec::with_capacity(config.input_buffer_bytes);
    let mut stats = PumpStats::default();

    let mut input_exhausted = false;
    let mut output_exhausted = false;

    debug!(sample_rate, channel_count, "starting decode pump");

    while !output_exhausted {
        if cancel.is_cancelled() {
            warn!("decode pump cancelled");
            return Err(ConvertError::DecodeIoFailure("decode cancelled".into()));
        }

        // Input side: feed the next compressed sample, or the single EOS
        // marker once the track is drained.
        if !input_exhausted {
            match session.dequeue_input(config.dequeue_timeout)? {
                Some(index) => match demuxer.read_sample(&mut sample_buf)? {
                    Some(size) => {
                        let pts_us = demuxer.sample_time_us();
                        session.queue_input(index, &sample_buf[..size], pts_us, false)?;
                        demuxer.advance();
                        stats.input_frames += 1;

                        if stats.input_frames % config.progress_log_interval == 0 {
                            trace!(frames = stats.input_frames, "input frames queued");
                        }
                    }
                    None => {
                        session.queue_input(index, &[], 0, true)?;
                        input_exhausted = true;
                        debug!(frames = stats.input_frames, "input end of stream queued");
                    }
                },
                None => stats.empty_input_polls += 1,
            }
        }

        // Output side: drain at most one decoded chunk per iteration.
        match session.dequeue_output(config.dequeue_timeout)? {
            OutputPoll::Chunk(chunk) => {
                if chunk.size > 0 {
                    let buffer = session.output_buffer(chunk.index)?;
                    let payload = chunk
                        .offset
                        .checked_add(chunk.size)
                        .and_then(|end| buffer.get(chunk.offset..end))
                        .ok_or_else(|| {
                            ConvertError::DecodeIoFailure(format!(
                                "output buffer {} shorter than reported chunk (len {}, offset {}, size {})",
                                chunk.index,
                                buffer.len(),
                                chunk.offset,
                                chunk.size
                            ))
                        })?;
                    pcm.extend_from_slice(payload);
                    stats.bytes_decoded += chunk.size as u64;
                    stats.output_frames += 1;

                    if stats.output_frames % config.progress_log_interval == 0 {
                        trace!(
                            frames = stats.output_frames,
                            bytes = stats.bytes_decoded,
                            "output frames drained"
                        );
                    }
                }

                session.release_output(chunk.index)?;

                if chunk.end_of_stream {
                    output_exhausted = true;
                    debug!(bytes = stats.bytes_decoded, "output end of stream reached");
                }
            }
            OutputPoll::BuffersChanged => trace!("output buffers changed"),
            OutputPoll::FormatChanged => {
                let format = session.output_format()?;
                if let Some(rate) = format.sample_rate {
                    sample_rate = rate;
                }
                if let Some(channels) = format.channel_count {
                    channel_count = channels;
                }
                stats.format_changes += 1;
                debug!(sample_rate, channel_count, "output format changed");
            }
            OutputPoll::TryAgainLater => stats.empty_output_polls += 1,
        }
    }

    if pcm.is_empty() {
        warn!("decode pump completed without producing PCM data");
        return Err(ConvertError::NoDataDecoded);
    }

    debug!(
        bytes = stats.bytes_decoded,
        input_frames = stats.input_frames,
        output_frames = stats.output_frames,
        "decode pump complete"
    );

    Ok(PumpOutput {
        pcm: pcm.freeze(),
        sample_rate,
        channel_count,
        stats,
    })
}
