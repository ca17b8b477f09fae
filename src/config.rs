//! # Conversion Configuration
//!
//! Configuration and statistics types for the decode pump.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decode pump configuration.
///
/// Controls the bounded-wait dequeue timeout, scratch buffer sizing, and
/// progress logging cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Maximum duration to wait for a free input or output buffer on each
    /// dequeue attempt.
    ///
    /// An expired wait is a skipped step, not an error; the pump retries on
    /// the next loop iteration. Any small positive value works; larger
    /// values reduce empty polls at the cost of tail latency on malformed
    /// streams.
    ///
    /// Default: 10 ms.
    #[serde(default = "default_dequeue_timeout")]
    pub dequeue_timeout: Duration,

    /// Capacity reserved for the compressed-sample scratch buffer, in bytes.
    ///
    /// The buffer grows on demand if the container yields larger samples.
    ///
    /// Default: 64 KiB.
    #[serde(default = "default_input_buffer_bytes")]
    pub input_buffer_bytes: usize,

    /// Emit a progress trace event every N frames on each side of the pump.
    ///
    /// Default: 100 frames.
    #[serde(default = "default_progress_log_interval")]
    pub progress_log_interval: u64,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            dequeue_timeout: default_dequeue_timeout(),
            input_buffer_bytes: default_input_buffer_bytes(),
            progress_log_interval: default_progress_log_interval(),
        }
    }
}

impl ConvertConfig {
    /// Configuration for latency-sensitive callers.
    ///
    /// Short dequeue waits keep each loop iteration cheap at the cost of
    /// more empty polls.
    pub fn low_latency() -> Self {
        Self {
            dequeue_timeout: Duration::from_millis(2),
            ..Default::default()
        }
    }

    /// Configuration for slow or heavily loaded decoders.
    ///
    /// Longer dequeue waits avoid spinning while the codec catches up.
    pub fn patient() -> Self {
        Self {
            dequeue_timeout: Duration::from_millis(100),
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.input_buffer_bytes == 0 {
            return Err("input_buffer_bytes must be > 0".to_string());
        }

        if self.progress_log_interval == 0 {
            return Err("progress_log_interval must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_dequeue_timeout() -> Duration {
    Duration::from_millis(10)
}

fn default_input_buffer_bytes() -> usize {
    64 * 1024
}

fn default_progress_log_interval() -> u64 {
    100
}

// ============================================================================
// Pump Statistics
// ============================================================================

/// Statistics about a completed (or aborted) pump run.
#[derive(Debug, Clone, Default)]
pub struct PumpStats {
    /// Compressed samples queued into the decoder.
    pub input_frames: u64,
    /// Decoded chunks drained from the decoder.
    pub output_frames: u64,
    /// Total decoded PCM bytes accumulated.
    pub bytes_decoded: u64,
    /// Input dequeue attempts that timed out without a free buffer.
    pub empty_input_polls: u64,
    /// Output dequeue attempts that timed out without a decoded chunk.
    pub empty_output_polls: u64,
    /// Mid-stream output format changes reported by the decoder.
    pub format_changes: u32,
}

impl PumpStats {
    /// Average decoded chunk size in bytes, or 0 if nothing was decoded.
    pub fn avg_chunk_bytes(&self) -> u64 {
        if self.output_frames == 0 {
            return 0;
        }
        self.bytes_decoded / self.output_frames
    }
}
