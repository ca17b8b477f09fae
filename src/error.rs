//! # Conversion Error Types
//!
//! Error types for the ADPCM-to-WAV conversion pipeline.

use thiserror::Error;

/// Errors that can occur while probing, decoding, or writing audio.
///
/// "Track exists but is not ADPCM" is deliberately **not** an error; it is
/// the [`Conversion::NotNeeded`](crate::convert::Conversion) outcome.
#[derive(Error, Debug)]
pub enum ConvertError {
    // ========================================================================
    // Probe Errors
    // ========================================================================
    /// The container could not be opened, or it has no track whose MIME type
    /// starts with `audio/`.
    #[error("No audio track found")]
    NoAudioTrack,

    // ========================================================================
    // Codec Negotiation Errors
    // ========================================================================
    /// No decoder could be created for the track's MIME type.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// The decoder rejected the probed format during configuration.
    #[error("Decoder configuration failed: {0}")]
    ConfigurationFailure(String),

    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// I/O or buffer failure while pumping the decoder session.
    #[error("Decode I/O failure: {0}")]
    DecodeIoFailure(String),

    /// The pump ran to output end-of-stream but produced zero PCM bytes.
    #[error("Decoder produced no PCM data")]
    NoDataDecoded,

    // ========================================================================
    // Write Errors
    // ========================================================================
    /// The WAV writer was invoked with an empty PCM payload.
    #[error("Refusing to write a WAV file with an empty PCM payload")]
    EmptyPayload,

    /// WAV serialization failed at the filesystem level.
    #[error("Failed to write WAV file: {0}")]
    WriteFailure(#[from] std::io::Error),
}

impl ConvertError {
    /// Returns `true` if this error arose while negotiating a decoder for
    /// the track's codec.
    pub fn is_negotiation_error(&self) -> bool {
        matches!(
            self,
            ConvertError::UnsupportedCodec(_) | ConvertError::ConfigurationFailure(_)
        )
    }

    /// Returns `true` if this error occurred while driving the decoder
    /// session's buffer queues.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ConvertError::DecodeIoFailure(_) | ConvertError::NoDataDecoded
        )
    }

    /// Returns `true` if this error occurred while serializing the WAV
    /// artifact.
    pub fn is_write_error(&self) -> bool {
        matches!(
            self,
            ConvertError::WriteFailure(_) | ConvertError::EmptyPayload
        )
    }
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
