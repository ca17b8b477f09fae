//! # WAV Serialization
//!
//! Bit-exact synthesis of the canonical 44-byte uncompressed-PCM WAV header,
//! plus the file writer and a header parser used for validation.
//!
//! Layout (all multi-byte integers little-endian, ASCII tags, no padding):
//!
//! ```text
//! offset  0  "RIFF"            12  "fmt "            28  ByteRate (u32)
//!         4  ChunkSize (u32)   16  Subchunk1Size=16  32  BlockAlign (u16)
//!         8  "WAVE"            20  AudioFormat=1     34  BitsPerSample (u16)
//!                              22  NumChannels (u16) 36  "data"
//!                              24  SampleRate (u32)  40  Subchunk2Size (u32)
//! ```

use crate::error::{ConvertError, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Length of the canonical uncompressed-PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// Bits per sample of the bridge's PCM output.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Fields recovered from a WAV header by [`parse_wav_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channel_count: u16,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Size of the `data` chunk payload in bytes.
    pub data_len: u32,
}

/// Synthesize the canonical 44-byte WAV header.
///
/// Invariants: `ChunkSize = 36 + data_len`,
/// `ByteRate = sample_rate * channels * bits/8`,
/// `BlockAlign = channels * bits/8`.
pub fn wav_header(
    sample_rate: u32,
    channel_count: u16,
    bits_per_sample: u16,
    data_len: u32,
) -> [u8; WAV_HEADER_LEN] {
    let bytes_per_sample = u32::from(bits_per_sample / 8);
    let byte_rate = sample_rate * u32::from(channel_count) * bytes_per_sample;
    let block_align = channel_count * (bits_per_sample / 8);
    let chunk_size = 36 + data_len;

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channel_count.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    header
}

/// Write `pcm` to `path` as a 16-bit PCM WAV file.
///
/// # Errors
///
/// - [`ConvertError::EmptyPayload`] if `pcm` is empty (checked before the
///   file is created, so no artifact is produced)
/// - [`ConvertError::WriteFailure`] on any filesystem error
pub fn write_wav(path: &Path, pcm: &[u8], sample_rate: u32, channel_count: u16) -> Result<()> {
    if pcm.is_empty() {
        return Err(ConvertError::EmptyPayload);
    }

    let data_len = u32::try_from(pcm.len()).map_err(|_| {
        ConvertError::WriteFailure(io::Error::new(
            io::ErrorKind::InvalidInput,
            "PCM payload exceeds the 4 GiB WAV data chunk limit",
        ))
    })?;

    debug!(
        path = %path.display(),
        sample_rate,
        channels = channel_count,
        bits = BITS_PER_SAMPLE,
        data_len,
        "writing WAV file"
    );

    let mut file = File::create(path)?;
    file.write_all(&wav_header(
        sample_rate,
        channel_count,
        BITS_PER_SAMPLE,
        data_len,
    ))?;
    file.write_all(pcm)?;
    file.flush()?;

    Ok(())
}

/// Parse the leading 44-byte header of a WAV file.
///
/// Validates the `RIFF`/`WAVE`/`fmt `/`data` tags and the PCM audio format
/// marker. Used by downstream validation and the writer's tests.
pub fn parse_wav_header(bytes: &[u8]) -> io::Result<WavHeader> {
    let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidData, msg.to_string());

    if bytes.len() < WAV_HEADER_LEN {
        return Err(invalid("WAV header truncated"));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(invalid("not a RIFF/WAVE file"));
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(invalid("unexpected WAV chunk layout"));
    }

    let le_u16 = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
    let le_u32 =
        |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

    if le_u16(20) != 1 {
        return Err(invalid("not uncompressed PCM"));
    }

    Ok(WavHeader {
        sample_rate: le_u32(24),
        channel_count: le_u16(22),
        bits_per_sample: le_u16(34),
        data_len: le_u32(40),
    })
}
