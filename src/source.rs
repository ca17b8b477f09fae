//! # Buffered Media Source
//!
//! Thin playback-source plumbing around the converter: buffers an incoming
//! byte stream to a temp file, runs the ADPCM check/conversion, and exposes
//! the resulting file path as a playable locator.
//!
//! Conversion failures are deliberately non-fatal here: the original
//! buffered file stays in place and playback proceeds against it.

use crate::convert::{AudioConverter, Conversion};
use crate::error::{ConvertError, Result};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Copy buffer size for the stream-to-file pipe.
const COPY_BUFFER_BYTES: usize = 0x10000;

/// File extensions for the audio MIME types this bridge meets.
const MIME_EXTENSIONS: [(&str, &str); 9] = [
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/mpeg", "mp3"),
    ("audio/mp4", "m4a"),
    ("audio/aac", "aac"),
    ("audio/ogg", "ogg"),
    ("audio/midi", "mid"),
    ("audio/amr", "amr"),
    ("audio/x-adpcm", "adp"),
];

/// A media source backed by a temp file, converted to WAV when the buffered
/// track turns out to be ADPCM.
#[derive(Debug)]
pub struct BufferedMediaSource {
    media_path: PathBuf,
    content_type: String,
}

impl BufferedMediaSource {
    /// Buffer `stream` into a temp file under `cache_dir` and convert it in
    /// place if its audio track is ADPCM-encoded.
    ///
    /// On a successful conversion the original buffered file is deleted and
    /// the locator points at the produced WAV. When no conversion is needed,
    /// or when conversion fails, the locator keeps pointing at the buffered
    /// original.
    pub fn buffer<R: Read>(
        mut stream: R,
        content_type: &str,
        cache_dir: &Path,
        converter: &AudioConverter,
    ) -> Result<Self> {
        let suffix = format!(".{}", extension_for_mime(content_type));
        let temp = tempfile::Builder::new()
            .prefix("media")
            .suffix(&suffix)
            .tempfile_in(cache_dir)
            .map_err(ConvertError::WriteFailure)?;

        // Persist now; the source owns deletion from here on.
        let (mut file, media_path) = temp
            .keep()
            .map_err(|e| ConvertError::WriteFailure(e.error))?;

        debug!(path = %media_path.display(), "starting media pipe");

        if let Err(e) = pipe_stream(&mut stream, &mut file) {
            warn!(path = %media_path.display(), "media pipe failure: {e}");
            let _ = fs::remove_file(&media_path);
            return Err(e.into());
        }
        drop(file);

        debug!(path = %media_path.display(), "media pipe closed");

        let mut source = Self {
            media_path,
            content_type: content_type.to_string(),
        };
        source.convert(converter);
        Ok(source)
    }

    fn convert(&mut self, converter: &AudioConverter) {
        let mut wav_path = self.media_path.clone().into_os_string();
        wav_path.push(".wav");
        let wav_path = PathBuf::from(wav_path);

        match converter.convert_to_wav_if_needed(&self.media_path, &wav_path) {
            Ok(Conversion::Converted) => {
                info!(wav = %wav_path.display(), "conversion successful, swapping media file");
                if let Err(e) = fs::remove_file(&self.media_path) {
                    warn!(path = %self.media_path.display(), "failed to delete original: {e}");
                }
                self.media_path = wav_path;
            }
            Ok(Conversion::NotNeeded) => {
                debug!("no conversion needed");
            }
            Err(e) => {
                // Keep the original file; playback may still work.
                warn!("audio conversion failed, keeping original: {e}");
            }
        }
    }

    /// Path to the playable media file.
    pub fn locator(&self) -> &Path {
        &self.media_path
    }

    /// Content type the stream was declared with.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Playback-source lifecycle hook. No-op for a file-backed source.
    pub fn connect(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Playback-source lifecycle hook. No-op for a file-backed source.
    pub fn start(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Playback-source lifecycle hook. No-op for a file-backed source.
    pub fn stop(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Delete the backing file. Best-effort; failures are logged.
    pub fn disconnect(&mut self) {
        match fs::remove_file(&self.media_path) {
            Ok(()) => debug!(path = %self.media_path.display(), "temp file deleted"),
            Err(e) => warn!(path = %self.media_path.display(), "failed to delete temp file: {e}"),
        }
    }
}

fn pipe_stream<R: Read, W: Write>(stream: &mut R, file: &mut W) -> std::io::Result<u64> {
    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    let mut total = 0u64;

    loop {
        let read = stream.read(&mut buf)?;
        if read == 0 {
            break;
        }
        file.write_all(&buf[..read])?;
        total += read as u64;
    }

    file.flush()?;
    Ok(total)
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    MIME_EXTENSIONS
        .iter()
        .find(|(mime, _)| mime_type.eq_ignore_ascii_case(mime))
        .map_or("bin", |(_, ext)| ext)
}
