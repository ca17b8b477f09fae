//! # ADPCM-to-WAV Bridge
//!
//! Narrow audio-format bridge: given an arbitrary input media file, detect
//! whether the embedded audio track is encoded in an ADPCM variant (IMA,
//! Microsoft, Yamaha, G.722, ...), and if so, decode it to linear PCM and
//! repackage the result as a canonical uncompressed WAV file. Non-ADPCM
//! tracks are left untouched.
//!
//! ## Overview
//!
//! The crate does **not** decode ADPCM itself. Decoding is delegated to an
//! injected [`DecoderSession`] (a platform codec binding); container access
//! goes through an injected [`ContainerDemuxer`]. This keeps the core pump
//! testable against deterministic fakes.
//!
//! Pipeline, in order:
//!
//! 1. [`probe`]: select the first `audio/` track and classify its MIME type
//! 2. [`pump`]: drive the decoder session's input/output queues to
//!    end-of-stream, accumulating raw PCM
//! 3. [`wav`]: serialize the PCM into a 44-byte-header WAV file
//! 4. [`convert`]: the orchestrator sequencing the above with guaranteed
//!    resource release on every exit path
//! 5. [`source`]: a buffered media source that pipes an incoming byte
//!    stream to a temp file and swaps in the converted WAV

pub mod config;
pub mod convert;
pub mod error;
pub mod probe;
pub mod pump;
pub mod source;
pub mod traits;
pub mod wav;

pub use config::{ConvertConfig, PumpStats};
pub use convert::{AudioConverter, Conversion};
pub use error::{ConvertError, Result};
pub use probe::{is_adpcm_mime, probe_audio_track, ProbedTrack};
pub use pump::{run_pump, CancelFlag, PumpOutput};
pub use source::BufferedMediaSource;
pub use traits::{
    ContainerDemuxer, ContainerOpener, DecoderFactory, DecoderSession, MediaFormat, OutputChunk,
    OutputPoll,
};
pub use wav::{parse_wav_header, wav_header, write_wav, WavHeader};
