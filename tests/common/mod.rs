//! Shared test fakes: a scripted decoder session and an in-memory demuxer.
//!
//! These stand in for the platform media stack so the pump and orchestrator
//! run deterministically.

#![allow(dead_code)]

use adpcm_bridge::{
    ContainerDemuxer, ContainerOpener, ConvertError, DecoderFactory, DecoderSession, MediaFormat,
    OutputChunk, OutputPoll, Result,
};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Install a subscriber honoring `RUST_LOG` for test debugging. Safe to call
/// from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// ============================================================================
// Fake Demuxer
// ============================================================================

/// In-memory container: a fixed track list and a sequence of compressed
/// samples for the selected track.
pub struct FakeDemuxer {
    tracks: Vec<MediaFormat>,
    samples: Vec<Vec<u8>>,
    cursor: usize,
    selected: Option<usize>,
    released: Arc<AtomicUsize>,
}

impl FakeDemuxer {
    pub fn new(tracks: Vec<MediaFormat>, samples: Vec<Vec<u8>>) -> Self {
        Self {
            tracks,
            samples,
            cursor: 0,
            selected: None,
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared release counter, observable after the demuxer is consumed.
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.released)
    }
}

impl ContainerDemuxer for FakeDemuxer {
    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn track_format(&self, index: usize) -> Result<MediaFormat> {
        self.tracks
            .get(index)
            .cloned()
            .ok_or_else(|| ConvertError::DecodeIoFailure("track index out of range".into()))
    }

    fn select_track(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(ConvertError::DecodeIoFailure("track index out of range".into()));
        }
        self.selected = Some(index);
        Ok(())
    }

    fn read_sample(&mut self, buf: &mut Vec<u8>) -> Result<Option<usize>> {
        match self.samples.get(self.cursor) {
            Some(sample) => {
                buf.clear();
                buf.extend_from_slice(sample);
                Ok(Some(sample.len()))
            }
            None => Ok(None),
        }
    }

    fn sample_time_us(&self) -> i64 {
        self.cursor as i64 * 20_000
    }

    fn advance(&mut self) -> bool {
        self.cursor += 1;
        self.cursor < self.samples.len()
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Scripted Decoder Session
// ============================================================================

/// One scripted result of an output dequeue.
pub enum SessionEvent {
    /// A decoded chunk backed by `buffer`; the valid payload is
    /// `buffer[offset..offset + size]`.
    Chunk {
        buffer: Vec<u8>,
        offset: usize,
        size: usize,
        eos: bool,
    },
    BuffersChanged,
    FormatChanged(MediaFormat),
    TryAgainLater,
}

impl SessionEvent {
    /// A plain chunk of `len` bytes of ramp data.
    pub fn chunk(len: usize) -> Self {
        SessionEvent::Chunk {
            buffer: (0..len).map(|i| (i % 251) as u8).collect(),
            offset: 0,
            size: len,
            eos: false,
        }
    }

    /// A zero-length chunk carrying the end-of-stream flag.
    pub fn eos() -> Self {
        SessionEvent::Chunk {
            buffer: Vec::new(),
            offset: 0,
            size: 0,
            eos: true,
        }
    }
}

/// Observable lifecycle counters, shared out of a consumed session.
#[derive(Default)]
pub struct SessionCounters {
    pub configured: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub released: AtomicUsize,
    pub eos_inputs: AtomicUsize,
    pub inputs_after_eos: AtomicUsize,
}

/// Decoder session driven by a pre-written event script.
///
/// Input buffers are always granted (index cycling 0..4) unless a grant
/// script is installed; output dequeues pop the event script in order.
/// Exhausting the script panics, so a broken pump fails the test instead of
/// hanging.
pub struct ScriptedSession {
    events: VecDeque<SessionEvent>,
    input_grants: Option<VecDeque<Option<usize>>>,
    next_input: usize,
    next_output: usize,
    output_buffers: HashMap<usize, Vec<u8>>,
    format: MediaFormat,
    queued_inputs: Vec<(usize, Vec<u8>, i64, bool)>,
    input_eos_seen: bool,
    counters: Arc<SessionCounters>,
    fail_configure: bool,
}

impl ScriptedSession {
    pub fn new(events: Vec<SessionEvent>) -> Self {
        Self {
            events: events.into(),
            input_grants: None,
            next_input: 0,
            next_output: 0,
            output_buffers: HashMap::new(),
            format: MediaFormat::new("audio/raw"),
            queued_inputs: Vec::new(),
            input_eos_seen: false,
            counters: Arc::new(SessionCounters::default()),
            fail_configure: false,
        }
    }

    /// Script the results of `dequeue_input`; `None` entries simulate
    /// timeouts. Once the script runs out, grants resume unconditionally.
    pub fn with_input_grants(mut self, grants: Vec<Option<usize>>) -> Self {
        self.input_grants = Some(grants.into());
        self
    }

    /// Make `configure` fail with `ConfigurationFailure`.
    pub fn with_configure_failure(mut self) -> Self {
        self.fail_configure = true;
        self
    }

    pub fn counters(&self) -> Arc<SessionCounters> {
        Arc::clone(&self.counters)
    }

    /// Inputs queued so far, as `(index, data, pts_us, end_of_stream)`.
    pub fn queued_inputs(&self) -> &[(usize, Vec<u8>, i64, bool)] {
        &self.queued_inputs
    }
}

impl DecoderSession for ScriptedSession {
    fn configure(&mut self, _format: &MediaFormat) -> Result<()> {
        if self.fail_configure {
            return Err(ConvertError::ConfigurationFailure(
                "scripted configure failure".into(),
            ));
        }
        self.counters.configured.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn dequeue_input(&mut self, _timeout: Duration) -> Result<Option<usize>> {
        if let Some(grants) = &mut self.input_grants {
            if let Some(grant) = grants.pop_front() {
                return Ok(grant);
            }
        }
        let index = self.next_input % 4;
        self.next_input += 1;
        Ok(Some(index))
    }

    fn queue_input(
        &mut self,
        index: usize,
        data: &[u8],
        pts_us: i64,
        end_of_stream: bool,
    ) -> Result<()> {
        if self.input_eos_seen {
            self.counters.inputs_after_eos.fetch_add(1, Ordering::SeqCst);
        }
        if end_of_stream {
            self.input_eos_seen = true;
            self.counters.eos_inputs.fetch_add(1, Ordering::SeqCst);
        }
        self.queued_inputs
            .push((index, data.to_vec(), pts_us, end_of_stream));
        Ok(())
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> Result<OutputPoll> {
        match self.events.pop_front() {
            Some(SessionEvent::Chunk {
                buffer,
                offset,
                size,
                eos,
            }) => {
                let index = self.next_output;
                self.next_output += 1;
                self.output_buffers.insert(index, buffer);
                Ok(OutputPoll::Chunk(OutputChunk {
                    index,
                    offset,
                    size,
                    pts_us: 0,
                    end_of_stream: eos,
                }))
            }
            Some(SessionEvent::BuffersChanged) => Ok(OutputPoll::BuffersChanged),
            Some(SessionEvent::FormatChanged(format)) => {
                self.format = format;
                Ok(OutputPoll::FormatChanged)
            }
            Some(SessionEvent::TryAgainLater) => Ok(OutputPoll::TryAgainLater),
            None => panic!("session script exhausted before output end-of-stream"),
        }
    }

    fn output_buffer(&self, index: usize) -> Result<&[u8]> {
        self.output_buffers
            .get(&index)
            .map(|b| b.as_slice())
            .ok_or_else(|| ConvertError::DecodeIoFailure("unknown output buffer".into()))
    }

    fn release_output(&mut self, index: usize) -> Result<()> {
        self.output_buffers
            .remove(&index)
            .map(|_| ())
            .ok_or_else(|| ConvertError::DecodeIoFailure("releasing unknown buffer".into()))
    }

    fn output_format(&self) -> Result<MediaFormat> {
        Ok(self.format.clone())
    }

    fn stop(&mut self) -> Result<()> {
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Fake Opener & Factory
// ============================================================================

/// Opener that hands out a single pre-built demuxer, ignoring the path.
pub struct FakeOpener {
    demuxer: Mutex<Option<Box<dyn ContainerDemuxer>>>,
}

impl FakeOpener {
    pub fn new(demuxer: FakeDemuxer) -> Self {
        Self {
            demuxer: Mutex::new(Some(Box::new(demuxer))),
        }
    }
}

impl ContainerOpener for FakeOpener {
    fn open(&self, _path: &Path) -> Result<Box<dyn ContainerDemuxer>> {
        self.demuxer
            .lock()
            .unwrap()
            .take()
            .ok_or(ConvertError::NoAudioTrack)
    }
}

/// Factory that hands out a single pre-built session and counts calls.
pub struct FakeFactory {
    session: Mutex<Option<Box<dyn DecoderSession>>>,
    calls: Arc<AtomicUsize>,
    fail_unsupported: bool,
}

impl FakeFactory {
    pub fn new(session: ScriptedSession) -> Self {
        Self {
            session: Mutex::new(Some(Box::new(session))),
            calls: Arc::new(AtomicUsize::new(0)),
            fail_unsupported: false,
        }
    }

    /// Factory that rejects every MIME type with `UnsupportedCodec`.
    pub fn unsupported() -> Self {
        Self {
            session: Mutex::new(None),
            calls: Arc::new(AtomicUsize::new(0)),
            fail_unsupported: true,
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl DecoderFactory for FakeFactory {
    fn create_for_mime(&self, mime_type: &str) -> Result<Box<dyn DecoderSession>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_unsupported {
            return Err(ConvertError::UnsupportedCodec(mime_type.to_string()));
        }
        self.session
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ConvertError::UnsupportedCodec(mime_type.to_string()))
    }
}
