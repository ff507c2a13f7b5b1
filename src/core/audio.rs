use crate::core::clock::SongClock;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use lewton::inside_ogg::OggStreamReader;
use log::{error, info, warn};
use std::fmt;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

// --- Errors ---

/// The payload handed to `load` was not decodable audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub message: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audio decode failed: {}", self.message)
    }
}

impl std::error::Error for DecodeError {}

/// Output-device acquisition failed. Recoverable: the host can retry or run
/// without playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    NoOutputDevice,
    OutputConfig(String),
    Stream(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::NoOutputDevice => write!(f, "no audio output device"),
            AudioError::OutputConfig(e) => write!(f, "no usable output config: {e}"),
            AudioError::Stream(e) => write!(f, "audio stream error: {e}"),
        }
    }
}

impl std::error::Error for AudioError {}

// --- Decoded audio ---

/// A fully decoded, interleaved PCM payload. Produced by `decode_ogg` (or a
/// `PendingLoad`) and applied to an `AudioService` via `load`/`finish_load`.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<i16>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }
}

/// Decodes an Ogg Vorbis payload fully before returning.
pub fn decode_ogg(bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
    // The cancel flag is never raised here, so the decode always completes.
    match decode_ogg_cancellable(bytes, &AtomicBool::new(false)) {
        Some(result) => result,
        None => Err(DecodeError {
            message: "decode cancelled".to_string(),
        }),
    }
}

fn decode_ogg_cancellable(
    bytes: &[u8],
    cancel: &AtomicBool,
) -> Option<Result<DecodedAudio, DecodeError>> {
    let mut ogg = match OggStreamReader::new(Cursor::new(bytes.to_vec())) {
        Ok(ogg) => ogg,
        Err(e) => {
            return Some(Err(DecodeError {
                message: e.to_string(),
            }))
        }
    };
    let channels = ogg.ident_hdr.audio_channels as usize;
    let sample_rate = ogg.ident_hdr.audio_sample_rate;
    if channels == 0 || sample_rate == 0 {
        return Some(Err(DecodeError {
            message: "stream reports zero channels or sample rate".to_string(),
        }));
    }

    let mut samples = Vec::new();
    loop {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        match ogg.read_dec_packet_itl() {
            Ok(Some(packet)) => samples.extend_from_slice(&packet),
            Ok(None) => break,
            Err(e) => {
                return Some(Err(DecodeError {
                    message: e.to_string(),
                }))
            }
        }
    }

    Some(Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    }))
}

/// Linear-interpolation resample plus channel remap. Mono payloads are
/// duplicated across output channels; extra source channels fold by index
/// wrap, matching the output mapping the mixer expects.
fn convert_samples(
    samples: &[i16],
    in_channels: usize,
    in_rate: u32,
    out_channels: usize,
    out_rate: u32,
) -> Vec<i16> {
    if in_channels == 0 || out_channels == 0 {
        return Vec::new();
    }
    if in_channels == out_channels && in_rate == out_rate {
        return samples.to_vec();
    }
    let in_frames = samples.len() / in_channels;
    if in_frames == 0 {
        return Vec::new();
    }
    let out_frames = ((in_frames as u64 * out_rate as u64) / in_rate as u64) as usize;
    let step = in_rate as f64 / out_rate as f64;
    let mut out = Vec::with_capacity(out_frames * out_channels);
    for i in 0..out_frames {
        let src = i as f64 * step;
        let i0 = (src as usize).min(in_frames - 1);
        let i1 = (i0 + 1).min(in_frames - 1);
        let frac = (src - i0 as f64) as f32;
        for c in 0..out_channels {
            let sc = c % in_channels;
            let a = samples[i0 * in_channels + sc] as f32;
            let b = samples[i1 * in_channels + sc] as f32;
            out.push((a + (b - a) * frac) as i16);
        }
    }
    out
}

// --- Cancellable async load ---

/// A decode running on a worker thread. Dropping or cancelling the handle
/// abandons the load; a decode finishing after abandonment is discarded,
/// never applied.
pub struct PendingLoad {
    cancel: Arc<AtomicBool>,
    receiver: Receiver<Result<DecodedAudio, DecodeError>>,
}

impl PendingLoad {
    pub fn begin(bytes: Vec<u8>) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_worker = cancel.clone();
        let (sender, receiver) = channel();
        thread::spawn(move || {
            if let Some(result) = decode_ogg_cancellable(&bytes, &cancel_worker) {
                if !cancel_worker.load(Ordering::Relaxed) {
                    // The receiver may be gone; a late decode is simply dropped.
                    let _ = sender.send(result);
                }
            }
        });
        Self { cancel, receiver }
    }

    /// Abandons the load. The worker bails out at its next packet boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Non-blocking poll. `None` while the decode is still running or after
    /// cancellation.
    pub fn try_finish(&mut self) -> Option<Result<DecodedAudio, DecodeError>> {
        if self.cancel.load(Ordering::Relaxed) {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

// --- Output device ---

/// What the mixer callback plays. Guarded by a mutex; the callback uses
/// `try_lock` and emits one buffer of silence on contention rather than
/// blocking the audio thread.
#[derive(Default)]
struct PlaybackSlot {
    samples: Option<Arc<Vec<i16>>>,
    channels: usize,
    cursor: usize,
    start_frame: usize,
    end_frame: usize,
    looping: bool,
    playing: bool,
    volume: f32,
}

impl PlaybackSlot {
    fn clear(&mut self) {
        self.samples = None;
        self.playing = false;
        self.cursor = 0;
    }

    fn fill(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let Some(samples) = self.samples.clone() else {
            return;
        };
        if !self.playing || self.channels == 0 {
            return;
        }
        let channels = self.channels;
        let gain = self.volume / 32768.0;
        let mut frame = 0;
        let out_frames = out.len() / channels;
        while frame < out_frames {
            if self.cursor >= self.end_frame {
                if self.looping {
                    self.cursor = self.start_frame;
                } else {
                    self.playing = false;
                    break;
                }
            }
            let base = self.cursor * channels;
            for c in 0..channels {
                out[frame * channels + c] = samples[base + c] as f32 * gain;
            }
            self.cursor += 1;
            frame += 1;
        }
    }
}

/// The process-wide output-device claim: a dedicated thread owns the cpal
/// stream for its whole lifetime and parks until the service is dropped.
struct Output {
    shared: Arc<Mutex<PlaybackSlot>>,
    // Dropping the sender disconnects the park channel and ends the thread.
    _shutdown: Sender<()>,
    sample_rate: u32,
    channels: usize,
}

impl Output {
    fn spawn() -> Result<Self, AudioError> {
        let shared = Arc::new(Mutex::new(PlaybackSlot::default()));
        let shared_cb = shared.clone();
        let (shutdown_tx, shutdown_rx) = channel::<()>();
        let (ready_tx, ready_rx) = channel::<Result<(u32, usize), AudioError>>();

        thread::spawn(move || {
            let built = build_stream(shared_cb);
            match built {
                Ok((stream, sample_rate, channels)) => {
                    let _ = ready_tx.send(Ok((sample_rate, channels)));
                    // Park until the owning service goes away.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        });

        let (sample_rate, channels) = ready_rx
            .recv()
            .map_err(|_| AudioError::Stream("output thread died during init".to_string()))??;
        info!("Audio output claimed ({sample_rate} Hz, {channels} ch)");
        Ok(Self {
            shared,
            _shutdown: shutdown_tx,
            sample_rate,
            channels,
        })
    }
}

fn build_stream(
    shared: Arc<Mutex<PlaybackSlot>>,
) -> Result<(cpal::Stream, u32, usize), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| AudioError::OutputConfig(e.to_string()))?;
    let stream_config: StreamConfig = config.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels as usize;

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _| match shared.try_lock() {
                Ok(mut slot) => slot.fill(data),
                Err(_) => data.fill(0.0),
            },
            |err| error!("Audio stream error: {err}"),
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))?;
    stream
        .play()
        .map_err(|e| AudioError::Stream(e.to_string()))?;
    Ok((stream, sample_rate, channels))
}

// --- Service ---

struct Track {
    samples: Arc<Vec<i16>>,
    channels: usize,
    sample_rate: u32,
    duration: f64,
}

/// Owns the decoded track, the (optional) output-device claim and the song
/// clock. One service exists per process; a `Session` takes ownership of it
/// for the duration of its playback claim.
pub struct AudioService {
    output: Option<Output>,
    track: Option<Track>,
    clock: SongClock,
}

impl AudioService {
    /// Claims the default output device. Fails with a recoverable
    /// `AudioError` (never panics) if no device or config is usable.
    pub fn with_default_output() -> Result<Self, AudioError> {
        let output = Output::spawn()?;
        Ok(Self {
            output: Some(output),
            track: None,
            clock: SongClock::new(),
        })
    }

    /// A service with identical clock and decode behavior but no device.
    /// For headless hosts and tests.
    pub fn without_output() -> Self {
        Self {
            output: None,
            track: None,
            clock: SongClock::new(),
        }
    }

    /// Decodes `bytes` fully before returning and installs the track.
    /// Replaces any previous track and halts playback.
    pub fn load(&mut self, bytes: &[u8]) -> Result<f64, DecodeError> {
        let decoded = decode_ogg(bytes)?;
        Ok(self.finish_load(decoded))
    }

    /// Applies an already-decoded payload (the tail end of a `PendingLoad`).
    /// Returns the track duration in seconds.
    pub fn finish_load(&mut self, decoded: DecodedAudio) -> f64 {
        self.stop();
        let duration = decoded.duration();
        let (samples, channels, sample_rate) = match &self.output {
            Some(out) => (
                convert_samples(
                    &decoded.samples,
                    decoded.channels,
                    decoded.sample_rate,
                    out.channels,
                    out.sample_rate,
                ),
                out.channels,
                out.sample_rate,
            ),
            None => (decoded.samples, decoded.channels, decoded.sample_rate),
        };
        info!(
            "Loaded track: {:.2}s at {} Hz, {} ch",
            duration, sample_rate, channels
        );
        self.track = Some(Track {
            samples: Arc::new(samples),
            channels,
            sample_rate,
            duration,
        });
        self.clock = SongClock::new();
        duration
    }

    pub fn is_loaded(&self) -> bool {
        self.track.is_some()
    }

    pub fn duration(&self) -> Option<f64> {
        self.track.as_ref().map(|t| t.duration)
    }

    /// Begins playback at `offset` seconds, superseding any current segment.
    /// `duration` bounds the segment (required when `looping`); `volume` is a
    /// 0..=1 gain applied in the mixer.
    pub fn play(
        &mut self,
        now: Instant,
        offset: f64,
        duration: Option<f64>,
        looping: bool,
        volume: f32,
    ) {
        let Some(track) = self.track.as_ref() else {
            warn!("play() before load(); ignoring");
            return;
        };
        let offset = offset.clamp(0.0, track.duration);
        let segment = duration
            .unwrap_or(track.duration - offset)
            .clamp(0.0, track.duration - offset);
        self.clock.begin(now, offset, segment, looping);

        if let Some(out) = &self.output {
            let start_frame = (offset * track.sample_rate as f64) as usize;
            let end_frame = ((offset + segment) * track.sample_rate as f64) as usize;
            let end_frame = end_frame.min(track.samples.len() / track.channels.max(1));
            let mut slot = out.shared.lock().unwrap();
            slot.samples = Some(track.samples.clone());
            slot.channels = track.channels;
            slot.start_frame = start_frame;
            slot.end_frame = end_frame;
            slot.cursor = start_frame;
            slot.looping = looping;
            slot.volume = volume.clamp(0.0, 1.0);
            slot.playing = true;
        }
    }

    /// Captures the exact projected position. No-op when not playing.
    pub fn pause(&mut self, now: Instant) {
        if !self.clock.is_playing() {
            return;
        }
        self.clock.pause(now);
        if let Some(out) = &self.output {
            out.shared.lock().unwrap().playing = false;
        }
    }

    /// No-op when not paused. The mixer cursor is re-derived from the clock
    /// so the audible position matches the projection.
    pub fn resume(&mut self, now: Instant) {
        if !self.clock.is_paused() {
            return;
        }
        self.clock.resume(now);
        let position = self.clock.current_time(now);
        if let (Some(out), Some(track)) = (&self.output, &self.track) {
            let mut slot = out.shared.lock().unwrap();
            slot.cursor = (position * track.sample_rate as f64) as usize;
            slot.playing = true;
        }
    }

    /// Halts playback and resets the position to 0.
    pub fn stop(&mut self) {
        self.clock.stop();
        if let Some(out) = &self.output {
            out.shared.lock().unwrap().clear();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    /// Side-effect-free, drift-free song position.
    pub fn current_time(&self, now: Instant) -> f64 {
        self.clock.current_time(now)
    }

    pub fn has_ended(&self, now: Instant) -> bool {
        self.clock.has_ended(now)
    }
}
