use log::warn;
use std::time::Instant;

/// Drift-free song-position clock.
///
/// The clock never accumulates elapsed time: every read projects the current
/// position from a single monotonic reference captured at the last
/// `begin`/`resume`, so repeated reads carry no compounding error. All
/// methods take an explicit `now` so hosts and tests can feed synthetic
/// timestamps.
#[derive(Debug, Clone)]
pub struct SongClock {
    transport: Transport,
    looping: bool,
    /// Length of the playback segment in seconds; `f64::INFINITY` when
    /// unbounded.
    play_duration: f64,
}

#[derive(Debug, Clone, Copy)]
enum Transport {
    Stopped,
    Playing {
        start_reference: Instant,
        start_offset: f64,
    },
    Paused {
        position: f64,
    },
}

impl SongClock {
    pub fn new() -> Self {
        Self {
            transport: Transport::Stopped,
            looping: false,
            play_duration: f64::INFINITY,
        }
    }

    /// Starts a playback segment at `offset` seconds. A finite
    /// `play_duration` bounds the segment; with `looping` the position wraps
    /// between `offset` and `offset + play_duration` indefinitely.
    pub fn begin(&mut self, now: Instant, offset: f64, play_duration: f64, looping: bool) {
        if looping && !play_duration.is_finite() {
            warn!("looping segment without a finite duration; loop disabled");
            self.looping = false;
        } else {
            self.looping = looping;
        }
        self.play_duration = play_duration.max(0.0);
        self.transport = Transport::Playing {
            start_reference: now,
            start_offset: offset,
        };
    }

    /// Captures the exact projected position so a later `resume` continues
    /// without an audible jump. No-op unless playing.
    pub fn pause(&mut self, now: Instant) {
        if let Transport::Playing { .. } = self.transport {
            let position = self.current_time(now);
            self.transport = Transport::Paused { position };
        }
    }

    /// No-op unless paused.
    pub fn resume(&mut self, now: Instant) {
        if let Transport::Paused { position } = self.transport {
            self.transport = Transport::Playing {
                start_reference: now,
                start_offset: position,
            };
        }
    }

    /// Halts the segment and resets the position to 0.
    pub fn stop(&mut self) {
        self.transport = Transport::Stopped;
        self.looping = false;
        self.play_duration = f64::INFINITY;
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.transport, Transport::Playing { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.transport, Transport::Paused { .. })
    }

    /// Current song position in seconds. Pure projection of
    /// `(now - start_reference) + start_offset`; modulo wrapping applies only
    /// while looping.
    pub fn current_time(&self, now: Instant) -> f64 {
        match self.transport {
            Transport::Stopped => 0.0,
            Transport::Paused { position } => position,
            Transport::Playing {
                start_reference,
                start_offset,
            } => {
                let elapsed = now.saturating_duration_since(start_reference).as_secs_f64();
                if self.looping && self.play_duration > 0.0 {
                    start_offset + elapsed % self.play_duration
                } else {
                    start_offset + elapsed.min(self.play_duration)
                }
            }
        }
    }

    /// True once a non-looping segment has run past its duration. Looping
    /// segments never end on their own.
    pub fn has_ended(&self, now: Instant) -> bool {
        match self.transport {
            Transport::Playing {
                start_reference, ..
            } => {
                !self.looping
                    && self.play_duration.is_finite()
                    && now.saturating_duration_since(start_reference).as_secs_f64()
                        >= self.play_duration
            }
            Transport::Stopped | Transport::Paused { .. } => false,
        }
    }
}

impl Default for SongClock {
    fn default() -> Self {
        Self::new()
    }
}
