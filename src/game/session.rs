use crate::config::{LEAD_IN_SECONDS, MAX_DELTA_TIME, RECEPTOR_FLASH_DURATION};
use crate::core::audio::{AudioService, DecodeError, DecodedAudio};
use crate::core::input::{InputPoller, Lane, LANE_COUNT};
use crate::game::chart::{new_note_states, Chart, ChartSet, Difficulty, NoteState};
use crate::game::hold::{ActiveHold, HoldPhase, HoldTracker};
use crate::game::judge::Judge;
use crate::game::projection::{project, Geometry, VisibleNote};
use crate::game::score::{GameScore, Results, ScoreSnapshot};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Idle,
    LeadIn,
    Playing,
    Paused,
    Finished,
}

/// The entire outward event surface of the engine: phase transitions, a
/// score snapshot at most once per tick, and the final results exactly once.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    ScoreUpdated(ScoreSnapshot),
    Finished(Results),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The requested difficulty is missing from the chart set.
    ChartUnavailable(Difficulty),
    /// Audio, chart or viewport not ready at start time.
    ResourceNotReady(&'static str),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ChartUnavailable(difficulty) => {
                write!(f, "no {difficulty:?} chart in the chart set")
            }
            SessionError::ResourceNotReady(what) => {
                write!(f, "{what} is not ready")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// The gameplay session: sequences Idle → LeadIn → Playing → (Paused ⇄
/// Playing) → Finished and coordinates the clock, poller, judge, hold
/// tracker and score. The host drives it with `tick(now)`; the engine owns
/// no timer or loop of its own.
pub struct Session {
    audio: AudioService,
    charts: ChartSet,
    geometry: Geometry,

    phase: SessionPhase,
    chart: Option<Arc<Chart>>,
    states: Vec<NoteState>,
    score: GameScore,
    judge: Judge,
    holds: HoldTracker,
    input: InputPoller,

    virtual_time: f32,
    current_time: f32,
    duration: f64,
    last_tick: Option<Instant>,
    lane_flash: [f32; LANE_COUNT],
    last_snapshot: Option<ScoreSnapshot>,
    results: Option<Results>,
    events: Vec<SessionEvent>,
}

impl Session {
    /// Takes ownership of the process's one audio-output claim.
    pub fn new(audio: AudioService, charts: ChartSet, geometry: Geometry) -> Self {
        Self {
            audio,
            charts,
            geometry,
            phase: SessionPhase::Idle,
            chart: None,
            states: Vec::new(),
            score: GameScore::new(0),
            judge: Judge::new(),
            holds: HoldTracker::empty(),
            input: InputPoller::new(),
            virtual_time: 0.0,
            current_time: 0.0,
            duration: 0.0,
            last_tick: None,
            lane_flash: [0.0; LANE_COUNT],
            last_snapshot: None,
            results: None,
            events: Vec::new(),
        }
    }

    /// Decodes and installs the session's audio payload.
    pub fn load_audio(&mut self, bytes: &[u8]) -> Result<f64, DecodeError> {
        self.audio.load(bytes)
    }

    /// Applies a payload decoded off-thread (see `PendingLoad`).
    pub fn finish_audio_load(&mut self, decoded: DecodedAudio) -> f64 {
        self.audio.finish_load(decoded)
    }

    /// Checks preconditions, builds the per-session judging state and enters
    /// LeadIn. Valid from Idle and Finished; elsewhere a warning no-op.
    pub fn start(&mut self, difficulty: Difficulty, now: Instant) -> Result<(), SessionError> {
        if !matches!(self.phase, SessionPhase::Idle | SessionPhase::Finished) {
            warn!("start() in {:?}; ignoring", self.phase);
            return Ok(());
        }
        let chart = self
            .charts
            .get(difficulty)
            .ok_or(SessionError::ChartUnavailable(difficulty))?;
        let Some(duration) = self.audio.duration() else {
            return Err(SessionError::ResourceNotReady("audio"));
        };
        if self.geometry.width <= 0.0 || self.geometry.height <= 0.0 {
            return Err(SessionError::ResourceNotReady("viewport"));
        }

        info!(
            "Session start: {:?} chart, {} notes, rating {}",
            difficulty,
            chart.note_count(),
            chart.difficulty_rating()
        );
        self.states = new_note_states(&chart);
        self.score = GameScore::new(chart.note_count());
        self.judge = Judge::new();
        self.holds = HoldTracker::new(&chart);
        self.input.reset();
        self.chart = Some(chart);
        self.duration = duration;
        self.virtual_time = -LEAD_IN_SECONDS;
        self.current_time = -LEAD_IN_SECONDS;
        self.last_tick = Some(now);
        self.lane_flash = [0.0; LANE_COUNT];
        self.last_snapshot = None;
        self.results = None;
        self.set_phase(SessionPhase::LeadIn);
        Ok(())
    }

    /// One frame of the engine. Order within a tick: clock read, input poll,
    /// press judging, miss sweep, hold update, song-end check, score
    /// notification. Idle and Finished ticks do nothing.
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Finished => return self.drain_events(),
            SessionPhase::Paused => {
                // Render-only tick: keep the poller's diff state current but
                // discard the edges, so keys pressed or released while paused
                // do not burst stale transitions into the resumed tick.
                let t = self.current_time;
                let _ = self.input.poll(t);
                self.last_tick = Some(now);
                return self.drain_events();
            }
            SessionPhase::LeadIn | SessionPhase::Playing => {}
        }

        let dt = self.delta(now);
        let Some(chart) = self.chart.clone() else {
            return self.drain_events();
        };

        if self.phase == SessionPhase::LeadIn {
            self.virtual_time += dt;
            if self.virtual_time >= 0.0 {
                self.audio.play(now, 0.0, None, false, 1.0);
                self.set_phase(SessionPhase::Playing);
                info!("Lead-in complete; audio started");
            }
        }
        let t = match self.phase {
            SessionPhase::Playing => self.audio.current_time(now) as f32,
            _ => self.virtual_time,
        };
        self.current_time = t;

        for edge in self.input.poll(t) {
            if edge.pressed {
                let judged = self.judge.handle_press(
                    &chart,
                    &mut self.states,
                    &mut self.score,
                    &mut self.holds,
                    edge.lane,
                    edge.time,
                );
                if judged.is_some() {
                    self.lane_flash[edge.lane.index()] = RECEPTOR_FLASH_DURATION;
                }
            } else {
                self.holds.handle_release(edge.lane, edge.time, &mut self.states);
            }
        }

        self.judge
            .sweep_misses(&chart, &mut self.states, &mut self.score, t);
        self.holds.tick(t, &mut self.states);
        for flash in &mut self.lane_flash {
            *flash = (*flash - dt).max(0.0);
        }

        if self.phase == SessionPhase::Playing
            && (self.audio.has_ended(now) || f64::from(t) >= self.duration)
        {
            self.finish();
        }

        let snapshot = self.score.snapshot();
        if self.last_snapshot != Some(snapshot) {
            self.last_snapshot = Some(snapshot);
            self.events.push(SessionEvent::ScoreUpdated(snapshot));
        }

        self.drain_events()
    }

    /// Valid only from Playing; elsewhere a tolerated no-op.
    pub fn pause(&mut self, now: Instant) {
        if self.phase != SessionPhase::Playing {
            return;
        }
        self.audio.pause(now);
        self.set_phase(SessionPhase::Paused);
    }

    /// Valid only from Paused; elsewhere a tolerated no-op.
    pub fn resume(&mut self, now: Instant) {
        if self.phase != SessionPhase::Paused {
            return;
        }
        self.audio.resume(now);
        self.last_tick = Some(now);
        self.set_phase(SessionPhase::Playing);
    }

    /// Tears the session down from any state. Later ticks are no-ops until
    /// the next `start()`.
    pub fn stop(&mut self) {
        self.audio.stop();
        self.input.reset();
        self.states.clear();
        self.holds = HoldTracker::empty();
        self.chart = None;
        self.results = None;
        self.last_tick = None;
        if self.phase != SessionPhase::Idle {
            self.set_phase(SessionPhase::Idle);
            info!("Session stopped");
        }
    }

    /// Full teardown and re-entry into LeadIn.
    pub fn restart(&mut self, difficulty: Difficulty, now: Instant) -> Result<(), SessionError> {
        self.stop();
        self.start(difficulty, now)
    }

    /// Forwards a window-size change to the projection geometry.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.geometry = Geometry::for_window(width, height);
    }

    /// The frame's visual note layout at the current song time.
    pub fn render_frame(&self) -> Vec<VisibleNote> {
        match &self.chart {
            Some(chart) => project(chart, &self.states, self.current_time, &self.geometry),
            None => Vec::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn score(&self) -> &GameScore {
        &self.score
    }

    pub fn results(&self) -> Option<&Results> {
        self.results.as_ref()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Per-lane receptor flash timers (render feedback only).
    pub fn lane_flash(&self) -> &[f32; LANE_COUNT] {
        &self.lane_flash
    }

    /// Holds currently engaged, for drawing continuous bodies.
    pub fn active_holds(&self) -> impl Iterator<Item = (Lane, ActiveHold)> + '_ {
        self.holds.active_lanes()
    }

    /// Lifecycle phase of one hold note.
    pub fn hold_phase(&self, note_index: usize) -> HoldPhase {
        self.holds.phase(note_index)
    }

    /// The input poller, for the host's keyboard/gamepad frontends.
    pub fn input_mut(&mut self) -> &mut InputPoller {
        &mut self.input
    }

    /// The audio service, for preview playback and volume control.
    pub fn audio_mut(&mut self) -> &mut AudioService {
        &mut self.audio
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.events.push(SessionEvent::PhaseChanged(phase));
    }

    fn finish(&mut self) {
        self.audio.stop();
        self.input.reset();
        let results = self.score.finalize();
        info!(
            "Session finished: {}/{} points, {:?}, max combo {}",
            results.score, results.max_possible_score, results.grade, results.max_combo
        );
        self.results = Some(results);
        self.set_phase(SessionPhase::Finished);
        self.events.push(SessionEvent::Finished(results));
    }

    fn delta(&mut self, now: Instant) -> f32 {
        let dt = match self.last_tick {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f32(),
            None => 0.0,
        };
        self.last_tick = Some(now);
        dt.min(MAX_DELTA_TIME)
    }

    fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }
}
