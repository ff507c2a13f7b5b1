//! Gameplay session engine for 4-lane rhythm games.
//!
//! The crate covers the real-time core of a StepMania-style game: a
//! drift-free song clock over decoded audio, edge-triggered lane input
//! merged from keyboard and gamepad, timing-window judging with hold
//! tracking, the score/combo/grade state machine, and the pure time→screen
//! projection the renderer consumes. Chart parsing, storage, networking and
//! pixel drawing are the host's business; the engine is driven one
//! `Session::tick(now)` at a time and reports back through `SessionEvent`s.

pub mod config;
pub mod core;
pub mod game;

pub use crate::core::audio::{AudioError, AudioService, DecodeError, DecodedAudio, PendingLoad};
pub use crate::core::clock::SongClock;
pub use crate::core::gamepad::{stick_to_lanes, GamepadSource};
pub use crate::core::input::{
    handle_key_event, lane_from_keycode, InputEdge, InputPoller, InputSource, Lane, LANE_COUNT,
};
pub use crate::game::chart::{Chart, ChartError, ChartSet, Difficulty, Note, NoteKind, NoteState};
pub use crate::game::hold::{ActiveHold, HoldPhase, HoldTracker};
pub use crate::game::judgment::{Grade, JudgeGrade, Judgment};
pub use crate::game::projection::{project, Geometry, VisibleNote};
pub use crate::game::score::{GameScore, JudgmentCounts, Results, ScoreSnapshot};
pub use crate::game::session::{Session, SessionError, SessionEvent, SessionPhase};
