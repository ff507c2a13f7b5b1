use crate::core::input::Lane;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The note variants a chart can carry. A Jump hits exactly two distinct
/// lanes at the same timestamp; a Hold spans `time..end_time` on one lane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum NoteKind {
    Tap { lane: Lane },
    Jump { lanes: [Lane; 2] },
    Hold { lane: Lane, end_time: f32 },
}

impl NoteKind {
    pub fn occupies(&self, lane: Lane) -> bool {
        match self {
            NoteKind::Tap { lane: l } | NoteKind::Hold { lane: l, .. } => *l == lane,
            NoteKind::Jump { lanes } => lanes[0] == lane || lanes[1] == lane,
        }
    }

    pub fn hold_end_time(&self) -> Option<f32> {
        match self {
            NoteKind::Hold { end_time, .. } => Some(*end_time),
            _ => None,
        }
    }
}

/// A single chart event. Immutable once the chart is built; judging mutates
/// only the per-session `NoteState`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub time: f32,
    pub kind: NoteKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    NonFiniteTime { index: usize },
    HoldEndsBeforeStart { index: usize },
    DuplicateJumpLanes { index: usize },
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartError::NonFiniteTime { index } => {
                write!(f, "note {index} has a non-finite timestamp")
            }
            ChartError::HoldEndsBeforeStart { index } => {
                write!(f, "hold note {index} ends at or before its start")
            }
            ChartError::DuplicateJumpLanes { index } => {
                write!(f, "jump note {index} names the same lane twice")
            }
        }
    }
}

impl std::error::Error for ChartError {}

/// An immutable, time-sorted chart. Loaded once per session.
#[derive(Clone, Debug)]
pub struct Chart {
    notes: Vec<Note>,
    difficulty_rating: u32,
}

impl Chart {
    /// Validates and time-sorts the notes. The sort is stable, so notes at
    /// the same timestamp keep their input order (the judging tie-break
    /// depends on a deterministic chart order).
    pub fn new(mut notes: Vec<Note>, difficulty_rating: u32) -> Result<Self, ChartError> {
        for (index, note) in notes.iter().enumerate() {
            if !note.time.is_finite() {
                return Err(ChartError::NonFiniteTime { index });
            }
            match note.kind {
                NoteKind::Hold { end_time, .. } => {
                    if !end_time.is_finite() || end_time <= note.time {
                        return Err(ChartError::HoldEndsBeforeStart { index });
                    }
                }
                NoteKind::Jump { lanes } => {
                    if lanes[0] == lanes[1] {
                        return Err(ChartError::DuplicateJumpLanes { index });
                    }
                }
                NoteKind::Tap { .. } => {}
            }
        }
        notes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self {
            notes,
            difficulty_rating,
        })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Feet/meter rating. Display only, no gameplay effect.
    pub fn difficulty_rating(&self) -> u32 {
        self.difficulty_rating
    }

    /// Timestamp of the last relevant event (hold tails included).
    pub fn last_event_time(&self) -> f32 {
        self.notes.iter().fold(0.0_f32, |acc, n| {
            acc.max(n.kind.hold_end_time().unwrap_or(n.time))
        })
    }
}

/// Difficulty selector for a `ChartSet`, mirroring the four tiers the chart
/// generation pipeline produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

/// The charts available for one song, keyed by difficulty. Produced by the
/// external chart-generation or import pipeline.
#[derive(Clone, Debug, Default)]
pub struct ChartSet {
    charts: HashMap<Difficulty, Arc<Chart>>,
}

impl ChartSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, difficulty: Difficulty, chart: Chart) {
        self.charts.insert(difficulty, Arc::new(chart));
    }

    pub fn get(&self, difficulty: Difficulty) -> Option<Arc<Chart>> {
        self.charts.get(&difficulty).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

/// Per-note judging state, rebuilt at every session start. `hit` and
/// `missed` are mutually exclusive and latch: once either is set it never
/// reverts, which is what makes double-judging impossible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteState {
    pub hit: bool,
    pub missed: bool,
    /// Only meaningful for Hold notes; toggled by the hold tracker.
    pub hold_active: bool,
}

impl NoteState {
    #[inline(always)]
    pub fn is_judged(&self) -> bool {
        self.hit || self.missed
    }
}

pub fn new_note_states(chart: &Chart) -> Vec<NoteState> {
    vec![NoteState::default(); chart.note_count()]
}

#[cfg(test)]
mod tests {
    use super::{Chart, ChartError, Note, NoteKind};
    use crate::core::input::Lane;

    fn tap(time: f32, lane: Lane) -> Note {
        Note {
            time,
            kind: NoteKind::Tap { lane },
        }
    }

    #[test]
    fn notes_are_sorted_by_time_on_build() {
        let chart = Chart::new(
            vec![tap(2.0, Lane::Left), tap(0.5, Lane::Down), tap(1.0, Lane::Up)],
            3,
        )
        .unwrap();
        let times: Vec<f32> = chart.notes().iter().map(|n| n.time).collect();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn hold_must_end_after_start() {
        let err = Chart::new(
            vec![Note {
                time: 1.0,
                kind: NoteKind::Hold {
                    lane: Lane::Left,
                    end_time: 1.0,
                },
            }],
            1,
        )
        .unwrap_err();
        assert_eq!(err, ChartError::HoldEndsBeforeStart { index: 0 });
    }

    #[test]
    fn jump_lanes_must_differ() {
        let err = Chart::new(
            vec![Note {
                time: 1.0,
                kind: NoteKind::Jump {
                    lanes: [Lane::Up, Lane::Up],
                },
            }],
            1,
        )
        .unwrap_err();
        assert_eq!(err, ChartError::DuplicateJumpLanes { index: 0 });
    }

    #[test]
    fn non_finite_time_is_rejected() {
        let err = Chart::new(vec![tap(f32::NAN, Lane::Left)], 1).unwrap_err();
        assert_eq!(err, ChartError::NonFiniteTime { index: 0 });
    }

    #[test]
    fn last_event_time_includes_hold_tails() {
        let chart = Chart::new(
            vec![
                tap(1.0, Lane::Left),
                Note {
                    time: 2.0,
                    kind: NoteKind::Hold {
                        lane: Lane::Down,
                        end_time: 4.5,
                    },
                },
            ],
            5,
        )
        .unwrap();
        assert_eq!(chart.last_event_time(), 4.5);
    }
}
