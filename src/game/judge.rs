use crate::core::input::Lane;
use crate::game::chart::{Chart, NoteKind, NoteState};
use crate::game::hold::HoldTracker;
use crate::game::judgment::{grade_for_offset, JudgeGrade, Judgment, GOOD_WINDOW};
use crate::game::score::GameScore;
use log::info;

/// Matches press edges against unconsumed notes and latches misses once a
/// note's window has fully elapsed. The forward cursor rides the time-sorted
/// note list so both operations stay O(window) per tick.
pub struct Judge {
    cursor: usize,
}

impl Judge {
    pub fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Judges a press at `lane`/`time`. Among unconsumed notes occupying the
    /// lane within the Good window, the nearest in time wins; exact ties go
    /// to the earliest chart index. Exactly one note is consumed per press; a
    /// press that finds no candidate is a ghost press and returns `None`.
    pub fn handle_press(
        &mut self,
        chart: &Chart,
        states: &mut [NoteState],
        score: &mut GameScore,
        holds: &mut HoldTracker,
        lane: Lane,
        time: f32,
    ) -> Option<Judgment> {
        let notes = chart.notes();
        let mut best: Option<(usize, f32)> = None;
        for index in self.cursor..notes.len() {
            let note = &notes[index];
            if note.time > time + GOOD_WINDOW {
                break;
            }
            if states[index].is_judged() || !note.kind.occupies(lane) {
                continue;
            }
            let offset = (time - note.time).abs();
            if offset > GOOD_WINDOW {
                continue;
            }
            match best {
                Some((_, best_offset)) if offset >= best_offset => {}
                _ => best = Some((index, offset)),
            }
        }

        let (index, offset) = best?;
        let grade = grade_for_offset(offset)?;
        let time_error = time - notes[index].time;

        states[index].hit = true;
        score.record(grade);
        info!(
            "JUDGED: note {}, lane {:?}, error {:+.2}ms, {:?}",
            index,
            lane,
            time_error * 1000.0,
            grade
        );

        if let NoteKind::Hold { end_time, .. } = notes[index].kind {
            holds.activate(lane, index, end_time, states);
        }

        Some(Judgment {
            note_index: index,
            grade,
            time_error_ms: time_error * 1000.0,
        })
    }

    /// Latches a miss on every unaddressed note whose window has fully
    /// elapsed. Run after press processing within a tick so a press exactly
    /// on the window boundary counts as a hit, not a miss. Returns how many
    /// notes were missed.
    pub fn sweep_misses(
        &mut self,
        chart: &Chart,
        states: &mut [NoteState],
        score: &mut GameScore,
        time: f32,
    ) -> u32 {
        let notes = chart.notes();
        let mut missed = 0;
        for index in self.cursor..notes.len() {
            let note = &notes[index];
            if time - note.time <= GOOD_WINDOW {
                // Notes are time-sorted, so nothing later is missable either.
                break;
            }
            if !states[index].is_judged() {
                states[index].missed = true;
                score.record(JudgeGrade::Miss);
                missed += 1;
                info!("MISSED: note {} at t={:.3}", index, note.time);
            }
        }

        while self.cursor < notes.len() && states[self.cursor].is_judged() {
            self.cursor += 1;
        }
        missed
    }
}

impl Default for Judge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Judge;
    use crate::core::input::Lane;
    use crate::game::chart::{new_note_states, Chart, Note, NoteKind, NoteState};
    use crate::game::hold::{HoldPhase, HoldTracker};
    use crate::game::judgment::JudgeGrade;
    use crate::game::score::GameScore;

    struct Field {
        chart: Chart,
        states: Vec<NoteState>,
        score: GameScore,
        holds: HoldTracker,
        judge: Judge,
    }

    impl Field {
        fn new(notes: Vec<Note>) -> Self {
            let chart = Chart::new(notes, 4).unwrap();
            let states = new_note_states(&chart);
            let score = GameScore::new(chart.note_count());
            let holds = HoldTracker::new(&chart);
            Self {
                chart,
                states,
                score,
                holds,
                judge: Judge::new(),
            }
        }

        fn press(&mut self, lane: Lane, time: f32) -> Option<JudgeGrade> {
            self.judge
                .handle_press(
                    &self.chart,
                    &mut self.states,
                    &mut self.score,
                    &mut self.holds,
                    lane,
                    time,
                )
                .map(|j| j.grade)
        }

        fn sweep(&mut self, time: f32) -> u32 {
            self.judge
                .sweep_misses(&self.chart, &mut self.states, &mut self.score, time)
        }
    }

    fn tap(time: f32, lane: Lane) -> Note {
        Note {
            time,
            kind: NoteKind::Tap { lane },
        }
    }

    #[test]
    fn window_boundaries_judge_exactly() {
        // Note at t=0 so the boundary offsets are bit-exact.
        let mut field = Field::new(vec![tap(0.0, Lane::Left)]);
        assert_eq!(field.press(Lane::Left, 0.0225), Some(JudgeGrade::Marvelous));

        let mut field = Field::new(vec![tap(0.0, Lane::Left)]);
        assert_eq!(field.press(Lane::Left, 0.0226), Some(JudgeGrade::Perfect));

        let mut field = Field::new(vec![tap(0.0, Lane::Left)]);
        assert_eq!(field.press(Lane::Left, 0.1351), None);
        assert!(!field.states[0].is_judged());
    }

    #[test]
    fn early_presses_judge_symmetrically() {
        // 0.045 - 0.0225 is exact in f32, so the early boundary is bit-exact.
        let mut field = Field::new(vec![tap(0.045, Lane::Left)]);
        assert_eq!(field.press(Lane::Left, 0.0225), Some(JudgeGrade::Marvelous));

        // Far too early: ghost press, the note stays pending.
        let mut field = Field::new(vec![tap(0.25, Lane::Left)]);
        assert_eq!(field.press(Lane::Left, 0.1), None);
        assert!(!field.states[0].is_judged());

        // Early but inside the Good window.
        let mut field = Field::new(vec![tap(0.25, Lane::Left)]);
        assert_eq!(field.press(Lane::Left, 0.125), Some(JudgeGrade::Good));
    }

    #[test]
    fn miss_latches_just_past_the_window() {
        let mut field = Field::new(vec![tap(1.0, Lane::Left)]);
        assert_eq!(field.sweep(1.135), 0);
        assert_eq!(field.sweep(1.136), 1);
        assert!(field.states[0].missed);
        assert_eq!(field.score.judgments().miss, 1);
    }

    #[test]
    fn press_exactly_on_boundary_beats_the_sweep() {
        let mut field = Field::new(vec![tap(1.0, Lane::Left)]);
        // Tick order: presses first, then the sweep at the same timestamp.
        assert_eq!(field.press(Lane::Left, 1.135), Some(JudgeGrade::Good));
        assert_eq!(field.sweep(1.135), 0);
        assert!(field.states[0].hit && !field.states[0].missed);
    }

    #[test]
    fn missed_note_cannot_be_hit_afterwards() {
        let mut field = Field::new(vec![tap(1.0, Lane::Left)]);
        field.sweep(1.2);
        assert!(field.states[0].missed);

        // The late press finds nothing; counts are untouched.
        assert_eq!(field.press(Lane::Left, 1.21), None);
        assert!(!field.states[0].hit);
        assert_eq!(field.score.judgments().judged(), 1);
    }

    #[test]
    fn nearest_candidate_wins() {
        let mut field = Field::new(vec![tap(1.0, Lane::Left), tap(1.1, Lane::Left)]);
        // 1.08 is 80ms from the first note, 20ms from the second.
        assert_eq!(field.press(Lane::Left, 1.08), Some(JudgeGrade::Marvelous));
        assert!(field.states[1].hit);
        assert!(!field.states[0].is_judged());
    }

    #[test]
    fn exact_tie_goes_to_earliest_chart_order() {
        // 1.0, 1.125 and 1.25 are all exactly representable, so both offsets
        // are bit-identical 0.125.
        let mut field = Field::new(vec![tap(1.0, Lane::Left), tap(1.25, Lane::Left)]);
        field.press(Lane::Left, 1.125);
        assert!(field.states[0].hit);
        assert!(!field.states[1].is_judged());
    }

    #[test]
    fn one_note_consumed_per_press() {
        let mut field = Field::new(vec![tap(1.0, Lane::Left), tap(1.02, Lane::Left)]);
        assert_eq!(field.press(Lane::Left, 1.0), Some(JudgeGrade::Marvelous));
        assert_eq!(field.press(Lane::Left, 1.02), Some(JudgeGrade::Marvelous));
        assert!(field.states[0].hit && field.states[1].hit);
        assert_eq!(field.score.judgments().marvelous, 2);
    }

    #[test]
    fn press_on_wrong_lane_is_a_ghost() {
        let mut field = Field::new(vec![tap(1.0, Lane::Left)]);
        assert_eq!(field.press(Lane::Right, 1.0), None);
        assert!(!field.states[0].is_judged());
        assert_eq!(field.score.judgments().judged(), 0);
    }

    #[test]
    fn jump_is_consumed_by_first_lane_hit() {
        let mut field = Field::new(vec![Note {
            time: 1.0,
            kind: NoteKind::Jump {
                lanes: [Lane::Left, Lane::Up],
            },
        }]);
        assert_eq!(field.press(Lane::Left, 1.0), Some(JudgeGrade::Marvelous));
        assert!(field.states[0].hit);

        // The partner lane's press finds an already-consumed note: ghost.
        assert_eq!(field.press(Lane::Up, 1.05), None);
        assert_eq!(field.score.judgments().judged(), 1);
    }

    #[test]
    fn hold_hit_engages_the_tracker() {
        let mut field = Field::new(vec![Note {
            time: 1.0,
            kind: NoteKind::Hold {
                lane: Lane::Down,
                end_time: 3.0,
            },
        }]);
        assert_eq!(field.press(Lane::Down, 1.01), Some(JudgeGrade::Marvelous));
        assert_eq!(field.holds.phase(0), HoldPhase::Active);
        assert!(field.states[0].hold_active);
    }

    #[test]
    fn missed_hold_start_never_activates() {
        let mut field = Field::new(vec![Note {
            time: 1.0,
            kind: NoteKind::Hold {
                lane: Lane::Down,
                end_time: 3.0,
            },
        }]);
        field.sweep(1.2);
        assert!(field.states[0].missed);
        assert_eq!(field.holds.phase(0), HoldPhase::NotStarted);
    }

    #[test]
    fn cursor_does_not_skip_unjudged_notes_between_judged_ones() {
        let mut field = Field::new(vec![
            tap(1.0, Lane::Left),
            tap(1.05, Lane::Right),
            tap(1.1, Lane::Left),
        ]);
        // Hit the outer two, leave the middle one pending.
        field.press(Lane::Left, 1.0);
        field.press(Lane::Left, 1.1);
        assert_eq!(field.sweep(1.15), 0);

        // The middle note still misses once its window elapses.
        assert_eq!(field.sweep(1.2), 1);
        assert!(field.states[1].missed);
    }
}
