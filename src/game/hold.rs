use crate::config::HOLD_RELEASE_GRACE;
use crate::core::input::{Lane, LANE_COUNT};
use crate::game::chart::{Chart, NoteState};
use log::info;

/// Lifecycle of one hold note.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HoldPhase {
    NotStarted,
    Active,
    Completed,
    Dropped,
}

/// A hold currently engaged on a lane, exposed so the renderer can draw a
/// continuous body up to `end_time`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ActiveHold {
    pub note_index: usize,
    pub end_time: f32,
}

/// Tracks hold notes from the initial hit through completion or early
/// release. At most one hold is engaged per lane.
pub struct HoldTracker {
    phases: Vec<HoldPhase>,
    active: [Option<ActiveHold>; LANE_COUNT],
}

impl HoldTracker {
    pub fn new(chart: &Chart) -> Self {
        Self {
            phases: vec![HoldPhase::NotStarted; chart.note_count()],
            active: [None; LANE_COUNT],
        }
    }

    /// Empty tracker for a session that has not started yet.
    pub fn empty() -> Self {
        Self {
            phases: Vec::new(),
            active: [None; LANE_COUNT],
        }
    }

    /// Engages a hold after its start tap was hit (judge step 3).
    pub fn activate(
        &mut self,
        lane: Lane,
        note_index: usize,
        end_time: f32,
        states: &mut [NoteState],
    ) {
        if self.phases[note_index] != HoldPhase::NotStarted {
            return;
        }
        self.phases[note_index] = HoldPhase::Active;
        states[note_index].hold_active = true;
        self.active[lane.index()] = Some(ActiveHold {
            note_index,
            end_time,
        });
    }

    /// A release edge on `lane`. Strictly before `end_time - grace` the hold
    /// drops; inside the grace window the release is forgiven and the hold
    /// completes on time. Releases with no engaged hold (normal tap
    /// releases) are no-ops.
    pub fn handle_release(&mut self, lane: Lane, time: f32, states: &mut [NoteState]) {
        let slot = &mut self.active[lane.index()];
        let Some(hold) = *slot else {
            return;
        };
        if time < hold.end_time - HOLD_RELEASE_GRACE {
            self.phases[hold.note_index] = HoldPhase::Dropped;
            states[hold.note_index].hold_active = false;
            *slot = None;
            info!(
                "Hold dropped: note {} released {:.0}ms early",
                hold.note_index,
                (hold.end_time - time) * 1000.0
            );
        }
        // Released inside the grace window: completion stays time-based.
    }

    /// Completes holds whose tail has passed. Run once per tick.
    pub fn tick(&mut self, time: f32, states: &mut [NoteState]) {
        for slot in &mut self.active {
            let Some(hold) = *slot else {
                continue;
            };
            if time >= hold.end_time {
                self.phases[hold.note_index] = HoldPhase::Completed;
                states[hold.note_index].hold_active = false;
                *slot = None;
            }
        }
    }

    pub fn phase(&self, note_index: usize) -> HoldPhase {
        self.phases
            .get(note_index)
            .copied()
            .unwrap_or(HoldPhase::NotStarted)
    }

    pub fn active_hold(&self, lane: Lane) -> Option<ActiveHold> {
        self.active[lane.index()]
    }

    /// `(lane, hold)` pairs currently engaged.
    pub fn active_lanes(&self) -> impl Iterator<Item = (Lane, ActiveHold)> + '_ {
        Lane::ALL
            .iter()
            .filter_map(|&lane| self.active[lane.index()].map(|h| (lane, h)))
    }
}

#[cfg(test)]
mod tests {
    use super::{HoldPhase, HoldTracker};
    use crate::core::input::Lane;
    use crate::game::chart::{new_note_states, Chart, Note, NoteKind};

    fn hold_chart(lane: Lane, start: f32, end: f32) -> Chart {
        Chart::new(
            vec![Note {
                time: start,
                kind: NoteKind::Hold {
                    lane,
                    end_time: end,
                },
            }],
            4,
        )
        .unwrap()
    }

    #[test]
    fn activation_marks_state_and_lane() {
        let chart = hold_chart(Lane::Down, 1.0, 3.0);
        let mut states = new_note_states(&chart);
        let mut tracker = HoldTracker::new(&chart);

        tracker.activate(Lane::Down, 0, 3.0, &mut states);
        assert_eq!(tracker.phase(0), HoldPhase::Active);
        assert!(states[0].hold_active);
        assert_eq!(tracker.active_hold(Lane::Down).unwrap().end_time, 3.0);
    }

    #[test]
    fn release_before_grace_boundary_drops() {
        let chart = hold_chart(Lane::Down, 1.0, 3.0);
        let mut states = new_note_states(&chart);
        let mut tracker = HoldTracker::new(&chart);
        tracker.activate(Lane::Down, 0, 3.0, &mut states);

        // 60ms early: strictly before end - 50ms grace.
        tracker.handle_release(Lane::Down, 2.94, &mut states);
        assert_eq!(tracker.phase(0), HoldPhase::Dropped);
        assert!(!states[0].hold_active);
        assert!(tracker.active_hold(Lane::Down).is_none());

        // Dropped is terminal: the tail passing does not change it.
        tracker.tick(3.0, &mut states);
        assert_eq!(tracker.phase(0), HoldPhase::Dropped);
    }

    #[test]
    fn release_inside_grace_window_still_completes() {
        let chart = hold_chart(Lane::Down, 1.0, 3.0);
        let mut states = new_note_states(&chart);
        let mut tracker = HoldTracker::new(&chart);
        tracker.activate(Lane::Down, 0, 3.0, &mut states);

        // 40ms early: inside the 50ms grace, completion is time-based.
        tracker.handle_release(Lane::Down, 2.96, &mut states);
        assert_eq!(tracker.phase(0), HoldPhase::Active);

        tracker.tick(3.0, &mut states);
        assert_eq!(tracker.phase(0), HoldPhase::Completed);
        assert!(!states[0].hold_active);
    }

    #[test]
    fn held_through_tail_completes() {
        let chart = hold_chart(Lane::Up, 1.0, 3.0);
        let mut states = new_note_states(&chart);
        let mut tracker = HoldTracker::new(&chart);
        tracker.activate(Lane::Up, 0, 3.0, &mut states);

        tracker.tick(2.0, &mut states);
        assert_eq!(tracker.phase(0), HoldPhase::Active);
        tracker.tick(3.0, &mut states);
        assert_eq!(tracker.phase(0), HoldPhase::Completed);
    }

    #[test]
    fn ghost_release_is_a_noop() {
        let chart = hold_chart(Lane::Left, 1.0, 3.0);
        let mut states = new_note_states(&chart);
        let mut tracker = HoldTracker::new(&chart);

        tracker.handle_release(Lane::Left, 0.5, &mut states);
        assert_eq!(tracker.phase(0), HoldPhase::NotStarted);
    }
}
