use crate::config::{
    GAMEPLAY_REF_HEIGHT, PASSED_NOTE_BUFFER_SECONDS, RECEPTOR_TOP_MARGIN_REF,
    SCROLL_SPEED_PIXELS_PER_SECOND_REF, VISIBLE_WINDOW_SECONDS,
};
use crate::game::chart::{Chart, NoteState};

/// Screen-space layout the projection maps into. Rebuilt on `resize`; the
/// reference constants scale with window height so the notefield keeps its
/// proportions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    pub width: f32,
    pub height: f32,
    pub receptor_y: f32,
    pub scroll_pixels_per_second: f32,
    pub visible_window: f32,
}

impl Geometry {
    pub fn for_window(width: f32, height: f32) -> Self {
        let scale = height / GAMEPLAY_REF_HEIGHT;
        Self {
            width,
            height,
            receptor_y: RECEPTOR_TOP_MARGIN_REF * scale,
            scroll_pixels_per_second: SCROLL_SPEED_PIXELS_PER_SECOND_REF * scale,
            visible_window: VISIBLE_WINDOW_SECONDS,
        }
    }
}

/// One note placed for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleNote {
    pub note_index: usize,
    pub screen_y: f32,
    /// Hold tail position, present only for hold notes.
    pub tail_y: Option<f32>,
    pub hit: bool,
    pub missed: bool,
}

/// Pure time-to-position mapping. A note is included while its timestamp
/// lies in `[t - buffer, t + visible_window + buffer]`; the buffer lets a
/// just-passed note finish scrolling through the receptors. Idempotent for
/// identical inputs, no judging logic.
pub fn project(
    chart: &Chart,
    states: &[NoteState],
    current_time: f32,
    geometry: &Geometry,
) -> Vec<VisibleNote> {
    let lower = current_time - PASSED_NOTE_BUFFER_SECONDS;
    let upper = current_time + geometry.visible_window + PASSED_NOTE_BUFFER_SECONDS;
    let mut visible = Vec::new();
    for (index, note) in chart.notes().iter().enumerate() {
        if note.time > upper {
            break;
        }
        if note.time < lower {
            continue;
        }
        let screen_y =
            geometry.receptor_y + (note.time - current_time) * geometry.scroll_pixels_per_second;
        let tail_y = note.kind.hold_end_time().map(|end| {
            geometry.receptor_y + (end - current_time) * geometry.scroll_pixels_per_second
        });
        visible.push(VisibleNote {
            note_index: index,
            screen_y,
            tail_y,
            hit: states[index].hit,
            missed: states[index].missed,
        });
    }
    visible
}
