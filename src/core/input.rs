use serde::{Deserialize, Serialize};
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub const LANE_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Lane {
    Left = 0,
    Down = 1,
    Up = 2,
    Right = 3,
}

impl Lane {
    pub const ALL: [Lane; LANE_COUNT] = [Lane::Left, Lane::Down, Lane::Up, Lane::Right];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: usize) -> Option<Lane> {
        match index {
            0 => Some(Lane::Left),
            1 => Some(Lane::Down),
            2 => Some(Lane::Up),
            3 => Some(Lane::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    Keyboard,
    Gamepad,
}

/// A press or release transition on one lane. `time` is the game-logic
/// timestamp supplied by the caller at poll time, not wall clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEdge {
    pub lane: Lane,
    pub pressed: bool,
    pub time: f32,
}

/// Merges keyboard and gamepad lane state and emits edge events once per
/// poll. A lane is down if either source reports it down; edges fire only on
/// transitions of the combined vector, so a held key never repeats. The
/// poller knows nothing about notes, judging, or timing windows.
#[derive(Default)]
pub struct InputPoller {
    keyboard: [bool; LANE_COUNT],
    gamepad: [bool; LANE_COUNT],
    previous: [bool; LANE_COUNT],
}

impl InputPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest physical state for one lane of one source.
    pub fn set_lane(&mut self, source: InputSource, lane: Lane, down: bool) {
        match source {
            InputSource::Keyboard => self.keyboard[lane.index()] = down,
            InputSource::Gamepad => self.gamepad[lane.index()] = down,
        }
    }

    /// The combined (keyboard OR gamepad) lane vector as of the last updates.
    pub fn held(&self) -> [bool; LANE_COUNT] {
        let mut combined = [false; LANE_COUNT];
        for i in 0..LANE_COUNT {
            combined[i] = self.keyboard[i] || self.gamepad[i];
        }
        combined
    }

    /// Diffs the combined state against the previous poll and returns the
    /// transitions, stamping each with `time`.
    pub fn poll(&mut self, time: f32) -> Vec<InputEdge> {
        let current = self.held();
        let mut edges = Vec::new();
        for (i, (&now_down, &was_down)) in current.iter().zip(self.previous.iter()).enumerate() {
            if now_down != was_down {
                edges.push(InputEdge {
                    lane: Lane::ALL[i],
                    pressed: now_down,
                    time,
                });
            }
        }
        self.previous = current;
        edges
    }

    /// Clears all source and diff state (session teardown).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[inline(always)]
pub fn lane_from_keycode(code: KeyCode) -> Option<Lane> {
    match code {
        KeyCode::ArrowLeft | KeyCode::KeyD => Some(Lane::Left),
        KeyCode::ArrowDown | KeyCode::KeyF => Some(Lane::Down),
        KeyCode::ArrowUp | KeyCode::KeyJ => Some(Lane::Up),
        KeyCode::ArrowRight | KeyCode::KeyK => Some(Lane::Right),
        _ => None,
    }
}

/// Feeds a winit keyboard event into the poller's keyboard source. Key
/// repeats are ignored; only real state changes reach the poller.
pub fn handle_key_event(event: &KeyEvent, poller: &mut InputPoller) {
    if event.repeat {
        return;
    }
    if let PhysicalKey::Code(code) = event.physical_key {
        if let Some(lane) = lane_from_keycode(code) {
            let down = event.state == ElementState::Pressed;
            poller.set_lane(InputSource::Keyboard, lane, down);
        }
    }
}
