use crate::core::input::{InputPoller, InputSource, Lane};
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use log::info;

#[inline(always)]
const fn deadzone() -> f32 {
    0.35
}

/// Maps left-stick deflection to lane directions with the deadzone applied.
/// Kept free of gilrs types so the mapping is testable.
#[inline(always)]
pub fn stick_to_lanes(x: f32, y: f32) -> [bool; 4] {
    let dz = deadzone();
    let left = x <= -dz;
    let right = x >= dz;
    let up = y <= -dz;
    let down = y >= dz;
    [left, down, up, right]
}

/// Gamepad lane source. Pumps gilrs, keeps a single active pad, and merges
/// d-pad and left-stick state into the poller's gamepad lanes.
pub struct GamepadSource {
    gilrs: Gilrs,
    active_id: Option<GamepadId>,
    dpad: [bool; 4],
    lx: f32,
    ly: f32,
}

impl GamepadSource {
    /// None if no gamepad backend is available on this host.
    pub fn try_new() -> Option<Self> {
        let gilrs = Gilrs::new().ok()?;
        Some(Self {
            gilrs,
            active_id: None,
            dpad: [false; 4],
            lx: 0.0,
            ly: 0.0,
        })
    }

    /// Drains pending gilrs events and writes the resulting lane state into
    /// `poller`. Call once per frame before `poller.poll()`.
    pub fn pump(&mut self, poller: &mut InputPoller) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if self.active_id.is_none() {
                self.active_id = Some(id);
                info!("Gamepad {:?} active", id);
            }
            if Some(id) != self.active_id {
                continue;
            }

            match event {
                EventType::Connected => {
                    self.active_id = Some(id);
                }
                EventType::Disconnected => {
                    self.active_id = None;
                    self.dpad = [false; 4];
                    self.lx = 0.0;
                    self.ly = 0.0;
                    for lane in Lane::ALL {
                        poller.set_lane(InputSource::Gamepad, lane, false);
                    }
                    info!("Gamepad disconnected; lanes released");
                    continue;
                }
                EventType::ButtonPressed(btn, _) => self.set_dpad(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_dpad(btn, false),
                EventType::AxisChanged(axis, value, _) => match axis {
                    Axis::LeftStickX => self.lx = value,
                    Axis::LeftStickY => self.ly = value,
                    _ => {}
                },
                _ => {}
            }

            let stick = stick_to_lanes(self.lx, self.ly);
            for lane in Lane::ALL {
                let i = lane.index();
                poller.set_lane(InputSource::Gamepad, lane, self.dpad[i] || stick[i]);
            }
        }
    }

    fn set_dpad(&mut self, btn: Button, down: bool) {
        match btn {
            Button::DPadLeft => self.dpad[Lane::Left.index()] = down,
            Button::DPadDown => self.dpad[Lane::Down.index()] = down,
            Button::DPadUp => self.dpad[Lane::Up.index()] = down,
            Button::DPadRight => self.dpad[Lane::Right.index()] = down,
            _ => {}
        }
    }
}
