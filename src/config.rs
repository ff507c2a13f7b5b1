// Engine-wide constants. Timing windows live in `game::judgment` next to the
// tier ladder that consumes them.

// Session pacing
pub const LEAD_IN_SECONDS: f32 = 2.0;
pub const MAX_DELTA_TIME: f32 = 0.1;

// Hold lifecycle
pub const HOLD_RELEASE_GRACE: f32 = 0.05;

// Receptor flash (render feedback only, no gameplay effect)
pub const RECEPTOR_FLASH_DURATION: f32 = 0.2;

// Render projection reference layout (for 1280x720)
pub const GAMEPLAY_REF_WIDTH: f32 = 1280.0;
pub const GAMEPLAY_REF_HEIGHT: f32 = 720.0;
pub const RECEPTOR_TOP_MARGIN_REF: f32 = 125.0;
pub const SCROLL_SPEED_PIXELS_PER_SECOND_REF: f32 = 600.0;

// Notes this far outside the visible window are still projected so a
// just-passed note can finish scrolling through the receptors.
pub const PASSED_NOTE_BUFFER_SECONDS: f32 = 0.5;
pub const VISIBLE_WINDOW_SECONDS: f32 = 1.5;
