use std::collections::HashSet;

use super::types::{InputEvent, Key, MouseButton};

/// Per-frame input deltas.
///
/// `InputState` holds what is currently down and where the pointer is.
/// `InputFrame` accumulates what changed since the last presented frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,

    pub keys_pressed: HashSet<Key>,
    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    /// Pointer travel in physical pixels while any button was held.
    pub drag_delta: (f32, f32),

    /// Accumulated vertical wheel movement in lines (positive = away from user).
    pub scroll_lines: f32,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.drag_delta = (0.0, 0.0);
        self.scroll_lines = 0.0;
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }
}
