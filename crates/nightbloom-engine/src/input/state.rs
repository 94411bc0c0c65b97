use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{
    InputEvent,
    Key,
    KeyState,
    MouseButton,
    MouseButtonState,
    PointerButtonEvent,
    PointerMoveEvent,
};

/// Current input state for a single window.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,

    /// Pointer position in physical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies an input event to the current state and writes deltas to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Releases are not delivered to unfocused windows.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                if let Some((px, py)) = self.pointer_pos {
                    if !self.buttons_down.is_empty() {
                        frame.drag_delta.0 += x - px;
                        frame.drag_delta.1 += y - py;
                    }
                }
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) {
                        frame.keys_pressed.insert(*key);
                    }
                }
                KeyState::Released => {
                    self.keys_down.remove(key);
                }
            },

            InputEvent::PointerButton(PointerButtonEvent { button, state, x, y }) => {
                self.pointer_pos = Some((*x, *y));

                match state {
                    MouseButtonState::Pressed => {
                        if self.buttons_down.insert(*button) {
                            frame.buttons_pressed.insert(*button);
                        }
                    }
                    MouseButtonState::Released => {
                        if self.buttons_down.remove(button) {
                            frame.buttons_released.insert(*button);
                        }
                    }
                }
            }

            InputEvent::MouseWheel(delta) => {
                frame.scroll_lines += delta.lines_y();
            }
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseWheelDelta;

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMoved(PointerMoveEvent { x, y })
    }

    fn button(state: MouseButtonState, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent { button: MouseButton::Left, state, x, y })
    }

    #[test]
    fn drag_accumulates_only_while_button_held() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, moved(10.0, 10.0));
        state.apply_event(&mut frame, moved(20.0, 10.0));
        assert_eq!(frame.drag_delta, (0.0, 0.0));

        state.apply_event(&mut frame, button(MouseButtonState::Pressed, 20.0, 10.0));
        state.apply_event(&mut frame, moved(25.0, 4.0));
        state.apply_event(&mut frame, moved(30.0, 2.0));
        assert_eq!(frame.drag_delta, (10.0, -8.0));

        state.apply_event(&mut frame, button(MouseButtonState::Released, 30.0, 2.0));
        state.apply_event(&mut frame, moved(50.0, 2.0));
        assert_eq!(frame.drag_delta, (10.0, -8.0));
        assert!(frame.buttons_released.contains(&MouseButton::Left));
    }

    #[test]
    fn wheel_pixels_are_normalised_to_lines() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, InputEvent::MouseWheel(MouseWheelDelta::Line { x: 0.0, y: 1.0 }));
        state.apply_event(&mut frame, InputEvent::MouseWheel(MouseWheelDelta::Pixel { x: 0.0, y: 80.0 }));
        assert_eq!(frame.scroll_lines, 3.0);

        frame.clear();
        assert_eq!(frame.scroll_lines, 0.0);
        assert!(frame.events.is_empty());
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, InputEvent::Key { key: Key::Space, state: KeyState::Pressed, repeat: false });
        state.apply_event(&mut frame, button(MouseButtonState::Pressed, 0.0, 0.0));
        assert!(state.key_down(Key::Space));

        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(!state.key_down(Key::Space));
        assert!(!state.button_down(MouseButton::Left));
    }

    #[test]
    fn key_repeat_reports_press_once() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        let press = InputEvent::Key { key: Key::R, state: KeyState::Pressed, repeat: false };

        state.apply_event(&mut frame, press.clone());
        frame.clear();
        state.apply_event(&mut frame, press);
        assert!(frame.keys_pressed.is_empty());
    }
}
