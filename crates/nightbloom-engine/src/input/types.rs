/// Keyboard keys the viewers react to.
///
/// Anything else maps to `Key::Unknown` carrying the platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Space,
    Enter,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    R,

    Digit1,
    Digit2,
    Digit3,

    Unknown(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseButtonState {
    Pressed,
    Released,
}

/// Pointer moved to `(x, y)` in physical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerMoveEvent {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerButtonEvent {
    pub button: MouseButton,
    pub state: MouseButtonState,
    pub x: f32,
    pub y: f32,
}

/// Wheel delta as reported by the platform.
///
/// Line deltas come from notched wheels, pixel deltas from touchpads.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseWheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f32, y: f32 },
}

impl MouseWheelDelta {
    /// Vertical component normalised to "lines" (pixel deltas use 40px per line).
    pub fn lines_y(self) -> f32 {
        match self {
            MouseWheelDelta::Line { y, .. } => y,
            MouseWheelDelta::Pixel { y, .. } => y / 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Focused(bool),
    PointerMoved(PointerMoveEvent),
    PointerLeft,
    PointerButton(PointerButtonEvent),
    MouseWheel(MouseWheelDelta),
    Key { key: Key, state: KeyState, repeat: bool },
}
