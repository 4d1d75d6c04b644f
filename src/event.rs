//! Input events as the application sees them.
//!
//! The native shell translates window system events into these, so the
//! application and its tests never depend on the windowing crate.

use std::path::PathBuf;

use crate::geometry::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer button pressed.
    PointerDown { button: PointerButton, position: Vec2 },
    /// Pointer moved.
    PointerMoved { position: Vec2 },
    /// Pointer button released.
    PointerUp { button: PointerButton, position: Vec2 },
    /// Keyboard key pressed.
    KeyPressed { key: Key, modifiers: Modifiers },
    /// Canvas resized, in physical pixels.
    Resized { width: u32, height: u32 },
    /// A file was dropped onto the window.
    FileDropped(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
    Other(u16),
}

/// Keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Left,
    Right,
    Up,
    Down,
    Delete,
    Escape,
    NumpadAdd,
    NumpadSubtract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
        alt: false,
    };
}
