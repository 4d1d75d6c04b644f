//! Global constants for the picture browser

/// Zoom change per zoom in/out command, in percent
pub const ZOOM_STEP_PERCENT: u32 = 5;

/// Highest zoom level, in percent growth over fit-to-canvas
pub const MAX_ZOOM_PERCENT: u32 = 1000;

/// Pointer travel in pixels (per axis) before a press becomes a drag.
/// Matches the default 4px drag rectangle on common desktop platforms.
pub const DEFAULT_DRAG_THRESHOLD: f32 = 4.0;

/// Largest bitmap edge the software rendering context accepts
pub const DEFAULT_MAX_BITMAP_DIMENSION: u32 = 16384;

/// Canvas background (dark gray)
pub const BACKGROUND_RGBA: [u8; 4] = [169, 169, 169, 255];

/// Placeholder outline drawn while dragging
pub const OUTLINE_RGBA: [u8; 4] = [128, 128, 128, 255];

/// Placeholder outline stroke width
pub const OUTLINE_WIDTH: f32 = 2.0;

/// On-canvas control buttons
pub mod controls {
    /// Edge length of a square control button
    pub const BUTTON_SIZE: f32 = 36.0;

    /// Distance between a button and the canvas edge / its neighbour
    pub const BUTTON_MARGIN: f32 = 12.0;

    /// Button face colour
    pub const FACE_RGBA: [u8; 4] = [40, 40, 40, 180];

    /// Glyph colour
    pub const GLYPH_RGBA: [u8; 4] = [235, 235, 235, 255];

    /// Glyph stroke width
    pub const GLYPH_WIDTH: f32 = 3.0;
}

/// Main window
pub mod window {
    /// Initial inner size
    pub const DEFAULT_SIZE: (u32, u32) = (1024, 768);

    /// Smallest inner size
    pub const MIN_SIZE: (u32, u32) = (320, 240);

    /// Title prefix, followed by the current file name
    pub const TITLE: &str = "Picture Browser";
}
