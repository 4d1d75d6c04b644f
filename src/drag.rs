//! Pointer drag state machine driving the pan offset.
//!
//! ```text
//! Idle --down, move past threshold--> Dragging --move--> Dragging
//!   ^                                    |
//!   +---------------- up ----------------+
//! ```
//!
//! The pan offset lives in [`ViewportState`]; this machine only writes it
//! while dragging.

use crate::constants::DEFAULT_DRAG_THRESHOLD;
use crate::geometry::Vec2;
use crate::viewport::ViewportState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    state: DragState,
    /// Pointer position minus pan at drag start; offset = pointer - anchor.
    anchor: Vec2,
    /// Where the pointer went down while still below the drag threshold.
    press: Option<Vec2>,
    threshold: f32,
}

impl Default for DragSession {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_THRESHOLD)
    }
}

impl DragSession {
    /// `threshold` is the per-axis travel in pixels a press needs before it
    /// counts as a drag.
    pub fn new(threshold: f32) -> Self {
        Self {
            state: DragState::Idle,
            anchor: Vec2::ZERO,
            press: None,
            threshold: threshold.max(0.0),
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        self.state == DragState::Dragging
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Primary button went down at `position`.
    pub fn pointer_down(&mut self, position: Vec2) {
        if self.is_dragging() {
            // The release never arrived (e.g. it happened outside the window)
            log::debug!("Pointer down while dragging, ending stale drag");
            self.state = DragState::Idle;
        }
        self.press = Some(position);
    }

    /// Pointer moved to `position`. Returns whether a repaint is needed.
    pub fn pointer_move(&mut self, position: Vec2, viewport: &mut ViewportState) -> bool {
        match self.state {
            DragState::Idle => {
                let Some(press) = self.press else {
                    return false;
                };

                let travel = position - press;
                if travel.x.abs() <= self.threshold && travel.y.abs() <= self.threshold {
                    return false;
                }

                self.state = DragState::Dragging;
                self.anchor = press - viewport.pan();
                self.press = None;
                log::debug!("Drag started, anchor ({:.1}, {:.1})", self.anchor.x, self.anchor.y);

                viewport.set_pan(position - self.anchor);
                // Always repaint on entry: the image switches to its outline.
                true
            }
            DragState::Dragging => {
                let offset = position - self.anchor;
                if offset == viewport.pan() {
                    return false;
                }
                viewport.set_pan(offset);
                true
            }
        }
    }

    /// Primary button released. Returns whether a repaint is needed.
    pub fn pointer_up(&mut self) -> bool {
        self.press = None;

        if self.is_dragging() {
            self.state = DragState::Idle;
            log::debug!("Drag ended");
            // Switch from the outline back to the image
            true
        } else {
            false
        }
    }

    /// Scale the anchor by a zoom factor, matching the pan rescale done by
    /// [`ViewportState::step_zoom`].
    pub fn rescale(&mut self, factor: f32) {
        self.anchor = self.anchor * factor;
    }

    /// Forget any drag in progress. Called when the displayed image changes.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
        self.anchor = Vec2::ZERO;
        self.press = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::ZoomStep;

    #[test]
    fn test_press_and_move_past_threshold_starts_drag() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();

        drag.pointer_down(Vec2::new(100.0, 100.0));
        assert_eq!(drag.state(), DragState::Idle);

        assert!(drag.pointer_move(Vec2::new(150.0, 120.0), &mut viewport));
        assert_eq!(drag.state(), DragState::Dragging);
        assert_eq!(drag.anchor(), Vec2::new(100.0, 100.0));
        assert_eq!(viewport.pan(), Vec2::new(50.0, 20.0));
    }

    #[test]
    fn test_small_moves_stay_idle() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();

        drag.pointer_down(Vec2::new(10.0, 10.0));
        assert!(!drag.pointer_move(Vec2::new(12.0, 13.0), &mut viewport));
        // Exactly on the threshold is still a click
        assert!(!drag.pointer_move(Vec2::new(14.0, 6.0), &mut viewport));
        assert_eq!(drag.state(), DragState::Idle);
        assert_eq!(viewport.pan(), Vec2::ZERO);

        assert!(drag.pointer_move(Vec2::new(10.0, 15.0), &mut viewport));
        assert!(drag.is_dragging());
    }

    #[test]
    fn test_move_without_press_is_ignored() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();

        assert!(!drag.pointer_move(Vec2::new(500.0, 500.0), &mut viewport));
        assert_eq!(drag.state(), DragState::Idle);
        assert_eq!(viewport.pan(), Vec2::ZERO);
    }

    #[test]
    fn test_drag_composes_with_existing_pan() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();
        viewport.set_pan(Vec2::new(30.0, 10.0));

        drag.pointer_down(Vec2::new(100.0, 100.0));
        assert!(drag.pointer_move(Vec2::new(110.0, 100.0), &mut viewport));

        assert_eq!(drag.anchor(), Vec2::new(70.0, 90.0));
        // Moved 10px right from the press, so the pan grows by 10px
        assert_eq!(viewport.pan(), Vec2::new(40.0, 10.0));
    }

    #[test]
    fn test_repeated_position_does_not_repaint() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();

        drag.pointer_down(Vec2::new(0.0, 0.0));
        assert!(drag.pointer_move(Vec2::new(20.0, 0.0), &mut viewport));
        assert!(drag.pointer_move(Vec2::new(25.0, 5.0), &mut viewport));
        assert!(!drag.pointer_move(Vec2::new(25.0, 5.0), &mut viewport));
        assert_eq!(viewport.pan(), Vec2::new(25.0, 5.0));
    }

    #[test]
    fn test_release_always_repaints_after_drag() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();

        drag.pointer_down(Vec2::new(0.0, 0.0));
        drag.pointer_move(Vec2::new(20.0, 20.0), &mut viewport);
        assert!(drag.pointer_up());
        assert_eq!(drag.state(), DragState::Idle);
        assert_eq!(viewport.pan(), Vec2::new(20.0, 20.0));

        // Nothing to switch back from
        assert!(!drag.pointer_up());
    }

    #[test]
    fn test_click_without_drag_leaves_no_pending_press() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();

        drag.pointer_down(Vec2::new(0.0, 0.0));
        assert!(!drag.pointer_up());
        assert!(!drag.pointer_move(Vec2::new(100.0, 100.0), &mut viewport));
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn test_second_drag_continues_from_current_pan() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();

        drag.pointer_down(Vec2::new(0.0, 0.0));
        drag.pointer_move(Vec2::new(50.0, 0.0), &mut viewport);
        drag.pointer_up();

        drag.pointer_down(Vec2::new(200.0, 200.0));
        drag.pointer_move(Vec2::new(200.0, 230.0), &mut viewport);
        assert_eq!(viewport.pan(), Vec2::new(50.0, 30.0));
    }

    #[test]
    fn test_zoom_rescales_anchor_and_pan_together() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();

        drag.pointer_down(Vec2::new(100.0, 100.0));
        drag.pointer_move(Vec2::new(150.0, 120.0), &mut viewport);

        let factor = viewport.step_zoom(ZoomStep::In).unwrap();
        drag.rescale(factor);

        assert!((drag.anchor().x - 105.0).abs() < 0.001);
        assert!((drag.anchor().y - 105.0).abs() < 0.001);
        assert!((viewport.pan().x - 52.5).abs() < 0.001);
        assert!((viewport.pan().y - 21.0).abs() < 0.001);
    }

    #[test]
    fn test_reset() {
        let mut drag = DragSession::default();
        let mut viewport = ViewportState::new();

        drag.pointer_down(Vec2::new(0.0, 0.0));
        drag.pointer_move(Vec2::new(50.0, 50.0), &mut viewport);
        drag.reset();

        assert_eq!(drag, DragSession::default());
    }

    #[test]
    fn test_negative_threshold_is_clamped() {
        assert_eq!(DragSession::new(-3.0).threshold(), 0.0);
    }
}
