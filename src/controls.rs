//! On-canvas buttons.
//!
//! Each control knows its bounds, how to lay itself out for a canvas size,
//! how to draw itself, and which [`Command`] a click on it issues. The
//! application owns them as `Vec<Box<dyn Control>>` and drives them through
//! the [`Control`] trait only.

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::constants::controls::{BUTTON_MARGIN, BUTTON_SIZE, FACE_RGBA, GLYPH_RGBA, GLYPH_WIDTH};
use crate::geometry::{Rect, Size, Vec2};
use crate::viewport::ZoomStep;

/// Something the user asked for, by key or by button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Zoom(ZoomStep),
    Previous,
    Next,
    ResetView,
    DeleteCurrent,
    ToggleCaching,
    Open,
}

pub trait Control {
    /// Position for a canvas of the given size.
    fn layout(&mut self, canvas: Size);

    fn bounds(&self) -> Rect;

    fn command(&self) -> Command;

    fn draw(&self, target: &mut Pixmap);

    fn hit_test(&self, point: Vec2) -> bool {
        self.bounds().contains(point)
    }
}

/// The default set: zoom out/in at the bottom right, previous/next at the sides.
pub fn default_controls() -> Vec<Box<dyn Control>> {
    vec![
        Box::new(ZoomButton::new(ZoomStep::Out)),
        Box::new(ZoomButton::new(ZoomStep::In)),
        Box::new(NavButton::new(NavDirection::Previous)),
        Box::new(NavButton::new(NavDirection::Next)),
    ]
}

#[derive(Debug, Clone)]
pub struct ZoomButton {
    step: ZoomStep,
    bounds: Rect,
}

impl ZoomButton {
    pub fn new(step: ZoomStep) -> Self {
        Self {
            step,
            bounds: Rect::ZERO,
        }
    }
}

impl Control for ZoomButton {
    fn layout(&mut self, canvas: Size) {
        // Zoom in hugs the corner, zoom out sits to its left
        let slot = match self.step {
            ZoomStep::In => 1.0,
            ZoomStep::Out => 2.0,
        };
        self.bounds = Rect::new(
            canvas.width - slot * (BUTTON_MARGIN + BUTTON_SIZE),
            canvas.height - BUTTON_MARGIN - BUTTON_SIZE,
            BUTTON_SIZE,
            BUTTON_SIZE,
        );
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn command(&self) -> Command {
        Command::Zoom(self.step)
    }

    fn draw(&self, target: &mut Pixmap) {
        fill_face(target, self.bounds);

        let c = self.bounds.center();
        let arm = BUTTON_SIZE / 4.0;
        let mut pb = PathBuilder::new();
        pb.move_to(c.x - arm, c.y);
        pb.line_to(c.x + arm, c.y);
        if self.step == ZoomStep::In {
            pb.move_to(c.x, c.y - arm);
            pb.line_to(c.x, c.y + arm);
        }
        stroke_glyph(target, pb);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

#[derive(Debug, Clone)]
pub struct NavButton {
    direction: NavDirection,
    bounds: Rect,
}

impl NavButton {
    pub fn new(direction: NavDirection) -> Self {
        Self {
            direction,
            bounds: Rect::ZERO,
        }
    }
}

impl Control for NavButton {
    fn layout(&mut self, canvas: Size) {
        let x = match self.direction {
            NavDirection::Previous => BUTTON_MARGIN,
            NavDirection::Next => canvas.width - BUTTON_MARGIN - BUTTON_SIZE,
        };
        self.bounds = Rect::new(x, (canvas.height - BUTTON_SIZE) / 2.0, BUTTON_SIZE, BUTTON_SIZE);
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn command(&self) -> Command {
        match self.direction {
            NavDirection::Previous => Command::Previous,
            NavDirection::Next => Command::Next,
        }
    }

    fn draw(&self, target: &mut Pixmap) {
        fill_face(target, self.bounds);

        let c = self.bounds.center();
        let arm = BUTTON_SIZE / 4.0;
        // Chevron pointing left or right
        let tip = match self.direction {
            NavDirection::Previous => -arm / 2.0,
            NavDirection::Next => arm / 2.0,
        };
        let mut pb = PathBuilder::new();
        pb.move_to(c.x - tip, c.y - arm);
        pb.line_to(c.x + tip, c.y);
        pb.line_to(c.x - tip, c.y + arm);
        stroke_glyph(target, pb);
    }
}

fn fill_face(target: &mut Pixmap, bounds: Rect) {
    let Some(rect) = tiny_skia::Rect::from_xywh(bounds.x, bounds.y, bounds.width, bounds.height) else {
        return;
    };
    let path = rounded(rect, BUTTON_SIZE / 6.0).unwrap_or_else(|| PathBuilder::from_rect(rect));

    let mut paint = Paint::default();
    let [r, g, b, a] = FACE_RGBA;
    paint.set_color_rgba8(r, g, b, a);
    target.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
}

fn rounded(rect: tiny_skia::Rect, radius: f32) -> Option<tiny_skia::Path> {
    let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    let mut pb = PathBuilder::new();
    pb.move_to(l + radius, t);
    pb.line_to(r - radius, t);
    pb.quad_to(r, t, r, t + radius);
    pb.line_to(r, b - radius);
    pb.quad_to(r, b, r - radius, b);
    pb.line_to(l + radius, b);
    pb.quad_to(l, b, l, b - radius);
    pb.line_to(l, t + radius);
    pb.quad_to(l, t, l + radius, t);
    pb.close();
    pb.finish()
}

fn stroke_glyph(target: &mut Pixmap, pb: PathBuilder) {
    let Some(path) = pb.finish() else {
        return;
    };

    let mut paint = Paint::default();
    let [r, g, b, a] = GLYPH_RGBA;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: GLYPH_WIDTH,
        line_cap: tiny_skia::LineCap::Round,
        line_join: tiny_skia::LineJoin::Round,
        ..Stroke::default()
    };
    target.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laid_out(canvas: Size) -> Vec<Box<dyn Control>> {
        let mut controls = default_controls();
        for control in &mut controls {
            control.layout(canvas);
        }
        controls
    }

    #[test]
    fn test_controls_stay_inside_canvas_and_do_not_overlap() {
        let canvas = Size::new(800.0, 600.0);
        let controls = laid_out(canvas);

        for (i, a) in controls.iter().enumerate() {
            assert!(Rect::from_size(canvas).contains_rect(&a.bounds(), 0.0), "{:?}", a.command());
            for b in controls.iter().skip(i + 1) {
                assert!(!a.hit_test(b.bounds().center()), "{:?} overlaps {:?}", a.command(), b.command());
            }
        }
    }

    #[test]
    fn test_hit_test_maps_to_command() {
        let controls = laid_out(Size::new(800.0, 600.0));
        let hit = |point: Vec2| controls.iter().find(|c| c.hit_test(point)).map(|c| c.command());

        assert_eq!(hit(Vec2::new(400.0, 300.0)), None);
        assert_eq!(hit(Vec2::new(20.0, 300.0)), Some(Command::Previous));
        assert_eq!(hit(Vec2::new(780.0, 300.0)), Some(Command::Next));
        assert_eq!(hit(Vec2::new(780.0, 580.0)), Some(Command::Zoom(ZoomStep::In)));
        assert_eq!(hit(Vec2::new(732.0, 580.0)), Some(Command::Zoom(ZoomStep::Out)));
    }

    #[test]
    fn test_layout_follows_resize() {
        let mut button = ZoomButton::new(ZoomStep::In);
        button.layout(Size::new(800.0, 600.0));
        let before = button.bounds();
        button.layout(Size::new(400.0, 300.0));
        assert_eq!(button.bounds().size(), before.size());
        assert!(button.bounds().x < before.x);
    }

    #[test]
    fn test_draw_paints_inside_bounds_only() {
        let mut pixmap = Pixmap::new(200, 100).unwrap();
        let mut button = NavButton::new(NavDirection::Next);
        button.layout(Size::new(200.0, 100.0));
        button.draw(&mut pixmap);

        let c = button.bounds().center();
        assert_ne!(pixmap.pixel(c.x as u32, c.y as u32).unwrap().alpha(), 0);
        assert_eq!(pixmap.pixel(5, 5).unwrap().alpha(), 0);
    }
}
