//! Fit, zoom and pan geometry.
//!
//! The destination rectangle of an image is always computed in the same
//! order: scale-and-center to the canvas, then zoom about the fitted
//! rectangle's own center, then pan. Zoom is relative to the pre-pan center.

use crate::constants::{MAX_ZOOM_PERCENT, ZOOM_STEP_PERCENT};
use crate::geometry::{Rect, Size, Vec2};

/// Largest uniform scale of `image` that fits `canvas`, centered in it.
///
/// Returns [`Rect::ZERO`] when either size has an empty dimension.
pub fn scale_and_center(canvas: Size, image: Size) -> Rect {
    if image.is_empty() || canvas.is_empty() {
        return Rect::ZERO;
    }

    let scale = (canvas.width / image.width).min(canvas.height / image.height);
    let width = image.width * scale;
    let height = image.height * scale;

    Rect::new(
        (canvas.width - width) / 2.0,
        (canvas.height - height) / 2.0,
        width,
        height,
    )
}

/// Grow `rect` symmetrically about its center by `zoom_percent` of its size.
///
/// Zero or negative percentages leave the rectangle untouched; zoom never
/// shrinks an image below its fitted size.
pub fn apply_zoom(rect: Rect, zoom_percent: i32) -> Rect {
    if zoom_percent <= 0 {
        return rect;
    }

    let growth = zoom_percent as f32 / 100.0;
    let dw = rect.width * growth;
    let dh = rect.height * growth;

    Rect::new(
        rect.x - dw / 2.0,
        rect.y - dh / 2.0,
        rect.width + dw,
        rect.height + dh,
    )
}

/// Translate `rect` by the pan offset.
pub fn apply_pan(rect: Rect, offset: Vec2) -> Rect {
    rect.translate(offset)
}

/// Where an image of `image` size lands on a `canvas` for the given view.
pub fn destination_rect(canvas: Size, image: Size, zoom_percent: u32, pan: Vec2) -> Rect {
    let fitted = scale_and_center(canvas, image);
    let zoomed = apply_zoom(fitted, zoom_percent.min(i32::MAX as u32) as i32);
    apply_pan(zoomed, pan)
}

/// Direction of a zoom command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStep {
    In,
    Out,
}

/// Zoom level and pan offset of the displayed image.
///
/// Both are plain numbers and survive without a current image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportState {
    zoom_percent: u32,
    pan: Vec2,
}

impl ViewportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom_percent(&self) -> u32 {
        self.zoom_percent
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub(crate) fn set_pan(&mut self, pan: Vec2) {
        self.pan = pan;
    }

    /// Step the zoom by ±5%, clamped to [0, 1000].
    ///
    /// Returns the scale factor the step applied (1.05 or 0.95), or `None`
    /// if the zoom was already at the limit. The pan offset is rescaled by
    /// the same factor so the view stays put relative to the image.
    pub fn step_zoom(&mut self, step: ZoomStep) -> Option<f32> {
        let step_factor = ZOOM_STEP_PERCENT as f32 / 100.0;

        let factor = match step {
            ZoomStep::In if self.zoom_percent < MAX_ZOOM_PERCENT => {
                self.zoom_percent = (self.zoom_percent + ZOOM_STEP_PERCENT).min(MAX_ZOOM_PERCENT);
                1.0 + step_factor
            }
            ZoomStep::Out if self.zoom_percent > 0 => {
                self.zoom_percent = self.zoom_percent.saturating_sub(ZOOM_STEP_PERCENT);
                1.0 - step_factor
            }
            _ => return None,
        };

        self.pan = self.pan * factor;
        log::debug!("Zoom {}% pan ({:.1}, {:.1})", self.zoom_percent, self.pan.x, self.pan.y);
        Some(factor)
    }

    pub fn zoom_in(&mut self) -> Option<f32> {
        self.step_zoom(ZoomStep::In)
    }

    pub fn zoom_out(&mut self) -> Option<f32> {
        self.step_zoom(ZoomStep::Out)
    }

    /// Back to fit-to-canvas with no pan. Called when the displayed image changes.
    pub fn reset(&mut self) {
        self.zoom_percent = 0;
        self.pan = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_rect(a: Rect, b: Rect) -> bool {
        (a.x - b.x).abs() < EPSILON
            && (a.y - b.y).abs() < EPSILON
            && (a.width - b.width).abs() < EPSILON
            && (a.height - b.height).abs() < EPSILON
    }

    #[test]
    fn test_scale_and_center_landscape_into_4_3() {
        let rect = scale_and_center(Size::new(800.0, 600.0), Size::new(1600.0, 900.0));
        assert!(approx_rect(rect, Rect::new(0.0, 75.0, 800.0, 450.0)), "{:?}", rect);
        assert!((rect.bottom() - 525.0).abs() < EPSILON);
    }

    #[test]
    fn test_scale_and_center_portrait_upscales() {
        let rect = scale_and_center(Size::new(800.0, 600.0), Size::new(100.0, 200.0));
        // Height bound: 600 / 200 = 3
        assert!(approx_rect(rect, Rect::new(250.0, 0.0, 300.0, 600.0)), "{:?}", rect);
    }

    #[test]
    fn test_scale_and_center_zero_image_is_empty() {
        assert_eq!(scale_and_center(Size::new(800.0, 600.0), Size::new(0.0, 900.0)), Rect::ZERO);
        assert_eq!(scale_and_center(Size::new(800.0, 600.0), Size::new(900.0, 0.0)), Rect::ZERO);
        assert_eq!(scale_and_center(Size::new(0.0, 600.0), Size::new(10.0, 10.0)), Rect::ZERO);
    }

    #[test]
    fn test_scale_and_center_stays_inside_canvas() {
        let canvases = [(1.0, 1.0), (800.0, 600.0), (333.0, 1000.0), (1920.0, 1080.0), (7.0, 3.0)];
        let images = [(1.0, 1.0), (1600.0, 900.0), (3.0, 7777.0), (4000.0, 3000.0), (999.0, 1.0)];

        for (cw, ch) in canvases {
            for (iw, ih) in images {
                let canvas = Size::new(cw, ch);
                let rect = scale_and_center(canvas, Size::new(iw, ih));
                assert!(
                    Rect::from_size(canvas).contains_rect(&rect, 0.01),
                    "{:?} escapes canvas {:?}",
                    rect,
                    canvas
                );
                // One axis always touches the canvas edges
                assert!(
                    (rect.width - cw).abs() < 0.01 || (rect.height - ch).abs() < 0.01,
                    "{:?} does not fill {:?}",
                    rect,
                    canvas
                );
            }
        }
    }

    #[test]
    fn test_apply_zoom_twenty_percent() {
        let fitted = Rect::new(0.0, 75.0, 800.0, 450.0);
        let zoomed = apply_zoom(fitted, 20);
        assert!(approx_rect(zoomed, Rect::new(-80.0, 30.0, 960.0, 540.0)), "{:?}", zoomed);
        assert!((zoomed.center().x - fitted.center().x).abs() < EPSILON);
        assert!((zoomed.center().y - fitted.center().y).abs() < EPSILON);
    }

    #[test]
    fn test_apply_zoom_non_positive_is_noop() {
        let rect = Rect::new(5.0, 6.0, 70.0, 80.0);
        assert_eq!(apply_zoom(rect, 0), rect);
        assert_eq!(apply_zoom(rect, -50), rect);
    }

    #[test]
    fn test_apply_zoom_area_is_monotonic() {
        let fitted = Rect::new(0.0, 75.0, 800.0, 450.0);
        let mut previous = fitted.area();

        for zoom in (0..=MAX_ZOOM_PERCENT as i32).step_by(ZOOM_STEP_PERCENT as usize) {
            let area = apply_zoom(fitted, zoom).area();
            assert!(area >= previous, "area shrank at {}%", zoom);
            previous = area;
        }
    }

    #[test]
    fn test_apply_pan() {
        let rect = apply_pan(Rect::new(0.0, 75.0, 800.0, 450.0), Vec2::new(50.0, -20.0));
        assert_eq!(rect, Rect::new(50.0, 55.0, 800.0, 450.0));
    }

    #[test]
    fn test_destination_rect_zooms_before_panning() {
        let canvas = Size::new(800.0, 600.0);
        let image = Size::new(1600.0, 900.0);
        let pan = Vec2::new(100.0, 0.0);

        let rect = destination_rect(canvas, image, 20, pan);
        assert!(approx_rect(rect, Rect::new(20.0, 30.0, 960.0, 540.0)), "{:?}", rect);
        assert!((rect.center().x - 500.0).abs() < EPSILON);
        assert!((rect.center().y - 300.0).abs() < EPSILON);
    }

    #[test]
    fn test_step_zoom_clamps_at_bounds() {
        let mut viewport = ViewportState::new();
        assert_eq!(viewport.step_zoom(ZoomStep::Out), None);
        assert_eq!(viewport.zoom_percent(), 0);

        for _ in 0..(MAX_ZOOM_PERCENT / ZOOM_STEP_PERCENT) {
            assert!(viewport.step_zoom(ZoomStep::In).is_some());
        }
        assert_eq!(viewport.zoom_percent(), MAX_ZOOM_PERCENT);
        assert_eq!(viewport.step_zoom(ZoomStep::In), None);
        assert_eq!(viewport.zoom_percent(), MAX_ZOOM_PERCENT);
    }

    #[test]
    fn test_step_zoom_rescales_pan() {
        let mut viewport = ViewportState::new();
        viewport.set_pan(Vec2::new(100.0, -40.0));

        let factor = viewport.step_zoom(ZoomStep::In).unwrap();
        assert!((factor - 1.05).abs() < EPSILON);
        assert_eq!(viewport.zoom_percent(), 5);
        assert!((viewport.pan().x - 105.0).abs() < EPSILON);
        assert!((viewport.pan().y + 42.0).abs() < EPSILON);

        let factor = viewport.step_zoom(ZoomStep::Out).unwrap();
        assert!((factor - 0.95).abs() < EPSILON);
        assert_eq!(viewport.zoom_percent(), 0);
    }

    #[test]
    fn test_clamped_zoom_keeps_pan() {
        let mut viewport = ViewportState::new();
        viewport.set_pan(Vec2::new(10.0, 10.0));
        assert_eq!(viewport.step_zoom(ZoomStep::Out), None);
        assert_eq!(viewport.pan(), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_reset() {
        let mut viewport = ViewportState::new();
        viewport.step_zoom(ZoomStep::In);
        viewport.set_pan(Vec2::new(3.0, 4.0));
        viewport.reset();
        assert_eq!(viewport, ViewportState::default());
    }
}
