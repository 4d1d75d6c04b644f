//! Double-buffered frame compositor.
//!
//! A frame is painted completely into an off-screen back buffer and then
//! handed to a [`Present`] sink in a single call, so the window never shows
//! a half-drawn frame.

use std::convert::Infallible;
use std::time::Instant;

use tiny_skia::{
    Color, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, PixmapRef, Stroke, Transform,
};

use super::context::{ContextBinding, SoftwareContext};
use super::RenderError;
use crate::constants::{BACKGROUND_RGBA, OUTLINE_RGBA, OUTLINE_WIDTH};
use crate::drag::DragSession;
use crate::geometry::{Rect, Size};
use crate::image_cache::ImageCache;
use crate::viewport::{destination_rect, ViewportState};

/// Destination of a finished frame.
pub trait Present {
    type Error: std::error::Error;

    fn present(&mut self, frame: PixmapRef<'_>) -> Result<(), Self::Error>;
}

/// A second pixmap that receives every presented frame.
///
/// Used when there is no window: the headless renderer and tests read the
/// last frame from here.
#[derive(Debug, Default)]
pub struct FrontBuffer {
    frame: Option<Pixmap>,
}

impl FrontBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> Option<&Pixmap> {
        self.frame.as_ref()
    }
}

impl Present for FrontBuffer {
    type Error = Infallible;

    fn present(&mut self, frame: PixmapRef<'_>) -> Result<(), Infallible> {
        match &mut self.frame {
            Some(front) if front.width() == frame.width() && front.height() == frame.height() => {
                front.data_mut().copy_from_slice(frame.data());
            }
            slot => *slot = Some(frame.to_owned()),
        }
        Ok(())
    }
}

/// Owns the rendering context and the back buffer.
#[derive(Debug)]
pub struct Compositor {
    context: SoftwareContext,
    back: Pixmap,
}

impl Compositor {
    /// Create a compositor with a `width` x `height` back buffer.
    pub fn new(width: u32, height: u32, max_dimension: u32) -> Result<Self, RenderError> {
        let context = SoftwareContext::new(max_dimension)?;
        let back = back_buffer(width, height)?;
        log::debug!("Compositor ready: {}x{} back buffer", back.width(), back.height());
        Ok(Self { context, back })
    }

    /// Binding for the image cache to create bitmaps against.
    pub fn binding(&self) -> ContextBinding {
        self.context.binding()
    }

    pub fn size(&self) -> Size {
        Size::from_pixels(self.back.width(), self.back.height())
    }

    /// Recreate the back buffer for a new canvas size. Zero dimensions are clamped to 1.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width.max(1) == self.back.width() && height.max(1) == self.back.height() {
            return Ok(());
        }
        self.back = back_buffer(width, height)?;
        log::debug!("Back buffer resized to {}x{}", self.back.width(), self.back.height());
        Ok(())
    }

    /// Replace the rendering context.
    ///
    /// Bitmaps of the old context will no longer be drawn; the caller must
    /// [`rebind`](ImageCache::rebind) the cache with the returned binding.
    pub fn recreate_context(&mut self) -> Result<ContextBinding, RenderError> {
        let context = SoftwareContext::new(self.context.max_dimension())?;
        log::info!("Rendering context replaced: {:?} -> {:?}", self.context.id(), context.id());
        self.context = context;
        Ok(self.context.binding())
    }

    /// Paint one frame into the back buffer.
    pub fn render(
        &mut self,
        cache: &mut ImageCache,
        viewport: &ViewportState,
        drag: &DragSession,
    ) -> Result<&Pixmap, RenderError> {
        let start = Instant::now();
        let [r, g, b, a] = BACKGROUND_RGBA;
        self.back.fill(Color::from_rgba8(r, g, b, a));

        let canvas = Size::from_pixels(self.back.width(), self.back.height());

        if let Some(image) = cache.current() {
            let bitmap = image.bitmap();
            if bitmap.context() != self.context.id() {
                return Err(RenderError::StaleResource {
                    live: self.context.id(),
                    found: bitmap.context(),
                });
            }

            let rect = destination_rect(canvas, image.size(), viewport.zoom_percent(), viewport.pan());
            if drag.is_dragging() {
                stroke_outline(&mut self.back, rect);
            } else {
                draw_bitmap(&mut self.back, bitmap.pixmap(), rect);
            }
        }

        log::trace!("Frame rendered in {:?}", start.elapsed());
        Ok(&self.back)
    }

    /// The back buffer, for drawing overlays after [`render`](Self::render).
    pub fn back_buffer_mut(&mut self) -> &mut Pixmap {
        &mut self.back
    }

    /// Hand the back buffer to `sink` in one call.
    pub fn present<P: Present>(&self, sink: &mut P) -> Result<(), RenderError> {
        sink.present(self.back.as_ref())
            .map_err(|e| RenderError::Present(e.to_string()))
    }
}

fn back_buffer(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    Pixmap::new(width.max(1), height.max(1)).ok_or_else(|| {
        RenderError::ContextCreation(format!("cannot allocate a {}x{} back buffer", width, height))
    })
}

fn draw_bitmap(target: &mut Pixmap, bitmap: PixmapRef<'_>, rect: Rect) {
    if rect.is_empty() {
        return;
    }

    let sx = rect.width / bitmap.width() as f32;
    let sy = rect.height / bitmap.height() as f32;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };

    target.draw_pixmap(
        0,
        0,
        bitmap,
        &paint,
        Transform::from_scale(sx, sy).post_translate(rect.x, rect.y),
        None,
    );
}

fn stroke_outline(target: &mut Pixmap, rect: Rect) {
    let Some(bounds) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) else {
        return;
    };

    let path = PathBuilder::from_rect(bounds);
    let mut paint = Paint::default();
    let [r, g, b, a] = OUTLINE_RGBA;
    paint.set_color_rgba8(r, g, b, a);

    let stroke = Stroke {
        width: OUTLINE_WIDTH,
        ..Stroke::default()
    };
    target.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}
