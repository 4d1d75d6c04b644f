//! Software rendering context and the bitmaps bound to it.
//!
//! Every context gets a process-unique [`ContextId`]; every [`Bitmap`] is
//! stamped with the id of the context it was created for. A bitmap from an
//! older context is never drawn: the compositor checks the stamp and the
//! image cache is consumed by [`ImageCache::rebind`](crate::ImageCache::rebind)
//! when the context is replaced.

use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;
use thiserror::Error;
use tiny_skia::{IntSize, Pixmap, PixmapRef};

use super::RenderError;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a rendering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitmapError {
    #[error("bitmap has an empty dimension ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("bitmap {width}x{height} exceeds the context limit of {max}px per edge")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("pixel buffer of {len} bytes does not match {width}x{height}")]
    BufferSize { width: u32, height: u32, len: usize },
}

/// The CPU rendering context owned by the compositor.
#[derive(Debug)]
pub struct SoftwareContext {
    id: ContextId,
    max_dimension: u32,
}

impl SoftwareContext {
    /// Create a context accepting bitmaps up to `max_dimension` pixels per edge.
    pub fn new(max_dimension: u32) -> Result<Self, RenderError> {
        if max_dimension == 0 {
            return Err(RenderError::ContextCreation(
                "maximum bitmap dimension must be positive".to_string(),
            ));
        }

        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        log::debug!("Created rendering context {:?}", id);
        Ok(Self { id, max_dimension })
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// A handle for creating bitmaps against this context.
    pub fn binding(&self) -> ContextBinding {
        ContextBinding {
            id: self.id,
            max_dimension: self.max_dimension,
        }
    }
}

/// What the image cache holds to create bitmaps for one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBinding {
    id: ContextId,
    max_dimension: u32,
}

impl ContextBinding {
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Turn decoded RGBA pixels into a premultiplied bitmap for this context.
    pub fn create_bitmap(&self, image: RgbaImage) -> Result<Bitmap, BitmapError> {
        let (width, height) = image.dimensions();

        if width > self.max_dimension || height > self.max_dimension {
            return Err(BitmapError::TooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }
        let size = IntSize::from_wh(width, height).ok_or(BitmapError::Empty { width, height })?;

        let mut data = image.into_raw();
        premultiply(&mut data);
        let len = data.len();

        let pixmap = Pixmap::from_vec(data, size).ok_or(BitmapError::BufferSize { width, height, len })?;

        Ok(Bitmap {
            pixmap,
            context: self.id,
        })
    }
}

/// An immutable, premultiplied RGBA bitmap bound to one rendering context.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pixmap: Pixmap,
    context: ContextId,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn pixmap(&self) -> PixmapRef<'_> {
        self.pixmap.as_ref()
    }

    /// Bytes of pixel memory held by this bitmap.
    pub fn byte_len(&self) -> usize {
        self.pixmap.data().len()
    }
}

fn premultiply(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
}
