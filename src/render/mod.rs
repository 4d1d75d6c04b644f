//! Software rendering: the rendering context, bitmaps bound to it, and the
//! double-buffered compositor that paints a frame from them.

mod compositor;
mod context;

pub use compositor::{Compositor, FrontBuffer, Present};
pub use context::{Bitmap, BitmapError, ContextBinding, ContextId, SoftwareContext};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The context or the back buffer could not be created. Fatal at startup.
    #[error("failed to create rendering context: {0}")]
    ContextCreation(String),

    /// A bitmap created for another context reached the compositor.
    #[error("bitmap belongs to context {found:?}, live context is {live:?}")]
    StaleResource { live: ContextId, found: ContextId },

    #[error("failed to present frame: {0}")]
    Present(String),
}
