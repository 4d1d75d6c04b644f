//! Picture Browser
//!
//! A single-image viewer: decode and cache an image, fit it into the
//! window, zoom and pan it, and step through the images of its folder.
//!
//! The rendering pipeline ([`image_cache`], [`viewport`], [`drag`],
//! [`render`]) is independent of the window system; [`native`] is the thin
//! winit/wgpu shell around it.

pub mod app;
pub mod config;
pub mod constants;
pub mod controls;
pub mod drag;
pub mod event;
pub mod file_list;
pub mod geometry;
pub mod image_cache;
pub mod native;
pub mod orientation;
pub mod render;
pub mod viewport;

pub use app::{App, Response, ShellRequest};
pub use image_cache::{CachedImage, DecodeError, ErrorKind, ImageCache, ImageHandle};
pub use render::{Compositor, FrontBuffer, Present, RenderError};
pub use viewport::ViewportState;
