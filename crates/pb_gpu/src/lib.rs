//! Window surface plumbing for the picture browser.
//!
//! The browser composites every frame on the CPU; this crate owns the wgpu
//! device and swap chain and uploads a finished frame in one copy.

pub mod config;
pub mod context;
pub mod error;

pub use config::GpuConfig;
pub use context::GpuContext;
pub use error::{GpuError, Result};
