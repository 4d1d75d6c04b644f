use std::borrow::Cow;
use std::sync::Arc;

use winit::window::Window;

use crate::config::GpuConfig;
use crate::error::{GpuError, Result};

/// Surface formats a CPU-composited RGBA frame can be copied into directly.
const COPYABLE_FORMATS: &[wgpu::TextureFormat] = &[
    wgpu::TextureFormat::Rgba8UnormSrgb,
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Bgra8UnormSrgb,
    wgpu::TextureFormat::Bgra8Unorm,
];

/// Main GPU context managing wgpu device, queue, and surface
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub config: GpuConfig,
}

impl GpuContext {
    /// Initialize GPU context for a window with default configuration.
    ///
    /// This is async because adapter and device requests are; use
    /// `pollster::block_on()` from the event loop thread.
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        Self::with_config(window, GpuConfig::default()).await
    }

    /// Initialize GPU context for a window with custom configuration.
    pub async fn with_config(window: Arc<Window>, config: GpuConfig) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        Self::finish_init(adapter, surface, window, config).await
    }

    /// Complete GPU context initialization with adapter and surface
    async fn finish_init(
        adapter: wgpu::Adapter,
        surface: wgpu::Surface<'static>,
        window: Arc<Window>,
        config: GpuConfig,
    ) -> Result<Self> {
        // Nothing is rendered on the GPU, the downlevel limits are plenty.
        let limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Main Device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                experimental_features: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);

        if !surface_caps.usages.contains(wgpu::TextureUsages::COPY_DST) {
            return Err(GpuError::SurfaceConfig(
                "surface textures cannot be copy destinations".to_string(),
            ));
        }

        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| COPYABLE_FORMATS.contains(f))
            .ok_or_else(|| {
                GpuError::SurfaceConfig(format!(
                    "no 8-bit RGBA/BGRA surface format among {:?}",
                    surface_caps.formats
                ))
            })?;

        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        // Use present mode from config, falling back to Fifo if not supported
        let present_mode = if surface_caps.present_modes.contains(&config.present_mode) {
            config.present_mode
        } else {
            wgpu::PresentMode::Fifo // Always supported
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_DST,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: config.max_frame_latency,
        };

        surface.configure(&device, &surface_config);
        log::debug!(
            "Surface configured: {}x{} {:?} {:?}",
            surface_config.width,
            surface_config.height,
            surface_format,
            present_mode
        );

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            config,
        })
    }

    /// Handle window resize
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        self.surface_config.width = new_width.max(1);
        self.surface_config.height = new_height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Get current surface width
    pub fn width(&self) -> u32 {
        self.surface_config.width
    }

    /// Get current surface height
    pub fn height(&self) -> u32 {
        self.surface_config.height
    }

    /// Copy a finished RGBA8 frame onto the next swap chain texture and present it.
    ///
    /// The whole frame goes up in a single `write_texture`, so the window never
    /// shows a partially drawn image. A lost or outdated surface is
    /// reconfigured and reported; the caller simply retries on the next redraw.
    pub fn present_rgba(&mut self, data: &[u8], width: u32, height: u32) -> Result<()> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(GpuError::FrameDataLength {
                expected,
                actual: data.len(),
            });
        }

        if width != self.width() || height != self.height() {
            return Err(GpuError::FrameSizeMismatch {
                frame_width: width,
                frame_height: height,
                surface_width: self.width(),
                surface_height: self.height(),
            });
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::debug!("Surface {:?}, reconfiguring", e);
                self.surface.configure(&self.device, &self.surface_config);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = to_surface_order(data, self.surface_config.format);

        self.queue.write_texture(
            frame.texture.as_image_copy(),
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::empty());
        frame.present();
        Ok(())
    }
}

/// Reorder RGBA8 bytes for the given surface format.
pub fn to_surface_order(data: &[u8], format: wgpu::TextureFormat) -> Cow<'_, [u8]> {
    match format {
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
            let mut swapped = data.to_vec();
            for px in swapped.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
            Cow::Owned(swapped)
        }
        _ => Cow::Borrowed(data),
    }
}
