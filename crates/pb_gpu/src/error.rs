use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("Failed to request adapter: {0}")]
    AdapterRequest(#[from] wgpu::RequestAdapterError),

    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Failed to create surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("Surface configuration error: {0}")]
    SurfaceConfig(String),

    #[error("Failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("Frame size {frame_width}x{frame_height} does not match surface {surface_width}x{surface_height}")]
    FrameSizeMismatch {
        frame_width: u32,
        frame_height: u32,
        surface_width: u32,
        surface_height: u32,
    },

    #[error("Frame data has {actual} bytes, expected {expected}")]
    FrameDataLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, GpuError>;
