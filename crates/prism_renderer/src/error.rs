#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no suitable GPU adapter found: {0}")]
    AdapterUnavailable(#[from] wgpu::RequestAdapterError),
    #[error("failed to open GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("failed to create surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    #[error("surface does not support adapter {0}")]
    SurfaceUnsupported(String),
    #[error("invalid cluster settings: {0}")]
    InvalidClusterSettings(String),
    #[error("failed to create {what}: {message}")]
    ResourceCreation { what: String, message: String },
    #[error("buffer map failed during readback: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),
    #[error("GPU poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("readback channel closed before the map completed")]
    ReadbackChannelClosed,
}
