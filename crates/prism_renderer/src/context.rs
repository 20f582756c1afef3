use crate::error::RenderError;

/// Device, queue and output format, handed explicitly to every component.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format of the final colour target (swapchain or offscreen).
    pub color_format: wgpu::TextureFormat,
}

impl GpuContext {
    /// Requests an adapter compatible with `surface` (if any) and opens a device on it.
    /// `color_format` is ignored when a surface is given; the surface picks it.
    pub async fn request(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?}, {:?})", info.name, info.device_type, info.backend);

        // A surface dictates the output format; prefer an sRGB one.
        let color_format = match surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&adapter);
                caps.formats
                    .iter()
                    .copied()
                    .find(|f| f.is_srgb())
                    .or_else(|| caps.formats.first().copied())
                    .ok_or_else(|| RenderError::SurfaceUnsupported(info.name.clone()))?
            }
            None => color_format,
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Prism Device"),
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await?;

        Ok(Self {
            adapter,
            device,
            queue,
            color_format,
        })
    }

    /// Device without a surface, for offscreen rendering and tests.
    pub fn headless(color_format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        pollster::block_on(Self::request(&instance, None, color_format))
    }

    /// Runs `create` inside validation and out-of-memory error scopes, turning
    /// device errors raised while building resources into a `RenderError`.
    pub fn create_checked<T>(
        &self,
        what: &str,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> Result<T, RenderError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let value = create(&self.device);

        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        let validation = pollster::block_on(self.device.pop_error_scope());

        match out_of_memory.or(validation) {
            Some(err) => Err(RenderError::ResourceCreation {
                what: what.to_string(),
                message: err.to_string(),
            }),
            None => Ok(value),
        }
    }

    /// Blocks until every submission so far has retired.
    pub fn wait_idle(&self) -> Result<(), RenderError> {
        self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })?;
        Ok(())
    }
}
