use prism_assets::TextureData;
use wgpu::{Device, Extent3d, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages};

pub struct TextureHelper;

impl TextureHelper {
    pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

    pub fn create_depth_texture(device: &Device, width: u32, height: u32, label: &str) -> wgpu::TextureView {
        let size = Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };

        let desc = TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        };

        let texture = device.create_texture(&desc);
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_target(device: &Device, width: u32, height: u32, format: TextureFormat, label: &str) -> wgpu::TextureView {
        device
            .create_texture(&TextureDescriptor {
                label: Some(label),
                size: Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format,
                usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }
}

/// A sampled colour texture uploaded from decoded asset pixels.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub const FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

    pub fn from_data(device: &Device, queue: &wgpu::Queue, data: &TextureData) -> Self {
        let size = Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&TextureDescriptor {
            label: Some(&data.name),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: Self::FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * data.width),
                rows_per_image: Some(data.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Intermediate targets of the deferred geometry pass.
pub struct GBuffer {
    pub position: wgpu::TextureView,
    pub normal: wgpu::TextureView,
    pub albedo: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    pub size: (u32, u32),
}

impl GBuffer {
    pub const POSITION_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
    pub const NORMAL_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
    pub const ALBEDO_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        Self {
            position: TextureHelper::create_target(device, width, height, Self::POSITION_FORMAT, "G-Buffer Position"),
            normal: TextureHelper::create_target(device, width, height, Self::NORMAL_FORMAT, "G-Buffer Normal"),
            albedo: TextureHelper::create_target(device, width, height, Self::ALBEDO_FORMAT, "G-Buffer Albedo"),
            depth: TextureHelper::create_depth_texture(device, width, height, "G-Buffer Depth"),
            size: (width, height),
        }
    }
}
