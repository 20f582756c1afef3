//! The light population and its GPU-side motion.

use glam::Vec3;
use rand::{Rng, SeedableRng, rngs::StdRng};
use wgpu::util::DeviceExt;

use crate::{
    binding::{storage_entry, uniform_entry},
    context::GpuContext,
    error::RenderError,
    shaders::{self, MOVE_LIGHTS_WORKGROUP_SIZE},
};

/// Allocated once at startup; never resized.
pub const MAX_LIGHTS: u32 = 5000;
pub const DEFAULT_ACTIVE_LIGHTS: u32 = 20;
pub const DEFAULT_LIGHT_INTENSITY: f32 = 0.1;

/// `numLights` plus padding ahead of the light array.
pub const LIGHT_SET_HEADER_SIZE: u64 = 16;

/// One light as laid out in the storage buffer: 8 floats, vec3 aligned to 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRecord {
    pub position: [f32; 3],
    pub _pad0: f32,
    pub color: [f32; 3],
    pub _pad1: f32,
}

impl LightRecord {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
            ..Default::default()
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct LightMotionUniform {
    time: f32,
    _pad: [f32; 3],
    bounds_min: [f32; 4],
    bounds_max: [f32; 4],
}

/// h in [0, 1]. Saturated hue pulled 20% toward white.
pub fn hue_to_rgb(h: f32) -> Vec3 {
    let f = |n: f32| {
        let k = (n + h * 6.0).rem_euclid(6.0);
        1.0 - k.min(4.0 - k).min(1.0).max(0.0)
    };
    Vec3::ONE.lerp(Vec3::new(f(5.0), f(3.0), f(1.0)), 0.8)
}

pub fn clamp_active_count(n: u32) -> u32 {
    n.clamp(1, MAX_LIGHTS)
}

#[derive(Debug, Clone)]
pub struct LightSettings {
    pub active_count: u32,
    pub intensity: f32,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    pub seed: u64,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            active_count: DEFAULT_ACTIVE_LIGHTS,
            intensity: DEFAULT_LIGHT_INTENSITY,
            bounds_min: Vec3::new(-14.0, 0.0, -6.0),
            bounds_max: Vec3::new(14.0, 12.0, 6.0),
            seed: 0x5eed,
        }
    }
}

/// Random colours for the whole population, scaled by `intensity`.
pub fn generate_light_records(seed: u64, intensity: f32) -> Vec<LightRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..MAX_LIGHTS)
        .map(|_| {
            // Positions are written by the motion pass.
            let color = hue_to_rgb(rng.gen_range(0.0..1.0)) * intensity;
            LightRecord::new(Vec3::ZERO, color)
        })
        .collect()
}

pub struct LightSet {
    active_count: u32,

    light_buffer: wgpu::Buffer,
    motion_buffer: wgpu::Buffer,

    move_lights_bind_group: wgpu::BindGroup,
    move_lights_pipeline: wgpu::ComputePipeline,
}

impl LightSet {
    pub fn new(ctx: &GpuContext, settings: &LightSettings) -> Result<Self, RenderError> {
        let active_count = clamp_active_count(settings.active_count);
        let records = generate_light_records(settings.seed, settings.intensity);

        let mut contents = Vec::with_capacity(
            LIGHT_SET_HEADER_SIZE as usize + records.len() * std::mem::size_of::<LightRecord>(),
        );
        contents.extend_from_slice(bytemuck::bytes_of(&[active_count, 0, 0, 0]));
        contents.extend_from_slice(bytemuck::cast_slice(&records));

        let light_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Set Storage Buffer"),
            contents: &contents,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let motion = LightMotionUniform {
            time: 0.0,
            _pad: [0.0; 3],
            bounds_min: settings.bounds_min.extend(0.0).to_array(),
            bounds_max: settings.bounds_max.extend(0.0).to_array(),
        };
        let motion_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Motion Uniform Buffer"),
            contents: bytemuck::bytes_of(&motion),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let (move_lights_bind_group, move_lights_pipeline) =
            ctx.create_checked("move lights compute pipeline", |device| {
                let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Move Lights Bind Group Layout"),
                    entries: &[
                        storage_entry(0, wgpu::ShaderStages::COMPUTE, false), // light set
                        uniform_entry(1, wgpu::ShaderStages::COMPUTE),        // motion
                    ],
                });

                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Move Lights Bind Group"),
                    layout: &layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: light_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: motion_buffer.as_entire_binding(),
                        },
                    ],
                });

                let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Move Lights Pipeline Layout"),
                    bind_group_layouts: &[&layout],
                    push_constant_ranges: &[],
                });

                let module = shaders::create_module(device, "move lights compute shader", shaders::MOVE_LIGHTS_COMPUTE_SRC);

                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some("Move Lights Compute Pipeline"),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    cache: None,
                });

                (bind_group, pipeline)
            })?;

        log::info!(
            "Light set ready: {} allocated, {} active",
            MAX_LIGHTS,
            active_count
        );

        Ok(Self {
            active_count,
            light_buffer,
            motion_buffer,
            move_lights_bind_group,
            move_lights_pipeline,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.light_buffer
    }

    pub fn active_count(&self) -> u32 {
        self.active_count
    }

    /// Updates the count read by every downstream shader. Returns the clamped value.
    pub fn set_active_count(&mut self, queue: &wgpu::Queue, n: u32) -> u32 {
        let clamped = clamp_active_count(n);
        if clamped != self.active_count {
            log::debug!("Active lights {} -> {}", self.active_count, clamped);
        }
        self.active_count = clamped;
        queue.write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(&clamped));
        clamped
    }

    /// Overwrites one light; it stays put until the next `advance`.
    pub fn write_light(&self, queue: &wgpu::Queue, index: u32, position: Vec3, color: Vec3) {
        if index >= MAX_LIGHTS {
            log::warn!("write_light: index {index} is outside the {MAX_LIGHTS} allocated lights");
            return;
        }

        let record = LightRecord::new(position, color);
        let offset = LIGHT_SET_HEADER_SIZE + index as u64 * std::mem::size_of::<LightRecord>() as u64;
        queue.write_buffer(&self.light_buffer, offset, bytemuck::bytes_of(&record));
    }

    /// Moves every active light to its position at `time` (seconds), on the GPU.
    ///
    /// The time write is queued ahead of the submission that reads it. Uses its
    /// own encoder so the motion pass stays out of the render passes' timing.
    pub fn advance(&self, ctx: &GpuContext, time: f32) {
        ctx.queue.write_buffer(&self.motion_buffer, 0, bytemuck::bytes_of(&time));

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Move Lights Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Move Lights Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.move_lights_pipeline);
            compute_pass.set_bind_group(0, &self.move_lights_bind_group, &[]);
            compute_pass.dispatch_workgroups(self.active_count.div_ceil(MOVE_LIGHTS_WORKGROUP_SIZE), 1, 1);
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn record_stride_is_eight_floats() {
        assert_eq!(std::mem::size_of::<LightRecord>(), 8 * 4);
        assert_eq!(std::mem::size_of::<LightMotionUniform>(), 48);
    }

    #[test]
    fn hue_zero_is_washed_red() {
        let c = hue_to_rgb(0.0);
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(c.y, 0.2, epsilon = 1e-6);
        assert_relative_eq!(c.z, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn hue_third_is_washed_green() {
        let c = hue_to_rgb(1.0 / 3.0);
        assert_relative_eq!(c.x, 0.2, epsilon = 1e-5);
        assert_relative_eq!(c.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(c.z, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn active_count_clamps_to_allocated_range() {
        assert_eq!(clamp_active_count(0), 1);
        assert_eq!(clamp_active_count(20), 20);
        assert_eq!(clamp_active_count(MAX_LIGHTS + 1), MAX_LIGHTS);
    }

    #[test]
    fn records_are_seeded_and_scaled() {
        let a = generate_light_records(7, 0.1);
        let b = generate_light_records(7, 0.1);
        assert_eq!(a.len(), MAX_LIGHTS as usize);
        assert_eq!(a, b);
        for r in &a {
            assert!(r.color.iter().all(|&c| (0.0..=0.1 + 1e-6).contains(&c)));
            assert_eq!(r.position, [0.0; 3]);
        }
    }
}
