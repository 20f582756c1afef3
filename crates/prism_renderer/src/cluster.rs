//! The cluster grid: a view-frustum subdivision rebuilt from the light set every frame.
//!
//! X and Y slices are uniform in NDC, Z slices are logarithmic in view depth. Each
//! cluster owns `MAX_LIGHTS_PER_CLUSTER` index slots; the count buffer holds how
//! many are filled. Both buffers are reallocated only when the cluster total
//! changes, which bumps `generation()` so dependents can rebuild their bindings.

pub mod reference;

use wgpu::util::DeviceExt;

use crate::{
    binding::{storage_entry, uniform_entry},
    camera::CameraBuffer,
    context::GpuContext,
    diagnostics::{self, OccupancyStats},
    error::RenderError,
    light::LightSet,
    shaders::{self, CLUSTERING_WORKGROUP_SIZE, MAX_LIGHTS_PER_CLUSTER, NUM_X_SLICES, NUM_Z_SLICES},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl ClusterDims {
    /// Y slices follow the aspect ratio so clusters stay roughly square on screen.
    pub fn for_viewport(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let y = (NUM_X_SLICES as u64 * height as u64).div_ceil(width as u64).max(1) as u32;
        Self {
            x: NUM_X_SLICES,
            y,
            z: NUM_Z_SLICES,
        }
    }

    pub fn total(&self) -> u32 {
        self.x * self.y * self.z
    }

    pub fn flat_index(&self, x: u32, y: u32, z: u32) -> u32 {
        x + y * self.x + z * self.x * self.y
    }
}

/// Depth range and light reach used both to assign and to shade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterSettings {
    pub near: f32,
    pub far: f32,
    /// Distance at which a light's contribution reaches zero.
    pub light_radius: f32,
}

impl ClusterSettings {
    /// The log slicing needs `0 < near < far`; a light needs a positive reach.
    pub fn validate(&self) -> Result<(), RenderError> {
        let Self { near, far, light_radius } = *self;
        if !(near.is_finite() && near > 0.0) {
            return Err(RenderError::InvalidClusterSettings(format!(
                "near plane must be positive, got {near}"
            )));
        }
        if !(far.is_finite() && far > near) {
            return Err(RenderError::InvalidClusterSettings(format!(
                "far plane must lie beyond near ({near}), got {far}"
            )));
        }
        if !(light_radius.is_finite() && light_radius > 0.0) {
            return Err(RenderError::InvalidClusterSettings(format!(
                "light radius must be positive, got {light_radius}"
            )));
        }
        Ok(())
    }
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 1000.0,
            light_radius: 2.0,
        }
    }
}

/// Mirrors `ClusterParams` in common.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ClusterParams {
    pub dims: [u32; 4],
    pub max_lights_per_cluster: u32,
    pub light_radius: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub slice_scale: f32,
    pub slice_bias: f32,
    pub viewport: [f32; 2],
}

impl ClusterParams {
    pub fn new(dims: ClusterDims, settings: &ClusterSettings, width: u32, height: u32) -> Self {
        let log_range = (settings.far / settings.near).ln();
        let nz = dims.z as f32;
        Self {
            dims: [dims.x, dims.y, dims.z, dims.total()],
            max_lights_per_cluster: MAX_LIGHTS_PER_CLUSTER,
            light_radius: settings.light_radius,
            z_near: settings.near,
            z_far: settings.far,
            slice_scale: nz / log_range,
            slice_bias: -nz * settings.near.ln() / log_range,
            viewport: [width.max(1) as f32, height.max(1) as f32],
        }
    }

    pub fn cluster_dims(&self) -> ClusterDims {
        ClusterDims {
            x: self.dims[0],
            y: self.dims[1],
            z: self.dims[2],
        }
    }
}

struct ClusterBuffers {
    counts: wgpu::Buffer,
    indices: wgpu::Buffer,
    compute_bind_group: wgpu::BindGroup,
}

pub struct ClusterGrid {
    settings: ClusterSettings,
    dims: ClusterDims,
    viewport: (u32, u32),

    params_buffer: wgpu::Buffer,
    buffers: ClusterBuffers,

    // Fixed for the grid's lifetime; held to rebuild the compute bind group.
    light_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,

    compute_layout: wgpu::BindGroupLayout,
    compute_pipeline: wgpu::ComputePipeline,

    generation: u64,
    reallocations: u64,
}

impl ClusterGrid {
    pub fn new(
        ctx: &GpuContext,
        lights: &LightSet,
        camera: &CameraBuffer,
        settings: ClusterSettings,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        settings.validate()?;
        let dims = ClusterDims::for_viewport(width, height);
        let params = ClusterParams::new(dims, &settings, width, height);

        let params_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cluster Params Uniform Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let (compute_layout, compute_pipeline) = ctx.create_checked("clustering compute pipeline", |device| {
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Clustering Bind Group Layout"),
                entries: &[
                    storage_entry(0, wgpu::ShaderStages::COMPUTE, true), // light set
                    uniform_entry(1, wgpu::ShaderStages::COMPUTE),       // camera
                    uniform_entry(2, wgpu::ShaderStages::COMPUTE),       // params
                    storage_entry(3, wgpu::ShaderStages::COMPUTE, false), // counts
                    storage_entry(4, wgpu::ShaderStages::COMPUTE, false), // indices
                ],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Clustering Pipeline Layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

            let module = shaders::create_module(device, "clustering compute shader", shaders::CLUSTERING_COMPUTE_SRC);

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Clustering Compute Pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

            (layout, pipeline)
        })?;

        let light_buffer = lights.buffer().clone();
        let camera_buffer = camera.buffer.clone();
        let buffers = Self::allocate(
            ctx,
            &compute_layout,
            &light_buffer,
            &camera_buffer,
            &params_buffer,
            dims,
        )?;

        log::info!(
            "Cluster grid {}x{}x{} ({} clusters) for {}x{}",
            dims.x,
            dims.y,
            dims.z,
            dims.total(),
            width,
            height
        );

        Ok(Self {
            settings,
            dims,
            viewport: (width, height),
            params_buffer,
            buffers,
            light_buffer,
            camera_buffer,
            compute_layout,
            compute_pipeline,
            generation: 1,
            reallocations: 0,
        })
    }

    fn allocate(
        ctx: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        light_buffer: &wgpu::Buffer,
        camera_buffer: &wgpu::Buffer,
        params_buffer: &wgpu::Buffer,
        dims: ClusterDims,
    ) -> Result<ClusterBuffers, RenderError> {
        let total = dims.total() as u64;
        let u32_size = std::mem::size_of::<u32>() as u64;

        ctx.create_checked("cluster buffers", |device| {
            let counts = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Cluster Counts Buffer"),
                size: (total * u32_size).max(4),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });

            let indices = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Cluster Light Indices Buffer"),
                size: (total * MAX_LIGHTS_PER_CLUSTER as u64 * u32_size).max(4),
                usage: wgpu::BufferUsages::STORAGE,
                mapped_at_creation: false,
            });

            let compute_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Clustering Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: light_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: camera_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: counts.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: indices.as_entire_binding(),
                    },
                ],
            });

            ClusterBuffers {
                counts,
                indices,
                compute_bind_group,
            }
        })
    }

    /// Brings the grid in line with the viewport. Returns true when the buffers
    /// were reallocated (and `generation()` advanced).
    pub fn rebuild_if_needed(&mut self, ctx: &GpuContext, width: u32, height: u32) -> Result<bool, RenderError> {
        if width == 0 || height == 0 {
            log::debug!("Skipping cluster rebuild for empty viewport {width}x{height}");
            return Ok(false);
        }
        if self.viewport == (width, height) {
            return Ok(false);
        }

        let dims = ClusterDims::for_viewport(width, height);
        let reallocate = dims.total() != self.dims.total();

        if reallocate {
            self.buffers = Self::allocate(
                ctx,
                &self.compute_layout,
                &self.light_buffer,
                &self.camera_buffer,
                &self.params_buffer,
                dims,
            )?;
            self.generation += 1;
            self.reallocations += 1;
            log::info!(
                "Cluster grid reallocated to {}x{}x{} ({} clusters)",
                dims.x,
                dims.y,
                dims.z,
                dims.total()
            );
        }

        self.dims = dims;
        self.viewport = (width, height);
        self.write_params(&ctx.queue);
        Ok(reallocate)
    }

    fn write_params(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params()));
    }

    /// Records the assignment: counts are zeroed, then one invocation per active light.
    pub fn assign(&self, encoder: &mut wgpu::CommandEncoder, active_lights: u32) {
        encoder.clear_buffer(&self.buffers.counts, 0, None);

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Clustering Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.compute_pipeline);
        compute_pass.set_bind_group(0, &self.buffers.compute_bind_group, &[]);
        compute_pass.dispatch_workgroups(active_lights.div_ceil(CLUSTERING_WORKGROUP_SIZE), 1, 1);
    }

    /// Blocks until the counts of the last submitted assignment are on the host.
    pub fn read_occupancy_stats(&self, ctx: &GpuContext) -> Result<OccupancyStats, RenderError> {
        let counts = self.read_counts(ctx)?;
        Ok(OccupancyStats::from_counts(&counts, MAX_LIGHTS_PER_CLUSTER))
    }

    /// Raw per-cluster counts, flat-indexed. Blocking, like `read_occupancy_stats`.
    pub fn read_counts(&self, ctx: &GpuContext) -> Result<Vec<u32>, RenderError> {
        diagnostics::read_counts_blocking(ctx, &self.buffers.counts, self.dims.total())
    }

    pub fn params(&self) -> ClusterParams {
        ClusterParams::new(self.dims, &self.settings, self.viewport.0, self.viewport.1)
    }

    pub fn dims(&self) -> ClusterDims {
        self.dims
    }

    pub fn total(&self) -> u32 {
        self.dims.total()
    }

    /// Increments whenever the count or index buffer is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reallocation_count(&self) -> u64 {
        self.reallocations
    }

    pub fn params_buffer(&self) -> &wgpu::Buffer {
        &self.params_buffer
    }

    pub fn counts_buffer(&self) -> &wgpu::Buffer {
        &self.buffers.counts
    }

    pub fn indices_buffer(&self) -> &wgpu::Buffer {
        &self.buffers.indices
    }
}
