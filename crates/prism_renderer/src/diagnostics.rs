//! Occupancy readback. Never on the per-frame path: both variants copy the
//! count buffer into a MAP_READ staging buffer, and the blocking one stalls the
//! queue until the copy has landed.

use std::fmt;
use std::sync::mpsc;

use crate::{context::GpuContext, error::RenderError};

/// Distribution of light counts across clusters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancyStats {
    pub total_clusters: u32,
    pub sum: u64,
    pub average: f32,
    pub max: u32,
    pub empty: u32,
    pub empty_percent: f32,
    /// Clusters whose count exceeds the slot capacity. Always zero unless the
    /// assignment pass is broken.
    pub overflowed: u32,
}

impl OccupancyStats {
    /// Reports the counts as written, so a count above `capacity` shows up in
    /// `max` and `overflowed` instead of being hidden.
    pub fn from_counts(counts: &[u32], capacity: u32) -> Self {
        let total_clusters = counts.len() as u32;
        let mut sum = 0u64;
        let mut max = 0u32;
        let mut empty = 0u32;
        let mut overflowed = 0u32;

        for &c in counts {
            sum += c as u64;
            max = max.max(c);
            if c == 0 {
                empty += 1;
            }
            if c > capacity {
                overflowed += 1;
            }
        }

        if overflowed > 0 {
            log::warn!("{overflowed} clusters report more than {capacity} lights (max {max})");
        }

        let (average, empty_percent) = if total_clusters == 0 {
            (0.0, 0.0)
        } else {
            (
                sum as f32 / total_clusters as f32,
                empty as f32 / total_clusters as f32 * 100.0,
            )
        };

        Self {
            total_clusters,
            sum,
            average,
            max,
            empty,
            empty_percent,
            overflowed,
        }
    }
}

impl fmt::Display for OccupancyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Clusters: {}, avg lights: {:.2}, max: {}, empty: {:.1}%",
            self.total_clusters, self.average, self.max, self.empty_percent
        )
    }
}

fn copy_to_staging(ctx: &GpuContext, counts: &wgpu::Buffer, total: u32) -> wgpu::Buffer {
    let size = (total as u64 * std::mem::size_of::<u32>() as u64).max(4);

    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Cluster Counts Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Cluster Counts Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(counts, 0, &staging, 0, size);
    ctx.queue.submit(std::iter::once(encoder.finish()));

    staging
}

fn take_counts(staging: &wgpu::Buffer, total: u32) -> Vec<u32> {
    let counts = {
        let data = staging.slice(..).get_mapped_range();
        let words: &[u32] = bytemuck::cast_slice(&data);
        words[..total as usize].to_vec()
    };
    staging.unmap();
    counts
}

/// Waits for all submitted work, copies `total` counts out and maps them.
pub(crate) fn read_counts_blocking(
    ctx: &GpuContext,
    counts: &wgpu::Buffer,
    total: u32,
) -> Result<Vec<u32>, RenderError> {
    ctx.wait_idle()?;
    let staging = copy_to_staging(ctx, counts, total);

    let (tx, rx) = mpsc::channel();
    staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.wait_idle()?;

    rx.recv().map_err(|_| RenderError::ReadbackChannelClosed)??;
    Ok(take_counts(&staging, total))
}

/// A count-buffer readback in flight. Poll it from the frame loop until it yields.
pub struct OccupancyReadback {
    staging: wgpu::Buffer,
    total: u32,
    capacity: u32,
    receiver: mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
}

impl OccupancyReadback {
    /// Queues the copy behind everything already submitted and starts the map.
    pub fn request(ctx: &GpuContext, grid: &crate::cluster::ClusterGrid) -> Self {
        let total = grid.total();
        let staging = copy_to_staging(ctx, grid.counts_buffer(), total);

        let (tx, receiver) = mpsc::channel();
        staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        Self {
            staging,
            total,
            capacity: grid.params().max_lights_per_cluster,
            receiver,
        }
    }

    /// Non-blocking. `None` while the map is still pending.
    pub fn poll(&mut self, ctx: &GpuContext) -> Option<Result<OccupancyStats, RenderError>> {
        if let Err(err) = ctx.device.poll(wgpu::PollType::Poll) {
            return Some(Err(err.into()));
        }

        match self.receiver.try_recv() {
            Ok(Ok(())) => {
                let counts = take_counts(&self.staging, self.total);
                Some(Ok(OccupancyStats::from_counts(&counts, self.capacity)))
            }
            Ok(Err(err)) => Some(Err(err.into())),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(RenderError::ReadbackChannelClosed)),
        }
    }
}
