//! Host mirror of the clustering math, used to check the GPU assignment.
//!
//! Lights are appended in index order here, whereas the GPU appends in whatever
//! order invocations win their slots. Counts agree; slot order does not.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use super::ClusterParams;

pub fn depth_slice(params: &ClusterParams, view_depth: f32) -> u32 {
    let s = (view_depth.max(params.z_near).ln() * params.slice_scale + params.slice_bias).floor();
    s.clamp(0.0, (params.dims[2] - 1) as f32) as u32
}

/// ndc in [-1, 1] -> slice in [0, n)
pub fn screen_slice(ndc: f32, n: u32) -> u32 {
    let s = ((ndc * 0.5 + 0.5) * n as f32).floor();
    s.clamp(0.0, (n - 1) as f32) as u32
}

/// The cluster a fragment at `frag_coord` (pixels, origin top-left) reads from.
pub fn cluster_for_fragment(params: &ClusterParams, frag_coord: Vec2, view_depth: f32) -> u32 {
    let uv = frag_coord / Vec2::from(params.viewport);
    let dims = params.cluster_dims();
    let x = screen_slice(uv.x * 2.0 - 1.0, dims.x);
    let y = screen_slice(1.0 - uv.y * 2.0, dims.y);
    let z = depth_slice(params, view_depth);
    dims.flat_index(x, y, z)
}

/// Pixel coordinate and view depth of a world-space point, or `None` behind the camera.
pub fn project_to_fragment(params: &ClusterParams, view: Mat4, proj: Mat4, world: Vec3) -> Option<(Vec2, f32)> {
    let view_pos = view * world.extend(1.0);
    let depth = -view_pos.z;
    if depth <= 0.0 {
        return None;
    }
    let clip = proj * view_pos;
    let ndc = clip.xy() / clip.w;
    let viewport = Vec2::from(params.viewport);
    let frag = Vec2::new((ndc.x * 0.5 + 0.5) * viewport.x, (0.5 - ndc.y * 0.5) * viewport.y);
    Some((frag, depth))
}

/// Inclusive cluster ranges `(x, y, z)` overlapped by a light, if any.
pub fn light_cluster_bounds(
    params: &ClusterParams,
    view: Mat4,
    proj: Mat4,
    position: Vec3,
) -> Option<([u32; 2], [u32; 2], [u32; 2])> {
    let radius = params.light_radius;
    let view_pos = (view * position.extend(1.0)).xyz();
    let depth = -view_pos.z;

    if depth + radius < params.z_near || depth - radius > params.z_far {
        return None;
    }

    let d_min = (depth - radius).max(params.z_near);
    let d_max = (depth + radius).min(params.z_far);

    let mut ndc_min = Vec2::splat(1e30);
    let mut ndc_max = Vec2::splat(-1e30);
    for corner in 0..8u32 {
        let p = Vec3::new(
            if corner & 1 != 0 { view_pos.x + radius } else { view_pos.x - radius },
            if corner & 2 != 0 { view_pos.y + radius } else { view_pos.y - radius },
            if corner & 4 != 0 { -d_max } else { -d_min },
        );
        let clip = proj * p.extend(1.0);
        let ndc = clip.xy() / clip.w;
        ndc_min = ndc_min.min(ndc);
        ndc_max = ndc_max.max(ndc);
    }

    if ndc_max.x < -1.0 || ndc_min.x > 1.0 || ndc_max.y < -1.0 || ndc_min.y > 1.0 {
        return None;
    }

    let dims = params.cluster_dims();
    Some((
        [screen_slice(ndc_min.x, dims.x), screen_slice(ndc_max.x, dims.x)],
        [screen_slice(ndc_min.y, dims.y), screen_slice(ndc_max.y, dims.y)],
        [depth_slice(params, d_min), depth_slice(params, d_max)],
    ))
}

/// Full assignment on the host: per-cluster counts (capped) and the flat index
/// array laid out like the GPU buffer.
pub fn assign_lights(params: &ClusterParams, view: Mat4, proj: Mat4, positions: &[Vec3]) -> (Vec<u32>, Vec<u32>) {
    let dims = params.cluster_dims();
    let capacity = params.max_lights_per_cluster as usize;
    let total = dims.total() as usize;

    let mut counts = vec![0u32; total];
    let mut indices = vec![0u32; total * capacity];

    for (light_idx, &position) in positions.iter().enumerate() {
        let Some((xs, ys, zs)) = light_cluster_bounds(params, view, proj, position) else {
            continue;
        };
        for z in zs[0]..=zs[1] {
            for y in ys[0]..=ys[1] {
                for x in xs[0]..=xs[1] {
                    let c = dims.flat_index(x, y, z) as usize;
                    let count = counts[c] as usize;
                    if count < capacity {
                        indices[c * capacity + count] = light_idx as u32;
                        counts[c] += 1;
                    }
                }
            }
        }
    }

    (counts, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterDims, ClusterSettings};
    use crate::shaders::MAX_LIGHTS_PER_CLUSTER;

    fn setup(radius: f32) -> (ClusterParams, Mat4, Mat4) {
        let settings = ClusterSettings {
            near: 0.1,
            far: 100.0,
            light_radius: radius,
        };
        let params = ClusterParams::new(ClusterDims::for_viewport(1280, 720), &settings, 1280, 720);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(45f32.to_radians(), 1280.0 / 720.0, 0.1, 100.0);
        (params, view, proj)
    }

    #[test]
    fn depth_slice_clamps_to_grid() {
        let (params, _, _) = setup(1.0);
        assert_eq!(depth_slice(&params, 0.01), 0);
        assert_eq!(depth_slice(&params, 0.1), 0);
        assert_eq!(depth_slice(&params, 100.0), 23);
        assert_eq!(depth_slice(&params, 1e6), 23);
    }

    #[test]
    fn depth_slices_grow_with_depth() {
        let (params, _, _) = setup(1.0);
        let mut last = 0;
        for i in 1..200 {
            let s = depth_slice(&params, i as f32 * 0.5);
            assert!(s >= last);
            last = s;
        }
    }

    #[test]
    fn screen_slice_edges() {
        assert_eq!(screen_slice(-1.0, 16), 0);
        assert_eq!(screen_slice(0.0, 16), 8);
        assert_eq!(screen_slice(1.0, 16), 15);
        assert_eq!(screen_slice(-3.0, 16), 0);
    }

    #[test]
    fn fragment_lookup_flips_y() {
        let (params, _, _) = setup(1.0);
        let dims = params.cluster_dims();
        let top_left = cluster_for_fragment(&params, Vec2::new(0.5, 0.5), 0.1);
        let bottom_left = cluster_for_fragment(&params, Vec2::new(0.5, 719.5), 0.1);
        assert_eq!(top_left, dims.flat_index(0, dims.y - 1, 0));
        assert_eq!(bottom_left, dims.flat_index(0, 0, 0));
    }

    #[test]
    fn tiny_light_lands_in_its_own_cluster() {
        let (params, view, proj) = setup(0.01);
        let position = Vec3::new(0.3, -0.2, -10.0);

        let (counts, indices) = assign_lights(&params, view, proj, &[position]);
        let (frag, depth) = project_to_fragment(&params, view, proj, position).unwrap();
        let expected = cluster_for_fragment(&params, frag, depth) as usize;

        assert_eq!(counts[expected], 1);
        assert_eq!(indices[expected * MAX_LIGHTS_PER_CLUSTER as usize], 0);
        assert!(counts.iter().sum::<u32>() <= 8, "a tiny light touches at most a 2x2x2 block");
    }

    #[test]
    fn light_behind_camera_is_skipped() {
        let (params, view, proj) = setup(1.0);
        let (counts, _) = assign_lights(&params, view, proj, &[Vec3::new(0.0, 0.0, 5.0)]);
        assert!(counts.iter().all(|&c| c == 0));
    }

    #[test]
    fn light_beyond_far_is_skipped() {
        let (params, view, proj) = setup(1.0);
        let (counts, _) = assign_lights(&params, view, proj, &[Vec3::new(0.0, 0.0, -150.0)]);
        assert!(counts.iter().all(|&c| c == 0));
    }

    #[test]
    fn overfull_cluster_caps_at_capacity() {
        let (params, view, proj) = setup(0.01);
        let positions = vec![Vec3::new(0.0, 0.0, -10.0); MAX_LIGHTS_PER_CLUSTER as usize + 5];
        let (counts, indices) = assign_lights(&params, view, proj, &positions);

        assert_eq!(*counts.iter().max().unwrap(), MAX_LIGHTS_PER_CLUSTER);
        let (frag, depth) = project_to_fragment(&params, view, proj, positions[0]).unwrap();
        let c = cluster_for_fragment(&params, frag, depth) as usize;
        let base = c * MAX_LIGHTS_PER_CLUSTER as usize;
        // First come, first served.
        assert_eq!(indices[base], 0);
        assert_eq!(indices[base + MAX_LIGHTS_PER_CLUSTER as usize - 1], MAX_LIGHTS_PER_CLUSTER - 1);
    }

    #[test]
    fn shaded_point_sees_every_light_in_reach() {
        let (params, view, proj) = setup(2.0);
        let lights = [
            Vec3::new(0.0, 0.0, -8.0),
            Vec3::new(1.5, 0.5, -9.0),
            Vec3::new(-3.0, 0.0, -8.0),
            Vec3::new(0.0, 0.0, -20.0),
        ];
        let (counts, indices) = assign_lights(&params, view, proj, &lights);

        let point = Vec3::new(0.5, 0.2, -8.5);
        let (frag, depth) = project_to_fragment(&params, view, proj, point).unwrap();
        let c = cluster_for_fragment(&params, frag, depth) as usize;
        let base = c * MAX_LIGHTS_PER_CLUSTER as usize;
        let listed = &indices[base..base + counts[c] as usize];

        for (i, light) in lights.iter().enumerate() {
            if light.distance(point) < params.light_radius {
                assert!(listed.contains(&(i as u32)), "light {i} missing from cluster {c}");
            }
        }
    }
}
