//! WGSL sources and the host constants injected into them.
//!
//! Every shader is composed as `common.wgsl` followed by its own source, then
//! `${name}` tokens are replaced with the values below. Cluster dimensions and
//! the depth slicing function therefore have one definition shared by the
//! clustering pass and every shading pass.

/// Screen-space X slices of the cluster grid. Y slices derive from the aspect ratio.
pub const NUM_X_SLICES: u32 = 16;
/// Depth slices of the cluster grid (logarithmic).
pub const NUM_Z_SLICES: u32 = 24;
/// Light index slots reserved per cluster; extra lights are dropped.
pub const MAX_LIGHTS_PER_CLUSTER: u32 = 256;

pub const MOVE_LIGHTS_WORKGROUP_SIZE: u32 = 128;
pub const CLUSTERING_WORKGROUP_SIZE: u32 = 64;

pub const BIND_GROUP_SCENE: u32 = 0;
pub const BIND_GROUP_MODEL: u32 = 1;
pub const BIND_GROUP_MATERIAL: u32 = 2;
/// The deferred fullscreen pass binds the G-buffer in the model slot.
pub const BIND_GROUP_GBUFFER: u32 = 1;

/// Background colour shared by every render mode.
pub const CLEAR_COLOR: [f32; 3] = [0.02, 0.02, 0.025];

pub const COMMON_SRC: &str = include_str!("shaders/common.wgsl");
pub const MOVE_LIGHTS_COMPUTE_SRC: &str = include_str!("shaders/move_lights.cs.wgsl");
pub const CLUSTERING_COMPUTE_SRC: &str = include_str!("shaders/clustering.cs.wgsl");
pub const NAIVE_VERT_SRC: &str = include_str!("shaders/naive.vs.wgsl");
pub const NAIVE_FRAG_SRC: &str = include_str!("shaders/naive.fs.wgsl");
pub const FORWARD_PLUS_FRAG_SRC: &str = include_str!("shaders/forward_plus.fs.wgsl");
pub const CLUSTERED_DEFERRED_FRAG_SRC: &str = include_str!("shaders/clustered_deferred.fs.wgsl");
pub const CLUSTERED_DEFERRED_FULLSCREEN_VERT_SRC: &str =
    include_str!("shaders/clustered_deferred_fullscreen.vs.wgsl");
pub const CLUSTERED_DEFERRED_FULLSCREEN_FRAG_SRC: &str =
    include_str!("shaders/clustered_deferred_fullscreen.fs.wgsl");

fn constants() -> Vec<(&'static str, String)> {
    vec![
        ("numXSlices", NUM_X_SLICES.to_string()),
        ("numZSlices", NUM_Z_SLICES.to_string()),
        ("maxLightsPerCluster", format!("{MAX_LIGHTS_PER_CLUSTER}u")),
        ("moveLightsWorkgroupSize", MOVE_LIGHTS_WORKGROUP_SIZE.to_string()),
        ("clusteringWorkgroupSize", CLUSTERING_WORKGROUP_SIZE.to_string()),
        ("bindGroup_scene", BIND_GROUP_SCENE.to_string()),
        ("bindGroup_model", BIND_GROUP_MODEL.to_string()),
        ("bindGroup_material", BIND_GROUP_MATERIAL.to_string()),
        ("bindGroup_gbuffer", BIND_GROUP_GBUFFER.to_string()),
        (
            "clearColor",
            format!(
                "vec3f({:?}, {:?}, {:?})",
                CLEAR_COLOR[0], CLEAR_COLOR[1], CLEAR_COLOR[2]
            ),
        ),
    ]
}

/// Prepends the common definitions and substitutes every `${name}` token.
pub fn preprocess(src: &str) -> String {
    let mut out = String::with_capacity(COMMON_SRC.len() + src.len() + 1);
    out.push_str(COMMON_SRC);
    out.push('\n');
    out.push_str(src);

    for (name, value) in constants() {
        out = out.replace(&format!("${{{name}}}"), &value);
    }
    out
}

pub fn create_module(device: &wgpu::Device, label: &str, src: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(preprocess(src).into()),
    })
}
