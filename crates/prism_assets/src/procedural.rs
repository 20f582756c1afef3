use glam::{Mat4, Quat, Vec3};

use crate::scene::{MaterialData, MeshData, PrimitiveData, SceneData, SceneNode, TextureData, Vertex};

/// A unit cube centred on the origin, one quad per face so normals stay flat.
pub fn cube_primitive(material: Option<usize>) -> PrimitiveData {
    // (normal, tangent u, tangent v)
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        let center = normal * 0.5;
        for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let p = center + u * su + v * sv;
            vertices.push(Vertex {
                position: p.to_array(),
                normal: normal.to_array(),
                uv: [su + 0.5, 0.5 - sv],
            });
        }
        // u x v == normal, so this winding is counter-clockwise seen from outside.
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    PrimitiveData {
        vertices,
        indices,
        material,
    }
}

/// A flat XZ quad facing +Y, `size` wide, with UVs tiled `tiling` times.
pub fn plane_primitive(size: f32, tiling: f32, material: Option<usize>) -> PrimitiveData {
    let h = size * 0.5;
    let corners = [(-h, h, 0.0, 0.0), (h, h, tiling, 0.0), (h, -h, tiling, tiling), (-h, -h, 0.0, tiling)];
    let vertices = corners
        .iter()
        .map(|&(x, z, u, v)| Vertex {
            position: [x, 0.0, z],
            normal: [0.0, 1.0, 0.0],
            uv: [u, v],
        })
        .collect();

    PrimitiveData {
        vertices,
        indices: vec![0, 1, 2, 0, 2, 3],
        material,
    }
}

/// Checker texture used by the demo floor.
pub fn checker_texture(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> TextureData {
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let texel = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
            pixels.extend_from_slice(&texel);
        }
    }
    TextureData {
        name: "checker".to_string(),
        pixels,
        width: size,
        height: size,
    }
}

/// A small hall: checkered floor, two rows of pillars and scattered crates.
/// Fits inside the default light motion volume.
pub fn demo_scene() -> SceneData {
    let textures = vec![checker_texture(256, 8, [200, 200, 200, 255], [90, 90, 95, 255])];

    let materials = vec![
        MaterialData {
            base_color: [1.0, 1.0, 1.0, 1.0],
            diffuse_texture: Some(0),
        },
        MaterialData {
            base_color: [0.85, 0.8, 0.7, 1.0],
            diffuse_texture: None,
        },
        MaterialData {
            base_color: [0.7, 0.35, 0.2, 1.0],
            diffuse_texture: None,
        },
    ];

    let meshes = vec![
        MeshData {
            primitives: vec![plane_primitive(32.0, 8.0, Some(0))],
        },
        MeshData {
            primitives: vec![cube_primitive(Some(1))],
        },
        MeshData {
            primitives: vec![cube_primitive(Some(2))],
        },
    ];

    let mut nodes = vec![SceneNode {
        name: "floor".to_string(),
        world_transform: Mat4::IDENTITY,
        mesh: 0,
    }];

    for i in 0..6 {
        let x = -12.5 + i as f32 * 5.0;
        for z in [-4.5, 4.5] {
            nodes.push(SceneNode {
                name: format!("pillar_{i}_{}", if z < 0.0 { "n" } else { "s" }),
                world_transform: Mat4::from_scale_rotation_translation(
                    Vec3::new(0.8, 10.0, 0.8),
                    Quat::IDENTITY,
                    Vec3::new(x, 5.0, z),
                ),
                mesh: 1,
            });
        }
    }

    for i in 0..8 {
        let angle = i as f32 * 0.7;
        let x = -10.0 + i as f32 * 2.8;
        let z = (i as f32 * 1.3).sin() * 2.0;
        nodes.push(SceneNode {
            name: format!("crate_{i}"),
            world_transform: Mat4::from_scale_rotation_translation(
                Vec3::splat(1.2),
                Quat::from_rotation_y(angle),
                Vec3::new(x, 0.6, z),
            ),
            mesh: 2,
        });
    }

    SceneData {
        meshes,
        materials,
        textures,
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_faces_wind_counter_clockwise_from_outside() {
        let cube = cube_primitive(None);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);

        for tri in cube.indices.chunks_exact(3) {
            let a = Vec3::from(cube.vertices[tri[0] as usize].position);
            let b = Vec3::from(cube.vertices[tri[1] as usize].position);
            let c = Vec3::from(cube.vertices[tri[2] as usize].position);
            let n = Vec3::from(cube.vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn plane_faces_up() {
        let plane = plane_primitive(2.0, 1.0, None);
        let v = &plane.vertices;
        let a = Vec3::from(v[0].position);
        let b = Vec3::from(v[1].position);
        let c = Vec3::from(v[2].position);
        assert!((b - a).cross(c - a).y > 0.0);
    }

    #[test]
    fn demo_scene_references_are_in_range() {
        let scene = demo_scene();
        for node in &scene.nodes {
            assert!(node.mesh < scene.meshes.len());
        }
        for mesh in &scene.meshes {
            for p in &mesh.primitives {
                assert!(p.material.is_none_or(|m| m < scene.materials.len()));
                assert!(p.indices.iter().all(|&i| (i as usize) < p.vertices.len()));
            }
        }
        for mat in &scene.materials {
            assert!(mat.diffuse_texture.is_none_or(|t| t < scene.textures.len()));
        }
        assert_eq!(scene.textures[0].pixels.len(), 256 * 256 * 4);
    }
}
