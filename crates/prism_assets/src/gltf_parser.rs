use std::path::Path;

use glam::Mat4;

use crate::{
    error::AssetError,
    scene::{MaterialData, MeshData, PrimitiveData, SceneData, SceneNode, TextureData, Vertex},
};

pub fn parse_gltf(path: &str) -> Result<SceneData, AssetError> {
    let base_path = Path::new(path).parent().unwrap_or(Path::new("./"));
    let import_err = |source| AssetError::Import {
        path: path.to_string(),
        source,
    };

    // Buffers (including data URIs) come from gltf; images are decoded with `image`.
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(import_err)?;
    let buffers = gltf::import_buffers(&document, Some(base_path), blob).map_err(import_err)?;

    let mut textures = Vec::new();
    for image in document.images() {
        let name = image.name().unwrap_or("glTF image").to_string();
        let decoded = match image.source() {
            gltf::image::Source::View { view, .. } => {
                let buffer = &buffers[view.buffer().index()];
                let start = view.offset();
                let end = start.saturating_add(view.length());
                let bytes = buffer.get(start..end).ok_or_else(|| AssetError::BufferViewOutOfRange {
                    name: name.clone(),
                    start,
                    end,
                    len: buffer.len(),
                })?;
                image::load_from_memory(bytes)
            }
            gltf::image::Source::Uri { uri, .. } => {
                if uri.starts_with("data:") {
                    return Err(AssetError::DataUri { name });
                }
                image::open(base_path.join(uri))
            }
        }
        .map_err(|source| AssetError::Image {
            name: name.clone(),
            source,
        })?;

        let rgba = decoded.to_rgba8();
        textures.push(TextureData {
            name,
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        });
    }

    let materials = document
        .materials()
        .map(|mat| {
            let pbr = mat.pbr_metallic_roughness();
            MaterialData {
                base_color: pbr.base_color_factor(),
                diffuse_texture: pbr
                    .base_color_texture()
                    .map(|info| info.texture().source().index()),
            }
        })
        .collect();

    // Only triangle lists are drawn.
    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let mut data = MeshData::default();

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of mesh {}: mode {:?} is not a triangle list",
                    primitive.index(),
                    mesh.index(),
                    primitive.mode()
                );
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .ok_or(AssetError::MissingAttribute {
                    mesh: mesh.index(),
                    primitive: primitive.index(),
                    attribute: "POSITION",
                })?;

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);

            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|read| read.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|read| read.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let expect_count = |attribute: &'static str, found: usize| {
                if found == positions.len() {
                    Ok(())
                } else {
                    Err(AssetError::AttributeCountMismatch {
                        mesh: mesh.index(),
                        primitive: primitive.index(),
                        attribute,
                        expected: positions.len(),
                        found,
                    })
                }
            };
            expect_count("NORMAL", normals.len())?;
            expect_count("TEXCOORD_0", uvs.len())?;

            let vertices = positions
                .iter()
                .zip(normals.iter())
                .zip(uvs.iter())
                .map(|((position, normal), uv)| Vertex {
                    position: *position,
                    normal: *normal,
                    uv: *uv,
                })
                .collect();

            data.primitives.push(PrimitiveData {
                vertices,
                indices,
                material: primitive.material().index(),
            });
        }

        meshes.push(data);
    }

    // Flatten the hierarchy into mesh instances with world transforms.
    let mut nodes = Vec::new();
    let roots: Vec<gltf::Node> = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().collect(),
        None => document.nodes().collect(),
    };
    for root in roots {
        flatten_node(&root, Mat4::IDENTITY, &mut nodes);
    }

    let scene = SceneData {
        meshes,
        materials,
        textures,
        nodes,
    };

    log::info!(
        "Loaded {path}: {} nodes, {} primitives, {} materials, {} textures, {} triangles",
        scene.nodes.len(),
        scene.primitive_count(),
        scene.materials.len(),
        scene.textures.len(),
        scene.triangle_count()
    );

    Ok(scene)
}

fn flatten_node(node: &gltf::Node, parent: Mat4, out: &mut Vec<SceneNode>) {
    let local = Mat4::from_cols_array_2d(&node.transform().matrix());
    let world = parent * local;

    if let Some(mesh) = node.mesh() {
        out.push(SceneNode {
            name: node.name().unwrap_or("Node").to_string(),
            world_transform: world,
            mesh: mesh.index(),
        });
    }

    for child in node.children() {
        flatten_node(&child, world, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    // One triangle, non-indexed, under a translated parent node.
    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "parent", "translation": [0.0, 2.0, 0.0], "children": [1] },
            { "name": "triangle", "translation": [1.0, 0.0, 0.0], "mesh": 0 }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    }"#;

    // POSITION has 3 entries, NORMAL only 2. The image view runs past the buffer.
    const MALFORMED_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1 } }] }],
        "buffers": [{
            "byteLength": 60,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAgD8AAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [
            { "buffer": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 24 }
            IMAGE_VIEW
        ],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3" }
        ]
        IMAGES
    }"#;

    fn malformed(with_image: bool) -> String {
        let (view, images) = if with_image {
            (
                r#", { "buffer": 0, "byteOffset": 40, "byteLength": 100 }"#,
                r#", "images": [{ "name": "truncated", "bufferView": 2, "mimeType": "image/png" }]"#,
            )
        } else {
            ("", "")
        };
        MALFORMED_GLTF.replace("IMAGE_VIEW", view).replace("IMAGES", images)
    }

    fn write_temp(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("prism_{}_{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn parses_and_flattens_a_minimal_scene() {
        let path = write_temp("triangle.gltf", TRIANGLE_GLTF);
        let scene = parse_gltf(&path).unwrap();

        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.nodes.len(), 1);
        assert_eq!(scene.triangle_count(), 1);

        let primitive = &scene.meshes[0].primitives[0];
        assert_eq!(primitive.indices, vec![0, 1, 2]);
        assert_eq!(primitive.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(primitive.material, None);
        assert!(primitive.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));

        let node = &scene.nodes[0];
        assert_eq!(node.name, "triangle");
        assert_eq!(node.world_transform.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 0.0));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_import_error() {
        let err = parse_gltf("/definitely/not/here.gltf").unwrap_err();
        assert!(matches!(err, AssetError::Import { .. }));
    }

    #[test]
    fn short_normal_stream_is_rejected_instead_of_truncated() {
        let path = write_temp("short_normals.gltf", &malformed(false));
        let err = parse_gltf(&path).unwrap_err();
        assert!(
            matches!(
                err,
                AssetError::AttributeCountMismatch {
                    attribute: "NORMAL",
                    expected: 3,
                    found: 2,
                    ..
                }
            ),
            "{err}"
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn image_view_past_the_buffer_is_an_error_not_a_panic() {
        let path = write_temp("truncated_image.gltf", &malformed(true));
        let err = parse_gltf(&path).unwrap_err();
        // The loader may already refuse the view while importing buffers.
        assert!(
            matches!(err, AssetError::BufferViewOutOfRange { .. } | AssetError::Import { .. }),
            "{err}"
        );
        let _ = std::fs::remove_file(path);
    }
}
