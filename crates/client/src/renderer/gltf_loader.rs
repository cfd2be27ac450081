//! glTF model loader.
//!
//! Parses .glb/.gltf bytes and flattens the node hierarchy into a list of
//! drawable primitives: node transforms are baked into vertex data (the model
//! is static apart from its tweened root rotation), missing normals and
//! indices are generated, and the base-color material is extracted.

use glam::{Mat3, Mat4, Vec3};

use super::mesh::{compute_normals, MeshVertex};

/// Error type for glTF loading.
#[derive(Debug, thiserror::Error)]
pub enum GltfError {
    #[error("failed to parse glTF: {0}")]
    Parse(#[from] gltf::Error),

    #[error("missing position data for mesh: {0}")]
    MissingPositions(String),
}

/// Decoded RGBA8 texture data.
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Material parameters for one primitive.
pub struct MaterialData {
    pub base_color_factor: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub base_color_image: Option<ImageData>,
}

/// One drawable primitive with baked world transform.
pub struct PrimitiveData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub material: MaterialData,
}

/// A loaded model: flattened primitives of the default scene.
pub struct ModelData {
    pub primitives: Vec<PrimitiveData>,
}

/// Parse a .glb/.gltf byte slice into drawable primitives.
pub fn load_model(bytes: &[u8]) -> Result<ModelData, GltfError> {
    let (document, buffers, images) = gltf::import_slice(bytes)?;

    let mut primitives = Vec::new();
    for scene in document.scenes() {
        for node in scene.nodes() {
            process_node(&node, Mat4::IDENTITY, &buffers, &images, &mut primitives)?;
        }
    }

    tracing::info!(
        "Loaded glTF model: {} primitives, {} vertices",
        primitives.len(),
        primitives.iter().map(|p| p.vertices.len()).sum::<usize>()
    );

    Ok(ModelData { primitives })
}

/// Process a glTF node and its children recursively, accumulating transforms.
fn process_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    primitives: &mut Vec<PrimitiveData>,
) -> Result<(), GltfError> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = mesh.name().unwrap_or("unnamed").to_string();

        for primitive in mesh.primitives() {
            primitives.push(extract_primitive(&primitive, &name, world, buffers, images)?);
        }
    }

    for child in node.children() {
        process_node(&child, world, buffers, images, primitives)?;
    }

    Ok(())
}

/// Extract one primitive with its transform baked into the vertex data.
fn extract_primitive(
    primitive: &gltf::Primitive,
    mesh_name: &str,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Result<PrimitiveData, GltfError> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    // Positions (required)
    let positions: Vec<Vec3> = reader
        .read_positions()
        .ok_or_else(|| GltfError::MissingPositions(mesh_name.to_string()))?
        .map(Vec3::from)
        .collect();

    // Indices (sequential if not indexed)
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    // Normals (computed from faces if missing)
    let normals: Vec<Vec3> = reader
        .read_normals()
        .map(|iter| iter.map(Vec3::from).collect())
        .unwrap_or_else(|| compute_normals(&positions, &indices));

    // Texture coordinates (zeroed if missing)
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().collect())
        .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

    // Bake the node's world transform.
    let normal_mat = Mat3::from_mat4(world).inverse().transpose();
    let vertices: Vec<MeshVertex> = positions
        .iter()
        .zip(normals.iter())
        .zip(uvs.iter())
        .map(|((p, n), uv)| MeshVertex {
            position: world.transform_point3(*p).into(),
            normal: (normal_mat * *n).normalize_or_zero().into(),
            uv: *uv,
        })
        .collect();

    let pbr = primitive.material().pbr_metallic_roughness();
    let base_color_image = pbr
        .base_color_texture()
        .and_then(|info| images.get(info.texture().source().index()))
        .and_then(decode_image);

    Ok(PrimitiveData {
        vertices,
        indices,
        material: MaterialData {
            base_color_factor: pbr.base_color_factor(),
            metallic: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
            base_color_image,
        },
    })
}

/// Convert a glTF image to RGBA8, or skip formats the viewer does not handle.
fn decode_image(data: &gltf::image::Data) -> Option<ImageData> {
    let pixels = match data.format {
        gltf::image::Format::R8G8B8A8 => data.pixels.clone(),
        gltf::image::Format::R8G8B8 => expand_rgb_to_rgba(&data.pixels),
        other => {
            tracing::warn!("Skipping texture with unsupported format {:?}", other);
            return None;
        }
    };

    Some(ImageData {
        width: data.width,
        height: data.height,
        pixels,
    })
}

/// RGB8 to RGBA8 with opaque alpha.
fn expand_rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        rgba.extend_from_slice(px);
        rgba.push(255);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_expansion_adds_opaque_alpha() {
        let rgba = expand_rgb_to_rgba(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let result = load_model(b"definitely not a gltf file");
        assert!(result.is_err());
    }

    #[test]
    fn truncated_glb_header_fails_to_parse() {
        // Valid magic, nothing else.
        let result = load_model(b"glTF");
        assert!(result.is_err());
    }
}
