//! Locates mesh groups and shader children inside a [`Tree`], translates
//! them to/from [`MeshGroup`], and recomputes bounding boxes (§4.6).
//!
//! Grounded on the teacher's `fdm::RenderAtom`/`MeshModel` traversal: walk
//! a fixed set of known child/chunk slots in a known order and build a
//! flat Rust struct from them. NTF's mesh group is one `Child` per
//! material-contiguous submesh (§3 `CHILD_TYPE_MESH_GROUP`) carrying its
//! own fully-expanded vertex/index buffers, rather than Diesel's shared
//! `Geometry`/`Topology`/`RenderAtom` indirection, so there is no
//! cross-group buffer slicing to reproduce here.

use super::error::NtfError;
use super::tree::{
    schema_for_name, Child, Chunk, Entry, Tree, CHILD_TYPE_LOCATOR, CHILD_TYPE_MESH_GROUP,
    CHILD_TYPE_SHADER,
};
use super::chunk::ChunkValue;
use super::vertex::{VertexCodec, VertexF1};
use crate::formats::mesh::{Locator, MeshGroup, Shader, Triangle, Vertex};

fn require_string(child: &Child, name: &str) -> Result<String, NtfError> {
    child
        .find_chunk(name)
        .and_then(|c| c.value.as_string())
        .map(str::to_owned)
        .ok_or_else(|| NtfError::MissingRequiredChunk(name.to_string()))
}

fn require_int32(child: &Child, name: &str) -> Result<i32, NtfError> {
    match child.find_chunk(name).map(|c| &c.value) {
        Some(ChunkValue::Int32(v)) => Ok(*v),
        _ => Err(NtfError::MissingRequiredChunk(name.to_string())),
    }
}

fn require_uint32(child: &Child, name: &str) -> Result<u32, NtfError> {
    child
        .find_chunk(name)
        .and_then(|c| c.value.as_uint32())
        .ok_or_else(|| NtfError::MissingRequiredChunk(name.to_string()))
}

fn require_raw<'a>(child: &'a Child, name: &str) -> Result<&'a [u8], NtfError> {
    child
        .find_chunk(name)
        .and_then(|c| c.value.as_raw())
        .ok_or_else(|| NtfError::MissingRequiredChunk(name.to_string()))
}

fn optional_float(child: &Child, name: &str) -> f32 {
    match child.find_chunk(name).map(|c| &c.value) {
        Some(ChunkValue::Float32(v)) => *v,
        _ => 0.0,
    }
}

fn optional_vec4(child: &Child, name: &str) -> [f32; 4] {
    match child.find_chunk(name).map(|c| &c.value) {
        Some(ChunkValue::Vec4Float(v)) => *v,
        _ => [0.0; 4],
    }
}

fn decode_indices(faces: &[u8], num_faces: u32) -> Result<Vec<Triangle>, NtfError> {
    if faces.len() % 2 != 0 {
        return Err(NtfError::CorruptNode(
            "Faces chunk length is not a multiple of 2".into(),
        ));
    }
    let index_count = faces.len() / 2;
    if index_count as u32 != num_faces {
        return Err(NtfError::CorruptNode(format!(
            "NumFaces ({}) does not match Faces buffer ({} indices)",
            num_faces, index_count
        )));
    }
    if index_count % 3 != 0 {
        return Err(NtfError::IndexCountNotMultipleOfThree(index_count));
    }
    let indices: Vec<u16> = faces
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    Ok(indices
        .chunks_exact(3)
        .map(|c| (c[0], c[1], c[2]))
        .collect())
}

fn to_mesh_vertex(v: VertexF1) -> Vertex {
    Vertex {
        position: [v.position.x, v.position.y, v.position.z],
        normal: [v.normal.x, v.normal.y, v.normal.z],
        tangent: [v.tangent.x, v.tangent.y, v.tangent.z],
        normal_w: v.normal_w,
        tangent_w: v.tangent_w,
        uv0: [v.uv0.x, v.uv0.y],
        uv1: [v.uv1.x, v.uv1.y],
    }
}

fn from_mesh_vertex(v: &Vertex) -> VertexF1 {
    VertexF1 {
        position: v.position.into(),
        normal: v.normal.into(),
        normal_w: v.normal_w,
        tangent: v.tangent.into(),
        tangent_w: v.tangent_w,
        uv0: v.uv0.into(),
        uv1: v.uv1.into(),
    }
}

fn extract_shader(shader: &Child) -> Result<Shader, NtfError> {
    Ok(Shader {
        name: require_string(shader, "Name").unwrap_or_default(),
        shader_name: require_string(shader, "ShaderName")?,
        tex_s0: require_string(shader, "TexS0").unwrap_or_default(),
        tex_s1: require_string(shader, "TexS1").unwrap_or_default(),
        tex_s2: require_string(shader, "TexS2").unwrap_or_default(),
        dest_color: optional_vec4(shader, "DestColor"),
        spec_color: optional_vec4(shader, "SpecColor"),
        alpha: optional_float(shader, "Alpha"),
        near_range: optional_float(shader, "NearRange"),
        far_range: optional_float(shader, "FarRange"),
    })
}

fn extract_mesh_group(group: &Child) -> Result<MeshGroup, NtfError> {
    let name = require_string(group, "Name")?;
    let vertex_format = require_int32(group, "VertexFormat")?;
    if vertex_format != 1 {
        return Err(NtfError::UnsupportedVertexFormat(vertex_format));
    }
    let num_vertexes = require_uint32(group, "NumVertexes")?;
    let num_faces = require_uint32(group, "NumFaces")?;
    let vertexes_raw = require_raw(group, "Vertexes")?;
    let faces_raw = require_raw(group, "Faces")?;

    let vertices = VertexCodec::decode_all(vertexes_raw)?
        .into_iter()
        .map(to_mesh_vertex)
        .collect::<Vec<_>>();

    if vertices.len() as u32 != num_vertexes {
        return Err(NtfError::CorruptNode(format!(
            "NumVertexes ({}) does not match Vertexes buffer ({} vertices)",
            num_vertexes,
            vertices.len()
        )));
    }

    if (vertices.len() as u64) > 65_535 {
        return Err(NtfError::TooManyVertices(vertices.len()));
    }

    let triangles = decode_indices(faces_raw, num_faces)?;

    let shader = group
        .first_child_of_type(CHILD_TYPE_SHADER)
        .ok_or_else(|| NtfError::MissingRequiredChunk("shader child (-253)".to_string()))?;
    let material = extract_shader(shader)?;

    Ok(MeshGroup {
        name,
        vertex_format,
        vertices,
        triangles,
        material,
    })
}

/// Walks the top-level `Children` of type −254 and decodes each into a
/// [`MeshGroup`], in tree order.
pub fn extract_mesh_groups(tree: &Tree) -> Result<Vec<MeshGroup>, NtfError> {
    tree.children_of_type(CHILD_TYPE_MESH_GROUP)
        .map(extract_mesh_group)
        .collect()
}

fn extract_locator(locator: &Child) -> Locator {
    let is_locator = require_int32(locator, "IsLocator").unwrap_or(0);
    let l_pos = match locator.find_chunk("LPos").map(|c| &c.value) {
        Some(ChunkValue::Vec4Int(v)) => *v,
        _ => [0; 4],
    };
    let l_dir = optional_vec4(locator, "LDir");
    Locator {
        is_locator,
        l_pos,
        l_dir,
    }
}

/// Walks the top-level `Children` of type 5 (§3 "Locator") and decodes
/// each into a [`Locator`], in tree order. Locators are read-only in this
/// core: nothing re-injects them, since nothing in the mesh-edit pipeline
/// ever changes a locator's position (§2, §4.6 only binds mesh groups).
pub fn extract_locators(tree: &Tree) -> Vec<Locator> {
    tree.children_of_type(CHILD_TYPE_LOCATOR)
        .map(extract_locator)
        .collect()
}

fn set_chunk(child: &mut Child, name: &str, value: ChunkValue) {
    if let Some(chunk) = child.find_chunk_mut(name) {
        chunk.value = value;
    } else {
        child.entries.push(Entry::Chunk(Chunk::new(name, value)));
    }
}

fn inject_shader(shader: &mut Child, material: &Shader) {
    set_chunk(shader, "Name", ChunkValue::String(material.name.clone()));
    set_chunk(
        shader,
        "ShaderName",
        ChunkValue::String(material.shader_name.clone()),
    );
    set_chunk(shader, "TexS0", ChunkValue::String(material.tex_s0.clone()));
    set_chunk(shader, "TexS1", ChunkValue::String(material.tex_s1.clone()));
    set_chunk(shader, "TexS2", ChunkValue::String(material.tex_s2.clone()));
    set_chunk(shader, "DestColor", ChunkValue::Vec4Float(material.dest_color));
    set_chunk(shader, "SpecColor", ChunkValue::Vec4Float(material.spec_color));
    set_chunk(shader, "Alpha", ChunkValue::Float32(material.alpha));
    set_chunk(shader, "NearRange", ChunkValue::Float32(material.near_range));
    set_chunk(shader, "FarRange", ChunkValue::Float32(material.far_range));
}

fn inject_mesh_group(group: &mut Child, mesh: &MeshGroup) -> Result<(), NtfError> {
    if mesh.vertices.len() > 65_535 {
        return Err(NtfError::TooManyVertices(mesh.vertices.len()));
    }

    let vertex_f1: Vec<VertexF1> = mesh.vertices.iter().map(from_mesh_vertex).collect();
    let vertexes_bytes = VertexCodec::encode_all(&vertex_f1);

    let mut faces_bytes = Vec::with_capacity(mesh.triangles.len() * 6);
    for &(a, b, c) in &mesh.triangles {
        faces_bytes.extend_from_slice(&a.to_le_bytes());
        faces_bytes.extend_from_slice(&b.to_le_bytes());
        faces_bytes.extend_from_slice(&c.to_le_bytes());
    }

    set_chunk(
        group,
        "NumVertexes",
        ChunkValue::UInt32(mesh.vertices.len() as u32),
    );
    set_chunk(group, "NumFaces", ChunkValue::UInt32(mesh.num_faces()));
    set_chunk(group, "Vertexes", ChunkValue::Raw(vertexes_bytes));
    set_chunk(group, "Faces", ChunkValue::Raw(faces_bytes));

    let (min, max) = mesh.bounding_box();
    let bbox_min = [min[0], min[1], min[2], 1.0];
    let bbox_max = [max[0], max[1], max[2], 1.0];
    set_chunk(group, "BBoxMin", ChunkValue::Vec4Float(bbox_min));
    set_chunk(group, "BBoxMax", ChunkValue::Vec4Float(bbox_max));
    if group.find_chunk("TMin").is_some() {
        set_chunk(group, "TMin", ChunkValue::Vec4Float(bbox_min));
    }
    if group.find_chunk("TMax").is_some() {
        set_chunk(group, "TMax", ChunkValue::Vec4Float(bbox_max));
    }

    if let Some(shader) = group.children_of_type_mut(CHILD_TYPE_SHADER).next() {
        inject_shader(shader, &mesh.material);
    }

    Ok(())
}

/// Overwrites the geometry (and bounding-box, and material) payloads of
/// each mesh group child, matched by position to `groups`, leaving every
/// other chunk/child untouched (§4.6). Transactional: on any error the
/// tree is left exactly as it was (§7).
pub fn inject_mesh_groups(tree: &mut Tree, groups: &[MeshGroup]) -> Result<(), NtfError> {
    let group_children: Vec<usize> = tree
        .entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e {
            Entry::Child(c) if c.child_type == CHILD_TYPE_MESH_GROUP => Some(i),
            _ => None,
        })
        .collect();

    if group_children.len() != groups.len() {
        return Err(NtfError::SkeletonMismatch {
            skeleton: group_children.len(),
            supplied: groups.len(),
        });
    }

    // Validate everything before mutating, so a failure never leaves the
    // tree partially updated.
    for mesh in groups {
        if mesh.vertices.len() > 65_535 {
            return Err(NtfError::TooManyVertices(mesh.vertices.len()));
        }
    }

    for (&idx, mesh) in group_children.iter().zip(groups) {
        let group = tree.entries[idx].as_child_mut().unwrap();
        inject_mesh_group(group, mesh)?;
    }
    Ok(())
}

/// Soft sanity check used by callers that want to warn (never fail) on a
/// chunk whose tag doesn't match the de-facto name→type schema (§9).
pub fn schema_warning(name: &str, actual: super::chunk::ChunkType) -> Option<String> {
    let expected = schema_for_name(name)?;
    if expected == actual {
        None
    } else {
        Some(format!(
            "chunk \"{}\" is usually tag {:?} but was parsed as {:?}",
            name, expected, actual
        ))
    }
}
