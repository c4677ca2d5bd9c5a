//! Skeletons: a serialized tree copy with mesh-payload chunks emptied, and
//! the base64/JSON sidecar record that carries it (§4.7, §6).
//!
//! The core never does file or JSON I/O of its own (§5) — `SkeletonStore`
//! only produces/consumes byte buffers and the in-memory `SkeletonRecord`
//! struct; writing that struct to a `.json` file on disk is the embedding
//! shell's job. Grounded in spec §4.7/§6 directly: the teacher has no
//! equivalent mechanism (Diesel release files don't carry a skeleton
//! concept), so the JSON record's shape and the choice of `serde`+`base64`
//! (rather than a hand-rolled encoder) are drawn from the pack's general
//! practice for sidecar metadata (see DESIGN.md).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::chunk::ChunkValue;
use super::error::NtfError;
use super::tree::{Tree, CHILD_TYPE_MESH_GROUP, CHILD_TYPE_SHADER};
use super::tree_codec::TreeCodec;

/// The sidecar JSON record described in §6. Only `raw_ntf_skeleton` is
/// authoritative on injection; `mesh_group_count`/`shader_names` exist for
/// a human (or a GUI shell) to eyeball without decoding the blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkeletonRecord {
    pub raw_ntf_skeleton: String,
    pub mesh_group_count: u32,
    pub shader_names: Vec<String>,
}

pub struct SkeletonStore;

impl SkeletonStore {
    /// Clones `tree`, blanks every `Vertexes`/`Faces` payload to zero
    /// bytes and zeroes `NumVertexes`/`NumFaces`, then serializes the
    /// result. Unknown chunks and children are carried forward verbatim.
    pub fn emit(tree: &Tree) -> Vec<u8> {
        let blanked = Self::blank_tree(tree);
        TreeCodec::write(&blanked)
    }

    fn blank_tree(tree: &Tree) -> Tree {
        let mut out = tree.clone();
        for entry in &mut out.entries {
            Self::blank_entry(entry);
        }
        out
    }

    fn blank_entry(entry: &mut super::tree::Entry) {
        if let super::tree::Entry::Child(child) = entry {
            for c in &mut child.entries {
                match c {
                    super::tree::Entry::Chunk(chunk) if chunk.name == "Vertexes" || chunk.name == "Faces" => {
                        chunk.value = ChunkValue::Raw(Vec::new());
                    }
                    super::tree::Entry::Chunk(chunk)
                        if chunk.name == "NumVertexes" || chunk.name == "NumFaces" =>
                    {
                        chunk.value = ChunkValue::UInt32(0);
                    }
                    other => Self::blank_entry(other),
                }
            }
        }
    }

    /// Parses a previously-emitted skeleton back into a [`Tree`]. The
    /// caller is expected to immediately call
    /// [`super::binding::inject_mesh_groups`] to repopulate the blanked
    /// chunks (§4.7).
    pub fn restore(bytes: &[u8]) -> Result<Tree, NtfError> {
        TreeCodec::parse(bytes)
    }

    /// Builds the full sidecar record described in §6, base64-wrapping
    /// `emit`'s output and populating the informational fields from
    /// `tree` directly (best-effort: a mesh group missing its shader
    /// child simply contributes no name, it never fails the whole
    /// record).
    pub fn emit_record(tree: &Tree) -> SkeletonRecord {
        let bytes = Self::emit(tree);
        let mesh_group_count = tree.children_of_type(CHILD_TYPE_MESH_GROUP).count() as u32;
        let shader_names = tree
            .children_of_type(CHILD_TYPE_MESH_GROUP)
            .filter_map(|g| g.first_child_of_type(CHILD_TYPE_SHADER))
            .filter_map(|s| s.find_chunk("ShaderName"))
            .filter_map(|c| c.value.as_string())
            .map(str::to_owned)
            .collect();

        SkeletonRecord {
            raw_ntf_skeleton: BASE64.encode(bytes),
            mesh_group_count,
            shader_names,
        }
    }

    /// Decodes and parses `record.raw_ntf_skeleton`, ignoring the
    /// informational fields entirely (§6: "only `raw_ntf_skeleton` is
    /// authoritative on injection").
    pub fn restore_record(record: &SkeletonRecord) -> Result<Tree, NtfError> {
        let bytes = BASE64
            .decode(&record.raw_ntf_skeleton)
            .map_err(|_| NtfError::CorruptNode("raw_ntf_skeleton is not valid base64".into()))?;
        Self::restore(&bytes)
    }
}

/// True if `tree` still has every `Vertexes`/`Faces` chunk blanked and
/// every `NumVertexes`/`NumFaces` chunk zeroed — used by tests and by
/// shells that want to assert a tree really is a skeleton before storing
/// it.
#[cfg(test)]
fn is_blanked(tree: &Tree) -> bool {
    fn child_is_blanked(child: &super::tree::Child) -> bool {
        child.entries.iter().all(|e| match e {
            super::tree::Entry::Chunk(c) if c.name == "Vertexes" || c.name == "Faces" => {
                matches!(&c.value, ChunkValue::Raw(b) if b.is_empty())
            }
            super::tree::Entry::Chunk(c) if c.name == "NumVertexes" || c.name == "NumFaces" => {
                matches!(c.value, ChunkValue::UInt32(0))
            }
            super::tree::Entry::Child(nested) => child_is_blanked(nested),
            _ => true,
        })
    }
    tree.entries.iter().all(|e| match e {
        super::tree::Entry::Child(c) => child_is_blanked(c),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ntf::binding::{extract_mesh_groups, inject_mesh_groups};
    use crate::formats::ntf::chunk::ChunkValue as V;
    use crate::formats::ntf::tree::{Child, Chunk, Entry};
    use crate::formats::ntf::vertex::{VertexCodec, VertexF1};

    fn one_triangle_group() -> Child {
        let mut group = Child::new(CHILD_TYPE_MESH_GROUP);
        group.entries.push(Entry::Chunk(Chunk::new("Name", V::String("T".into()))));
        group.entries.push(Entry::Chunk(Chunk::new("VertexFormat", V::Int32(1))));
        group.entries.push(Entry::Chunk(Chunk::new("NumVertexes", V::UInt32(3))));
        group.entries.push(Entry::Chunk(Chunk::new("NumFaces", V::UInt32(3))));
        let verts = vec![
            VertexF1 {
                position: [0.0, 0.0, 0.0].into(),
                normal: [0.0, 0.0, 1.0].into(),
                normal_w: 255,
                tangent: [1.0, 0.0, 0.0].into(),
                tangent_w: 255,
                uv0: [0.0, 0.0].into(),
                uv1: [0.0, 0.0].into(),
            };
            3
        ];
        group.entries.push(Entry::Chunk(Chunk::new(
            "Vertexes",
            V::Raw(VertexCodec::encode_all(&verts)),
        )));
        let faces: Vec<u8> = [0u16, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect();
        group.entries.push(Entry::Chunk(Chunk::new("Faces", V::Raw(faces))));
        let mut shader = Child::new(CHILD_TYPE_SHADER);
        shader.entries.push(Entry::Chunk(Chunk::new(
            "ShaderName",
            V::String("buildings_lmap".into()),
        )));
        group.entries.push(Entry::Child(shader));
        group
    }

    #[test]
    fn emit_blanks_mesh_payloads_and_preserves_unknown_chunks() {
        let mut tree = Tree {
            entries: vec![Entry::Child(one_triangle_group())],
        };
        tree.entries.push(Entry::Chunk(Chunk::new(
            "AniFileName",
            V::String("engine_private.anim".into()),
        )));

        let bytes = SkeletonStore::emit(&tree);
        let skeleton = SkeletonStore::restore(&bytes).unwrap();
        assert!(is_blanked(&skeleton));
        assert_eq!(
            skeleton.find_chunk("AniFileName").unwrap().value,
            V::String("engine_private.anim".into())
        );
    }

    #[test]
    fn skeleton_record_roundtrips_through_base64_json() {
        let tree = Tree {
            entries: vec![Entry::Child(one_triangle_group())],
        };
        let record = SkeletonStore::emit_record(&tree);
        assert_eq!(record.mesh_group_count, 1);
        assert_eq!(record.shader_names, vec!["buildings_lmap".to_string()]);

        let json = serde_json::to_string(&record).unwrap();
        let back: SkeletonRecord = serde_json::from_str(&json).unwrap();
        let restored = SkeletonStore::restore_record(&back).unwrap();
        assert!(is_blanked(&restored));
    }

    #[test]
    fn skeleton_transplant_keeps_a_geometry_and_b_shader_survives() {
        let mut tree_a = Tree {
            entries: vec![Entry::Child(one_triangle_group())],
        };
        tree_a.entries.push(Entry::Chunk(Chunk::new(
            "AniFileName",
            V::String("a_only.anim".into()),
        )));
        let groups_b = crate::formats::ntf::binding::extract_mesh_groups(&Tree {
            entries: vec![Entry::Child(one_triangle_group())],
        })
        .unwrap();

        let skeleton_bytes = SkeletonStore::emit(&tree_a);
        let mut restored = SkeletonStore::restore(&skeleton_bytes).unwrap();
        inject_mesh_groups(&mut restored, &groups_b).unwrap();

        assert_eq!(
            restored.find_chunk("AniFileName").unwrap().value,
            V::String("a_only.anim".into())
        );
        let groups = extract_mesh_groups(&restored).unwrap();
        assert_eq!(groups[0].vertices.len(), 3);
    }
}
