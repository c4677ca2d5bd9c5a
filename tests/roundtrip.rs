//! End-to-end exercise of the parse → extract → inject → write pipeline
//! and the skeleton transplant path, against an in-memory tree built the
//! same way the unit tests build one (no fixture files: every byte is
//! produced by the library itself, so these tests never depend on the
//! local filesystem).

use ntf_toolkit::formats::mesh::{MeshGroup, Shader, Vertex};
use ntf_toolkit::formats::ntf::chunk::ChunkValue;
use ntf_toolkit::formats::ntf::tree::{Child, Chunk, Entry, Tree, CHILD_TYPE_MESH_GROUP, CHILD_TYPE_SHADER};
use ntf_toolkit::formats::ntf::vertex::{VertexCodec, VertexF1};
use ntf_toolkit::formats::ntf::{extract_mesh_groups, inject_mesh_groups, SkeletonStore, TreeCodec};
use ntf_toolkit::formats::objbridge;

fn quad_vertex(pos: [f32; 3], uv: [f32; 2]) -> VertexF1 {
    VertexF1 {
        position: pos.into(),
        normal: [0.0, 0.0, 1.0].into(),
        normal_w: 255,
        tangent: [1.0, 0.0, 0.0].into(),
        tangent_w: 255,
        uv0: uv.into(),
        uv1: [0.0, 0.0].into(),
    }
}

fn sample_tree() -> Tree {
    let mut shader = Child::new(CHILD_TYPE_SHADER);
    shader.entries.push(Entry::Chunk(Chunk::new(
        "ShaderName",
        ChunkValue::String("buildings_lmap".into()),
    )));
    shader
        .entries
        .push(Entry::Chunk(Chunk::new("TexS0", ChunkValue::String("wall.dds".into()))));
    shader
        .entries
        .push(Entry::Chunk(Chunk::new("Alpha", ChunkValue::Float32(1.0))));

    let mut group = Child::new(CHILD_TYPE_MESH_GROUP);
    group
        .entries
        .push(Entry::Chunk(Chunk::new("Name", ChunkValue::String("Wall01".into()))));
    group
        .entries
        .push(Entry::Chunk(Chunk::new("VertexFormat", ChunkValue::Int32(1))));
    group
        .entries
        .push(Entry::Chunk(Chunk::new("NumVertexes", ChunkValue::UInt32(3))));
    group
        .entries
        .push(Entry::Chunk(Chunk::new("NumFaces", ChunkValue::UInt32(3))));

    let verts = vec![
        quad_vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
        quad_vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
        quad_vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
    ];
    group.entries.push(Entry::Chunk(Chunk::new(
        "Vertexes",
        ChunkValue::Raw(VertexCodec::encode_all(&verts)),
    )));
    let faces: Vec<u8> = [0u16, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect();
    group.entries.push(Entry::Chunk(Chunk::new("Faces", ChunkValue::Raw(faces))));
    group.entries.push(Entry::Child(shader));

    let mut tree = Tree::new();
    tree.entries.push(Entry::Child(group));
    tree.entries.push(Entry::Chunk(Chunk::new(
        "AniFileName",
        ChunkValue::String("engine_private.anim".into()),
    )));
    tree
}

#[test]
fn parse_then_write_reproduces_the_same_bytes() {
    let tree = sample_tree();
    let bytes = TreeCodec::write(&tree);
    let reparsed = TreeCodec::parse(&bytes).unwrap();
    let rewritten = TreeCodec::write(&reparsed);
    assert_eq!(bytes, rewritten);
}

#[test]
fn extract_inject_roundtrip_preserves_geometry_and_unrelated_data() {
    let mut tree = sample_tree();
    let bytes = TreeCodec::write(&tree);
    let reparsed = TreeCodec::parse(&bytes).unwrap();
    assert_eq!(tree, reparsed);

    let groups = extract_mesh_groups(&reparsed).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].triangles.len(), 1);
    assert_eq!(groups[0].num_faces(), 3);

    inject_mesh_groups(&mut tree, &groups).unwrap();
    assert_eq!(
        tree.find_chunk("AniFileName").unwrap().value,
        ChunkValue::String("engine_private.anim".into())
    );
}

#[test]
fn skeleton_transplant_preserves_donor_tree_and_acceptor_geometry() {
    let tree_a = sample_tree();
    let tree_b_groups = extract_mesh_groups(&sample_tree()).unwrap();

    let record = SkeletonStore::emit_record(&tree_a);
    assert_eq!(record.mesh_group_count, 1);

    let mut restored = SkeletonStore::restore_record(&record).unwrap();
    inject_mesh_groups(&mut restored, &tree_b_groups).unwrap();

    assert_eq!(
        restored.find_chunk("AniFileName").unwrap().value,
        ChunkValue::String("engine_private.anim".into())
    );
    let groups = extract_mesh_groups(&restored).unwrap();
    assert_eq!(groups[0].vertices.len(), 3);
}

#[test]
fn ntf_to_text_interchange_and_back_preserves_positions_and_uv0() {
    let tree = sample_tree();
    let groups = extract_mesh_groups(&tree).unwrap();

    let obj_text = objbridge::write_mesh(&groups, "wall.mtl");
    assert!(obj_text.lines().any(|l| l == "mtllib wall.mtl"));
    let mtl_text = objbridge::write_material_library(&groups);

    let materials = objbridge::parse_material_library(&mtl_text);
    let reimported = objbridge::parse_mesh(&obj_text, &materials).unwrap();

    assert_eq!(reimported.len(), groups.len());
    assert_eq!(reimported[0].vertices.len(), groups[0].vertices.len());
    for (a, b) in groups[0].vertices.iter().zip(&reimported[0].vertices) {
        assert_eq!(a.position, b.position);
        assert_eq!(a.uv0, b.uv0);
    }
    // Tangents are re-solved from the interchange geometry, not asserted
    // equal to the originals.
    assert!(reimported[0]
        .vertices
        .iter()
        .all(|v| v.tangent.iter().all(|c| c.is_finite())));
}

#[test]
fn injecting_a_mismatched_group_count_leaves_the_tree_untouched() {
    let mut tree = sample_tree();
    let before = tree.clone();
    let extra: Vec<MeshGroup> = vec![
        extract_mesh_groups(&tree).unwrap().remove(0),
        MeshGroup {
            name: "Extra".into(),
            vertex_format: 1,
            vertices: vec![Vertex {
                position: [0.0; 3],
                normal: [0.0, 0.0, 1.0],
                tangent: [1.0, 0.0, 0.0],
                normal_w: 255,
                tangent_w: 255,
                uv0: [0.0; 2],
                uv1: [0.0; 2],
            }],
            triangles: vec![],
            material: Shader::default(),
        },
    ];
    let err = inject_mesh_groups(&mut tree, &extra).unwrap_err();
    assert_eq!(
        err,
        ntf_toolkit::formats::ntf::NtfError::SkeletonMismatch {
            skeleton: 1,
            supplied: 2,
        }
    );
    assert_eq!(tree, before);
}
