//! Neutral per-group mesh data (§3 "MeshGroup", "Shader", "Locator";
//! §2 MeshModel component).
//!
//! This is the shape `TreeMeshBinding` extracts from/injects into a
//! [`crate::formats::ntf::tree::Tree`], and what [`crate::formats::objbridge`]
//! reads from and writes to the textual interchange format. Grounded on
//! the teacher's `fdm::MeshModel`/`RenderAtom` split (one struct per draw
//! call plus shared geometry), simplified to one fully-expanded vertex
//! list per group since NTF (unlike Diesel release format) doesn't share
//! vertex buffers across render atoms.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub normal_w: u8,
    pub tangent_w: u8,
    pub uv0: [f32; 2],
    pub uv1: [f32; 2],
}

pub type Triangle = (u16, u16, u16);

/// The "pass-through bag of any additional chunks" §3 describes isn't a
/// field here: `TreeMeshBinding::inject_mesh_groups` mutates the shader
/// child found in the tree in place rather than rebuilding it from this
/// struct, so chunks this type doesn't know about simply stay untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shader {
    pub name: String,
    pub shader_name: String,
    pub tex_s0: String,
    pub tex_s1: String,
    pub tex_s2: String,
    pub dest_color: [f32; 4],
    pub spec_color: [f32; 4],
    pub alpha: f32,
    pub near_range: f32,
    pub far_range: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshGroup {
    pub name: String,
    pub vertex_format: i32,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub material: Shader,
}

impl MeshGroup {
    /// §4.6: NumFaces stores the index count, not the triangle count.
    pub fn num_faces(&self) -> u32 {
        (self.triangles.len() as u32) * 3
    }

    pub fn bounding_box(&self) -> ([f32; 3], [f32; 3]) {
        if self.vertices.is_empty() {
            return ([0.0; 3], [0.0; 3]);
        }
        let mut min = self.vertices[0].position;
        let mut max = min;
        for v in &self.vertices[1..] {
            for axis in 0..3 {
                min[axis] = min[axis].min(v.position[axis]);
                max[axis] = max[axis].max(v.position[axis]);
            }
        }
        (min, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Locator {
    pub is_locator: i32,
    pub l_pos: [i32; 4],
    pub l_dir: [f32; 4],
}
