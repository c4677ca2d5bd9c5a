//! NTF (Node Tree Format) binary container: parsing, serialization, the
//! vertex codec, mesh/tree binding, and the skeleton mechanism (§2-§7).

pub mod binding;
pub mod chunk;
pub mod error;
pub mod skeleton;
pub mod tree;
pub mod tree_codec;
pub mod vertex;

pub use binding::{extract_locators, extract_mesh_groups, inject_mesh_groups};
pub use chunk::{ChunkCodec, ChunkType, ChunkValue};
pub use error::NtfError;
pub use skeleton::{SkeletonRecord, SkeletonStore};
pub use tree::{Child, Chunk, Entry, Tree};
pub use tree_codec::{TreeCodec, MAGIC};
pub use vertex::{VertexCodec, VertexF1, VERTEX_FORMAT_1_STRIDE};
