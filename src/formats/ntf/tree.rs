//! In-memory NTF tree: ordered entries, each either a named+typed [`Chunk`]
//! or a typed [`Child`] subtree (§3).
//!
//! Grounded on the teacher's `DieselContainer` (`formats/fdm/container.rs`):
//! same "ordered ids, lookup by id, `iter()` walks in insertion order"
//! shape, generalized from a flat id→section map to a recursive tree since
//! NTF nests Children inside Children arbitrarily, which Diesel's format
//! does not.

use super::chunk::{ChunkType, ChunkValue};

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub name: String,
    pub value: ChunkValue,
}

impl Chunk {
    pub fn new(name: impl Into<String>, value: ChunkValue) -> Self {
        Chunk {
            name: name.into(),
            value,
        }
    }

    pub fn chunk_type(&self) -> ChunkType {
        self.value.chunk_type()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub child_type: i32,
    pub entries: Vec<Entry>,
}

impl Child {
    pub fn new(child_type: i32) -> Self {
        Child {
            child_type,
            entries: Vec::new(),
        }
    }

    pub fn find_chunk(&self, name: &str) -> Option<&Chunk> {
        self.entries.iter().find_map(|e| match e {
            Entry::Chunk(c) if c.name == name => Some(c),
            _ => None,
        })
    }

    pub fn find_chunk_mut(&mut self, name: &str) -> Option<&mut Chunk> {
        self.entries.iter_mut().find_map(|e| match e {
            Entry::Chunk(c) if c.name == name => Some(c),
            _ => None,
        })
    }

    pub fn children_of_type(&self, child_type: i32) -> impl Iterator<Item = &Child> {
        self.entries.iter().filter_map(move |e| match e {
            Entry::Child(c) if c.child_type == child_type => Some(c),
            _ => None,
        })
    }

    pub fn children_of_type_mut(&mut self, child_type: i32) -> impl Iterator<Item = &mut Child> {
        self.entries.iter_mut().filter_map(move |e| match e {
            Entry::Child(c) if c.child_type == child_type => Some(c),
            _ => None,
        })
    }

    pub fn first_child_of_type(&self, child_type: i32) -> Option<&Child> {
        self.children_of_type(child_type).next()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Chunk(Chunk),
    Child(Child),
}

impl Entry {
    pub fn as_chunk(&self) -> Option<&Chunk> {
        match self {
            Entry::Chunk(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_child(&self) -> Option<&Child> {
        match self {
            Entry::Child(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_child_mut(&mut self) -> Option<&mut Child> {
        match self {
            Entry::Child(c) => Some(c),
            _ => None,
        }
    }
}

/// The root of a parsed file: an ordered sequence of top-level entries,
/// prefixed on disk by the magic bytes (§3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    pub entries: Vec<Entry>,
}

impl Tree {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn find_chunk(&self, name: &str) -> Option<&Chunk> {
        self.entries.iter().find_map(|e| match e {
            Entry::Chunk(c) if c.name == name => Some(c),
            _ => None,
        })
    }

    pub fn children_of_type(&self, child_type: i32) -> impl Iterator<Item = &Child> {
        self.entries.iter().filter_map(move |e| match e {
            Entry::Child(c) if c.child_type == child_type => Some(c),
            _ => None,
        })
    }

    pub fn children_of_type_mut(&mut self, child_type: i32) -> impl Iterator<Item = &mut Child> {
        self.entries.iter_mut().filter_map(move |e| match e {
            Entry::Child(c) if c.child_type == child_type => Some(c),
            _ => None,
        })
    }
}

/// Child type tags used by the mesh-binding layer (§3).
pub const CHILD_TYPE_MESH_GROUP: i32 = -254;
pub const CHILD_TYPE_SHADER: i32 = -253;
pub const CHILD_TYPE_LOCATOR: i32 = 5;

/// The de-facto name→type schema (§3 invariants, §9 "Name-to-type-schema
/// coupling"). Used only as a soft sanity check on parse and to decide
/// encoder branches on write where a caller builds a `Chunk` by name
/// without specifying a `ChunkValue` variant explicitly; a mismatch is
/// never a hard parse failure, since the engine's chunk vocabulary is not
/// closed (§9 "Skeleton as an opaque blob").
pub fn schema_for_name(name: &str) -> Option<ChunkType> {
    Some(match name {
        "Name" | "ShaderName" | "TexS0" | "TexS1" | "TexS2" | "AniFileName" => ChunkType::String,
        "NumVertexes" | "NumFaces" => ChunkType::UInt32,
        "Vertexes" | "Faces" => ChunkType::Raw,
        "VertexFormat" | "Type" | "IsLocator" => ChunkType::Int32,
        "Alpha" | "NearRange" | "FarRange" => ChunkType::Float32,
        "DestColor" | "SpecColor" | "LDir" | "BBoxMin" | "BBoxMax" | "TMin" | "TMax" => {
            ChunkType::Vec4
        }
        "LPos" => ChunkType::Vec4,
        _ => return None,
    })
}

/// True for exactly the one chunk name whose tag-20 payload is integers.
pub fn is_int_vec4_name(name: &str) -> bool {
    name == super::chunk::LPOS_NAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lookup_is_soft_and_partial() {
        assert_eq!(schema_for_name("NumVertexes"), Some(ChunkType::UInt32));
        assert_eq!(schema_for_name("SomeEnginePrivateField"), None);
    }

    #[test]
    fn child_find_first_respects_order() {
        let mut root = Child::new(CHILD_TYPE_MESH_GROUP);
        root.entries.push(Entry::Child(Child::new(1)));
        root.entries
            .push(Entry::Child(Child::new(CHILD_TYPE_SHADER)));
        root.entries
            .push(Entry::Child(Child::new(CHILD_TYPE_SHADER)));
        let found = root.first_child_of_type(CHILD_TYPE_SHADER).unwrap();
        assert_eq!(found.child_type, CHILD_TYPE_SHADER);
    }
}
