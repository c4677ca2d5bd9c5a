//! Stable error discriminants for the whole NTF pipeline (§7). One enum,
//! rather than the teacher's per-format split (`fdm::ParseError` vs.
//! `bundles::ReadError`), because §7 explicitly enumerates a single closed
//! list of kinds shared across parsing, mesh binding, and skeleton
//! injection.

use thiserror::Error;

use super::chunk::ChunkError;
use crate::util::cursor::CursorError;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NtfError {
    #[error("not an NTF file: magic bytes did not match F6 66 99 9F")]
    NotAnNtfFile,

    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("corrupt node: {0}")]
    CorruptNode(String),

    #[error("chunk tag {0} is not one of the eight known shapes")]
    UnknownChunkTag(u8),

    #[error("VertexFormat {0} is not supported for mesh decoding (only format 1)")]
    UnsupportedVertexFormat(i32),

    #[error("index count {0} is not a multiple of three")]
    IndexCountNotMultipleOfThree(usize),

    #[error("mesh group has {0} vertices, exceeding the 65535 u16 index limit")]
    TooManyVertices(usize),

    #[error("mesh group is missing required chunk \"{0}\"")]
    MissingRequiredChunk(String),

    #[error("skeleton has {skeleton} mesh groups but {supplied} groups were supplied for injection")]
    SkeletonMismatch { skeleton: usize, supplied: usize },
}

impl From<CursorError> for NtfError {
    fn from(_: CursorError) -> Self {
        NtfError::UnexpectedEof
    }
}

impl From<ChunkError> for NtfError {
    fn from(e: ChunkError) -> Self {
        match e {
            ChunkError::UnknownChunkTag(t) => NtfError::UnknownChunkTag(t),
            ChunkError::Truncated(_) => NtfError::UnexpectedEof,
            ChunkError::BadName => NtfError::CorruptNode("chunk name is not valid UTF-8".into()),
        }
    }
}
