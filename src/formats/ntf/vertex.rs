//! Vertex Format 1 codec: 36 bytes/vertex, UBYTE4N-packed normal/tangent
//! (§4.4).
//!
//! Grounded on the teacher's `GeometrySection` attribute codec
//! (`formats/fdm.rs`), which reads/writes one fixed-width field per vertex
//! attribute in sequence; NTF interleaves all of Format 1's attributes
//! into a single fixed stride instead of Diesel's parallel-array layout,
//! so this is a plain struct-of-36-bytes reader/writer rather than a
//! per-attribute dispatch table.

use vek::{Vec2, Vec3};

use crate::util::cursor::{BinaryReader, BinaryWriter};

use super::error::NtfError;

pub const VERTEX_FORMAT_1_STRIDE: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexF1 {
    pub position: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub normal_w: u8,
    pub tangent: Vec3<f32>,
    pub tangent_w: u8,
    pub uv0: Vec2<f32>,
    pub uv1: Vec2<f32>,
}

/// The asymmetric UBYTE4N convention: center byte 128, divide by 127. A
/// symmetric `(byte - 127.5) / 127.5` scheme would drift the neutral
/// vector off byte 128, which the engine's own decoder doesn't expect
/// (§4.4).
pub fn decode_ubyte4n(byte: u8) -> f32 {
    (byte as f32 - 128.0) / 127.0
}

pub fn encode_ubyte4n(f: f32) -> u8 {
    (f * 127.0 + 128.0).round().clamp(0.0, 255.0) as u8
}

pub struct VertexCodec;

impl VertexCodec {
    /// Decodes a buffer of format-1 vertices. `bytes.len()` must be a
    /// multiple of [`VERTEX_FORMAT_1_STRIDE`].
    pub fn decode_all(bytes: &[u8]) -> Result<Vec<VertexF1>, NtfError> {
        if bytes.len() % VERTEX_FORMAT_1_STRIDE != 0 {
            return Err(NtfError::CorruptNode(format!(
                "vertex buffer length {} is not a multiple of the format-1 stride {}",
                bytes.len(),
                VERTEX_FORMAT_1_STRIDE
            )));
        }
        bytes
            .chunks_exact(VERTEX_FORMAT_1_STRIDE)
            .map(Self::decode_one)
            .collect()
    }

    pub fn decode_one(bytes: &[u8]) -> Result<VertexF1, NtfError> {
        let mut r = BinaryReader::new(bytes);
        let position = Vec3::new(r.read_f32()?, r.read_f32()?, r.read_f32()?);

        let nx = r.read_u8()?;
        let ny = r.read_u8()?;
        let nz = r.read_u8()?;
        let normal_w = r.read_u8()?;
        let normal = Vec3::new(decode_ubyte4n(nx), decode_ubyte4n(ny), decode_ubyte4n(nz));

        let tx = r.read_u8()?;
        let ty = r.read_u8()?;
        let tz = r.read_u8()?;
        let tangent_w = r.read_u8()?;
        let tangent = Vec3::new(decode_ubyte4n(tx), decode_ubyte4n(ty), decode_ubyte4n(tz));

        let uv0 = Vec2::new(r.read_f32()?, r.read_f32()?);
        let uv1 = Vec2::new(r.read_f32()?, r.read_f32()?);

        Ok(VertexF1 {
            position,
            normal,
            normal_w,
            tangent,
            tangent_w,
            uv0,
            uv1,
        })
    }

    pub fn encode_all(vertices: &[VertexF1]) -> Vec<u8> {
        let mut w = BinaryWriter::with_capacity(vertices.len() * VERTEX_FORMAT_1_STRIDE);
        for v in vertices {
            Self::encode_one(v, &mut w);
        }
        w.into_bytes()
    }

    pub fn encode_one(v: &VertexF1, w: &mut BinaryWriter) {
        w.write_f32(v.position.x);
        w.write_f32(v.position.y);
        w.write_f32(v.position.z);

        w.write_u8(encode_ubyte4n(v.normal.x));
        w.write_u8(encode_ubyte4n(v.normal.y));
        w.write_u8(encode_ubyte4n(v.normal.z));
        w.write_u8(v.normal_w);

        w.write_u8(encode_ubyte4n(v.tangent.x));
        w.write_u8(encode_ubyte4n(v.tangent.y));
        w.write_u8(encode_ubyte4n(v.tangent.z));
        w.write_u8(v.tangent_w);

        w.write_f32(v.uv0.x);
        w.write_f32(v.uv0.y);
        w.write_f32(v.uv1.x);
        w.write_f32(v.uv1.y);
    }
}
