//! Random-access little-endian byte cursor.
//!
//! Unlike the teacher's `ReadExt`/`WriteExt` traits (generic over any
//! `std::io::{Read, Write}`), nodes in an NTF tree carry a size field that
//! is only known once the node's payload has already been written. That
//! needs a cursor that can seek backward and patch bytes already emitted,
//! which a generic `Write` stream can't do. `BinaryCursor` owns a growable
//! buffer and exposes the "mark, write payload, patch the size at the
//! mark" idiom `TreeCodec` is built on.

use std::convert::TryInto;

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum CursorError {
    #[error("read past end of buffer at offset {offset} (wanted {wanted} bytes, {available} available)")]
    UnexpectedEof {
        offset: usize,
        wanted: usize,
        available: usize,
    },
}

/// A position recorded by [`BinaryCursor::mark`], redeemed by
/// [`BinaryCursor::patch_u32_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

impl Mark {
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// Read cursor over a borrowed byte slice.
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        BinaryReader { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn seek(&mut self, pos: usize) -> Result<(), CursorError> {
        if pos > self.buf.len() {
            return Err(CursorError::UnexpectedEof {
                offset: self.pos,
                wanted: pos - self.pos,
                available: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), CursorError> {
        self.seek(self.pos + count)
    }

    /// Borrow `count` bytes starting at the current position without
    /// advancing past them being consumed by the caller explicitly.
    pub fn take(&mut self, count: usize) -> Result<&'a [u8], CursorError> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&e| e <= self.buf.len())
            .ok_or(CursorError::UnexpectedEof {
                offset: self.pos,
                wanted: count,
                available: self.remaining(),
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32, CursorError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32, CursorError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }
}

/// Write cursor over an owned, growable buffer.
#[derive(Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BinaryWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Record the current position as a placeholder, reserve a `u32` of
    /// zeros there, and return a token to patch it later.
    pub fn mark(&mut self) -> Mark {
        let m = Mark(self.buf.len());
        self.write_u32(0);
        m
    }

    /// Overwrite the `u32` reserved at `mark` with `value`.
    pub fn patch_u32_at(&mut self, mark: Mark, value: u32) {
        self.buf[mark.0..mark.0 + 4].copy_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_roundtrips_little_endian_scalars() {
        let bytes = [0x2A, 0x00, 0x00, 0x00, 0xFF, 0x00];
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 42);
        assert_eq!(r.read_u8().unwrap(), 0xFF);
        assert_eq!(r.read_u8().unwrap(), 0x00);
        assert!(r.is_empty());
    }

    #[test]
    fn read_past_end_errors() {
        let bytes = [0u8; 2];
        let mut r = BinaryReader::new(&bytes);
        assert!(r.read_u32().is_err());
    }

    #[test]
    fn mark_and_patch_computes_self_inclusive_size() {
        let mut w = BinaryWriter::new();
        let mark = w.mark();
        w.write_bytes(b"hello");
        let size: u32 = (w.position() - mark.0).try_into().unwrap();
        w.patch_u32_at(mark, size);
        assert_eq!(&w.bytes()[0..4], &9u32.to_le_bytes());
        assert_eq!(&w.bytes()[4..], b"hello");
    }
}
