use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::errors::{Error, Result};

/// Width of the version-dependent "offset" integer, fixed once at parser
/// construction from the snapshot's magic (see [`crate::parser::Version`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetWidth {
    Four,
    Eight,
}

impl OffsetWidth {
    pub fn bytes(self) -> usize {
        match self {
            OffsetWidth::Four => 4,
            OffsetWidth::Eight => 8,
        }
    }
}

/// Positional and absolute little-endian reads over any seekable binary
/// stream.
///
/// The `reada_*` family is a save-cursor/seek/read/restore-cursor
/// convenience, not a true positional read: it mutates the underlying
/// stream's cursor during the call. Callers must not interleave `reada_*`
/// calls for the same reader across threads (see module docs on
/// concurrency).
#[derive(Debug)]
pub struct ByteReader<R> {
    inner: R,
    offset_width: OffsetWidth,
}

impl<R: Read + Seek> ByteReader<R> {
    pub fn new(inner: R, offset_width: OffsetWidth) -> Self {
        Self {
            inner,
            offset_width,
        }
    }

    pub fn offset_width(&self) -> OffsetWidth {
        self.offset_width
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn seek(&mut self, addr: u64) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::Start(addr))?)
    }

    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::Current(0))?)
    }

    /// Streaming read of exactly `n` bytes from the cursor.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).map_err(|_| Error::Truncated {
            expected: n,
            got: 0,
        })?;
        Ok(buf)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.inner
            .read_u8()
            .map_err(|_| Error::Truncated { expected: 1, got: 0 })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.inner
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Truncated { expected: 4, got: 0 })
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.inner
            .read_u64::<LittleEndian>()
            .map_err(|_| Error::Truncated { expected: 8, got: 0 })
    }

    /// Reads a width-parameterized integer, 4 or 8 bytes per
    /// [`OffsetWidth`] fixed at construction.
    pub fn read_offset(&mut self) -> Result<u64> {
        match self.offset_width {
            OffsetWidth::Four => self.read_u32().map(u64::from),
            OffsetWidth::Eight => self.read_u64(),
        }
    }

    /// Save-cursor / seek / read / restore-cursor at an absolute address.
    /// Not reentrant: do not interleave against the same reader from
    /// another thread.
    pub fn reada(&mut self, addr: u64, n: usize) -> Result<Vec<u8>> {
        let cur = self.tell()?;
        self.seek(addr)?;
        let data = self.read(n);
        self.seek(cur)?;
        data
    }

    pub fn reada_byte(&mut self, addr: u64) -> Result<u8> {
        let cur = self.tell()?;
        self.seek(addr)?;
        let v = self.read_byte();
        self.seek(cur)?;
        v
    }

    pub fn reada_u32(&mut self, addr: u64) -> Result<u32> {
        let cur = self.tell()?;
        self.seek(addr)?;
        let v = self.read_u32();
        self.seek(cur)?;
        v
    }

    pub fn reada_u64(&mut self, addr: u64) -> Result<u64> {
        let cur = self.tell()?;
        self.seek(addr)?;
        let v = self.read_u64();
        self.seek(cur)?;
        v
    }

    pub fn reada_offset(&mut self, addr: u64) -> Result<u64> {
        let cur = self.tell()?;
        self.seek(addr)?;
        let v = self.read_offset();
        self.seek(cur)?;
        v
    }

    /// Total length of the underlying stream, leaving the cursor unchanged.
    pub fn len(&mut self) -> Result<u64> {
        let cur = self.tell()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.seek(cur)?;
        Ok(end)
    }
}
