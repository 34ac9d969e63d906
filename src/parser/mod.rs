mod group;

pub use group::{GroupIdent, Lookup, MetaTagDescriptor, TagDescriptor};

use std::io::{Read, Seek};

use crate::errors::{Error, Result};
use crate::reader::{ByteReader, OffsetWidth};

/// Size in bytes of the fixed 12-byte header (magic + group count).
pub const HEADER_SIZE: u64 = 12;

/// Size in bytes of each group descriptor entry in the group table.
pub const GROUP_ENTRY_SIZE: u64 = 80;

/// Size in bytes of the NUL-padded name field within a group descriptor.
pub const GROUP_NAME_SIZE: usize = 64;

/// Snapshot format version, derived from the header magic. Fixed for the
/// lifetime of a [`Parser`]; determines the width used everywhere the
/// format calls for an "offset-sized" integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V0,
    V1,
    V2,
    V3,
}

impl Version {
    fn from_magic(magic: u32) -> Result<(Version, OffsetWidth)> {
        match magic {
            0xBED2BED0 => Ok((Version::V0, OffsetWidth::Four)),
            0xBAD1BAD1 => Ok((Version::V1, OffsetWidth::Eight)),
            0xBED2BED2 => Ok((Version::V2, OffsetWidth::Eight)),
            0xBED3BED3 => Ok((Version::V3, OffsetWidth::Eight)),
            other => Err(Error::BadMagic(other)),
        }
    }
}

/// Group descriptor, resolved from the group table: a name and the
/// absolute file offset of its tag stream.
#[derive(Debug, Clone)]
pub struct Group {
    pub index: u32,
    pub name: String,
    tags_offset: u64,
}

impl Group {
    /// Looks up `name` with the given index vector within this group's tag
    /// stream. Re-scans from `tags_offset` every call; no caching.
    pub fn lookup<R: Read + Seek>(
        &self,
        parser: &mut Parser<R>,
        name: &str,
        indices: &[u32],
    ) -> Result<Lookup> {
        group::scan_tag_stream(&mut parser.reader, &self.name, self.tags_offset, name, indices)
    }

    /// Returns whether `lookup(name, indices)` would succeed, without
    /// constructing a descriptor.
    pub fn contains<R: Read + Seek>(
        &self,
        parser: &mut Parser<R>,
        name: &str,
        indices: &[u32],
    ) -> Result<bool> {
        match self.lookup(parser, name, indices) {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Write operations are unsupported; mirrors the original's
    /// `Group.__setitem__`, which unconditionally raises.
    pub fn set(&self, _name: &str, _value: &[u8]) -> Result<()> {
        Err(Error::ReadOnly)
    }
}

/// A lazy navigator over a VMware snapshot's group/tag hierarchy.
///
/// Construction validates the magic and reads the group count eagerly;
/// thereafter the parser performs no I/O until a lookup is requested, and
/// every tag lookup re-scans the relevant tag stream from its group's
/// offset (the format is not randomly indexable tag-by-tag).
pub struct Parser<R> {
    reader: ByteReader<R>,
    version: Version,
    group_count: u32,
}

impl<R: Read + Seek> Parser<R> {
    pub fn new(inner: R) -> Result<Self> {
        // Offset width is not yet known; the magic itself is always a
        // plain 4-byte read regardless of version.
        let mut reader = ByteReader::new(inner, OffsetWidth::Four);
        let magic = reader.reada_u32(0)?;
        let (version, offset_width) = Version::from_magic(magic)?;

        let mut reader = ByteReader::new(reader.into_inner(), offset_width);
        let group_count = reader.reada_u32(8)?;

        log::debug!(
            "parsed vmss/vmsn header: version={:?} offset_width={:?} groups={}",
            version,
            offset_width,
            group_count
        );

        Ok(Self {
            reader,
            version,
            group_count,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn group_count(&self) -> u32 {
        self.group_count
    }

    pub fn offset_width(&self) -> OffsetWidth {
        self.reader.offset_width()
    }

    pub fn group_named(&mut self, name: &str) -> Result<Group> {
        let (index, resolved_name, tags_offset) =
            self.search_group(GroupIdent::Name(name))?;
        Ok(Group {
            index,
            name: resolved_name,
            tags_offset,
        })
    }

    pub fn group_at(&mut self, index: u32) -> Result<Group> {
        let (index, name, tags_offset) = self.search_group(GroupIdent::Index(index))?;
        Ok(Group {
            index,
            name,
            tags_offset,
        })
    }

    pub fn contains_group_named(&mut self, name: &str) -> Result<bool> {
        match self.search_group(GroupIdent::Name(name)) {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Write operations are unsupported; mirrors the original's
    /// `Parser.__setitem__`, which unconditionally raises.
    pub fn set_group(&mut self, _name: &str, _value: &[u8]) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// Scan is O(group count); no index is built since group counts are
    /// small in practice (typically under 50).
    fn search_group(&mut self, ident: GroupIdent) -> Result<(u32, String, u64)> {
        for i in 0..self.group_count {
            let entry_offset = HEADER_SIZE + u64::from(i) * GROUP_ENTRY_SIZE;
            self.reader.seek(entry_offset)?;
            let name_bytes = self.reader.read(GROUP_NAME_SIZE)?;
            let nul = name_bytes
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(GROUP_NAME_SIZE);
            let name = String::from_utf8_lossy(&name_bytes[..nul]).into_owned();

            let matches = match ident {
                GroupIdent::Name(requested) => name == requested,
                GroupIdent::Index(requested) => requested == i,
            };

            if matches {
                let tags_offset = self
                    .reader
                    .reada_u64(entry_offset + GROUP_NAME_SIZE as u64)?;
                log::debug!("found group {} at index {}", name, i);
                return Ok((i, name, tags_offset));
            }
        }

        Err(Error::NotFound)
    }

    /// Typed reads against a terminal tag descriptor, dispatched at
    /// `tag.payload_offset`. Every typed read requires
    /// `on_disk_size >= required width` and is refused on a compressed
    /// payload (decompression is out of scope; see crate docs).
    pub fn read_tag_bytes(&mut self, tag: &TagDescriptor, len: usize) -> Result<Vec<u8>> {
        self.require_readable(tag, len as u64)?;
        self.reader.reada(tag.payload_offset, len)
    }

    pub fn read_tag_byte(&mut self, tag: &TagDescriptor) -> Result<u8> {
        self.require_readable(tag, 1)?;
        self.reader.reada_byte(tag.payload_offset)
    }

    pub fn read_tag_u32(&mut self, tag: &TagDescriptor) -> Result<u32> {
        self.require_readable(tag, 4)?;
        self.reader.reada_u32(tag.payload_offset)
    }

    pub fn read_tag_u64(&mut self, tag: &TagDescriptor) -> Result<u64> {
        self.require_readable(tag, 8)?;
        self.reader.reada_u64(tag.payload_offset)
    }

    pub fn read_tag_offset(&mut self, tag: &TagDescriptor) -> Result<u64> {
        let width = self.reader.offset_width().bytes() as u64;
        self.require_readable(tag, width)?;
        self.reader.reada_offset(tag.payload_offset)
    }

    /// Absolute read of `len` bytes at `file_offset`, independent of any
    /// tag descriptor. Used by the memory address space to dispatch reads
    /// against a resolved run.
    pub fn read_at(&mut self, file_offset: u64, len: usize) -> Result<Vec<u8>> {
        self.reader.reada(file_offset, len)
    }

    fn require_readable(&self, tag: &TagDescriptor, width: u64) -> Result<()> {
        if tag.compressed || tag.on_disk_size < width {
            return Err(Error::TypeMismatch {
                need: width,
                have: tag.on_disk_size,
            });
        }
        Ok(())
    }

    /// Total file length, as reported by the underlying stream. Used by
    /// callers wishing to check the `payload_offset + on_disk_size <= file
    /// length` invariant.
    pub fn stream_len(&mut self) -> Result<u64> {
        self.reader.len()
    }

    /// Releases the underlying reader.
    pub fn close(self) -> R {
        self.reader.into_inner()
    }
}
