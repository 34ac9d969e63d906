use std::io::{Read, Seek};

use crate::errors::{Error, Result};
use crate::parser::Parser;
use crate::reader::ByteReader;

/// Identifies a group by either name or zero-based index.
#[derive(Debug, Clone, Copy)]
pub enum GroupIdent<'a> {
    Name(&'a str),
    Index(u32),
}

/// Terminal tag descriptor: a read-only view over a tag's payload. Holds no
/// buffered data; a read against it issues an absolute read against the
/// byte reader through [`Parser::read_tag_bytes`] and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDescriptor {
    pub group: String,
    pub name: String,
    pub indices: Vec<u32>,
    pub payload_offset: u64,
    pub on_disk_size: u64,
    pub in_memory_size: u64,
    pub compressed: bool,
}

/// Intermediate navigator representing a partially indexed path. Holds no
/// file-offset state of its own beyond the tag stream it was found in;
/// supplying the next index re-scans that stream at one index deeper.
#[derive(Debug, Clone)]
pub struct MetaTagDescriptor {
    pub group: String,
    pub name: String,
    pub indices: Vec<u32>,
    tags_offset: u64,
}

impl MetaTagDescriptor {
    pub fn lookup<R: Read + Seek>(&self, parser: &mut Parser<R>, index: u32) -> Result<Lookup> {
        let mut next = self.indices.clone();
        next.push(index);
        scan_tag_stream(&mut parser.reader, &self.group, self.tags_offset, &self.name, &next)
    }

    pub fn contains<R: Read + Seek>(&self, parser: &mut Parser<R>, index: u32) -> Result<bool> {
        match self.lookup(parser, index) {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Result of a tag lookup: either a terminal descriptor or a deeper
/// intermediate node to subscript further. `NotFound` is returned as an
/// `Err`, not a third variant, so lookups compose with `?`.
#[derive(Debug, Clone)]
pub enum Lookup {
    Terminal(TagDescriptor),
    Intermediate(MetaTagDescriptor),
}

/// Scans the tag stream starting at `tags_offset`, looking for `tag_name`
/// with index vector `requested`. Re-scans from the start of the stream on
/// every call: the format is not randomly indexable and the consumer's
/// access pattern (a handful of lookups per parse) does not warrant
/// building a per-group index.
pub(crate) fn scan_tag_stream<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    group_name: &str,
    tags_offset: u64,
    tag_name: &str,
    requested: &[u32],
) -> Result<Lookup> {
    reader.seek(tags_offset)?;

    loop {
        let flags = reader.read_byte()?;
        let name_size = reader.read_byte()?;

        if flags == 0 && name_size == 0 {
            return Err(Error::NotFound);
        }

        let name_bytes = reader.read(name_size as usize)?;
        let name = String::from_utf8_lossy(&name_bytes).into_owned();

        let dims = (flags >> 6) & 0x03;
        let mut indices = Vec::with_capacity(dims as usize);
        for _ in 0..dims {
            indices.push(reader.read_u32()?);
        }

        let encoded_size = flags & 0x3f;
        let (on_disk_size, in_memory_size, compressed) = if encoded_size == 62 || encoded_size == 63 {
            let compressed = encoded_size == 63;
            let on_disk_size = reader.read_offset()?;
            let in_memory_size = reader.read_offset()?;

            let reserved = reader.read(2)?;
            let reserved = u16::from_le_bytes([reserved[0], reserved[1]]);
            if reserved != 0 {
                log::warn!(
                    "tag {}.{}{:?}: reserved word after long-form size is non-zero: {:#06x}",
                    group_name,
                    name,
                    indices,
                    reserved
                );
            }

            (on_disk_size, in_memory_size, compressed)
        } else {
            (u64::from(encoded_size), u64::from(encoded_size), false)
        };

        let payload_offset = reader.tell()?;
        reader.seek(payload_offset + on_disk_size)?;

        if name != tag_name {
            continue;
        }

        if indices.as_slice() == requested {
            log::trace!(
                "found tag {}.{}{:?}: size={} mem_size={} compressed={}",
                group_name,
                name,
                indices,
                on_disk_size,
                in_memory_size,
                compressed
            );
            return Ok(Lookup::Terminal(TagDescriptor {
                group: group_name.to_string(),
                name,
                indices,
                payload_offset,
                on_disk_size,
                in_memory_size,
                compressed,
            }));
        }

        if indices.len() > requested.len() && &indices[..requested.len()] == requested {
            log::trace!("found meta-tag {}.{}{:?}", group_name, name, requested);
            return Ok(Lookup::Intermediate(MetaTagDescriptor {
                group: group_name.to_string(),
                name,
                indices: requested.to_vec(),
                tags_offset,
            }));
        }
    }
}
