use std::io::{self, Read, Seek};

use crate::errors::{Error, Result};
use crate::parser::{Group, Lookup, Parser, TagDescriptor};

/// The snapshot format does not parameterize this; it is a fixed constant
/// of the core.
pub const PAGE_SIZE: u64 = 4096;

/// A contiguous mapping from guest physical memory into the snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub guest_physical_offset: u64,
    pub file_offset: u64,
    pub length: u64,
}

/// Guest physical memory, reconstructed from a `memory` group's region
/// manifest (or a single-region fallback), plus the first vCPU's CR3.
///
/// Built once at construction; the run table and `dtb` are immutable
/// thereafter. No decoded payload is cached beyond what [`Parser`] itself
/// holds; every read dispatches to the underlying byte reader.
pub struct VmwareMemorySpace<R> {
    parser: Parser<R>,
    pub runs: Vec<Run>,
    pub dtb: u32,
}

impl<R: Read + Seek> VmwareMemorySpace<R> {
    /// Probes `inner` for the vmss/vmsn magic and, if present, builds the
    /// run table and extracts CR3.
    ///
    /// A non-matching magic fails with [`Error::WrongFormat`] without
    /// consuming the stream beyond the 12-byte header, so a caller chaining
    /// address-space candidates can try the next one.
    pub fn new(inner: R) -> Result<Self> {
        let mut parser = match Parser::new(inner) {
            Ok(parser) => parser,
            Err(Error::BadMagic(_)) => return Err(Error::WrongFormat),
            Err(e) => return Err(e),
        };

        let memory = parser
            .group_named("memory")
            .map_err(|e| remap_not_found(e, Error::MemoryNotEmbedded))?;

        let base_tag = match memory
            .lookup(&mut parser, "Memory", &[0, 0])
            .map_err(|e| remap_not_found(e, Error::MemoryNotEmbedded))?
        {
            Lookup::Terminal(tag) => tag,
            Lookup::Intermediate(_) => return Err(Error::MemoryNotEmbedded),
        };

        let runs = build_runs(&mut parser, &memory, &base_tag)?;
        let dtb = extract_cr3(&mut parser)?;

        Ok(Self { parser, runs, dtb })
    }

    /// Finds the run covering `addr`, if any. Insertion-ordered, linear
    /// scan: snapshot manifests carry at most a few hundred regions, so a
    /// per-construction index is not worth the complexity (see crate docs
    /// on lazy traversal).
    fn find_run(&self, addr: u64) -> Option<Run> {
        self.runs
            .iter()
            .copied()
            .find(|r| addr >= r.guest_physical_offset && addr < r.guest_physical_offset + r.length)
    }

    /// Reads `len` bytes at guest-physical address `addr`. Reads that span
    /// run boundaries are split at the boundary. Returns `None` only when
    /// no byte of the requested range is covered by any run; a partially
    /// covered range is zero-filled for its unmapped portion.
    pub fn read(&mut self, addr: u64, len: usize) -> Result<Option<Vec<u8>>> {
        if len == 0 {
            return Ok(Some(Vec::new()));
        }

        let end = addr + len as u64;
        let mut out = Vec::with_capacity(len);
        let mut cur = addr;
        let mut mapped_any = false;

        while cur < end {
            if let Some(run) = self.find_run(cur) {
                mapped_any = true;
                let run_end = run.guest_physical_offset + run.length;
                let chunk_end = end.min(run_end);
                let chunk_len = (chunk_end - cur) as usize;
                let file_offset = cur - run.guest_physical_offset + run.file_offset;
                out.extend_from_slice(&self.parser.read_at(file_offset, chunk_len)?);
                cur = chunk_end;
            } else {
                let next_start = self
                    .runs
                    .iter()
                    .map(|r| r.guest_physical_offset)
                    .filter(|&g| g > cur)
                    .min()
                    .unwrap_or(end);
                let gap_end = next_start.min(end);
                out.resize(out.len() + (gap_end - cur) as usize, 0);
                cur = gap_end;
            }
        }

        Ok(if mapped_any { Some(out) } else { None })
    }

    /// Convenience wrapper over [`VmwareMemorySpace::read`] for callers
    /// that want a plain `io::Result` instead of the crate's sparse-read
    /// `Option` convention (no external forensic-framework address-space
    /// trait is vendored into this crate; see `SPEC_FULL.md` §6).
    pub fn physical_read(&mut self, addr: u64, len: usize) -> io::Result<Vec<u8>> {
        match self.read(addr, len) {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "guest-physical address range is entirely unmapped",
            )),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }

    /// Releases the parser and the underlying reader.
    pub fn close(self) -> R {
        self.parser.close()
    }
}

fn remap_not_found(err: Error, replacement: Error) -> Error {
    match err {
        Error::NotFound => replacement,
        other => other,
    }
}

fn build_runs<R: Read + Seek>(
    parser: &mut Parser<R>,
    memory: &Group,
    base_tag: &TagDescriptor,
) -> Result<Vec<Run>> {
    let regions_count = match memory.lookup(parser, "regionsCount", &[]) {
        Ok(Lookup::Terminal(tag)) => Some(parser.read_tag_u32(&tag)?),
        Ok(Lookup::Intermediate(_)) | Err(Error::NotFound) => None,
        Err(e) => return Err(e),
    };

    let mut runs = Vec::new();

    match regions_count {
        Some(count) if count > 0 => {
            for i in 0..count {
                let ppn = read_region_component(parser, memory, "regionPPN", i)?;
                let page_num = read_region_component(parser, memory, "regionPageNum", i)?;
                let size = read_region_component(parser, memory, "regionSize", i)?;

                runs.push(Run {
                    guest_physical_offset: u64::from(ppn) * PAGE_SIZE,
                    file_offset: u64::from(page_num) * PAGE_SIZE + base_tag.payload_offset,
                    length: u64::from(size) * PAGE_SIZE,
                });
            }
        }
        _ => {
            runs.push(Run {
                guest_physical_offset: 0,
                file_offset: base_tag.payload_offset,
                length: base_tag.on_disk_size,
            });
        }
    }

    log::debug!("built {} memory run(s)", runs.len());
    for run in &runs {
        log::trace!("{:?}", run);
    }

    Ok(runs)
}

fn read_region_component<R: Read + Seek>(
    parser: &mut Parser<R>,
    memory: &Group,
    field: &'static str,
    index: u32,
) -> Result<u32> {
    match memory.lookup(parser, field, &[index]) {
        Ok(Lookup::Terminal(tag)) => parser.read_tag_u32(&tag),
        Ok(Lookup::Intermediate(_)) | Err(Error::NotFound) => {
            Err(Error::CorruptRegionTable { index, field })
        }
        Err(e) => Err(e),
    }
}

fn extract_cr3<R: Read + Seek>(parser: &mut Parser<R>) -> Result<u32> {
    let cpu = parser
        .group_named("cpu")
        .map_err(|e| remap_not_found(e, Error::NoCR3))?;

    let lookup = cpu
        .lookup(parser, "CR", &[0, 3])
        .map_err(|e| remap_not_found(e, Error::NoCR3))?;

    match lookup {
        Lookup::Terminal(tag) => parser.read_tag_u32(&tag),
        Lookup::Intermediate(_) => Err(Error::NoCR3),
    }
}
