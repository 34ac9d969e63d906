//! Parser for VMware `.vmss`/`.vmsn` virtual-machine snapshot containers,
//! exposed as a random-access guest physical-memory address space.
//!
//! Three layers, leaves first:
//!
//! - [`reader`] (positional/absolute little-endian reads over any
//!   `Read + Seek` stream).
//! - [`parser`] (a lazy navigator over the snapshot's group/tag hierarchy).
//! - [`memspace`] (the `memory` group's run table and the first vCPU's
//!   CR3, built once at construction).
//!
//! Decompression, raw stream I/O, write-back, and interpretation of groups
//! other than `memory`/`cpu` are out of scope; see each module's docs for
//! what it does and does not attempt.

pub mod errors;
pub mod memspace;
pub mod parser;
pub mod reader;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
pub use memspace::{Run, VmwareMemorySpace, PAGE_SIZE};
pub use parser::{Group, GroupIdent, Lookup, MetaTagDescriptor, Parser, TagDescriptor, Version};
pub use reader::{ByteReader, OffsetWidth};
