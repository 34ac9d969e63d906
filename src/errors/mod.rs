use std::io::Error as IoError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] IoError),

    /// Raised by embedders that wrap a source opened in a text-translating
    /// mode before handing it to [`crate::reader::ByteReader`]. `Read + Seek`
    /// itself carries no mode bit, so nothing in this crate constructs this
    /// variant; see DESIGN.md's Open Question resolutions for why.
    #[error("file handle is not opened in binary mode")]
    BadMode,

    #[error("short read: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("header signature invalid: {0:#010x}")]
    BadMagic(u32),

    #[error("not found")]
    NotFound,

    #[error("tag is too small for requested read: need {need} bytes, have {have}")]
    TypeMismatch { need: u64, have: u64 },

    #[error("write operations are not supported")]
    ReadOnly,

    #[error("stream does not carry a recognized vmss/vmsn header")]
    WrongFormat,

    #[error("memory is not embedded in this snapshot (likely stored in a sibling .vmem file)")]
    MemoryNotEmbedded,

    #[error("region table is corrupt: region {index} is missing {field}")]
    CorruptRegionTable { index: u32, field: &'static str },

    #[error("cpu.CR[0][3] (CR3/dtb) not present in snapshot")]
    NoCR3,
}
