use std::io;

use thiserror::Error;

use crate::simg::header::SPARSE_HEADER_MAGIC;

/// Errors raised while re-chunking a sparse image.
///
/// Every variant is fatal to the current pass. Output written before the
/// error is not a valid image and must be discarded by the caller.
#[derive(Debug, Error)]
pub enum SparseError {
    /// Header magic did not match
    #[error("Invalid sparse image magic: 0x{0:08X} (expected 0x{magic:08X})", magic = SPARSE_HEADER_MAGIC)]
    BadMagic(u32),

    /// Chunk header declared a type outside RAW/FILL/DONT_CARE
    #[error("Unknown chunk type 0x{chunk_type:04X} at chunk {index}")]
    UnknownChunkType { index: u32, chunk_type: u16 },

    /// Input ended inside the image header (`index` is `None`) or inside a chunk
    #[error("Unexpected end of sparse image data{}", position(.index))]
    Truncated { index: Option<u32> },

    /// A chunk does not fit the 32-bit on-disk size fields
    #[error("Chunk size calculation overflow: {block_count} blocks x {block_size} bytes/block")]
    ChunkSizeOverflow { block_count: u32, block_size: u32 },

    /// Block size is zero or not a multiple of 4
    #[error("Invalid block size: {0} (must be a non-zero multiple of 4)")]
    InvalidBlockSize(u32),

    /// Alignment unit is zero or too large for a 32-bit window
    #[error("Invalid alignment unit: {0} KiB")]
    InvalidAlignment(u32),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn position(index: &Option<u32>) -> String {
    match index {
        Some(index) => format!(" at chunk {}", index),
        None => " in image header".to_string(),
    }
}

impl SparseError {
    /// Map an `UnexpectedEof` from a short read onto `Truncated`, keep anything else.
    pub(crate) fn from_read(e: io::Error, index: Option<u32>) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            SparseError::Truncated { index }
        } else {
            SparseError::Io(e)
        }
    }
}
