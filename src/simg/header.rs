//! Android sparse image file header
//!
//! The header is a fixed 28-byte little-endian preamble:
//! - magic (4), major/minor version (2 + 2)
//! - declared file and chunk header sizes (2 + 2)
//! - block size, total blocks, total chunks, image checksum (4 each)
//!
//! Only `total_chunks` is rewritten by the re-chunker; every other field is
//! carried from input to output unchanged.

use std::io::Read;

use crate::simg::error::SparseError;

/// Sparse image magic number: 0xED26FF3A
pub const SPARSE_HEADER_MAGIC: u32 = 0xED26FF3A;

/// Standard sparse image header size
pub const SPARSE_HEADER_SIZE: usize = 28;

/// Standard chunk header size
pub const CHUNK_HEADER_SIZE: usize = 12;

/// Parsed sparse image header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub magic: u32,
    pub major_version: u16,
    pub minor_version: u16,
    /// Declared size of this header (28)
    pub file_header_size: u16,
    /// Declared size of a chunk header (12)
    pub chunk_header_size: u16,
    /// Block size in bytes (typically 4096)
    pub block_size: u32,
    /// Total blocks in the expanded image
    pub total_blocks: u32,
    /// Number of chunk records that follow the header
    pub total_chunks: u32,
    /// Image checksum, passed through and never verified
    pub image_checksum: u32,
}

impl ImageHeader {
    /// Decode a header from the first 28 bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, SparseError> {
        if data.len() < SPARSE_HEADER_SIZE {
            return Err(SparseError::Truncated { index: None });
        }

        let u16_at = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]);
        let u32_at =
            |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

        let magic = u32_at(0);
        if magic != SPARSE_HEADER_MAGIC {
            return Err(SparseError::BadMagic(magic));
        }

        Ok(Self {
            magic,
            major_version: u16_at(4),
            minor_version: u16_at(6),
            file_header_size: u16_at(8),
            chunk_header_size: u16_at(10),
            block_size: u32_at(12),
            total_blocks: u32_at(16),
            total_chunks: u32_at(20),
            image_checksum: u32_at(24),
        })
    }

    /// Read exactly one header from a stream.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, SparseError> {
        let mut raw = [0u8; SPARSE_HEADER_SIZE];
        reader
            .read_exact(&mut raw)
            .map_err(|e| SparseError::from_read(e, None))?;
        Self::parse(&raw)
    }

    /// Encode the header in on-disk field order.
    pub fn encode(&self) -> [u8; SPARSE_HEADER_SIZE] {
        let mut out = [0u8; SPARSE_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..6].copy_from_slice(&self.major_version.to_le_bytes());
        out[6..8].copy_from_slice(&self.minor_version.to_le_bytes());
        out[8..10].copy_from_slice(&self.file_header_size.to_le_bytes());
        out[10..12].copy_from_slice(&self.chunk_header_size.to_le_bytes());
        out[12..16].copy_from_slice(&self.block_size.to_le_bytes());
        out[16..20].copy_from_slice(&self.total_blocks.to_le_bytes());
        out[20..24].copy_from_slice(&self.total_chunks.to_le_bytes());
        out[24..28].copy_from_slice(&self.image_checksum.to_le_bytes());
        out
    }

    /// Same header with a different chunk count
    pub fn with_total_chunks(self, total_chunks: u32) -> Self {
        Self {
            total_chunks,
            ..self
        }
    }

    /// Total expanded image size in bytes
    pub fn image_size(&self) -> u64 {
        self.total_blocks as u64 * self.block_size as u64
    }
}
