//! Sparse chunk records
//!
//! Each chunk starts with a 12-byte header:
//! - chunk_type (2), reserved (2), block_count (4), total_size (4)
//!
//! followed by a type-specific body:
//!   - RAW: `block_count * block_size` literal bytes
//!   - FILL: a single 4-byte pattern
//!   - DONT_CARE: nothing

use std::io::Write;

use bytes::Bytes;

use crate::simg::error::SparseError;
use crate::simg::header::CHUNK_HEADER_SIZE;

/// Chunk type: Raw data
pub const CHUNK_TYPE_RAW: u16 = 0xCAC1;

/// Chunk type: Fill pattern
pub const CHUNK_TYPE_FILL: u16 = 0xCAC2;

/// Chunk type: Don't care (skip)
pub const CHUNK_TYPE_DONT_CARE: u16 = 0xCAC3;

/// Size of the pattern that follows a FILL chunk header
pub const FILL_PATTERN_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Raw,
    Fill,
    DontCare,
}

impl ChunkType {
    pub fn from_raw(value: u16) -> Option<Self> {
        match value {
            CHUNK_TYPE_RAW => Some(ChunkType::Raw),
            CHUNK_TYPE_FILL => Some(ChunkType::Fill),
            CHUNK_TYPE_DONT_CARE => Some(ChunkType::DontCare),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u16 {
        match self {
            ChunkType::Raw => CHUNK_TYPE_RAW,
            ChunkType::Fill => CHUNK_TYPE_FILL,
            ChunkType::DontCare => CHUNK_TYPE_DONT_CARE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChunkType::Raw => "RAW",
            ChunkType::Fill => "FILL",
            ChunkType::DontCare => "DONT_CARE",
        }
    }
}

/// On-disk chunk header, before the type is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub chunk_type: u16,
    pub reserved: u16,
    pub block_count: u32,
    pub total_size: u32,
}

impl ChunkHeader {
    pub fn parse(data: &[u8; CHUNK_HEADER_SIZE]) -> Self {
        Self {
            chunk_type: u16::from_le_bytes([data[0], data[1]]),
            reserved: u16::from_le_bytes([data[2], data[3]]),
            block_count: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            total_size: u32::from_le_bytes([data[8], data[9], data[10], data[11]]),
        }
    }

    pub fn encode(&self) -> [u8; CHUNK_HEADER_SIZE] {
        let mut out = [0u8; CHUNK_HEADER_SIZE];
        out[0..2].copy_from_slice(&self.chunk_type.to_le_bytes());
        out[2..4].copy_from_slice(&self.reserved.to_le_bytes());
        out[4..8].copy_from_slice(&self.block_count.to_le_bytes());
        out[8..12].copy_from_slice(&self.total_size.to_le_bytes());
        out
    }
}

/// Decoded body of a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkData {
    /// Literal bytes, exactly `block_count * block_size` long
    Raw(Bytes),
    /// 4-byte little-endian pattern repeated across every block
    Fill(u32),
    /// Blocks whose content is irrelevant
    DontCare,
}

/// One decoded chunk: a run of `block_count` blocks and its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub block_count: u32,
    pub data: ChunkData,
}

impl Chunk {
    pub fn raw(block_count: u32, bytes: impl Into<Bytes>) -> Self {
        Self {
            block_count,
            data: ChunkData::Raw(bytes.into()),
        }
    }

    pub fn fill(block_count: u32, pattern: u32) -> Self {
        Self {
            block_count,
            data: ChunkData::Fill(pattern),
        }
    }

    pub fn dont_care(block_count: u32) -> Self {
        Self {
            block_count,
            data: ChunkData::DontCare,
        }
    }

    pub fn chunk_type(&self) -> ChunkType {
        match self.data {
            ChunkData::Raw(_) => ChunkType::Raw,
            ChunkData::Fill(_) => ChunkType::Fill,
            ChunkData::DontCare => ChunkType::DontCare,
        }
    }

    /// Logical size of the blocks this chunk covers
    pub fn payload_bytes(&self, block_size: u32) -> u64 {
        self.block_count as u64 * block_size as u64
    }

    /// Bytes consumed from the input for the header and inline metadata,
    /// not counting a RAW body.
    pub fn inline_len(&self) -> usize {
        match self.data {
            ChunkData::Fill(_) => CHUNK_HEADER_SIZE + FILL_PATTERN_SIZE,
            ChunkData::Raw(_) | ChunkData::DontCare => CHUNK_HEADER_SIZE,
        }
    }

    /// Header describing this chunk, with `total_size` derived from the body.
    pub fn header(&self, block_size: u32) -> Result<ChunkHeader, SparseError> {
        let body_len = match &self.data {
            ChunkData::Raw(bytes) => bytes.len() as u64,
            ChunkData::Fill(_) => FILL_PATTERN_SIZE as u64,
            ChunkData::DontCare => 0,
        };
        let total_size = u32::try_from(CHUNK_HEADER_SIZE as u64 + body_len).map_err(|_| {
            SparseError::ChunkSizeOverflow {
                block_count: self.block_count,
                block_size,
            }
        })?;

        Ok(ChunkHeader {
            chunk_type: self.chunk_type().as_raw(),
            reserved: 0,
            block_count: self.block_count,
            total_size,
        })
    }

    /// Write header and body in sparse format; returns bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W, block_size: u32) -> Result<u64, SparseError> {
        let header = self.header(block_size)?;
        writer.write_all(&header.encode())?;
        match &self.data {
            ChunkData::Raw(bytes) => writer.write_all(bytes)?,
            ChunkData::Fill(pattern) => writer.write_all(&pattern.to_le_bytes())?,
            ChunkData::DontCare => {}
        }
        Ok(header.total_size as u64)
    }

    /// Append the expanded content of this chunk to `out`.
    ///
    /// DONT_CARE blocks expand to zeroes.
    pub fn materialize_into(&self, block_size: u32, out: &mut Vec<u8>) {
        let len = self.payload_bytes(block_size) as usize;
        match &self.data {
            ChunkData::Raw(bytes) => out.extend_from_slice(bytes),
            ChunkData::Fill(pattern) => {
                let pattern = pattern.to_le_bytes();
                out.extend(pattern.iter().copied().cycle().take(len));
            }
            ChunkData::DontCare => out.resize(out.len() + len, 0),
        }
    }
}
