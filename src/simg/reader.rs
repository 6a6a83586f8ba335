use std::io::Read;

use bytes::Bytes;
use tracing::{trace, warn};

use crate::simg::chunk::{Chunk, ChunkData, ChunkHeader, ChunkType, FILL_PATTERN_SIZE};
use crate::simg::error::SparseError;
use crate::simg::header::CHUNK_HEADER_SIZE;

/// Sequential chunk decoder over a sparse image body.
///
/// The reader never seeks. A chunk handed back through [`ChunkReader::rewind`]
/// is held in a single pushback slot and returned by the next call to
/// [`ChunkReader::next_chunk`], RAW payload included, so the input only
/// needs to implement `Read`.
pub struct ChunkReader<R> {
    inner: R,
    block_size: u32,
    /// Chunks decoded from the stream so far
    decoded: u32,
    pending: Option<Chunk>,
}

impl<R: Read> ChunkReader<R> {
    /// `inner` must be positioned right after the image header.
    pub fn new(inner: R, block_size: u32) -> Self {
        Self {
            inner,
            block_size,
            decoded: 0,
            pending: None,
        }
    }

    /// Number of distinct chunks decoded from the stream
    pub fn chunks_decoded(&self) -> u32 {
        self.decoded
    }

    /// Index of the chunk the next stream read will decode
    fn index(&self) -> u32 {
        self.decoded
    }

    /// Return the next chunk, preferring one that was pushed back.
    pub fn next_chunk(&mut self) -> Result<Chunk, SparseError> {
        if let Some(chunk) = self.pending.take() {
            trace!(
                "Redelivering {} chunk ({} blocks)",
                chunk.chunk_type().name(),
                chunk.block_count
            );
            return Ok(chunk);
        }

        let index = self.index();
        let mut raw = [0u8; CHUNK_HEADER_SIZE];
        self.read_exact(&mut raw)?;
        let header = ChunkHeader::parse(&raw);

        let chunk_type =
            ChunkType::from_raw(header.chunk_type).ok_or(SparseError::UnknownChunkType {
                index,
                chunk_type: header.chunk_type,
            })?;

        let payload_bytes = header.block_count as u64 * self.block_size as u64;
        let (data, expected_total) = match chunk_type {
            ChunkType::Raw => {
                let expected_total = CHUNK_HEADER_SIZE as u64 + payload_bytes;
                if expected_total > u32::MAX as u64 {
                    return Err(SparseError::ChunkSizeOverflow {
                        block_count: header.block_count,
                        block_size: self.block_size,
                    });
                }
                // Sized by what the stream delivers, not by the declared count.
                let mut body = Vec::new();
                (&mut self.inner)
                    .take(payload_bytes)
                    .read_to_end(&mut body)
                    .map_err(|e| SparseError::from_read(e, Some(index)))?;
                if (body.len() as u64) < payload_bytes {
                    return Err(SparseError::Truncated { index: Some(index) });
                }
                (ChunkData::Raw(Bytes::from(body)), expected_total)
            }
            ChunkType::Fill => {
                let mut pattern = [0u8; FILL_PATTERN_SIZE];
                self.read_exact(&mut pattern)?;
                (
                    ChunkData::Fill(u32::from_le_bytes(pattern)),
                    (CHUNK_HEADER_SIZE + FILL_PATTERN_SIZE) as u64,
                )
            }
            ChunkType::DontCare => (ChunkData::DontCare, CHUNK_HEADER_SIZE as u64),
        };

        // The block count is authoritative; a stale total_size is only reported.
        if header.total_size as u64 != expected_total {
            warn!(
                "Chunk {}: declared total_size {} does not match derived size {}",
                index, header.total_size, expected_total
            );
        }

        trace!(
            "Chunk {}: {} {} blocks ({} bytes)",
            index,
            chunk_type.name(),
            header.block_count,
            payload_bytes
        );

        self.decoded += 1;
        Ok(Chunk {
            block_count: header.block_count,
            data,
        })
    }

    /// Push `chunk` back so the next call to `next_chunk` yields it again.
    ///
    /// Only the most recently delivered chunk may be rewound, and only once.
    pub fn rewind(&mut self, chunk: Chunk) {
        debug_assert!(self.pending.is_none(), "only one chunk can be pushed back");
        trace!(
            "Rewinding {} chunk ({} header bytes)",
            chunk.chunk_type().name(),
            chunk.inline_len()
        );
        self.pending = Some(chunk);
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SparseError> {
        let index = self.index();
        self.inner
            .read_exact(buf)
            .map_err(|e| SparseError::from_read(e, Some(index)))
    }
}
