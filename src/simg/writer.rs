use std::io::{Seek, SeekFrom, Write};

use tracing::trace;

use crate::simg::chunk::Chunk;
use crate::simg::engine::ChunkSink;
use crate::simg::error::SparseError;
use crate::simg::header::{ImageHeader, SPARSE_HEADER_SIZE};

/// Two-phase sparse image writer.
///
/// Construction writes a zeroed header placeholder. Chunks are then streamed
/// after it, and [`SparseWriter::finish`] seeks back to offset 0 and writes
/// the real header once the output chunk count is known.
pub struct SparseWriter<W> {
    inner: W,
    block_size: u32,
    chunks_written: u32,
    bytes_written: u64,
}

impl<W: Write + Seek> SparseWriter<W> {
    pub fn new(mut inner: W, block_size: u32) -> Result<Self, SparseError> {
        inner.write_all(&[0u8; SPARSE_HEADER_SIZE])?;
        Ok(Self {
            inner,
            block_size,
            chunks_written: 0,
            bytes_written: SPARSE_HEADER_SIZE as u64,
        })
    }

    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<(), SparseError> {
        let written = chunk.write_to(&mut self.inner, self.block_size)?;
        self.chunks_written += 1;
        self.bytes_written += written;
        trace!(
            "Wrote {} chunk #{} ({} bytes)",
            chunk.chunk_type().name(),
            self.chunks_written,
            written
        );
        Ok(())
    }

    /// Output chunks written so far
    pub fn chunks_written(&self) -> u32 {
        self.chunks_written
    }

    /// Bytes written so far, placeholder header included
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Patch the header at offset 0 and return the underlying stream.
    pub fn finish(mut self, header: &ImageHeader) -> Result<W, SparseError> {
        self.inner.flush()?;
        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&header.encode())?;
        self.inner.seek(SeekFrom::Start(self.bytes_written))?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write + Seek> ChunkSink for SparseWriter<W> {
    fn emit(&mut self, chunk: Chunk) -> Result<(), SparseError> {
        self.write_chunk(&chunk)
    }
}
