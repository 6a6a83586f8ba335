//! Merge/flush state machine
//!
//! Chunks are fed one at a time. For a chunk of `size` bytes against a
//! window with `remaining = capacity - filled`:
//! - empty window and `size >= capacity`: emit the chunk unchanged
//! - non-empty window and `size > remaining`: flush the window, hand the
//!   chunk back so it is fed again against the empty window
//! - `size == remaining`: merge, then flush the now-full window
//! - `size < remaining`: merge and keep accumulating
//!
//! After the last chunk, [`RechunkEngine::finish`] flushes whatever is left.

use tracing::trace;

use crate::simg::chunk::Chunk;
use crate::simg::error::SparseError;
use crate::simg::window::MergeWindow;

/// Destination for finalized output chunks
pub trait ChunkSink {
    fn emit(&mut self, chunk: Chunk) -> Result<(), SparseError>;
}

impl ChunkSink for Vec<Chunk> {
    fn emit(&mut self, chunk: Chunk) -> Result<(), SparseError> {
        self.push(chunk);
        Ok(())
    }
}

/// Outcome of feeding one chunk
#[derive(Debug, PartialEq, Eq)]
pub enum Feed {
    /// The chunk was emitted or merged
    Placed,
    /// The window was flushed to make room; feed this chunk again
    Redeliver(Chunk),
}

pub struct RechunkEngine {
    block_size: u32,
    window: MergeWindow,
    /// Chunks emitted to the sink so far
    emitted: u32,
}

impl RechunkEngine {
    pub fn new(block_size: u32, capacity: u32) -> Self {
        Self {
            block_size,
            window: MergeWindow::new(capacity, block_size),
            emitted: 0,
        }
    }

    /// Number of chunks handed to the sink
    pub fn chunks_emitted(&self) -> u32 {
        self.emitted
    }

    pub fn window(&self) -> &MergeWindow {
        &self.window
    }

    pub fn feed<S: ChunkSink>(&mut self, chunk: Chunk, sink: &mut S) -> Result<Feed, SparseError> {
        let size = chunk.payload_bytes(self.block_size);
        let capacity = self.window.capacity() as u64;

        if self.window.is_empty() && size >= capacity {
            trace!(
                "Standalone {} chunk ({} blocks)",
                chunk.chunk_type().name(),
                chunk.block_count
            );
            self.emit(chunk, sink)?;
            return Ok(Feed::Placed);
        }

        let remaining = self.window.remaining();
        if size > remaining {
            trace!(
                "{} bytes overflow window with {} bytes left, flushing",
                size,
                remaining
            );
            self.flush(sink)?;
            return Ok(Feed::Redeliver(chunk));
        }

        self.window.merge(&chunk);
        if size == remaining {
            self.flush(sink)?;
        }
        Ok(Feed::Placed)
    }

    /// Flush a partially filled final window.
    pub fn finish<S: ChunkSink>(&mut self, sink: &mut S) -> Result<(), SparseError> {
        self.flush(sink)
    }

    fn flush<S: ChunkSink>(&mut self, sink: &mut S) -> Result<(), SparseError> {
        if let Some(chunk) = self.window.take() {
            trace!(
                "Flushing window as {} chunk ({} blocks)",
                chunk.chunk_type().name(),
                chunk.block_count
            );
            self.emit(chunk, sink)?;
        }
        Ok(())
    }

    fn emit<S: ChunkSink>(&mut self, chunk: Chunk, sink: &mut S) -> Result<(), SparseError> {
        sink.emit(chunk)?;
        self.emitted += 1;
        Ok(())
    }
}
